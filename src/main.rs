use anyhow::Result;
use clap::Parser;

use dlvery::cli::commands::list::ListCommand;
use dlvery::cli::commands::queue::QueueCommand;
use dlvery::cli::commands::status::StatusCommand;
use dlvery::cli::commands::sync::SyncCommand;
use dlvery::cli::commands::update::UpdateCommand;
use dlvery::cli::commands::{AgentSession, Command};
use dlvery::cli::{Cli, Commands};
use dlvery::{config, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config()?.clone();
    init_telemetry(&config.observability)?;

    let result = tokio::runtime::Runtime::new()?.block_on(async {
        let mut session = AgentSession::open(config, cli.agent).await?;

        match cli.command {
            Commands::List { all } => ListCommand::new(all).execute(&mut session).await,
            Commands::Update {
                id,
                status,
                notes,
                signature_file,
            } => {
                UpdateCommand::new(id.as_str(), status, notes, signature_file)
                    .execute(&mut session)
                    .await
            }
            Commands::Sync => SyncCommand.execute(&mut session).await,
            Commands::Queue => QueueCommand.execute(&mut session).await,
            Commands::Status => StatusCommand.execute(&mut session).await,
        }
    });

    shutdown_telemetry();
    result
}
