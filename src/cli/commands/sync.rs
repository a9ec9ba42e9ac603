use anyhow::Result;
use tracing::Instrument;

use super::{AgentSession, Command};
use crate::telemetry::{create_sync_span, generate_correlation_id};

pub struct SyncCommand;

impl Command for SyncCommand {
    async fn execute(&self, session: &mut AgentSession) -> Result<()> {
        let correlation_id = generate_correlation_id();
        let span = create_sync_span("sync", Some(&session.ctx.agent), None, Some(&correlation_id));

        let queued = session.reconciler.pending().len();
        println!("🔄 Syncing {queued} queued update(s)...");

        let report = session.reconciler.sync(&session.ctx).instrument(span).await;
        let flush = &report.flush;

        for pending in &flush.applied {
            println!(
                "   ✅ #{} → {}",
                pending.delivery_id(),
                pending.update.status().label()
            );
        }
        for (pending, error) in &flush.rejected {
            println!(
                "   ❌ #{} → {} dropped: {}",
                pending.delivery_id(),
                pending.update.status().label(),
                error
            );
        }

        if let Some(error) = &flush.interrupted {
            println!("📴 Store unreachable ({error}); {} update(s) still queued", flush.remaining);
        } else {
            println!("📤 Queue drained");
        }

        match (report.refreshed, &report.refresh_error) {
            (Some(count), _) => println!("📥 Refreshed {count} deliveries"),
            (None, Some(error)) => println!("⚠️  Refresh failed: {error}"),
            (None, None) => {}
        }

        session.print_durability_warning();
        Ok(())
    }
}
