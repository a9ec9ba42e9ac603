use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "dlvery")]
#[command(about = "Last-mile delivery status updates that keep working offline")]
#[command(long_about = "dlvery lets a delivery agent record delivery outcomes, capture proof-of-delivery \
                       signatures and keep working without connectivity. Updates made offline are queued \
                       and replayed in order with 'dlvery sync'.")]
pub struct Cli {
    /// Agent identity (defaults to agent.id from configuration)
    #[arg(long, global = true, help = "Agent identity, e.g. the agent's email address")]
    pub agent: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show today's and past deliveries for the agent
    List {
        /// List every delivery in the store instead of the agent's own
        #[arg(long, help = "List every delivery known to the store")]
        all: bool,
    },
    /// Record a new status for a delivery
    Update {
        /// Delivery id
        id: String,
        /// pending, in_progress, delivered, damaged or door_locked
        status: String,
        /// Notes for the delivery (keeps the current notes when omitted)
        #[arg(long)]
        notes: Option<String>,
        /// Signature image: a PNG file or a file holding a PNG data URI
        #[arg(long, help = "Customer signature, required for 'delivered'")]
        signature_file: Option<PathBuf>,
    },
    /// Send queued updates and refresh the local delivery list
    Sync,
    /// Show updates waiting to be synced
    Queue,
    /// Show sync health: last sync, staleness, queue length and durability
    Status,
}
