use anyhow::Result;

use super::{AgentSession, Command};

pub struct QueueCommand;

impl Command for QueueCommand {
    async fn execute(&self, session: &mut AgentSession) -> Result<()> {
        let queue = session.reconciler.pending();

        if queue.is_empty() {
            println!("✨ Nothing pending sync");
            return Ok(());
        }

        println!("⏳ PENDING SYNC ({})", queue.len());
        println!("──────────────────");
        for (position, pending) in queue.iter().enumerate() {
            let signed = if pending.update.signature().is_some() { " ✍️" } else { "" };
            println!(
                "{:>3}. #{} → {}{} (queued {})",
                position + 1,
                pending.delivery_id(),
                pending.update.status().label(),
                signed,
                pending.enqueued_at.format("%Y-%m-%d %H:%M:%S UTC"),
            );
            if !pending.update.notes().is_empty() {
                println!("       📝 {}", pending.update.notes());
            }
        }

        session.print_durability_warning();
        Ok(())
    }
}
