use anyhow::Result;

use super::{AgentSession, Command};
use crate::sync::Durability;

pub struct StatusCommand;

impl Command for StatusCommand {
    async fn execute(&self, session: &mut AgentSession) -> Result<()> {
        let reconciler = &session.reconciler;

        println!("🚚 DLVERY SYNC STATUS");
        println!("==========================");
        println!("   👤 Agent: {}", session.ctx.agent);
        println!("   🌐 Store: {}", session.store.base_url());
        println!("   📂 Offline storage: {}", session.config.offline.storage_dir);
        println!();

        match reconciler.last_sync() {
            Some(last_sync) => println!("   🕒 Last sync: {}", last_sync.to_rfc3339()),
            None => println!("   🕒 Last sync: never"),
        }
        if reconciler.is_stale() {
            println!(
                "   ⚠️  Stale: older than {} minutes",
                reconciler.config().stale_after.num_minutes()
            );
        } else {
            println!("   ✅ Fresh");
        }

        println!("   ⏳ Pending sync: {}", reconciler.pending().len());
        println!("   📦 Deliveries mirrored: {}", reconciler.deliveries().len());
        match reconciler.durability() {
            Durability::Durable => println!("   💾 Durability: durable"),
            Durability::Degraded => println!("   💾 Durability: degraded (in-memory only)"),
        }

        Ok(())
    }
}
