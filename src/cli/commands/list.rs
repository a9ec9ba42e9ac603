use anyhow::Result;
use chrono::Local;

use super::{AgentSession, Command};
use crate::store::DeliveryStore;
use crate::types::DeliveryRecord;

pub struct ListCommand {
    pub all: bool,
}

impl ListCommand {
    pub fn new(all: bool) -> Self {
        Self { all }
    }

    async fn list_all(&self, session: &AgentSession) -> Result<()> {
        let records = session.store.list().await?;
        println!("📦 ALL DELIVERIES ({})", records.len());
        println!("==========================");
        for record in &records {
            print_record(record);
        }
        Ok(())
    }
}

impl Command for ListCommand {
    async fn execute(&self, session: &mut AgentSession) -> Result<()> {
        if self.all {
            return self.list_all(session).await;
        }

        if session.reconciler.is_stale() || session.reconciler.deliveries().is_empty() {
            if let Err(e) = session.reconciler.refresh(&session.ctx).await {
                println!("📴 Working offline ({e}); showing the last synced list");
            }
        }

        let view = session
            .reconciler
            .agent_view(&session.ctx, Local::now().date_naive());

        println!("🚚 DELIVERIES FOR {}", session.ctx.agent);
        println!("==========================");
        println!();
        println!("📅 TODAY ({})", view.today.len());
        println!("──────────");
        if view.today.is_empty() {
            println!("   No deliveries scheduled for today");
        }
        for record in &view.today {
            print_record(record);
        }

        println!();
        println!("🗂️  PAST ({})", view.past.len());
        println!("──────────");
        for record in &view.past {
            print_record(record);
        }

        let pending = session.reconciler.pending().len();
        if pending > 0 {
            println!();
            println!("⏳ {pending} update(s) pending sync, run 'dlvery sync' when back online");
        }
        if session.reconciler.is_stale() {
            println!("⚠️  Delivery list may be out of date");
        }
        session.print_durability_warning();
        Ok(())
    }
}

fn print_record(record: &DeliveryRecord) {
    let marker = if record.priority.is_highlighted() { "🔴" } else { "  " };
    println!(
        "{marker} #{:<6} {:<12} {:<20} x{:<3} {:<10} {:<14} {}",
        record.id.as_str(),
        record.date,
        record.product_name,
        record.quantity,
        record.priority,
        record.status.label(),
        record.customer_address,
    );
    if !record.notes.is_empty() {
        println!("           📝 {}", record.notes);
    }
}
