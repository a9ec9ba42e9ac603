use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::config::DlveryConfig;
use crate::storage::FileStorage;
use crate::store::HttpDeliveryStore;
use crate::sync::{Durability, SyncReconciler};
use crate::types::AgentContext;

pub mod list;
pub mod queue;
pub mod status;
pub mod sync;
pub mod update;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, session: &mut AgentSession) -> Result<()>;
}

/// Everything a command needs for one signed-in agent
pub struct AgentSession {
    pub ctx: AgentContext,
    pub config: DlveryConfig,
    pub store: Arc<HttpDeliveryStore>,
    pub reconciler: SyncReconciler,
}

impl AgentSession {
    /// Resolve the agent identity and restore the offline state
    pub async fn open(config: DlveryConfig, agent: Option<String>) -> Result<Self> {
        let agent = agent
            .or_else(|| config.agent.id.clone())
            .filter(|agent| !agent.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("no agent identity: pass --agent or set agent.id (DLVERY_AGENT__ID)")
            })?;

        let store = Arc::new(HttpDeliveryStore::new(&config.store)?);
        let storage = Arc::new(FileStorage::open(config.storage_dir()));
        let reconciler =
            SyncReconciler::open(store.clone(), storage, config.sync_config()).await;

        Ok(Self {
            ctx: AgentContext::new(agent),
            config,
            store,
            reconciler,
        })
    }

    /// Warn once per command when updates would not survive a restart
    pub fn print_durability_warning(&self) {
        if self.reconciler.durability() == Durability::Degraded {
            println!("⚠️  Offline storage unavailable: queued updates are lost if dlvery exits before syncing");
        }
    }
}
