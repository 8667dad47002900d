use crate::adapters::{DurableStore, SystemClock};
use crate::config::AppConfig;
use crate::registry::{MemoryStore, Registry};

use std::sync::Arc;

pub type SubscriptionRegistry = Registry<DurableStore, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<SubscriptionRegistry>,
}

impl AppState {
    /// Wires the registry; the fallback store lives as long as this state.
    pub fn new(config: AppConfig) -> Self {
        let durable = DurableStore::from_config(config.supabase.as_ref());
        let fallback = Arc::new(MemoryStore::new());
        let registry = Registry::new(durable, fallback, SystemClock);
        Self {
            config,
            registry: Arc::new(registry),
        }
    }
}
