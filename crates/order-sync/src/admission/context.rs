use crate::collab::{Catalog, OrderStore, SideEffects};
use crate::config::SyncConfig;
use crate::hub::FanoutHub;
use crate::retry::RetryPolicy;
use crate::state_machine::TransitionHooks;
use std::sync::Arc;
use std::time::Duration;

/// Tunables a desk reads on every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskSettings {
    pub dedup_window: Duration,
    pub code_length: usize,
    pub code_attempts: u32,
    pub persistence_retry: RetryPolicy,
}

impl DeskSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            dedup_window: config.dedup_window(),
            code_length: config.code_length,
            code_attempts: config.code_attempts,
            persistence_retry: config.persistence_retry(),
        }
    }
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Dependencies shared by every tenant desk. Cloned once per spawned desk.
#[derive(Clone)]
pub struct DeskContext {
    pub store: Arc<dyn OrderStore>,
    pub catalog: Arc<dyn Catalog>,
    pub effects: Arc<dyn SideEffects>,
    pub hub: Arc<FanoutHub>,
    pub hooks: Arc<TransitionHooks>,
    pub settings: DeskSettings,
}
