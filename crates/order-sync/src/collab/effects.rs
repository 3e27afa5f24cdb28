use crate::error::StoreError;
use crate::model::Order;
use crate::state_machine::SideEffect;
use async_trait::async_trait;
use tracing::info;

/// Executes the effects declared by [`TransitionHooks`](crate::state_machine::TransitionHooks).
///
/// Called after the transition is persisted; an error is logged by the caller and does not
/// undo the transition.
#[async_trait]
pub trait SideEffects: Send + Sync {
    async fn execute(&self, effect: SideEffect, order: &Order) -> Result<(), StoreError>;
}

/// Default executor when no downstream systems are wired: records the effect in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEffects;

#[async_trait]
impl SideEffects for LoggingEffects {
    async fn execute(&self, effect: SideEffect, order: &Order) -> Result<(), StoreError> {
        info!(order_id = %order.id, tenant_id = %order.tenant_id, ?effect, "Side effect");
        Ok(())
    }
}
