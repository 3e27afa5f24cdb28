use crate::error::StoreError;
use crate::model::{Comanda, Order};
use async_trait::async_trait;

/// Persistence for orders and comandas.
///
/// Implementations must give read-after-write consistency within one tenant: a `save_order`
/// that returned `Ok` is visible to the next `load_order` and `code_exists` for that tenant.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn load_order(&self, tenant_id: &str, order_id: &str)
        -> Result<Option<Order>, StoreError>;

    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn code_exists(&self, tenant_id: &str, code: &str) -> Result<bool, StoreError>;

    async fn load_comanda(
        &self,
        tenant_id: &str,
        comanda_id: &str,
    ) -> Result<Option<Comanda>, StoreError>;

    async fn save_comanda(&self, comanda: &Comanda) -> Result<(), StoreError>;
}
