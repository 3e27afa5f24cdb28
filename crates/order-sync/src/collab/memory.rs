//! In-memory collaborators.

use super::{Catalog, OrderStore, SideEffects, SkuInfo};
use crate::error::StoreError;
use crate::model::{Comanda, Order};
use crate::state_machine::SideEffect;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use tokio::sync::Mutex;

type Key = (String, String);

fn key(tenant_id: &str, id: &str) -> Key {
    (tenant_id.to_string(), id.to_string())
}

/// Orders and comandas in sharded maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: DashMap<Key, Order>,
    comandas: DashMap<Key, Comanda>,
    codes: DashSet<Key>,
    fail_next_writes: AtomicU32,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` writes fail with `Unavailable`.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_next_writes.store(n, Ordering::SeqCst);
    }

    /// While offline every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Marks a code as taken, e.g. to force a collision.
    pub fn reserve_code(&self, tenant_id: &str, code: &str) {
        self.codes.insert(key(tenant_id, code));
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn order_count(&self, tenant_id: &str) -> usize {
        self.orders.iter().filter(|e| e.key().0 == tenant_id).count()
    }

    pub fn orders(&self, tenant_id: &str) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .map(|e| e.value().clone())
            .collect()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.check_read()?;
        let injected = self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn load_order(
        &self,
        tenant_id: &str,
        order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        self.check_read()?;
        Ok(self
            .orders
            .get(&key(tenant_id, order_id))
            .map(|o| o.value().clone()))
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.check_write()?;
        self.codes.insert(key(&order.tenant_id, &order.code));
        self.orders
            .insert(key(&order.tenant_id, &order.id), order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn code_exists(&self, tenant_id: &str, code: &str) -> Result<bool, StoreError> {
        self.check_read()?;
        Ok(self.codes.contains(&key(tenant_id, code)))
    }

    async fn load_comanda(
        &self,
        tenant_id: &str,
        comanda_id: &str,
    ) -> Result<Option<Comanda>, StoreError> {
        self.check_read()?;
        Ok(self
            .comandas
            .get(&key(tenant_id, comanda_id))
            .map(|c| c.value().clone()))
    }

    async fn save_comanda(&self, comanda: &Comanda) -> Result<(), StoreError> {
        self.check_write()?;
        self.comandas
            .insert(key(&comanda.tenant_id, &comanda.id), comanda.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Catalog keyed by `(tenant, sku)`. Skus registered with [`MemoryCatalog::with_shared_sku`]
/// resolve for every tenant.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    skus: DashMap<Key, SkuInfo>,
}

const SHARED: &str = "*";

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sku(self, tenant_id: &str, sku: &str, unit_price: i64) -> Self {
        self.skus.insert(
            key(tenant_id, sku),
            SkuInfo {
                unit_price,
                available: true,
            },
        );
        self
    }

    pub fn with_shared_sku(self, sku: &str, unit_price: i64) -> Self {
        self.with_sku(SHARED, sku, unit_price)
    }

    pub fn set_available(&self, tenant_id: &str, sku: &str, available: bool) {
        if let Some(mut info) = self.skus.get_mut(&key(tenant_id, sku)) {
            info.available = available;
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn resolve_sku(&self, tenant_id: &str, sku: &str) -> Result<Option<SkuInfo>, StoreError> {
        let found = self
            .skus
            .get(&key(tenant_id, sku))
            .or_else(|| self.skus.get(&key(SHARED, sku)))
            .map(|info| *info.value());
        Ok(found)
    }
}

/// Remembers every executed effect; can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingEffects {
    executed: Mutex<Vec<(SideEffect, String)>>,
    failing: AtomicBool,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `(effect, order_id)` pairs in execution order.
    pub async fn executed(&self) -> Vec<(SideEffect, String)> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl SideEffects for RecordingEffects {
    async fn execute(&self, effect: SideEffect, order: &Order) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("effects offline".into()));
        }
        self.executed.lock().await.push((effect, order.id.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_writes(2);
        let comanda = Comanda::open("c".into(), "t".into(), None, chrono::Utc::now());
        assert!(store.save_comanda(&comanda).await.is_err());
        assert!(store.save_comanda(&comanda).await.is_err());
        assert!(store.save_comanda(&comanda).await.is_ok());
        assert_eq!(store.write_count(), 1);
        assert!(store.load_comanda("t", "c").await.unwrap().is_some());
        assert!(store.load_comanda("other", "c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_shared_and_tenant_skus() {
        let catalog = MemoryCatalog::new()
            .with_shared_sku("water", 300)
            .with_sku("t-1", "special", 2_000);
        assert_eq!(
            catalog.resolve_sku("t-2", "water").await.unwrap().map(|i| i.unit_price),
            Some(300)
        );
        assert!(catalog.resolve_sku("t-2", "special").await.unwrap().is_none());

        catalog.set_available("t-1", "special", false);
        let info = catalog.resolve_sku("t-1", "special").await.unwrap().unwrap();
        assert!(!info.available);
    }
}
