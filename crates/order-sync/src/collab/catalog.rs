use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuInfo {
    /// Minor currency units.
    pub unit_price: i64,
    pub available: bool,
}

/// Pricing lookup used while validating payloads.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// `Ok(None)` means the sku does not exist for this tenant.
    async fn resolve_sku(&self, tenant_id: &str, sku: &str) -> Result<Option<SkuInfo>, StoreError>;
}
