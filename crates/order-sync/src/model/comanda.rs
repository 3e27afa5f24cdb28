use super::order::{items_total, LineItem, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ComandaId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComandaStatus {
    Open,
    Closed,
    Cancelled,
}

impl fmt::Display for ComandaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComandaStatus::Open => "open",
            ComandaStatus::Closed => "closed",
            ComandaStatus::Cancelled => "cancelled",
        })
    }
}

/// An open tab. Items change only while `status == Open`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comanda {
    pub id: ComandaId,
    pub tenant_id: TenantId,
    pub table_id: Option<String>,
    pub status: ComandaStatus,
    pub items: Vec<LineItem>,
    /// Derived from `items`; frozen once closed.
    pub total: i64,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Comanda {
    pub fn open(
        id: ComandaId,
        tenant_id: TenantId,
        table_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            table_id,
            status: ComandaStatus::Open,
            items: Vec::new(),
            total: 0,
            opened_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ComandaStatus::Open
    }

    pub(crate) fn recompute_total(&mut self) -> Option<i64> {
        let total = items_total(&self.items)?;
        self.total = total;
        Some(total)
    }
}
