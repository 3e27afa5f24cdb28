//! # Collaborator Ports
//!
//! The engine never owns persistence, pricing or downstream effects. It talks to them through
//! the async traits in this module, which are injected into the tenant desks as `Arc<dyn _>`.
//!
//! | Port | Used for |
//! |------|----------|
//! | [`OrderStore`] | Load / save orders and comandas, code collision checks |
//! | [`Catalog`] | Unit price and availability per sku |
//! | [`SideEffects`] | Executing transition hooks (stock, billing) |
//!
//! The [`memory`] implementations back the tests and the demo binary. `MemoryStore` can be told
//! to fail the next N writes so retry paths are testable.

pub mod catalog;
pub mod effects;
pub mod memory;
pub mod store;

pub use catalog::{Catalog, SkuInfo};
pub use effects::{LoggingEffects, SideEffects};
pub use memory::{MemoryCatalog, MemoryStore, RecordingEffects};
pub use store::OrderStore;
