//! Typed wrappers around the raw actor clients.
//!
//! Callers never build [`DeskAction`](crate::admission::DeskAction)s by hand; they call a
//! method here and get a typed result back, with framework errors already mapped onto
//! [`SyncError`](crate::error::SyncError).

mod tenant_client;
mod track_client;

pub use tenant_client::TenantClient;
pub use track_client::TrackClient;
