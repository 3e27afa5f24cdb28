//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the global `tracing` subscriber for the binary. Library code only
//! emits events; it never installs a subscriber itself.
//!
//! ## Configuration
//!
//! Levels come from `RUST_LOG`. The format is compact and hides module paths
//! (`with_target(false)`); the structured fields (`tenant_id`, `order_id`, `driver_id`,
//! `conn_id`) carry the context instead.
//!
//! ```bash
//! RUST_LOG=info cargo run -p order-sync           # admissions, transitions, connections
//! RUST_LOG=debug cargo run -p order-sync          # plus rejected fixes, publishes, replays
//! RUST_LOG=order_sync=debug,actor_framework=info cargo run -p order-sync
//! ```
//!
//! ## What Gets Traced
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | Desk open/close, order admitted, duplicate admission, transitions, subscribe/disconnect |
//! | `warn` | Refused transitions, failed side effects, persistence retries, lagging subscribers, rejected queue entries |
//! | `debug` | Rejected fixes, publish fan-out counts, code collisions, replayed requests |
//!
//! ## Workflow Trace Example
//!
//! ```text
//! INFO Tenant desk open tenant_id=t-1
//! INFO create_order{tenant_id=t-1 idempotency_key="req-1"}: Order admitted tenant_id=t-1 order_id=5f0c… code=K7P2QX total=3000
//! INFO create_order{tenant_id=t-1 idempotency_key="req-1"}: Duplicate admission tenant_id=t-1 order_id=5f0c…
//! WARN transition_order{tenant_id=t-1 order_id="5f0c…" to=New ..}: Transition refused error=invalid transition ready -> new
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
