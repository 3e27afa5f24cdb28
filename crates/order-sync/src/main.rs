//! # Order Sync Demo
//!
//! Walks one delivery order through its whole life on in-memory collaborators:
//! 1. A kitchen screen and the customer app subscribe.
//! 2. The customer places an order; a retry with the same key returns the same order.
//! 3. Staff move it through the kitchen and assign a driver.
//! 4. The driver reports fixes; an implausible jump is rejected.
//! 5. A tablet that was offline replays its queued writes.
//!
//! Configuration comes from `ORDER_SYNC_*` variables (or a `.env` file).

use chrono::{Duration, Utc};
use order_sync::collab::{LoggingEffects, MemoryCatalog, MemoryStore};
use order_sync::config::SyncConfig;
use order_sync::lifecycle::{setup_tracing, SyncSystem};
use order_sync::model::{
    Initiator, ItemRequest, Operation, OrderPayload, OrderStatus, PositionSample, QueuedMutation,
    SubscriberKey, TargetRef,
};
use order_sync::queue::OfflineQueue;
use std::sync::Arc;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = SyncConfig::from_env()?;
    let catalog = MemoryCatalog::new()
        .with_shared_sku("burger", 1_250)
        .with_shared_sku("fries", 600)
        .with_shared_sku("soda", 500);
    let system = SyncSystem::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(catalog),
        Arc::new(LoggingEffects),
    );

    let mut kitchen = system.subscribe(SubscriberKey::tenant("bistro"));
    let mut customer = system.subscribe(SubscriberKey::customer("c-42"));

    // Admission
    let payload = OrderPayload::new(vec![
        ItemRequest::new("burger", 2),
        ItemRequest::new("fries", 1),
    ])
    .for_customer("c-42");
    let span = tracing::info_span!("admission");
    let order = async {
        let first = system
            .create_order("bistro", "req-001", payload.clone())
            .await?;
        let retry = system.create_order("bistro", "req-001", payload).await?;
        info!(code = %first.order.code, retry = retry.code(), "Customer retried");
        Ok::<_, order_sync::error::SyncError>(first.order)
    }
    .instrument(span)
    .await?;

    // Kitchen
    let staff = Initiator::Staff("s-1".into());
    for to in [
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ] {
        system
            .transition_order("bistro", &order.id, to, staff.clone(), None)
            .await?;
    }
    if let Err(e) = system
        .transition_order("bistro", &order.id, OrderStatus::New, staff.clone(), None)
        .await
    {
        info!(code = e.code(), "Backwards transition refused");
    }

    // Delivery
    system
        .assign_driver("bistro", &order.id, "d-7", Some(Utc::now() + Duration::minutes(25)))
        .await?;
    system
        .transition_order(
            "bistro",
            &order.id,
            OrderStatus::OutForDelivery,
            Initiator::Driver("d-7".into()),
            None,
        )
        .await?;

    let t0 = Utc::now();
    let fixes = [
        PositionSample::new(-23.5505, -46.6333, 8.0, t0),
        PositionSample::new(-23.5503, -46.6331, 6.0, t0 + Duration::seconds(5)),
        // 1.1 km in one second
        PositionSample::new(-23.5403, -46.6331, 6.0, t0 + Duration::seconds(6)),
        PositionSample::new(-23.5500, -46.6329, 5.0, t0 + Duration::seconds(10)),
    ];
    for fix in fixes {
        let ingestion = system.report_location("d-7", fix).await?;
        match ingestion.rejection {
            None => info!(lat = fix.lat, lng = fix.lng, "Fix accepted"),
            Some(reason) => info!(%reason, "Fix rejected"),
        }
    }
    if let Some(position) = system.current_position("d-7").await? {
        info!(lat = position.lat, lng = position.lng, "Smoothed position");
    }

    system
        .transition_order(
            "bistro",
            &order.id,
            OrderStatus::Delivered,
            Initiator::Driver("d-7".into()),
            None,
        )
        .await?;

    // Offline replay
    let queue = OfflineQueue::open_in_memory()?;
    queue.enqueue(&QueuedMutation::new(
        "tablet-1",
        "bistro",
        None,
        Operation::AddComandaItem {
            sku: "soda".into(),
            quantity: 2,
            table_id: Some("12".into()),
        },
    ))?;
    queue.enqueue(&QueuedMutation::new(
        "tablet-2",
        "bistro",
        Some(TargetRef::Local("tablet-1".into())),
        Operation::CloseComanda,
    ))?;
    let report = system.replay(&queue).await?;
    info!(
        applied = report.applied,
        rejected = report.rejected,
        "Offline writes replayed"
    );

    let mut seen = 0;
    while let Some(event) = kitchen.try_recv() {
        seen += 1;
        info!(kind = event.kind(), "Kitchen event");
    }
    while let Some(event) = customer.try_recv() {
        info!(kind = event.kind(), "Customer event");
    }
    if seen == 0 {
        error!("Kitchen screen received nothing");
    }

    drop(kitchen);
    drop(customer);
    system.shutdown().await;
    info!("Demo completed");
    Ok(())
}
