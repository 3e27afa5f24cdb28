use actor_framework::{ActorEntity, ActorRegistry, FrameworkError, ResourceActor};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// --- Test Entity ---

/// A ticket counter per venue. `Slow` holds the actor so tests can pile up a mailbox.
struct Venue {
    name: String,
    sold: u32,
    capacity: u32,
}

#[derive(Debug)]
enum VenueAction {
    Sell(u32),
    Sold,
    Name,
    Slow(Duration),
}

#[derive(Debug, PartialEq)]
enum VenueReply {
    Count(u32),
    Name(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
enum VenueError {
    #[error("sold out")]
    SoldOut,
}

#[derive(Clone, Default)]
struct VenueContext {
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

#[async_trait]
impl ActorEntity for Venue {
    type Id = String;
    type Action = VenueAction;
    type ActionResult = VenueReply;
    type Context = VenueContext;
    type Error = VenueError;

    fn from_id(name: String, _ctx: &VenueContext) -> Self {
        Self {
            name,
            sold: 0,
            capacity: 3,
        }
    }

    async fn on_start(&mut self, ctx: &VenueContext) -> Result<(), VenueError> {
        ctx.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: VenueAction,
        _ctx: &VenueContext,
    ) -> Result<VenueReply, VenueError> {
        match action {
            VenueAction::Sell(n) => {
                if self.sold + n > self.capacity {
                    return Err(VenueError::SoldOut);
                }
                self.sold += n;
                Ok(VenueReply::Count(self.sold))
            }
            VenueAction::Sold => Ok(VenueReply::Count(self.sold)),
            VenueAction::Name => Ok(VenueReply::Name(self.name.clone())),
            VenueAction::Slow(d) => {
                tokio::time::sleep(d).await;
                Ok(VenueReply::Count(self.sold))
            }
        }
    }

    async fn on_stop(&mut self, ctx: &VenueContext) {
        ctx.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

// --- Tests ---

#[tokio::test]
async fn test_framework_full_lifecycle() {
    let ctx = VenueContext::default();
    let (actor, client) = ResourceActor::<Venue>::new("arena".to_string(), 10);
    let handle = tokio::spawn(actor.run(ctx.clone()));

    assert_eq!(
        client.perform_action(VenueAction::Name).await.unwrap(),
        VenueReply::Name("arena".into())
    );
    assert_eq!(
        client.perform_action(VenueAction::Sell(2)).await.unwrap(),
        VenueReply::Count(2)
    );

    // Entity errors come back untouched and leave state alone.
    let err = client.perform_action(VenueAction::Sell(2)).await.unwrap_err();
    assert!(matches!(err, FrameworkError::Entity(VenueError::SoldOut)));
    assert_eq!(
        client.perform_action(VenueAction::Sold).await.unwrap(),
        VenueReply::Count(2)
    );

    drop(client);
    handle.await.unwrap();
    assert_eq!(ctx.started.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_requests_are_serialized() {
    let (actor, client) = ResourceActor::<Venue>::new("club".to_string(), 64);
    tokio::spawn(actor.run(VenueContext::default()));

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let c = client.clone();
        tasks.push(tokio::spawn(
            async move { c.perform_action(VenueAction::Sell(1)).await },
        ));
    }

    let mut ok = 0;
    let mut sold_out = 0;
    for t in tasks {
        match t.await.unwrap() {
            Ok(_) => ok += 1,
            Err(FrameworkError::Entity(VenueError::SoldOut)) => sold_out += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 3);
    assert_eq!(sold_out, 17);
}

#[tokio::test]
async fn test_request_expires_in_mailbox() {
    let (actor, client) = ResourceActor::<Venue>::new("stadium".to_string(), 10);
    tokio::spawn(actor.run(VenueContext::default()));

    let busy = client.clone();
    let blocker = tokio::spawn(async move {
        busy.perform_action(VenueAction::Slow(Duration::from_millis(200)))
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Enqueued fine, but reaches the front only after its deadline.
    let result = client
        .perform_action_within(VenueAction::Sell(1), Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(FrameworkError::Timeout)));

    blocker.await.unwrap().unwrap();
    // The expired sale was never applied.
    assert_eq!(
        client.perform_action(VenueAction::Sold).await.unwrap(),
        VenueReply::Count(0)
    );
}

#[tokio::test]
async fn test_registry_isolates_keys() {
    let ctx = VenueContext::default();
    let registry = ActorRegistry::<Venue>::new(ctx.clone(), 10);

    let north = registry.client(&"north".to_string());
    let south = registry.client(&"south".to_string());

    // A slow request on one key does not hold up the other.
    let slow = north.clone();
    let pending = tokio::spawn(async move {
        slow.perform_action(VenueAction::Slow(Duration::from_millis(300)))
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let reply = south
        .perform_action_within(VenueAction::Sell(3), Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(reply, VenueReply::Count(3));

    // Same key twice hands out the same actor.
    let again = registry.client(&"south".to_string());
    assert_eq!(
        again.perform_action(VenueAction::Sold).await.unwrap(),
        VenueReply::Count(3)
    );
    assert_eq!(registry.len(), 2);
    assert!(registry.contains(&"north".to_string()));

    pending.await.unwrap().unwrap();
    drop((north, south, again));
    registry.shutdown().await;
    assert_eq!(ctx.started.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.stopped.load(Ordering::SeqCst), 2);
}
