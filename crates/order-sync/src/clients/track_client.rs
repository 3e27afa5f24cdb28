//! # Track Client
//!
//! High-level API for one driver's track.
use crate::error::SyncError;
use crate::model::{PositionSample, SmoothedPosition};
use crate::tracking::{DriverTrack, Ingestion, TrackAction, TrackReply};
use actor_framework::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use std::convert::Infallible;
use tracing::instrument;

#[derive(Clone)]
pub struct TrackClient {
    inner: ResourceClient<DriverTrack>,
}

#[async_trait]
impl ActorClient<DriverTrack> for TrackClient {
    type Error = SyncError;

    fn inner(&self) -> &ResourceClient<DriverTrack> {
        &self.inner
    }

    fn map_error(e: FrameworkError<Infallible>) -> SyncError {
        match e {
            FrameworkError::Timeout => SyncError::Timeout,
            other => SyncError::Transient(other.to_string()),
        }
    }
}

impl TrackClient {
    pub fn new(inner: ResourceClient<DriverTrack>) -> Self {
        Self { inner }
    }

    pub fn driver_id(&self) -> &str {
        self.inner.id()
    }

    /// Feeds one raw fix. The reply says whether it was accepted.
    #[instrument(skip(self), fields(driver_id = %self.driver_id()))]
    pub async fn ingest(&self, sample: PositionSample) -> Result<Ingestion, SyncError> {
        match self.request(TrackAction::Ingest(sample)).await? {
            TrackReply::Ingested(ingestion) => Ok(ingestion),
            other => unreachable!("Ingest must return Ingested, got {other:?}"),
        }
    }

    pub async fn current_position(&self) -> Result<Option<SmoothedPosition>, SyncError> {
        match self.request(TrackAction::Current).await? {
            TrackReply::Position(position) => Ok(position),
            other => unreachable!("Current must return Position, got {other:?}"),
        }
    }

    #[instrument(skip(self), fields(driver_id = %self.driver_id()))]
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.request(TrackAction::Reset).await?;
        Ok(())
    }
}
