use super::{Rejection, Track};
use crate::config::GeoConfig;
use crate::model::{DriverId, PositionSample, SmoothedPosition};
use actor_framework::ActorEntity;
use async_trait::async_trait;
use std::convert::Infallible;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
pub enum TrackAction {
    Ingest(PositionSample),
    Current,
    Reset,
}

/// Result of one ingested fix.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    pub rejection: Option<Rejection>,
    /// Smoothed position right after the fix was applied.
    pub position: Option<SmoothedPosition>,
}

impl Ingestion {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackReply {
    Ingested(Ingestion),
    Position(Option<SmoothedPosition>),
    Reset,
}

/// Per-driver tracking state owned by one actor.
pub struct DriverTrack {
    driver_id: DriverId,
    track: Track,
    accepted: u64,
    rejected: u64,
}

#[async_trait]
impl ActorEntity for DriverTrack {
    type Id = DriverId;
    type Action = TrackAction;
    type ActionResult = TrackReply;
    type Context = GeoConfig;
    type Error = Infallible;

    fn from_id(id: DriverId, ctx: &GeoConfig) -> Self {
        Self {
            driver_id: id,
            track: Track::new(ctx),
            accepted: 0,
            rejected: 0,
        }
    }

    async fn handle_action(
        &mut self,
        action: TrackAction,
        _ctx: &GeoConfig,
    ) -> Result<TrackReply, Infallible> {
        let now = Instant::now();
        let reply = match action {
            TrackAction::Ingest(sample) => {
                let rejection = match self.track.ingest(&sample, now) {
                    Ok(()) => {
                        self.accepted += 1;
                        None
                    }
                    Err(reason) => {
                        self.rejected += 1;
                        debug!(driver_id = %self.driver_id, %reason, "Fix rejected");
                        Some(reason)
                    }
                };
                TrackReply::Ingested(Ingestion {
                    rejection,
                    position: self.track.current_position(now),
                })
            }
            TrackAction::Current => TrackReply::Position(self.track.current_position(now)),
            TrackAction::Reset => {
                self.track.reset();
                debug!(driver_id = %self.driver_id, "Track reset");
                TrackReply::Reset
            }
        };
        Ok(reply)
    }

    async fn on_stop(&mut self, _ctx: &GeoConfig) {
        info!(
            driver_id = %self.driver_id,
            accepted = self.accepted,
            rejected = self.rejected,
            "Track closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_framework::ResourceActor;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_track_actor_rejects_implausible_jump() {
        let (actor, client) = ResourceActor::<DriverTrack>::new("d-1".to_string(), 8);
        tokio::spawn(actor.run(GeoConfig::default()));

        let t0 = Utc::now();
        let first = client
            .perform_action(TrackAction::Ingest(PositionSample::new(0.0, 0.0, 5.0, t0)))
            .await
            .unwrap();
        let TrackReply::Ingested(first) = first else {
            panic!("unexpected reply");
        };
        assert!(first.accepted());

        let jump = PositionSample::new(0.01, 0.0, 5.0, t0 + Duration::seconds(1));
        let TrackReply::Ingested(second) = client
            .perform_action(TrackAction::Ingest(jump))
            .await
            .unwrap()
        else {
            panic!("unexpected reply");
        };
        assert!(matches!(second.rejection, Some(Rejection::TooFast { .. })));
        let pos = second.position.unwrap();
        assert!(pos.lat.abs() < 1e-9, "position moved to {}", pos.lat);

        client.perform_action(TrackAction::Reset).await.unwrap();
        assert_eq!(
            client.perform_action(TrackAction::Current).await.unwrap(),
            TrackReply::Position(None)
        );
    }
}
