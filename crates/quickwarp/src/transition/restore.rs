use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::host::{EntityHandle, EntityHost};
use crate::types::WarpPoint;

use super::Step;

pub const RESTORE_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error("a restore is already running")]
    Busy,
    #[error("warp point has no scene")]
    UnsetPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    Restored(EntityHandle),
    /// No active controllable entity showed up in time. Nothing was touched.
    TimedOut,
    ApplyFailed { reason: String },
}

impl RestoreOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, RestoreOutcome::Restored(_))
    }
}

#[derive(Debug, Default)]
enum RestoreState {
    #[default]
    Idle,
    Searching {
        point: WarpPoint,
        elapsed: Duration,
    },
    /// Entity found; the transform is written on the next tick.
    Settling {
        point: WarpPoint,
        entity: EntityHandle,
    },
    EndOfFrame {
        entity: EntityHandle,
    },
}

/// Puts the controllable entity back at a saved point once the scene has
/// produced one.
#[derive(Debug)]
pub struct RestoreSequencer {
    timeout: Duration,
    state: RestoreState,
}

impl Default for RestoreSequencer {
    fn default() -> Self {
        Self::new(RESTORE_TIMEOUT)
    }
}

impl RestoreSequencer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: RestoreState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, RestoreState::Idle)
    }

    pub fn begin(&mut self, point: WarpPoint) -> Result<(), RestoreError> {
        if self.is_running() {
            return Err(RestoreError::Busy);
        }
        if !point.is_set() {
            return Err(RestoreError::UnsetPoint);
        }
        debug!(scene = %point.scene_id, "restore_searching");
        self.state = RestoreState::Searching {
            point,
            elapsed: Duration::ZERO,
        };
        Ok(())
    }

    pub fn poll<H: EntityHost + ?Sized>(
        &mut self,
        host: &mut H,
        dt: Duration,
    ) -> Step<RestoreOutcome> {
        match std::mem::take(&mut self.state) {
            RestoreState::Idle => Step::Pending,
            RestoreState::Searching { point, elapsed } => {
                let elapsed = elapsed.saturating_add(dt);
                let found = host
                    .find_controllable_entity()
                    .filter(|entity| host.is_active_in_hierarchy(*entity));
                if let Some(entity) = found {
                    debug!(?entity, "restore_entity_found");
                    self.state = RestoreState::Settling { point, entity };
                    Step::Pending
                } else if elapsed >= self.timeout {
                    warn!(
                        scene = %point.scene_id,
                        ?elapsed,
                        "restore_entity_timeout"
                    );
                    Step::Done(RestoreOutcome::TimedOut)
                } else {
                    self.state = RestoreState::Searching { point, elapsed };
                    Step::Pending
                }
            }
            RestoreState::Settling { point, entity } => match apply(host, entity, &point) {
                Ok(()) => {
                    self.state = RestoreState::EndOfFrame { entity };
                    Step::Pending
                }
                Err(reason) => {
                    warn!(?entity, reason = %reason, "restore_apply_failed");
                    Step::Done(RestoreOutcome::ApplyFailed { reason })
                }
            },
            RestoreState::EndOfFrame { entity } => {
                info!(?entity, "restore_complete");
                Step::Done(RestoreOutcome::Restored(entity))
            }
        }
    }
}

/// Position is required. Velocity is best-effort: once the entity has moved
/// the physics transforms are always synced.
fn apply<H: EntityHost + ?Sized>(
    host: &mut H,
    entity: EntityHandle,
    point: &WarpPoint,
) -> Result<(), String> {
    host.set_position(entity, point.position)
        .map_err(|error| error.to_string())?;
    if let Err(error) = host.set_body_velocity(entity, point.velocity, 0.0) {
        warn!(?entity, error = %error, "restore_velocity_failed");
    }
    host.sync_physics_transforms();
    Ok(())
}
