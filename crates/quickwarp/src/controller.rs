use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::WarpConfig;
use crate::host::Host;
use crate::loader::LoaderCache;
use crate::store::{StoreError, WarpStore};
use crate::transition::{
    RestoreOutcome, RestoreSequencer, SceneSwitcher, Step, Strategy, TransitionOutcome,
};
use crate::types::{Vec2, WarpPoint};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no active scene to capture")]
    NoActiveScene,
    #[error("no controllable entity found")]
    EntityNotFound,
    #[error("warp point captured but not saved: {0}")]
    Persist(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WarpRejection {
    #[error("a warp is already in flight")]
    InFlight,
    #[error("warp requested again within the debounce window")]
    Debounced,
    #[error("no warp point has been captured")]
    NoWarpPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WarpOutcome {
    /// `via` is `None` when the target scene was already active.
    Teleported {
        scene: String,
        via: Option<Strategy>,
    },
    SceneSwitchFailed {
        target: String,
    },
    EntityNotReady,
    RestoreFailed {
        reason: String,
    },
}

impl WarpOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, WarpOutcome::Teleported { .. })
    }
}

#[derive(Debug, Default)]
enum Flight {
    #[default]
    Idle,
    Switching {
        point: WarpPoint,
    },
    Restoring {
        point: WarpPoint,
        via: Option<Strategy>,
    },
    /// Finished inside a call that could not report it; handed out by the
    /// next `poll`.
    Settled(WarpOutcome),
}

/// Owns the saved warp point and runs one warp at a time: scene switch
/// first, then entity restore.
#[derive(Debug)]
pub struct WarpController<S> {
    current: WarpPoint,
    store: S,
    switcher: SceneSwitcher,
    restore: RestoreSequencer,
    debounce: Duration,
    clock: Duration,
    last_request: Option<Duration>,
    flight: Flight,
}

impl<S: WarpStore> WarpController<S> {
    pub fn new(config: &WarpConfig, mut store: S) -> Self {
        let current = store.load().unwrap_or_default();
        Self {
            current,
            store,
            switcher: SceneSwitcher::new(
                config.timeouts,
                LoaderCache::new(config.loader_override.clone()),
            ),
            restore: RestoreSequencer::new(config.restore_timeout),
            debounce: config.debounce,
            clock: Duration::ZERO,
            last_request: None,
            flight: Flight::Idle,
        }
    }

    pub fn current(&self) -> &WarpPoint {
        &self.current
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn switcher(&self) -> &SceneSwitcher {
        &self.switcher
    }

    pub fn is_in_flight(&self) -> bool {
        !matches!(self.flight, Flight::Idle)
    }

    /// Records where the controllable entity is right now and persists it.
    /// The in-memory point is kept even when persisting fails.
    pub fn capture<H: Host + ?Sized>(&mut self, host: &H) -> Result<(), CaptureError> {
        let scene = host
            .active_scene()
            .filter(|scene| !scene.is_empty())
            .ok_or(CaptureError::NoActiveScene)?;
        let entity = host
            .find_controllable_entity()
            .ok_or(CaptureError::EntityNotFound)?;
        let position = host
            .position(entity)
            .ok_or(CaptureError::EntityNotFound)?;
        let velocity = host.linear_velocity(entity).unwrap_or(Vec2::ZERO);

        self.current.overwrite(scene, position, velocity);
        info!(
            scene,
            x = position.x,
            y = position.y,
            vx = velocity.x,
            vy = velocity.y,
            "warp_point_captured"
        );

        self.store.save(&self.current).map_err(|error| {
            warn!(error = %error, "warp_point_save_failed");
            CaptureError::Persist(error)
        })
    }

    /// Starts a warp to the saved point. The outcome arrives through
    /// [`WarpController::poll`].
    pub fn request_warp<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), WarpRejection> {
        if self.is_in_flight() {
            return Err(WarpRejection::InFlight);
        }
        if let Some(last) = self.last_request {
            if self.clock.saturating_sub(last) < self.debounce {
                return Err(WarpRejection::Debounced);
            }
        }
        self.last_request = Some(self.clock);
        if !self.current.is_set() {
            info!("warp_point_unset");
            return Err(WarpRejection::NoWarpPoint);
        }

        let point = self.current.clone();
        info!(target_scene = %point.scene_id, "warp_requested");
        match self.switcher.switch_to(host, &point.scene_id) {
            Ok(Step::Pending) => self.flight = Flight::Switching { point },
            Ok(Step::Done(outcome)) => self.after_switch(host, point, outcome),
            Err(error) => {
                warn!(error = %error, "warp_switch_rejected");
                self.flight = Flight::Settled(WarpOutcome::SceneSwitchFailed {
                    target: point.scene_id,
                });
            }
        }
        Ok(())
    }

    /// Advances the running warp by one tick. Returns the outcome exactly once
    /// when it settles.
    pub fn poll<H: Host + ?Sized>(&mut self, host: &mut H, dt: Duration) -> Option<WarpOutcome> {
        self.clock = self.clock.saturating_add(dt);
        match std::mem::take(&mut self.flight) {
            Flight::Idle => None,
            Flight::Settled(outcome) => Some(report(outcome)),
            Flight::Switching { point } => match self.switcher.poll(host, dt) {
                Step::Pending => {
                    self.flight = Flight::Switching { point };
                    None
                }
                Step::Done(outcome) => {
                    self.after_switch(host, point, outcome);
                    self.take_settled()
                }
            },
            Flight::Restoring { point, via } => match self.restore.poll(host, dt) {
                Step::Pending => {
                    self.flight = Flight::Restoring { point, via };
                    None
                }
                Step::Done(outcome) => Some(report(restore_to_warp(point, via, outcome))),
            },
        }
    }

    fn after_switch<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        point: WarpPoint,
        outcome: TransitionOutcome,
    ) {
        if !outcome.succeeded() {
            self.flight = Flight::Settled(WarpOutcome::SceneSwitchFailed {
                target: point.scene_id,
            });
            return;
        }

        let via = outcome.strategy();
        if let Err(error) = self.restore.begin(point.clone()) {
            self.flight = Flight::Settled(WarpOutcome::RestoreFailed {
                reason: error.to_string(),
            });
            return;
        }
        self.flight = match self.restore.poll(host, Duration::ZERO) {
            Step::Pending => Flight::Restoring { point, via },
            Step::Done(outcome) => Flight::Settled(restore_to_warp(point, via, outcome)),
        };
    }

    fn take_settled(&mut self) -> Option<WarpOutcome> {
        match std::mem::take(&mut self.flight) {
            Flight::Settled(outcome) => Some(report(outcome)),
            other => {
                self.flight = other;
                None
            }
        }
    }
}

fn restore_to_warp(
    point: WarpPoint,
    via: Option<Strategy>,
    outcome: RestoreOutcome,
) -> WarpOutcome {
    match outcome {
        RestoreOutcome::Restored(_) => WarpOutcome::Teleported {
            scene: point.scene_id,
            via,
        },
        RestoreOutcome::TimedOut => WarpOutcome::EntityNotReady,
        RestoreOutcome::ApplyFailed { reason } => WarpOutcome::RestoreFailed { reason },
    }
}

fn report(outcome: WarpOutcome) -> WarpOutcome {
    match &outcome {
        WarpOutcome::Teleported { scene, via } => info!(
            scene = %scene,
            via = via.map_or("already_active", Strategy::label),
            "warp_complete"
        ),
        WarpOutcome::SceneSwitchFailed { target } => {
            warn!(target_scene = %target, "warp_failed_scene_switch")
        }
        WarpOutcome::EntityNotReady => warn!("warp_failed_entity_not_ready"),
        WarpOutcome::RestoreFailed { reason } => warn!(reason = %reason, "warp_failed_restore"),
    }
    outcome
}
