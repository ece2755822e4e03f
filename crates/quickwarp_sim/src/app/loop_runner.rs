use std::time::Duration;

use quickwarp::{TriggerKey, WarpController, WarpOutcome, WarpRejection, WarpStore};
use tracing::{info, warn};

use super::script::{Script, ScriptAction};
use super::sim_host::SimHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    /// Hard stop for sessions whose script never settles.
    pub(crate) max_ticks: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: 60 * 60,
        }
    }
}

impl LoopConfig {
    pub(crate) fn fixed_dt(&self) -> Duration {
        Duration::from_secs(1) / self.target_tps.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionKeys {
    pub(crate) capture: TriggerKey,
    pub(crate) warp: TriggerKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct InputSnapshot {
    capture_pressed: bool,
    warp_pressed: bool,
}

impl InputSnapshot {
    pub(crate) fn capture_pressed(&self) -> bool {
        self.capture_pressed
    }

    pub(crate) fn warp_pressed(&self) -> bool {
        self.warp_pressed
    }
}

#[derive(Debug)]
struct InputCollector {
    keys: SessionKeys,
    capture_key_is_down: bool,
    capture_pressed_edge: bool,
    warp_key_is_down: bool,
    warp_pressed_edge: bool,
}

impl InputCollector {
    fn new(keys: SessionKeys) -> Self {
        Self {
            keys,
            capture_key_is_down: false,
            capture_pressed_edge: false,
            warp_key_is_down: false,
            warp_pressed_edge: false,
        }
    }

    fn handle_key_state(&mut self, key: TriggerKey, state: KeyState) {
        if key == self.keys.capture {
            track_edge(
                &mut self.capture_key_is_down,
                &mut self.capture_pressed_edge,
                state,
            );
        }
        if key == self.keys.warp {
            track_edge(&mut self.warp_key_is_down, &mut self.warp_pressed_edge, state);
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            capture_pressed: self.capture_pressed_edge,
            warp_pressed: self.warp_pressed_edge,
        };
        self.capture_pressed_edge = false;
        self.warp_pressed_edge = false;
        snapshot
    }
}

fn track_edge(is_down: &mut bool, pressed_edge: &mut bool, state: KeyState) {
    match state {
        KeyState::Pressed => {
            if !*is_down {
                *pressed_edge = true;
            }
            *is_down = true;
        }
        KeyState::Released => *is_down = false,
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionReport {
    pub(crate) ticks_run: u64,
    pub(crate) captures: u32,
    pub(crate) failed_captures: u32,
    pub(crate) outcomes: Vec<WarpOutcome>,
    pub(crate) rejections: Vec<WarpRejection>,
}

impl SessionReport {
    pub(crate) fn all_warps_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(WarpOutcome::succeeded)
    }
}

/// Runs the scripted session tick by tick: host frame, warp progress, then
/// input for the tick.
pub(crate) fn run_session<S: WarpStore>(
    config: &LoopConfig,
    keys: SessionKeys,
    controller: &mut WarpController<S>,
    host: &mut SimHost,
    script: &Script,
) -> SessionReport {
    let fixed_dt = config.fixed_dt();
    let mut input = InputCollector::new(keys);
    let mut report = SessionReport::default();
    info!(
        target_tps = config.target_tps,
        capture_key = %keys.capture,
        warp_key = %keys.warp,
        scripted_warps = script.count_presses(keys.warp),
        "session_started"
    );

    for tick in 0..config.max_ticks {
        host.step(fixed_dt);
        if let Some(outcome) = controller.poll(host, fixed_dt) {
            info!(tick, ?outcome, "session_warp_settled");
            report.outcomes.push(outcome);
        }

        for action in script.actions_at(tick) {
            match action {
                ScriptAction::Press(key) => input.handle_key_state(*key, KeyState::Pressed),
                ScriptAction::Release(key) => input.handle_key_state(*key, KeyState::Released),
                ScriptAction::Travel(scene) => {
                    if let Err(error) = host.travel(scene) {
                        warn!(tick, scene, error = %error, "session_travel_failed");
                    }
                }
                ScriptAction::Run(velocity) => host.push_player(*velocity),
            }
        }

        let snapshot = input.snapshot_for_tick();
        if snapshot.capture_pressed() {
            match controller.capture(&*host) {
                Ok(()) => report.captures += 1,
                Err(error) => {
                    warn!(tick, error = %error, "session_capture_failed");
                    report.failed_captures += 1;
                }
            }
        }
        if snapshot.warp_pressed() {
            if let Err(rejection) = controller.request_warp(host) {
                info!(tick, reason = %rejection, "session_warp_rejected");
                report.rejections.push(rejection);
            }
        }

        report.ticks_run = tick + 1;
        if tick >= script.last_tick() && !controller.is_in_flight() {
            break;
        }
    }

    info!(
        ticks = report.ticks_run,
        captures = report.captures,
        failed_captures = report.failed_captures,
        warps = report.outcomes.len(),
        rejected = report.rejections.len(),
        "session_finished"
    );
    report
}
