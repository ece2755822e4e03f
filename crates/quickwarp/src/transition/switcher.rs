use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::host::{is_active_scene, LoadMode, SceneHost};
use crate::loader::{InvokeError, LoaderCache};

use super::Step;

pub const LOADER_TIMEOUT: Duration = Duration::from_secs(8);
pub const ASYNC_SINGLE_TIMEOUT: Duration = Duration::from_secs(6);
pub const ADDITIVE_TIMEOUT: Duration = Duration::from_secs(8);
const SYNC_SETTLE_TICKS: u32 = 1;
const ADDITIVE_SETTLE_TICKS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTimeouts {
    pub loader: Duration,
    pub async_single: Duration,
    pub additive: Duration,
}

impl Default for TransitionTimeouts {
    fn default() -> Self {
        Self {
            loader: LOADER_TIMEOUT,
            async_single: ASYNC_SINGLE_TIMEOUT,
            additive: ADDITIVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    InternalLoader,
    AsyncSingle,
    SyncSingle,
    Additive,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::InternalLoader,
        Strategy::AsyncSingle,
        Strategy::SyncSingle,
        Strategy::Additive,
    ];

    pub fn index(self) -> usize {
        match self {
            Strategy::InternalLoader => 0,
            Strategy::AsyncSingle => 1,
            Strategy::SyncSingle => 2,
            Strategy::Additive => 3,
        }
    }

    pub fn next(self) -> Option<Strategy> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn phase(self) -> TransitionPhase {
        match self {
            Strategy::InternalLoader => TransitionPhase::AttemptingLoader,
            Strategy::AsyncSingle => TransitionPhase::AttemptingAsyncSingle,
            Strategy::SyncSingle => TransitionPhase::AttemptingSyncSingle,
            Strategy::Additive => TransitionPhase::AttemptingAdditive,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::InternalLoader => "internal_loader",
            Strategy::AsyncSingle => "async_single",
            Strategy::SyncSingle => "sync_single",
            Strategy::Additive => "additive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPhase {
    #[default]
    Idle,
    AttemptingLoader,
    AttemptingAsyncSingle,
    AttemptingSyncSingle,
    AttemptingAdditive,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The target was already active; no strategy ran.
    AlreadyActive,
    Switched(Strategy),
    /// Every strategy was tried without landing in the target scene.
    Exhausted,
}

impl TransitionOutcome {
    pub fn succeeded(self) -> bool {
        !matches!(self, TransitionOutcome::Exhausted)
    }

    pub fn strategy(self) -> Option<Strategy> {
        match self {
            TransitionOutcome::Switched(strategy) => Some(strategy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a transition to '{target}' is already in flight")]
    Busy { target: String },
    #[error("target scene id is empty")]
    EmptyTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Wait {
    ActiveScene { timeout: Duration },
    SyncSettle { ticks_left: u32 },
    AdditiveLoad { previous: Option<String>, timeout: Duration },
    AdditiveSettle { ticks_left: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Waiting,
    Landed,
    GaveUp,
}

/// State of the strategy currently being waited on. Lives only for the
/// duration of one `switch_to` call chain.
#[derive(Debug)]
struct TransitionAttempt {
    target_scene: String,
    strategy: Strategy,
    elapsed: Duration,
    wait: Wait,
}

impl TransitionAttempt {
    fn landed<H: SceneHost + ?Sized>(&self, host: &H) -> bool {
        is_active_scene(host, &self.target_scene)
    }

    /// Check made right after the host call, before any tick passes.
    fn check_issued<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Progress {
        match self.wait {
            Wait::AdditiveLoad { .. } if host.is_scene_loaded(&self.target_scene) => {
                self.activate_additive(host)
            }
            Wait::AdditiveLoad { .. } => Progress::Waiting,
            _ if self.landed(host) => Progress::Landed,
            _ => Progress::Waiting,
        }
    }

    /// Check made once per tick, after `elapsed` has been advanced.
    fn check_tick<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Progress {
        match &mut self.wait {
            Wait::ActiveScene { timeout } => {
                let timeout = *timeout;
                if self.landed(host) {
                    Progress::Landed
                } else if self.elapsed >= timeout {
                    Progress::GaveUp
                } else {
                    Progress::Waiting
                }
            }
            Wait::SyncSettle { ticks_left } => {
                *ticks_left = ticks_left.saturating_sub(1);
                let exhausted = *ticks_left == 0;
                if self.landed(host) {
                    Progress::Landed
                } else if exhausted {
                    Progress::GaveUp
                } else {
                    Progress::Waiting
                }
            }
            Wait::AdditiveLoad { timeout, .. } => {
                let timeout = *timeout;
                if host.is_scene_loaded(&self.target_scene) {
                    self.activate_additive(host)
                } else if self.elapsed >= timeout {
                    warn!(
                        target_scene = %self.target_scene,
                        elapsed = ?self.elapsed,
                        "additive_load_timeout"
                    );
                    Progress::GaveUp
                } else {
                    Progress::Waiting
                }
            }
            Wait::AdditiveSettle { ticks_left } => {
                *ticks_left = ticks_left.saturating_sub(1);
                if *ticks_left > 0 {
                    Progress::Waiting
                } else if self.landed(host) {
                    Progress::Landed
                } else {
                    Progress::GaveUp
                }
            }
        }
    }

    /// The additively loaded target becomes active and the previous scene is
    /// asked to unload. The unload is never awaited and its failure is only
    /// logged: a host left with both scenes loaded stays that way.
    fn activate_additive<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Progress {
        let previous = match &self.wait {
            Wait::AdditiveLoad { previous, .. } => previous.clone(),
            _ => None,
        };

        match host.set_active_scene(&self.target_scene) {
            Ok(true) => {
                info!(target_scene = %self.target_scene, "additive_scene_activated");
            }
            Ok(false) => {
                warn!(target_scene = %self.target_scene, "additive_activation_refused");
                return Progress::GaveUp;
            }
            Err(error) => {
                warn!(
                    target_scene = %self.target_scene,
                    error = %error,
                    "additive_activation_failed"
                );
                return Progress::GaveUp;
            }
        }

        if let Some(previous) = previous.filter(|previous| *previous != self.target_scene) {
            info!(scene = %previous, "previous_scene_unloading");
            if let Err(error) = host.unload_scene_async(&previous) {
                warn!(scene = %previous, error = %error, "previous_scene_unload_failed");
            }
        }

        self.wait = Wait::AdditiveSettle {
            ticks_left: ADDITIVE_SETTLE_TICKS,
        };
        Progress::Waiting
    }
}

/// Drives the host into a target scene by trying each [`Strategy`] in order.
///
/// Call [`SceneSwitcher::switch_to`] once, then [`SceneSwitcher::poll`] once
/// per tick with the unscaled frame time until it returns [`Step::Done`].
/// Only one transition runs at a time.
#[derive(Debug, Default)]
pub struct SceneSwitcher {
    timeouts: TransitionTimeouts,
    loader: LoaderCache,
    phase: TransitionPhase,
    attempt: Option<TransitionAttempt>,
    attempted: Vec<Strategy>,
}

impl SceneSwitcher {
    pub fn new(timeouts: TransitionTimeouts, loader: LoaderCache) -> Self {
        Self {
            timeouts,
            loader,
            phase: TransitionPhase::Idle,
            attempt: None,
            attempted: Vec::new(),
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.attempt.is_some()
    }

    pub fn target(&self) -> Option<&str> {
        self.attempt
            .as_ref()
            .map(|attempt| attempt.target_scene.as_str())
    }

    /// Strategies entered during the latest transition, in order.
    pub fn attempted(&self) -> &[Strategy] {
        &self.attempted
    }

    pub fn loader_cache(&self) -> &LoaderCache {
        &self.loader
    }

    pub fn switch_to<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        target: &str,
    ) -> Result<Step<TransitionOutcome>, TransitionError> {
        if let Some(attempt) = &self.attempt {
            return Err(TransitionError::Busy {
                target: attempt.target_scene.clone(),
            });
        }
        if target.is_empty() {
            return Err(TransitionError::EmptyTarget);
        }

        self.attempted.clear();
        if is_active_scene(host, target) {
            info!(target_scene = target, "transition_already_active");
            return Ok(self.finish(target, TransitionOutcome::AlreadyActive));
        }

        info!(
            target_scene = target,
            active_scene = host.active_scene().unwrap_or("<none>"),
            "transition_started"
        );
        Ok(self.enter_from(host, target.to_string(), Some(Strategy::InternalLoader)))
    }

    /// Advances the running transition by one tick. Does nothing while idle.
    pub fn poll<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        dt: Duration,
    ) -> Step<TransitionOutcome> {
        let Some(mut attempt) = self.attempt.take() else {
            return Step::Pending;
        };

        attempt.elapsed = attempt.elapsed.saturating_add(dt);
        match attempt.check_tick(host) {
            Progress::Waiting => {
                self.attempt = Some(attempt);
                Step::Pending
            }
            Progress::Landed => self.finish(
                &attempt.target_scene,
                TransitionOutcome::Switched(attempt.strategy),
            ),
            Progress::GaveUp => {
                info!(
                    strategy = %attempt.strategy,
                    elapsed = ?attempt.elapsed,
                    "strategy_gave_up"
                );
                self.enter_from(host, attempt.target_scene, attempt.strategy.next())
            }
        }
    }

    fn enter_from<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        target: String,
        mut next: Option<Strategy>,
    ) -> Step<TransitionOutcome> {
        while let Some(strategy) = next {
            self.phase = strategy.phase();
            self.attempted.push(strategy);
            next = strategy.next();

            let Some(wait) = self.issue(host, &target, strategy) else {
                continue;
            };
            let mut attempt = TransitionAttempt {
                target_scene: target,
                strategy,
                elapsed: Duration::ZERO,
                wait,
            };
            match attempt.check_issued(host) {
                Progress::Waiting => {
                    self.attempt = Some(attempt);
                    return Step::Pending;
                }
                Progress::Landed => {
                    return self.finish(
                        &attempt.target_scene,
                        TransitionOutcome::Switched(strategy),
                    );
                }
                Progress::GaveUp => {
                    info!(strategy = %strategy, "strategy_gave_up");
                    let TransitionAttempt { target_scene, .. } = attempt;
                    return self.enter_from(host, target_scene, next);
                }
            }
        }

        self.finish(&target, TransitionOutcome::Exhausted)
    }

    /// Makes the host call for `strategy`. `None` means the strategy could not
    /// start and the chain moves on without waiting.
    fn issue<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        target: &str,
        strategy: Strategy,
    ) -> Option<Wait> {
        debug!(strategy = %strategy, target_scene = target, "strategy_issuing");
        let issued = match strategy {
            Strategy::InternalLoader => match self.loader.invoke(host, target) {
                Ok(()) => Ok(Wait::ActiveScene {
                    timeout: self.timeouts.loader,
                }),
                Err(InvokeError::NoLoader) => {
                    info!(strategy = %strategy, "strategy_unavailable");
                    return None;
                }
                Err(error) => Err(error.to_string()),
            },
            Strategy::AsyncSingle => host
                .load_scene_async(target, LoadMode::Single)
                .map(|()| Wait::ActiveScene {
                    timeout: self.timeouts.async_single,
                })
                .map_err(|error| error.to_string()),
            Strategy::SyncSingle => host
                .load_scene(target)
                .map(|()| Wait::SyncSettle {
                    ticks_left: SYNC_SETTLE_TICKS,
                })
                .map_err(|error| error.to_string()),
            Strategy::Additive => {
                let previous = host.active_scene().map(str::to_string);
                host.load_scene_async(target, LoadMode::Additive)
                    .map(|()| Wait::AdditiveLoad {
                        previous,
                        timeout: self.timeouts.additive,
                    })
                    .map_err(|error| error.to_string())
            }
        };

        match issued {
            Ok(wait) => Some(wait),
            Err(error) => {
                warn!(strategy = %strategy, error = %error, "strategy_call_failed");
                None
            }
        }
    }

    fn finish(&mut self, target: &str, outcome: TransitionOutcome) -> Step<TransitionOutcome> {
        self.attempt = None;
        if outcome.succeeded() {
            self.phase = TransitionPhase::Succeeded;
            info!(
                target_scene = target,
                strategy = outcome.strategy().map_or("none", Strategy::label),
                "transition_succeeded"
            );
        } else {
            self.phase = TransitionPhase::Failed;
            warn!(
                target_scene = target,
                attempted = self.attempted.len(),
                "transition_failed"
            );
        }
        Step::Done(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{HostType, MethodDesc, ParamShape};
    use crate::test_host::{drive_switch, FakeHost, HostCall, Reaction};

    const SECOND: Duration = Duration::from_secs(1);

    fn loader_surface() -> Vec<HostType> {
        vec![HostType::new("GameManager").with_method(MethodDesc::new(
            "BeginSceneTransition",
            vec![ParamShape::Str, ParamShape::Bool],
            true,
        ))]
    }

    fn switcher() -> SceneSwitcher {
        SceneSwitcher::new(TransitionTimeouts::default(), LoaderCache::default())
    }

    #[test]
    fn already_active_target_succeeds_without_attempts() {
        let mut host = FakeHost::new("zone_2").with_surface(loader_surface());
        let mut switcher = switcher();

        let step = switcher.switch_to(&mut host, "zone_2").expect("start");

        assert_eq!(step, Step::Done(TransitionOutcome::AlreadyActive));
        assert!(switcher.attempted().is_empty());
        assert!(host.calls().is_empty());
        assert!(!switcher.loader_cache().has_run());
        assert_eq!(switcher.phase(), TransitionPhase::Succeeded);
    }

    #[test]
    fn preferred_loader_success_uses_only_first_strategy() {
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_loader(Reaction::After(3))
            .with_async(Reaction::After(0));
        let mut switcher = switcher();

        assert_eq!(
            switcher.switch_to(&mut host, "zone_2").expect("start"),
            Step::Pending
        );
        assert_eq!(switcher.phase(), TransitionPhase::AttemptingLoader);

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 30).expect("settles");
        assert_eq!(outcome, TransitionOutcome::Switched(Strategy::InternalLoader));
        assert_eq!(ticks, 3);
        assert_eq!(switcher.attempted(), &[Strategy::InternalLoader]);
        assert_eq!(host.calls().len(), 1);
        assert!(matches!(host.calls()[0], HostCall::Invoke { .. }));
        assert_eq!(host.active_scene(), Some("zone_2"));
    }

    #[test]
    fn without_loader_async_single_load_succeeds() {
        let mut host = FakeHost::new("zone_1").with_async(Reaction::After(4));
        let mut switcher = switcher();

        switcher.switch_to(&mut host, "zone_2").expect("start");
        assert_eq!(switcher.phase(), TransitionPhase::AttemptingAsyncSingle);

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 30).expect("settles");
        assert_eq!(outcome, TransitionOutcome::Switched(Strategy::AsyncSingle));
        assert_eq!(ticks, 4);
        assert_eq!(
            switcher.attempted(),
            &[Strategy::InternalLoader, Strategy::AsyncSingle]
        );
        assert_eq!(
            host.calls(),
            &[HostCall::LoadAsync {
                scene: "zone_2".to_string(),
                mode: LoadMode::Single,
            }]
        );
    }

    #[test]
    fn loader_timeout_advances_to_async_after_eight_seconds() {
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_loader(Reaction::Never)
            .with_async(Reaction::After(2));
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        for _ in 0..7 {
            host.advance();
            assert_eq!(switcher.poll(&mut host, SECOND), Step::Pending);
            assert_eq!(switcher.phase(), TransitionPhase::AttemptingLoader);
        }
        host.advance();
        assert_eq!(switcher.poll(&mut host, SECOND), Step::Pending);
        assert_eq!(switcher.phase(), TransitionPhase::AttemptingAsyncSingle);

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 30).expect("settles");
        assert_eq!(outcome, TransitionOutcome::Switched(Strategy::AsyncSingle));
        assert_eq!(ticks, 2);
    }

    #[test]
    fn all_strategies_time_out_in_fixed_order() {
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_loader(Reaction::Never)
            .with_async(Reaction::Never)
            .with_sync(Reaction::Never)
            .with_additive(Reaction::Never);
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        let mut phases = vec![switcher.phase()];
        let mut outcome = None;
        for _ in 0..40 {
            host.advance();
            if let Step::Done(done) = switcher.poll(&mut host, SECOND) {
                outcome = Some(done);
                break;
            }
            if phases.last() != Some(&switcher.phase()) {
                phases.push(switcher.phase());
            }
        }

        assert_eq!(outcome, Some(TransitionOutcome::Exhausted));
        assert_eq!(switcher.attempted(), &Strategy::ORDER);
        assert_eq!(
            phases,
            vec![
                TransitionPhase::AttemptingLoader,
                TransitionPhase::AttemptingAsyncSingle,
                TransitionPhase::AttemptingSyncSingle,
                TransitionPhase::AttemptingAdditive,
            ]
        );
        assert_eq!(switcher.phase(), TransitionPhase::Failed);
        assert!(!switcher.is_in_flight());
    }

    #[test]
    fn worst_case_duration_is_sum_of_tier_timeouts() {
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_loader(Reaction::Never)
            .with_async(Reaction::Never)
            .with_sync(Reaction::Never)
            .with_additive(Reaction::Never);
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 40).expect("settles");

        // 8 loader + 6 async + 1 sync settle + 8 additive.
        assert_eq!(outcome, TransitionOutcome::Exhausted);
        assert_eq!(ticks, 23);
    }

    #[test]
    fn timeouts_accumulate_frame_time_not_tick_count() {
        let mut host = FakeHost::new("zone_1")
            .with_async(Reaction::Never)
            .with_sync(Reaction::Fail)
            .with_additive(Reaction::Fail);
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        let frame = Duration::from_millis(20);
        let (outcome, ticks) =
            drive_switch(&mut switcher, &mut host, frame, 1_000).expect("settles");

        assert_eq!(outcome, TransitionOutcome::Exhausted);
        assert_eq!(ticks, 300);
    }

    #[test]
    fn failing_calls_fall_through_without_waiting() {
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_failing_invoke()
            .with_async(Reaction::Fail)
            .with_sync(Reaction::Fail)
            .with_additive(Reaction::Fail);
        let mut switcher = switcher();

        let step = switcher.switch_to(&mut host, "zone_2").expect("start");

        assert_eq!(step, Step::Done(TransitionOutcome::Exhausted));
        assert_eq!(switcher.attempted(), &Strategy::ORDER);
    }

    #[test]
    fn unresolvable_instance_loader_is_skipped() {
        let surface = vec![HostType::new("GameManager").with_method(MethodDesc::new(
            "ChangeScene",
            vec![ParamShape::Str],
            false,
        ))];
        let mut host = FakeHost::new("zone_1")
            .with_surface(surface)
            .with_loader(Reaction::After(0))
            .with_async(Reaction::After(1));
        let mut switcher = switcher();

        switcher.switch_to(&mut host, "zone_2").expect("start");

        assert_eq!(switcher.phase(), TransitionPhase::AttemptingAsyncSingle);
        assert!(host
            .calls()
            .iter()
            .all(|call| !matches!(call, HostCall::Invoke { .. })));
    }

    #[test]
    fn immediate_sync_load_succeeds_without_ticking() {
        let mut host = FakeHost::new("zone_1")
            .with_async(Reaction::Fail)
            .with_sync(Reaction::After(0));
        let mut switcher = switcher();

        let step = switcher.switch_to(&mut host, "zone_2").expect("start");

        assert_eq!(
            step,
            Step::Done(TransitionOutcome::Switched(Strategy::SyncSingle))
        );
    }

    #[test]
    fn sync_load_gets_one_settle_tick() {
        let mut host = FakeHost::new("zone_1")
            .with_async(Reaction::Fail)
            .with_sync(Reaction::After(1))
            .with_additive(Reaction::After(0));
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");
        assert_eq!(switcher.phase(), TransitionPhase::AttemptingSyncSingle);

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 5).expect("settles");
        assert_eq!(outcome, TransitionOutcome::Switched(Strategy::SyncSingle));
        assert_eq!(ticks, 1);
    }

    #[test]
    fn additive_loads_activates_and_unloads_previous() {
        let mut host = FakeHost::new("zone_1")
            .with_async(Reaction::Fail)
            .with_sync(Reaction::Fail)
            .with_additive(Reaction::After(3));
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");
        assert_eq!(switcher.phase(), TransitionPhase::AttemptingAdditive);

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 20).expect("settles");

        assert_eq!(outcome, TransitionOutcome::Switched(Strategy::Additive));
        // Loaded on tick 3, then two settle ticks.
        assert_eq!(ticks, 5);
        assert!(host.calls().contains(&HostCall::SetActive {
            scene: "zone_2".to_string()
        }));
        assert!(host.calls().contains(&HostCall::Unload {
            scene: "zone_1".to_string()
        }));
        assert_eq!(host.loaded_scenes(), &["zone_2".to_string()]);
    }

    #[test]
    fn additive_unload_failure_does_not_block_success() {
        let mut host = FakeHost::new("zone_1")
            .with_async(Reaction::Fail)
            .with_sync(Reaction::Fail)
            .with_additive(Reaction::After(0))
            .with_failing_unload();
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        let (outcome, _) = drive_switch(&mut switcher, &mut host, SECOND, 5).expect("settles");

        assert_eq!(outcome, TransitionOutcome::Switched(Strategy::Additive));
        assert_eq!(
            host.loaded_scenes(),
            &["zone_1".to_string(), "zone_2".to_string()]
        );
    }

    #[test]
    fn refused_additive_activation_fails_and_leaves_mixed_state() {
        let mut host = FakeHost::new("zone_1")
            .with_async(Reaction::Fail)
            .with_sync(Reaction::Fail)
            .with_additive(Reaction::After(2))
            .refusing_set_active();
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        let (outcome, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 20).expect("settles");

        assert_eq!(outcome, TransitionOutcome::Exhausted);
        assert_eq!(ticks, 2);
        assert_eq!(host.active_scene(), Some("zone_1"));
        assert_eq!(
            host.loaded_scenes(),
            &["zone_1".to_string(), "zone_2".to_string()]
        );
    }

    #[test]
    fn second_request_while_in_flight_is_rejected() {
        let mut host = FakeHost::new("zone_1").with_async(Reaction::Never);
        let mut switcher = switcher();
        switcher.switch_to(&mut host, "zone_2").expect("start");

        assert_eq!(
            switcher.switch_to(&mut host, "zone_3"),
            Err(TransitionError::Busy {
                target: "zone_2".to_string()
            })
        );
        assert_eq!(switcher.target(), Some("zone_2"));
    }

    #[test]
    fn empty_target_is_rejected() {
        let mut host = FakeHost::new("zone_1");
        assert_eq!(
            switcher().switch_to(&mut host, ""),
            Err(TransitionError::EmptyTarget)
        );
    }

    #[test]
    fn discovery_runs_once_across_transitions() {
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_loader(Reaction::After(1));
        let mut switcher = switcher();

        for target in ["zone_2", "zone_3", "zone_1"] {
            switcher.switch_to(&mut host, target).expect("start");
            let (outcome, _) = drive_switch(&mut switcher, &mut host, SECOND, 5).expect("settles");
            assert_eq!(outcome, TransitionOutcome::Switched(Strategy::InternalLoader));
        }
        assert_eq!(host.surface_scans(), 1);
    }

    #[test]
    fn custom_timeouts_are_honoured() {
        let timeouts = TransitionTimeouts {
            loader: Duration::from_secs(2),
            async_single: Duration::from_secs(1),
            additive: Duration::from_secs(3),
        };
        let mut host = FakeHost::new("zone_1")
            .with_surface(loader_surface())
            .with_loader(Reaction::Never)
            .with_async(Reaction::Never)
            .with_sync(Reaction::Never)
            .with_additive(Reaction::Never);
        let mut switcher = SceneSwitcher::new(timeouts, LoaderCache::default());
        switcher.switch_to(&mut host, "zone_2").expect("start");

        let (_, ticks) = drive_switch(&mut switcher, &mut host, SECOND, 40).expect("settles");
        assert_eq!(ticks, 2 + 1 + 1 + 3);
    }

    #[test]
    fn strategy_order_has_no_gaps() {
        let mut walked = vec![Strategy::InternalLoader];
        while let Some(next) = walked.last().and_then(|strategy| strategy.next()) {
            walked.push(next);
        }
        assert_eq!(walked, Strategy::ORDER);
    }
}
