mod restore;
mod switcher;

pub use restore::{RestoreError, RestoreOutcome, RestoreSequencer, RESTORE_TIMEOUT};
pub use switcher::{
    SceneSwitcher, Strategy, TransitionError, TransitionOutcome, TransitionPhase,
    TransitionTimeouts, ADDITIVE_TIMEOUT, ASYNC_SINGLE_TIMEOUT, LOADER_TIMEOUT,
};

/// Result of advancing a tick-driven sequence by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    Pending,
    Done(T),
}
