use quickwarp::{TriggerKey, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptAction {
    Press(TriggerKey),
    Release(TriggerKey),
    /// Player walks through a gate into another scene.
    Travel(&'static str),
    /// Sets the player's velocity, standing in for movement input.
    Run(Vec2),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    pub(crate) action: ScriptAction,
}

/// Timed input for a headless session, ordered by tick.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub(crate) fn at(mut self, tick: u64, action: ScriptAction) -> Self {
        self.steps.push(ScriptStep { tick, action });
        self.steps.sort_by_key(|step| step.tick);
        self
    }

    /// Press on `tick`, release two ticks later.
    pub(crate) fn tap(self, tick: u64, key: TriggerKey) -> Self {
        self.at(tick, ScriptAction::Press(key))
            .at(tick + 2, ScriptAction::Release(key))
    }

    pub(crate) fn actions_at(&self, tick: u64) -> impl Iterator<Item = &ScriptAction> {
        self.steps
            .iter()
            .skip_while(move |step| step.tick < tick)
            .take_while(move |step| step.tick == tick)
            .map(|step| &step.action)
    }

    pub(crate) fn last_tick(&self) -> u64 {
        self.steps.last().map_or(0, |step| step.tick)
    }

    pub(crate) fn count_presses(&self, key: TriggerKey) -> usize {
        self.steps
            .iter()
            .filter(|step| step.action == ScriptAction::Press(key))
            .count()
    }
}

/// Capture in a scene only the game's own transition can reach, wander off,
/// warp back. Then the same from a scene the engine can load directly, with
/// an impatient double tap that the controller must swallow.
pub(crate) fn demo_script(capture: TriggerKey, warp: TriggerKey) -> Script {
    Script::default()
        .at(60, ScriptAction::Run(Vec2::new(3.0, 0.0)))
        .tap(90, capture)
        .at(150, ScriptAction::Travel("Town"))
        .at(200, ScriptAction::Run(Vec2::new(-2.0, 1.0)))
        .tap(260, warp)
        .tap(263, warp)
        .at(700, ScriptAction::Travel("Bellhart"))
        .tap(760, capture)
        .at(800, ScriptAction::Travel("Abyss_02"))
        .tap(860, warp)
}
