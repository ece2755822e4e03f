use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use crate::host::{
    EntityHandle, EntityHost, EntityLocator, HostError, HostResult, LoadMode, SceneHost,
};
use crate::loader::{ArgValue, CallTarget, HostType, InstanceId};
use crate::transition::{SceneSwitcher, Step, TransitionOutcome};
use crate::types::{Vec2, Vec3};

/// How the fake host responds to a scene request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reaction {
    /// Takes effect after this many host ticks; zero means during the call.
    After(u32),
    /// Accepted, but nothing ever happens.
    Never,
    /// The call itself errors.
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    Invoke {
        target: CallTarget,
        args: Vec<ArgValue>,
    },
    LoadAsync {
        scene: String,
        mode: LoadMode,
    },
    LoadSync {
        scene: String,
    },
    SetActive {
        scene: String,
    },
    Unload {
        scene: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Activate,
    MarkLoaded,
}

#[derive(Debug)]
struct PendingEffect {
    scene: String,
    ticks_left: u32,
    effect: Effect,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeEntity {
    pub handle: EntityHandle,
    /// Ticks until active; `None` never activates.
    pub active_after: Option<u32>,
    pub position: Vec3,
    /// `None` when the entity has no physics body.
    pub velocity: Option<Vec2>,
    pub angular_velocity: f32,
}

impl FakeEntity {
    pub(crate) fn active(position: Vec3) -> Self {
        Self {
            handle: EntityHandle(1),
            active_after: Some(0),
            position,
            velocity: Some(Vec2::ZERO),
            angular_velocity: 0.0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct FakeHost {
    active: Option<String>,
    loaded: Vec<String>,
    surface: Option<Vec<HostType>>,
    surface_scans: Cell<u32>,
    statics: HashMap<(String, String), InstanceId>,
    instances: HashMap<String, Vec<InstanceId>>,
    invoke_fails: bool,
    loader_reaction: Reaction,
    async_reaction: Reaction,
    sync_reaction: Reaction,
    additive_reaction: Reaction,
    refuse_set_active: bool,
    unload_fails: bool,
    position_write_fails: bool,
    velocity_write_fails: bool,
    calls: Vec<HostCall>,
    pending: Vec<PendingEffect>,
    entity: Option<FakeEntity>,
    physics_syncs: u32,
}

impl FakeHost {
    pub(crate) fn new(active: &str) -> Self {
        Self {
            active: Some(active.to_string()),
            loaded: vec![active.to_string()],
            surface: Some(Vec::new()),
            surface_scans: Cell::new(0),
            statics: HashMap::new(),
            instances: HashMap::new(),
            invoke_fails: false,
            loader_reaction: Reaction::Never,
            async_reaction: Reaction::Never,
            sync_reaction: Reaction::Never,
            additive_reaction: Reaction::Never,
            refuse_set_active: false,
            unload_fails: false,
            position_write_fails: false,
            velocity_write_fails: false,
            calls: Vec::new(),
            pending: Vec::new(),
            entity: None,
            physics_syncs: 0,
        }
    }

    pub(crate) fn with_surface(mut self, surface: Vec<HostType>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub(crate) fn with_failing_surface(mut self) -> Self {
        self.surface = None;
        self
    }

    pub(crate) fn with_static_instance(
        mut self,
        type_name: &str,
        member: &str,
        instance: InstanceId,
    ) -> Self {
        self.statics
            .insert((type_name.to_string(), member.to_string()), instance);
        self
    }

    pub(crate) fn with_live_instances(
        mut self,
        type_name: &str,
        instances: Vec<InstanceId>,
    ) -> Self {
        self.set_live_instances(type_name, instances);
        self
    }

    pub(crate) fn set_live_instances(&mut self, type_name: &str, instances: Vec<InstanceId>) {
        self.instances.insert(type_name.to_string(), instances);
    }

    pub(crate) fn with_failing_invoke(mut self) -> Self {
        self.invoke_fails = true;
        self
    }

    pub(crate) fn with_loader(mut self, reaction: Reaction) -> Self {
        self.loader_reaction = reaction;
        self
    }

    pub(crate) fn with_async(mut self, reaction: Reaction) -> Self {
        self.async_reaction = reaction;
        self
    }

    pub(crate) fn with_sync(mut self, reaction: Reaction) -> Self {
        self.sync_reaction = reaction;
        self
    }

    pub(crate) fn with_additive(mut self, reaction: Reaction) -> Self {
        self.additive_reaction = reaction;
        self
    }

    pub(crate) fn refusing_set_active(mut self) -> Self {
        self.refuse_set_active = true;
        self
    }

    pub(crate) fn with_failing_unload(mut self) -> Self {
        self.unload_fails = true;
        self
    }

    pub(crate) fn with_failing_position_write(mut self) -> Self {
        self.position_write_fails = true;
        self
    }

    pub(crate) fn with_failing_velocity_write(mut self) -> Self {
        self.velocity_write_fails = true;
        self
    }

    pub(crate) fn with_entity(mut self, entity: FakeEntity) -> Self {
        self.entity = Some(entity);
        self
    }

    pub(crate) fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub(crate) fn surface_scans(&self) -> u32 {
        self.surface_scans.get()
    }

    pub(crate) fn entity(&self) -> Option<&FakeEntity> {
        self.entity.as_ref()
    }

    pub(crate) fn physics_syncs(&self) -> u32 {
        self.physics_syncs
    }

    pub(crate) fn loaded_scenes(&self) -> &[String] {
        &self.loaded
    }

    /// Moves the host between scenes the way normal gameplay would.
    pub(crate) fn travel(&mut self, scene: &str) {
        self.activate(scene);
    }

    /// One host tick: pending loads progress and the entity may wake up.
    pub(crate) fn advance(&mut self) {
        let mut due = Vec::new();
        self.pending.retain_mut(|pending| {
            pending.ticks_left = pending.ticks_left.saturating_sub(1);
            if pending.ticks_left == 0 {
                due.push((pending.scene.clone(), pending.effect));
                false
            } else {
                true
            }
        });
        for (scene, effect) in due {
            self.apply(&scene, effect);
        }

        if let Some(entity) = self.entity.as_mut() {
            if let Some(ticks) = entity.active_after.as_mut() {
                *ticks = ticks.saturating_sub(1);
            }
        }
    }

    fn activate(&mut self, scene: &str) {
        self.active = Some(scene.to_string());
        self.loaded = vec![scene.to_string()];
    }

    fn apply(&mut self, scene: &str, effect: Effect) {
        match effect {
            Effect::Activate => self.activate(scene),
            Effect::MarkLoaded => {
                if !self.loaded.iter().any(|loaded| loaded == scene) {
                    self.loaded.push(scene.to_string());
                }
            }
        }
    }

    fn react(
        &mut self,
        call: &'static str,
        scene: &str,
        reaction: Reaction,
        effect: Effect,
    ) -> HostResult<()> {
        match reaction {
            Reaction::Fail => Err(HostError::CallFailed {
                call,
                reason: "scripted failure".to_string(),
            }),
            Reaction::Never => Ok(()),
            Reaction::After(0) => {
                self.apply(scene, effect);
                Ok(())
            }
            Reaction::After(ticks) => {
                self.pending.push(PendingEffect {
                    scene: scene.to_string(),
                    ticks_left: ticks,
                    effect,
                });
                Ok(())
            }
        }
    }
}

impl SceneHost for FakeHost {
    fn active_scene(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn is_scene_loaded(&self, scene: &str) -> bool {
        self.loaded.iter().any(|loaded| loaded == scene)
    }

    fn load_scene_async(&mut self, scene: &str, mode: LoadMode) -> HostResult<()> {
        self.calls.push(HostCall::LoadAsync {
            scene: scene.to_string(),
            mode,
        });
        match mode {
            LoadMode::Single => {
                self.react("load_scene_async", scene, self.async_reaction, Effect::Activate)
            }
            LoadMode::Additive => {
                self.react("load_scene_async", scene, self.additive_reaction, Effect::MarkLoaded)
            }
        }
    }

    fn load_scene(&mut self, scene: &str) -> HostResult<()> {
        self.calls.push(HostCall::LoadSync {
            scene: scene.to_string(),
        });
        self.react("load_scene", scene, self.sync_reaction, Effect::Activate)
    }

    fn set_active_scene(&mut self, scene: &str) -> HostResult<bool> {
        self.calls.push(HostCall::SetActive {
            scene: scene.to_string(),
        });
        if self.refuse_set_active || !self.is_scene_loaded(scene) {
            return Ok(false);
        }
        self.active = Some(scene.to_string());
        Ok(true)
    }

    fn unload_scene_async(&mut self, scene: &str) -> HostResult<()> {
        self.calls.push(HostCall::Unload {
            scene: scene.to_string(),
        });
        if self.unload_fails {
            return Err(HostError::CallFailed {
                call: "unload_scene_async",
                reason: "scripted failure".to_string(),
            });
        }
        self.loaded.retain(|loaded| loaded != scene);
        Ok(())
    }

    fn callable_surface(&self) -> HostResult<Vec<HostType>> {
        self.surface_scans.set(self.surface_scans.get() + 1);
        self.surface.clone().ok_or(HostError::CallFailed {
            call: "callable_surface",
            reason: "type load failure".to_string(),
        })
    }

    fn read_static_instance(
        &self,
        type_name: &str,
        member: &str,
    ) -> HostResult<Option<InstanceId>> {
        Ok(self
            .statics
            .get(&(type_name.to_string(), member.to_string()))
            .copied())
    }

    fn find_instances(&self, type_name: &str) -> HostResult<Vec<InstanceId>> {
        Ok(self.instances.get(type_name).cloned().unwrap_or_default())
    }

    fn invoke(&mut self, target: &CallTarget, args: &[ArgValue]) -> HostResult<()> {
        if self.invoke_fails {
            return Err(HostError::InvocationRejected {
                target: target.to_string(),
                reason: "target threw".to_string(),
            });
        }
        self.calls.push(HostCall::Invoke {
            target: target.clone(),
            args: args.to_vec(),
        });
        let Some(ArgValue::Str(scene)) = args.first() else {
            return Ok(());
        };
        let scene = scene.clone();
        self.react("invoke", &scene, self.loader_reaction, Effect::Activate)
    }
}

impl EntityLocator for FakeHost {
    fn find_controllable_entity(&self) -> Option<EntityHandle> {
        self.entity.as_ref().map(|entity| entity.handle)
    }
}

impl EntityHost for FakeHost {
    fn is_active_in_hierarchy(&self, entity: EntityHandle) -> bool {
        self.entity
            .as_ref()
            .is_some_and(|found| found.handle == entity && found.active_after == Some(0))
    }

    fn position(&self, entity: EntityHandle) -> Option<Vec3> {
        self.entity
            .as_ref()
            .filter(|found| found.handle == entity)
            .map(|found| found.position)
    }

    fn linear_velocity(&self, entity: EntityHandle) -> Option<Vec2> {
        self.entity
            .as_ref()
            .filter(|found| found.handle == entity)
            .and_then(|found| found.velocity)
    }

    fn set_position(&mut self, entity: EntityHandle, position: Vec3) -> HostResult<()> {
        if self.position_write_fails {
            return Err(HostError::CallFailed {
                call: "set_position",
                reason: "scripted failure".to_string(),
            });
        }
        match self.entity.as_mut().filter(|found| found.handle == entity) {
            Some(found) => {
                found.position = position;
                Ok(())
            }
            None => Err(HostError::EntityGone { entity }),
        }
    }

    fn set_body_velocity(
        &mut self,
        entity: EntityHandle,
        linear: Vec2,
        angular: f32,
    ) -> HostResult<()> {
        if self.velocity_write_fails {
            return Err(HostError::CallFailed {
                call: "set_body_velocity",
                reason: "scripted failure".to_string(),
            });
        }
        match self.entity.as_mut().filter(|found| found.handle == entity) {
            Some(found) => {
                if found.velocity.is_some() {
                    found.velocity = Some(linear);
                    found.angular_velocity = angular;
                }
                Ok(())
            }
            None => Err(HostError::EntityGone { entity }),
        }
    }

    fn sync_physics_transforms(&mut self) {
        self.physics_syncs += 1;
    }
}

/// Advances host then switcher once per tick until the switch settles.
/// Returns the outcome and the number of polls it took.
pub(crate) fn drive_switch(
    switcher: &mut SceneSwitcher,
    host: &mut FakeHost,
    dt: Duration,
    max_ticks: u32,
) -> Option<(TransitionOutcome, u32)> {
    for tick in 1..=max_ticks {
        host.advance();
        if let Step::Done(outcome) = switcher.poll(host, dt) {
            return Some((outcome, tick));
        }
    }
    None
}
