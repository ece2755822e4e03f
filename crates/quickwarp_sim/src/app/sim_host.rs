use std::time::Duration;

use quickwarp::{
    ArgValue, CallTarget, EntityHandle, EntityHost, EntityLocator, HostError, HostResult,
    HostType, InstanceId, LoadMode, MemberKind, MethodDesc, ParamShape, SceneHost, Vec2, Vec3,
};
use tracing::{debug, info};

pub(crate) const PLAYER: EntityHandle = EntityHandle(1);
const GAME_MANAGER: InstanceId = InstanceId(7);
const GAME_MANAGER_TYPE: &str = "GameManager";
const TRANSITION_METHOD: &str = "BeginSceneTransition";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SceneEntry {
    pub(crate) name: &'static str,
    /// Reachable through the engine's generic scene loads. Others only open
    /// through the game's own transition call.
    pub(crate) generic_loadable: bool,
    pub(crate) spawn: Vec3,
}

impl SceneEntry {
    pub(crate) const fn new(name: &'static str, generic_loadable: bool, spawn: Vec3) -> Self {
        Self {
            name,
            generic_loadable,
            spawn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SimSettings {
    pub(crate) load_ticks: u32,
    pub(crate) respawn_ticks: u32,
    pub(crate) expose_loader: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            load_ticks: 20,
            respawn_ticks: 30,
            expose_loader: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Activate,
    MarkLoaded,
}

#[derive(Debug)]
struct PendingLoad {
    scene: String,
    ticks_left: u32,
    completion: Completion,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Player {
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec2,
    pub(crate) angular_velocity: f32,
    /// Ticks until the respawned player is enabled again.
    pub(crate) inactive_ticks: u32,
}

/// Headless stand-in for a running game: a handful of scenes, a player that
/// respawns disabled on every scene activation, and a game manager whose
/// transition call is the only way into some scenes.
#[derive(Debug)]
pub(crate) struct SimHost {
    catalog: Vec<SceneEntry>,
    settings: SimSettings,
    active: Option<String>,
    loaded: Vec<String>,
    pending: Vec<PendingLoad>,
    player: Player,
    physics_syncs: u32,
}

impl SimHost {
    pub(crate) fn new(catalog: Vec<SceneEntry>, start: &str, settings: SimSettings) -> Self {
        let mut host = Self {
            catalog,
            settings,
            active: None,
            loaded: Vec::new(),
            pending: Vec::new(),
            player: Player {
                position: Vec3::ZERO,
                velocity: Vec2::ZERO,
                angular_velocity: 0.0,
                inactive_ticks: 0,
            },
            physics_syncs: 0,
        };
        host.activate_single(start);
        host.player.inactive_ticks = 0;
        host
    }

    pub(crate) fn demo(settings: SimSettings) -> Self {
        Self::new(demo_catalog(), "Bone_East_01", settings)
    }

    pub(crate) fn player(&self) -> &Player {
        &self.player
    }

    pub(crate) fn physics_syncs(&self) -> u32 {
        self.physics_syncs
    }

    /// Walks through a gate into `scene`, the way play normally moves
    /// between scenes.
    pub(crate) fn travel(&mut self, scene: &str) -> HostResult<()> {
        self.entry(scene)?;
        info!(scene, "sim_player_travelled");
        self.activate_single(scene);
        Ok(())
    }

    pub(crate) fn push_player(&mut self, velocity: Vec2) {
        self.player.velocity = velocity;
    }

    /// One host frame: loads progress, the player wakes up and moves.
    pub(crate) fn step(&mut self, dt: Duration) {
        let mut due = Vec::new();
        self.pending.retain_mut(|pending| {
            pending.ticks_left = pending.ticks_left.saturating_sub(1);
            if pending.ticks_left == 0 {
                due.push((pending.scene.clone(), pending.completion));
                false
            } else {
                true
            }
        });
        for (scene, completion) in due {
            match completion {
                Completion::Activate => self.activate_single(&scene),
                Completion::MarkLoaded => {
                    debug!(scene = %scene, "sim_scene_loaded_additive");
                    if !self.is_scene_loaded(&scene) {
                        self.loaded.push(scene);
                    }
                }
            }
        }

        if self.player.inactive_ticks > 0 {
            self.player.inactive_ticks -= 1;
            return;
        }
        let seconds = dt.as_secs_f32();
        self.player.position.x += self.player.velocity.x * seconds;
        self.player.position.y += self.player.velocity.y * seconds;
    }

    fn entry(&self, scene: &str) -> HostResult<&SceneEntry> {
        self.catalog
            .iter()
            .find(|entry| entry.name == scene)
            .ok_or_else(|| HostError::SceneUnavailable {
                scene: scene.to_string(),
            })
    }

    fn generic_entry(&self, scene: &str) -> HostResult<&SceneEntry> {
        let entry = self.entry(scene)?;
        if entry.generic_loadable {
            Ok(entry)
        } else {
            Err(HostError::SceneUnavailable {
                scene: scene.to_string(),
            })
        }
    }

    fn schedule(&mut self, scene: &str, completion: Completion) {
        self.pending.push(PendingLoad {
            scene: scene.to_string(),
            ticks_left: self.settings.load_ticks.max(1),
            completion,
        });
    }

    fn activate_single(&mut self, scene: &str) {
        self.loaded = vec![scene.to_string()];
        self.enter(scene);
    }

    fn enter(&mut self, scene: &str) {
        let spawn = self
            .catalog
            .iter()
            .find(|entry| entry.name == scene)
            .map_or(Vec3::ZERO, |entry| entry.spawn);
        self.active = Some(scene.to_string());
        self.player = Player {
            position: spawn,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            inactive_ticks: self.settings.respawn_ticks,
        };
        info!(scene, "sim_scene_activated");
    }
}

impl SceneHost for SimHost {
    fn active_scene(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn is_scene_loaded(&self, scene: &str) -> bool {
        self.loaded.iter().any(|loaded| loaded == scene)
    }

    fn load_scene_async(&mut self, scene: &str, mode: LoadMode) -> HostResult<()> {
        self.generic_entry(scene)?;
        let completion = match mode {
            LoadMode::Single => Completion::Activate,
            LoadMode::Additive => Completion::MarkLoaded,
        };
        self.schedule(scene, completion);
        Ok(())
    }

    fn load_scene(&mut self, scene: &str) -> HostResult<()> {
        self.generic_entry(scene)?;
        self.pending.push(PendingLoad {
            scene: scene.to_string(),
            ticks_left: 1,
            completion: Completion::Activate,
        });
        Ok(())
    }

    fn set_active_scene(&mut self, scene: &str) -> HostResult<bool> {
        if !self.is_scene_loaded(scene) {
            return Ok(false);
        }
        self.enter(scene);
        Ok(true)
    }

    fn unload_scene_async(&mut self, scene: &str) -> HostResult<()> {
        if self.active_scene() == Some(scene) {
            return Err(HostError::CallFailed {
                call: "unload_scene_async",
                reason: "cannot unload the active scene".to_string(),
            });
        }
        self.loaded.retain(|loaded| loaded != scene);
        Ok(())
    }

    fn callable_surface(&self) -> HostResult<Vec<HostType>> {
        if !self.settings.expose_loader {
            return Ok(Vec::new());
        }
        Ok(vec![
            HostType::new("<>c__DisplayClass12_0")
                .with_method(MethodDesc::new("LoadScene", vec![ParamShape::Str], false)),
            HostType::new("AudioManager").with_method(MethodDesc::new(
                "PreloadSceneAudio",
                vec![ParamShape::Str],
                false,
            )),
            HostType::new("DebugMenu").with_method(MethodDesc::new(
                "LoadLevel",
                vec![ParamShape::Str],
                true,
            )),
            HostType::new(GAME_MANAGER_TYPE)
                .with_method(MethodDesc::new(
                    "UnloadSceneAssets",
                    vec![ParamShape::Str],
                    false,
                ))
                .with_method(MethodDesc::new(
                    TRANSITION_METHOD,
                    vec![ParamShape::Str, ParamShape::Bool],
                    false,
                ))
                .with_static_member("Instance", MemberKind::Property, GAME_MANAGER_TYPE),
        ])
    }

    fn read_static_instance(
        &self,
        type_name: &str,
        member: &str,
    ) -> HostResult<Option<InstanceId>> {
        let exposed = self.settings.expose_loader
            && type_name == GAME_MANAGER_TYPE
            && member == "Instance";
        Ok(exposed.then_some(GAME_MANAGER))
    }

    fn find_instances(&self, type_name: &str) -> HostResult<Vec<InstanceId>> {
        if self.settings.expose_loader && type_name == GAME_MANAGER_TYPE {
            Ok(vec![GAME_MANAGER])
        } else {
            Ok(Vec::new())
        }
    }

    fn invoke(&mut self, target: &CallTarget, args: &[ArgValue]) -> HostResult<()> {
        match (target.type_name.as_str(), target.method_name.as_str()) {
            (GAME_MANAGER_TYPE, TRANSITION_METHOD) => {
                if target.instance != Some(GAME_MANAGER) {
                    return Err(HostError::InvocationRejected {
                        target: target.to_string(),
                        reason: "null instance".to_string(),
                    });
                }
                let Some(ArgValue::Str(scene)) = args.first() else {
                    return Err(HostError::InvocationRejected {
                        target: target.to_string(),
                        reason: "first argument must be a scene name".to_string(),
                    });
                };
                let scene = scene.clone();
                self.entry(&scene)?;
                self.schedule(&scene, Completion::Activate);
                Ok(())
            }
            // Present on the surface but does nothing outside debug builds.
            ("DebugMenu", "LoadLevel") => Ok(()),
            _ => Err(HostError::InvocationRejected {
                target: target.to_string(),
                reason: "no such method".to_string(),
            }),
        }
    }
}

impl EntityLocator for SimHost {
    fn find_controllable_entity(&self) -> Option<EntityHandle> {
        Some(PLAYER)
    }
}

impl EntityHost for SimHost {
    fn is_active_in_hierarchy(&self, entity: EntityHandle) -> bool {
        entity == PLAYER && self.player.inactive_ticks == 0
    }

    fn position(&self, entity: EntityHandle) -> Option<Vec3> {
        (entity == PLAYER).then_some(self.player.position)
    }

    fn linear_velocity(&self, entity: EntityHandle) -> Option<Vec2> {
        (entity == PLAYER).then_some(self.player.velocity)
    }

    fn set_position(&mut self, entity: EntityHandle, position: Vec3) -> HostResult<()> {
        if entity != PLAYER {
            return Err(HostError::EntityGone { entity });
        }
        self.player.position = position;
        Ok(())
    }

    fn set_body_velocity(
        &mut self,
        entity: EntityHandle,
        linear: Vec2,
        angular: f32,
    ) -> HostResult<()> {
        if entity != PLAYER {
            return Err(HostError::EntityGone { entity });
        }
        self.player.velocity = linear;
        self.player.angular_velocity = angular;
        Ok(())
    }

    fn sync_physics_transforms(&mut self) {
        self.physics_syncs += 1;
        debug!(
            x = self.player.position.x,
            y = self.player.position.y,
            vx = self.player.velocity.x,
            vy = self.player.velocity.y,
            angular = self.player.angular_velocity,
            "sim_physics_synced"
        );
    }
}

pub(crate) fn demo_catalog() -> Vec<SceneEntry> {
    vec![
        SceneEntry::new("Bone_East_01", false, Vec3::new(4.0, 2.0, 0.0)),
        SceneEntry::new("Town", true, Vec3::new(0.0, 0.0, 0.0)),
        SceneEntry::new("Bellhart", true, Vec3::new(-12.0, 6.0, 0.0)),
        SceneEntry::new("Abyss_02", false, Vec3::new(30.0, -40.0, 0.0)),
    ]
}
