use thiserror::Error;

use crate::loader::{ArgValue, CallTarget, HostType, InstanceId};
use crate::types::{Vec2, Vec3};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("scene '{scene}' is not available to the host")]
    SceneUnavailable { scene: String },
    #[error("host call {call} failed: {reason}")]
    CallFailed { call: &'static str, reason: String },
    #[error("invocation of {target} rejected: {reason}")]
    InvocationRejected { target: String, reason: String },
    #[error("entity {entity:?} no longer exists")]
    EntityGone { entity: EntityHandle },
    #[error("host does not expose {capability}")]
    Unsupported { capability: &'static str },
}

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Single,
    Additive,
}

/// Scene management surface of the host environment.
///
/// All calls happen between ticks. Load requests are fire-and-forget: the
/// caller observes their effect through [`SceneHost::active_scene`] and
/// [`SceneHost::is_scene_loaded`] on later ticks.
pub trait SceneHost {
    fn active_scene(&self) -> Option<&str>;

    fn is_scene_loaded(&self, scene: &str) -> bool;

    fn load_scene_async(&mut self, scene: &str, mode: LoadMode) -> HostResult<()>;

    /// Synchronous single-mode load.
    fn load_scene(&mut self, scene: &str) -> HostResult<()>;

    /// Returns `false` when the host refuses the assignment.
    fn set_active_scene(&mut self, scene: &str) -> HostResult<bool>;

    fn unload_scene_async(&mut self, scene: &str) -> HostResult<()>;

    /// Introspectable callables, scanned once by loader discovery. Hosts
    /// without such a surface keep the default and only get the generic
    /// strategies.
    fn callable_surface(&self) -> HostResult<Vec<HostType>> {
        Ok(Vec::new())
    }

    /// Reads a static member expected to hold an instance of `type_name`.
    fn read_static_instance(
        &self,
        _type_name: &str,
        _member: &str,
    ) -> HostResult<Option<InstanceId>> {
        Ok(None)
    }

    fn find_instances(&self, _type_name: &str) -> HostResult<Vec<InstanceId>> {
        Ok(Vec::new())
    }

    fn invoke(&mut self, _target: &CallTarget, _args: &[ArgValue]) -> HostResult<()> {
        Err(HostError::Unsupported {
            capability: "callable invocation",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

pub trait EntityLocator {
    /// Best guess at the controllable entity. May return an inactive one.
    fn find_controllable_entity(&self) -> Option<EntityHandle>;
}

pub trait EntityHost: EntityLocator {
    fn is_active_in_hierarchy(&self, entity: EntityHandle) -> bool;

    fn position(&self, entity: EntityHandle) -> Option<Vec3>;

    /// `None` when the entity has no physics body.
    fn linear_velocity(&self, entity: EntityHandle) -> Option<Vec2>;

    fn set_position(&mut self, entity: EntityHandle, position: Vec3) -> HostResult<()>;

    /// No-op for entities without a physics body.
    fn set_body_velocity(
        &mut self,
        entity: EntityHandle,
        linear: Vec2,
        angular: f32,
    ) -> HostResult<()>;

    fn sync_physics_transforms(&mut self);
}

pub trait Host: SceneHost + EntityHost {}

impl<T: SceneHost + EntityHost + ?Sized> Host for T {}

pub(crate) fn is_active_scene<H: SceneHost + ?Sized>(host: &H, scene: &str) -> bool {
    host.active_scene() == Some(scene)
}
