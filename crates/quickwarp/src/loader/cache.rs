use thiserror::Error;
use tracing::{info, warn};

use crate::host::{HostError, SceneHost};

use super::discovery::{
    discover_with_declaring_type, resolve_instance, Binding, DiscoveredLoader, LoaderOverride,
};
use super::surface::{ArgValue, HostType, ParamShape};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("no loader was discovered")]
    NoLoader,
    #[error("{loader} needs an instance but none could be resolved")]
    InstanceUnresolved { loader: String },
    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Debug)]
struct CachedLoader {
    loader: DiscoveredLoader,
    declaring_type: HostType,
}

#[derive(Debug, Default)]
enum DiscoverySlot {
    #[default]
    NotRun,
    Settled(Option<CachedLoader>),
}

/// Once-only home of the discovered loader.
///
/// Discovery runs on first use and is never repeated, whether it found
/// something or not. The only later mutation is resolving the instance of an
/// instance-bound loader that had none at discovery time.
#[derive(Debug, Default)]
pub struct LoaderCache {
    loader_override: Option<LoaderOverride>,
    slot: DiscoverySlot,
}

impl LoaderCache {
    pub fn new(loader_override: Option<LoaderOverride>) -> Self {
        Self {
            loader_override,
            slot: DiscoverySlot::NotRun,
        }
    }

    pub fn has_run(&self) -> bool {
        matches!(self.slot, DiscoverySlot::Settled(_))
    }

    /// The cached result without triggering discovery.
    pub fn cached(&self) -> Option<&DiscoveredLoader> {
        match &self.slot {
            DiscoverySlot::Settled(Some(cached)) => Some(&cached.loader),
            _ => None,
        }
    }

    pub fn discover<H: SceneHost + ?Sized>(&mut self, host: &H) -> Option<&DiscoveredLoader> {
        if let DiscoverySlot::NotRun = self.slot {
            let found = discover_with_declaring_type(host, self.loader_override.as_ref()).map(
                |(loader, declaring_type)| CachedLoader {
                    loader,
                    declaring_type,
                },
            );
            self.slot = DiscoverySlot::Settled(found);
        }
        self.cached()
    }

    /// Fires the loader for `scene_id`. Success only means the host accepted
    /// the call, not that the scene changed.
    pub fn invoke<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scene_id: &str,
    ) -> Result<(), InvokeError> {
        self.discover(&*host);
        let DiscoverySlot::Settled(Some(cached)) = &mut self.slot else {
            return Err(InvokeError::NoLoader);
        };

        if cached.loader.handle.binding == Binding::Instance(None) {
            if let Some(instance) = resolve_instance(&*host, &cached.declaring_type) {
                info!(loader = %cached.loader, ?instance, "loader_instance_resolved");
                cached.loader.handle.binding = Binding::Instance(Some(instance));
            }
        }
        if !cached.loader.is_usable() {
            warn!(loader = %cached.loader, "loader_instance_missing");
            return Err(InvokeError::InstanceUnresolved {
                loader: cached.loader.to_string(),
            });
        }

        let target = cached.loader.call_target();
        let args = build_arguments(scene_id, &cached.loader.parameter_shapes);
        info!(loader = %target, scene_id, "loader_invoking");
        host.invoke(&target, &args)?;
        Ok(())
    }
}

/// Scene id first, then a zero value for every remaining declared parameter.
pub fn build_arguments(scene_id: &str, parameter_shapes: &[ParamShape]) -> Vec<ArgValue> {
    let mut args = Vec::with_capacity(parameter_shapes.len().max(1));
    args.push(ArgValue::Str(scene_id.to_string()));
    args.extend(
        parameter_shapes
            .iter()
            .skip(1)
            .map(ParamShape::default_argument),
    );
    args
}
