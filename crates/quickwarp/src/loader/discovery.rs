use std::fmt;

use tracing::{debug, info, warn};

use crate::host::SceneHost;

use super::surface::{CallTarget, HostType, InstanceId, MemberKind, MethodDesc, ParamShape};

/// Names that resemble loaders but unload, preload, or fetch content.
const REJECTED_PATTERNS: [&str; 3] = ["unload", "preload", "download"];
const PREFERRED_PATTERNS: [&str; 3] = ["beginscenetransition", "changescene", "gotoscene"];
const GENERIC_PATTERNS: [&str; 3] = ["loadscene", "loadlevel", "startscene"];
const SINGLETON_FIELD_NAMES: [&str; 3] = ["instance", "_instance", "s_instance"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoaderTier {
    Generic = 1,
    Preferred = 2,
}

impl LoaderTier {
    pub fn score(self) -> u8 {
        self as u8
    }
}

/// Explicit entry point supplied by configuration instead of scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOverride {
    pub type_name: String,
    pub method_name: String,
}

impl LoaderOverride {
    /// Parses `Type.Method`. The last dot separates the method so that
    /// namespaced type names keep working.
    pub fn parse(raw: &str) -> Option<Self> {
        let (type_name, method_name) = raw.trim().rsplit_once('.')?;
        let type_name = type_name.trim();
        let method_name = method_name.trim();
        if type_name.is_empty() || method_name.is_empty() {
            return None;
        }
        Some(Self {
            type_name: type_name.to_string(),
            method_name: method_name.to_string(),
        })
    }
}

impl fmt::Display for LoaderOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Static,
    Instance(Option<InstanceId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderHandle {
    pub type_name: String,
    pub method_name: String,
    pub binding: Binding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLoader {
    pub handle: LoaderHandle,
    pub parameter_shapes: Vec<ParamShape>,
    pub tier: Option<LoaderTier>,
}

impl DiscoveredLoader {
    /// Instance-bound loaders are unusable until an instance resolves.
    pub fn is_usable(&self) -> bool {
        !matches!(self.handle.binding, Binding::Instance(None))
    }

    pub fn call_target(&self) -> CallTarget {
        let instance = match self.handle.binding {
            Binding::Static => None,
            Binding::Instance(instance) => instance,
        };
        CallTarget {
            type_name: self.handle.type_name.clone(),
            method_name: self.handle.method_name.clone(),
            params: self.parameter_shapes.clone(),
            instance,
        }
    }
}

impl fmt::Display for DiscoveredLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameter_shapes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let binding = match self.handle.binding {
            Binding::Static => "static",
            Binding::Instance(Some(_)) => "instance found",
            Binding::Instance(None) => "instance missing",
        };
        write!(
            f,
            "{}.{}({params}) [{binding}]",
            self.handle.type_name, self.handle.method_name
        )
    }
}

pub(crate) fn is_rejected_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    REJECTED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// Tier of a method name, or `None` when it matches neither pattern set.
/// Rejected names never classify.
pub fn classify_name(name: &str) -> Option<LoaderTier> {
    if is_rejected_name(name) {
        return None;
    }
    let lower = name.to_ascii_lowercase();
    if PREFERRED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
    {
        Some(LoaderTier::Preferred)
    } else if GENERIC_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        Some(LoaderTier::Generic)
    } else {
        None
    }
}

fn takes_scene_id_first(method: &MethodDesc) -> bool {
    matches!(method.params.first(), Some(ParamShape::Str))
}

/// Picks the highest scoring candidate. Ties keep the first one seen so the
/// choice is stable across runs against the same surface.
pub fn select_candidate(surface: &[HostType]) -> Option<(&HostType, &MethodDesc, LoaderTier)> {
    let mut best: Option<(&HostType, &MethodDesc, LoaderTier)> = None;

    for host_type in surface {
        if host_type.is_generated() {
            continue;
        }
        for method in &host_type.methods {
            if is_rejected_name(&method.name) || !takes_scene_id_first(method) {
                continue;
            }
            let Some(tier) = classify_name(&method.name) else {
                continue;
            };
            match best {
                Some((_, _, best_tier)) if best_tier >= tier => {}
                _ => best = Some((host_type, method, tier)),
            }
        }
    }

    best
}

fn select_override<'a>(
    surface: &'a [HostType],
    wanted: &LoaderOverride,
) -> Option<(&'a HostType, &'a MethodDesc)> {
    surface
        .iter()
        .filter(|host_type| host_type.name == wanted.type_name)
        .flat_map(|host_type| {
            host_type
                .methods
                .iter()
                .map(move |method| (host_type, method))
        })
        .find(|(_, method)| method.name == wanted.method_name && takes_scene_id_first(method))
}

fn is_singleton_accessor(kind: MemberKind, name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.contains("singleton") {
        return true;
    }
    match kind {
        MemberKind::Property => lower == "instance",
        MemberKind::Field => SINGLETON_FIELD_NAMES.contains(&lower.as_str()),
    }
}

/// Resolves a live instance of `host_type`: conventional singleton accessors
/// first, then any live instance the host reports. Host errors count as
/// "not found".
pub(crate) fn resolve_instance<H: SceneHost + ?Sized>(
    host: &H,
    host_type: &HostType,
) -> Option<InstanceId> {
    let accessors = host_type.static_members.iter().filter(|member| {
        member.value_type == host_type.name && is_singleton_accessor(member.kind, &member.name)
    });
    // Properties before fields, each in declaration order.
    let (properties, fields): (Vec<_>, Vec<_>) =
        accessors.partition(|member| member.kind == MemberKind::Property);

    for member in properties.into_iter().chain(fields) {
        match host.read_static_instance(&host_type.name, &member.name) {
            Ok(Some(instance)) => return Some(instance),
            Ok(None) => {}
            Err(error) => {
                debug!(
                    type_name = %host_type.name,
                    member = %member.name,
                    error = %error,
                    "singleton_read_failed"
                );
            }
        }
    }

    find_first_instance(host, &host_type.name)
}

pub(crate) fn find_first_instance<H: SceneHost + ?Sized>(
    host: &H,
    type_name: &str,
) -> Option<InstanceId> {
    match host.find_instances(type_name) {
        Ok(instances) => instances.first().copied(),
        Err(error) => {
            debug!(type_name, error = %error, "instance_search_failed");
            None
        }
    }
}

/// Scans the host's callable surface and returns the best entry point.
pub fn discover<H: SceneHost + ?Sized>(
    host: &H,
    loader_override: Option<&LoaderOverride>,
) -> Option<DiscoveredLoader> {
    discover_with_declaring_type(host, loader_override).map(|(loader, _)| loader)
}

/// Like [`discover`], also returning the declaring type so instance
/// resolution can be retried later without another scan.
pub(crate) fn discover_with_declaring_type<H: SceneHost + ?Sized>(
    host: &H,
    loader_override: Option<&LoaderOverride>,
) -> Option<(DiscoveredLoader, HostType)> {
    let surface = match host.callable_surface() {
        Ok(surface) => surface,
        Err(error) => {
            warn!(error = %error, "loader_discovery_failed");
            return None;
        }
    };

    let (host_type, method, tier) = match loader_override {
        Some(wanted) => match select_override(&surface, wanted) {
            Some((_, method)) if is_rejected_name(&method.name) => {
                warn!(loader = %wanted, "configured_loader_rejected");
                return None;
            }
            Some((host_type, method)) => (host_type, method, classify_name(&method.name)),
            None => {
                warn!(loader = %wanted, "configured_loader_not_found");
                return None;
            }
        },
        None => match select_candidate(&surface) {
            Some((host_type, method, tier)) => (host_type, method, Some(tier)),
            None => {
                info!(scanned_types = surface.len(), "loader_not_found");
                return None;
            }
        },
    };

    let binding = if method.is_static {
        Binding::Static
    } else {
        Binding::Instance(resolve_instance(host, host_type))
    };

    let loader = DiscoveredLoader {
        handle: LoaderHandle {
            type_name: host_type.name.clone(),
            method_name: method.name.clone(),
            binding,
        },
        parameter_shapes: method.params.clone(),
        tier,
    };
    info!(
        loader = %loader,
        score = loader.tier.map_or(0, LoaderTier::score),
        "loader_discovered"
    );
    Some((loader, host_type.clone()))
}
