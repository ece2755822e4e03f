mod cache;
mod discovery;
mod surface;

pub use cache::{build_arguments, InvokeError, LoaderCache};
pub use discovery::{
    classify_name, discover, select_candidate, Binding, DiscoveredLoader, LoaderHandle,
    LoaderOverride, LoaderTier,
};
pub use surface::{
    ArgValue, CallTarget, HostType, InstanceId, MemberKind, MethodDesc, ParamShape, StaticMember,
};
