pub mod accessor;
pub mod bridge;
pub mod error;
pub mod host;
pub mod keys;
pub mod skull;
pub mod version;

pub use accessor::{
    AccessorCache, AccessorRequest, AccessorResolver, CacheStats, CandidateLayout, LayoutError,
    LayoutTable, MatchQuality, MemberBinding, MemoCache, Resolution, ResolutionError,
    ResolvedAccessor,
};
pub use bridge::{Bridge, BridgeConfig, WarmupReport};
pub use error::ConfigurationError;
pub use host::{
    BindError, HostObject, HostRuntime, HostShape, InMemoryHost, InvokeError, MemberFlags,
    MemberHandle, MemberInfo, MemberKind, ObjectRef, Value,
};
pub use keys::{KeyRegistry, TEXTURE_PROPERTY};
pub use skull::{
    CustomSkull, CustomSkulls, SkullDelivery, SkullError, SkullOutcome, SkullPacketBuilder,
    SkullPacketPlan, SkullRequest, SkullState, TextureValue,
};
pub use version::{GateResult, PackageTag, ParseError, VersionDescriptor, VersionGate, VersionRange};
