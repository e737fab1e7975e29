use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use hostbridge::host::shapes::GAME_PROFILE;
use hostbridge::host::ClassBuilder;
use hostbridge::version::gate;
use hostbridge::{
    AccessorRequest, Bridge, BridgeConfig, CandidateLayout, HostObject, HostShape, InMemoryHost,
    LayoutTable, MatchQuality, MemberKind, ResolutionError, SkullPacketBuilder, Value,
    VersionDescriptor,
};

fn profile_holder_bridge() -> Bridge {
    let holder = ClassBuilder::new("test.ProfileHolder")
        .constructor(&[], |_| Ok(Value::from(HostObject::new("test.ProfileHolder"))));
    let host = InMemoryHost::new("1.20.4", "org.bukkit.craftbukkit.v1_20_R3.CraftServer")
        .with_class(holder);
    let overrides =
        LayoutTable::from_layouts([CandidateLayout::new("ProfileHolder", "test.ProfileHolder")])
            .unwrap();
    let mut config = BridgeConfig::builtin().unwrap();
    config.layouts.merge_overrides(overrides);
    Bridge::new(Arc::new(host), config)
}

#[test]
fn test_host_1_20_4_passes_1_19_gate() {
    let current = VersionDescriptor::parse("1.20.4");
    assert_eq!(
        (current.major, current.minor, current.patch, current.qualifier.as_deref()),
        (1, 20, 4, None)
    );
    assert!(gate(&current, &VersionDescriptor::new(1, 19, 0)).allowed);
}

#[test]
fn test_cached_constructor_skips_resolver() {
    let bridge = profile_holder_bridge();
    let request = AccessorRequest::constructor("ProfileHolder", &[]);
    let resolutions = AtomicUsize::new(0);
    let counted = |r: &AccessorRequest| {
        resolutions.fetch_add(1, Ordering::SeqCst);
        bridge.resolver().resolve_uncached(r)
    };

    let first = bridge.resolver().cache().get_or_resolve(&request, counted).unwrap();
    let second = bridge.resolver().cache().get_or_resolve(&request, counted).unwrap();

    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    let holder = first.construct(&[]).unwrap();
    assert_eq!(holder.type_name(), "test.ProfileHolder");
}

#[test]
fn test_concurrent_first_use_resolves_once() {
    const CALLERS: usize = 12;

    let bridge = Bridge::with_builtin(HostShape::modern_1_20().runtime()).unwrap();
    let barrier = Barrier::new(CALLERS);
    let request = AccessorRequest::constructor("GameProfile", &["UUID", "String"]);

    let accessors: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    bridge.resolve(&request).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(accessors.iter().all(|a| Arc::ptr_eq(a, &accessors[0])));
    let stats = bridge.cache_stats();
    assert_eq!(stats.computations, 1);
    assert_eq!(stats.hits, (CALLERS - 1) as u64);
}

#[test]
fn test_concurrent_failures_are_shared() {
    const CALLERS: usize = 8;

    let bridge = Bridge::with_builtin(HostShape::modern_1_20().runtime()).unwrap();
    let barrier = Barrier::new(CALLERS);
    let request = AccessorRequest::method("GameProfile", "getSkin", &[]);

    let errors: Vec<ResolutionError> = thread::scope(|scope| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    bridge.resolve(&request).unwrap_err()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(errors.iter().all(|e| e == &errors[0]));
    assert_eq!(bridge.cache_stats().computations, 1);
    assert_eq!(bridge.resolver().cache().failures(), 1);
}

#[test]
fn test_every_shape_resolves_skull_accessors() {
    for name in HostShape::NAMES {
        let shape = HostShape::by_name(name).unwrap();
        let bridge = Bridge::with_builtin(shape.runtime()).unwrap();
        let requests = SkullPacketBuilder::requests(true, true);
        let report = bridge.warm_up(&requests);
        assert!(report.is_complete(), "{name}: {:?}", report.failed);
        assert_eq!(report.resolved.len(), requests.len());
    }
}

#[test]
fn test_profile_accessor_follows_version() {
    let request = AccessorRequest::method("GameProfile", "getProperties", &[]);

    let legacy = Bridge::with_builtin(HostShape::legacy_1_8().runtime()).unwrap();
    assert_eq!(legacy.resolve(&request).unwrap().member().name, "getProperties");

    let modern = Bridge::with_builtin(HostShape::modern_1_20().runtime()).unwrap();
    assert_eq!(modern.resolve(&request).unwrap().member().name, "properties");

    let put = modern
        .resolve(&AccessorRequest::method("PropertyMap", "put", &["String", "Property"]))
        .unwrap();
    assert_eq!(put.quality(), MatchQuality::Widened);
}

#[test]
fn test_toml_override_rebinds_renamed_member() {
    let mut shape =
        HostShape::modern_1_20().without_member(GAME_PROFILE, MemberKind::Method, "properties");
    shape.host_mut().add_class(
        ClassBuilder::new(GAME_PROFILE).method("propertiesView", &[], None, |this, _| {
            Ok(this.get("properties").unwrap_or_default())
        }),
    );
    let request = AccessorRequest::method("GameProfile", "getProperties", &[]);

    let stock = Bridge::with_builtin(shape.runtime()).unwrap();
    assert!(matches!(stock.resolve(&request), Err(ResolutionError::NotFound { .. })));

    let overrides = LayoutTable::from_toml_str(
        r#"
        [[layout]]
        owner = "GameProfile"
        since = "1.20.2"
        class = "com.mojang.authlib.GameProfile"

        [[layout.member]]
        kind = "method"
        name = "getProperties"
        internal = "propertiesView"
        "#,
    )
    .unwrap();
    let patched = Bridge::new(
        shape.runtime(),
        BridgeConfig::builtin().unwrap().with_overrides(overrides),
    );
    assert_eq!(patched.resolve(&request).unwrap().member().name, "propertiesView");
}

#[test]
fn test_invalidate_allows_retry_after_reload() {
    let bridge = profile_holder_bridge();
    let request = AccessorRequest::method("ProfileHolder", "reload", &[]);

    assert!(bridge.resolve(&request).is_err());
    assert!(bridge.resolve(&request).is_err());
    assert_eq!(bridge.cache_stats().computations, 1);

    bridge.resolver().invalidate(&request);
    assert!(bridge.resolve(&request).is_err());
    assert_eq!(bridge.cache_stats().computations, 2);
}
