use std::sync::Arc;

use log::{info, warn};

use crate::accessor::{
    AccessorRequest, AccessorResolver, CacheStats, LayoutTable, Resolution, ResolutionError,
};
use crate::error::ConfigurationError;
use crate::host::HostRuntime;
use crate::keys::KeyRegistry;
use crate::skull::SkullPacketBuilder;
use crate::version::{PackageTag, VersionDescriptor, VersionGate};

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub layouts: LayoutTable,
    pub keys: KeyRegistry,
    /// Version to assume instead of the one the host reports.
    pub version_override: Option<String>,
}

impl BridgeConfig {
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Ok(Self {
            layouts: LayoutTable::builtin()?,
            keys: KeyRegistry::builtin()?,
            version_override: None,
        })
    }

    pub fn with_overrides(mut self, overrides: LayoutTable) -> Self {
        self.layouts.merge_overrides(overrides);
        self
    }

    pub fn with_version_override(mut self, version: impl Into<String>) -> Self {
        self.version_override = Some(version.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct WarmupReport {
    /// Each request with the member it bound to.
    pub resolved: Vec<(AccessorRequest, String)>,
    pub failed: Vec<ResolutionError>,
}

impl WarmupReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Everything the dispatch layer needs for one host process: the detected
/// version, the tables, and the accessor cache. Create one at startup and
/// share it.
pub struct Bridge {
    gate: VersionGate,
    resolver: AccessorResolver,
}

impl Bridge {
    pub fn new(host: Arc<dyn HostRuntime>, config: BridgeConfig) -> Self {
        let package = PackageTag::from_server_class(host.server_class());
        let version = detect_version(
            host.as_ref(),
            config.version_override.as_deref(),
            package.as_ref(),
        );

        info!(
            "bridge: host {version} (package {}), {} layouts for {} owners, {} keys",
            package.as_ref().map_or("unversioned", PackageTag::as_str),
            config.layouts.len(),
            config.layouts.owners().count(),
            config.keys.len(),
        );

        Self {
            gate: VersionGate::new(version.clone()),
            resolver: AccessorResolver::new(host, config.layouts, config.keys, version, package),
        }
    }

    /// [`Bridge::new`] with the built-in tables.
    pub fn with_builtin(host: Arc<dyn HostRuntime>) -> Result<Self, ConfigurationError> {
        Ok(Self::new(host, BridgeConfig::builtin()?))
    }

    pub fn version(&self) -> &VersionDescriptor {
        self.gate.current()
    }

    pub fn package(&self) -> Option<&PackageTag> {
        self.resolver.package()
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    pub fn keys(&self) -> &KeyRegistry {
        self.resolver.keys()
    }

    pub fn resolver(&self) -> &AccessorResolver {
        &self.resolver
    }

    pub fn resolve(&self, request: &AccessorRequest) -> Resolution {
        self.resolver.resolve(request)
    }

    pub fn skulls(&self) -> SkullPacketBuilder<'_> {
        SkullPacketBuilder::new(&self.resolver)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache().stats()
    }

    /// Resolves `requests` up front so failures surface at startup instead
    /// of on first use.
    pub fn warm_up<'r>(
        &self,
        requests: impl IntoIterator<Item = &'r AccessorRequest>,
    ) -> WarmupReport {
        let mut report = WarmupReport::default();
        for request in requests {
            match self.resolver.resolve(request) {
                Ok(accessor) => report.resolved.push((request.clone(), accessor.to_string())),
                Err(error) => report.failed.push(error),
            }
        }
        info!(
            "bridge: warm-up resolved {} of {} accessors",
            report.resolved.len(),
            report.resolved.len() + report.failed.len()
        );
        report
    }
}

/// Override first, then the reported version string, then the package tag.
fn detect_version(
    host: &dyn HostRuntime,
    version_override: Option<&str>,
    package: Option<&PackageTag>,
) -> VersionDescriptor {
    if let Some(raw) = version_override {
        let version = VersionDescriptor::parse(raw);
        if !version.is_unknown() {
            return version;
        }
        warn!("bridge: ignoring unreadable version override {raw:?}");
    }

    let reported = VersionDescriptor::parse(host.version_string());
    if !reported.is_unknown() {
        if reported.is_approximate() {
            warn!(
                "bridge: host version {:?} read approximately as {reported}",
                host.version_string()
            );
        }
        return reported;
    }

    match package {
        Some(tag) => {
            warn!(
                "bridge: unreadable host version {:?}, falling back to package {tag}",
                host.version_string()
            );
            tag.descriptor()
        }
        None => {
            warn!("bridge: host version {:?} is unknown", host.version_string());
            reported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostShape, InMemoryHost};

    fn bare(version: &str, server_class: &str) -> Arc<dyn HostRuntime> {
        Arc::new(InMemoryHost::new(version, server_class))
    }

    #[test]
    fn test_detects_reported_version_and_package() {
        let bridge = Bridge::with_builtin(HostShape::legacy_1_8().runtime()).unwrap();
        assert_eq!(bridge.version(), &VersionDescriptor::new(1, 8, 8));
        assert_eq!(bridge.package().map(PackageTag::as_str), Some("v1_8_R3"));
        assert!(bridge.gate().is_legacy());
    }

    #[test]
    fn test_version_fallbacks() {
        let config = BridgeConfig::builtin().unwrap();

        let overridden = Bridge::new(
            bare("1.20.4", "org.bukkit.craftbukkit.v1_20_R3.CraftServer"),
            config.clone().with_version_override("1.19.2"),
        );
        assert_eq!(overridden.version(), &VersionDescriptor::new(1, 19, 2));

        let from_package = Bridge::new(
            bare("custom build", "org.bukkit.craftbukkit.v1_12_R1.CraftServer"),
            config.clone(),
        );
        assert_eq!(from_package.version().minor, 12);
        assert!(from_package.gate().is_legacy());

        let unknown = Bridge::new(bare("", "org.bukkit.craftbukkit.CraftServer"), config);
        assert!(unknown.version().is_unknown());
        assert!(unknown.package().is_none());
    }

    #[test]
    fn test_warm_up_reports_failures() {
        let bridge = Bridge::with_builtin(HostShape::modern_1_20().runtime()).unwrap();
        let requests = [
            AccessorRequest::constructor("GameProfile", &["UUID", "String"]),
            AccessorRequest::method("GameProfile", "getProperties", &[]),
            AccessorRequest::method("Scoreboard", "getTeam", &["String"]),
        ];
        let report = bridge.warm_up(&requests);
        assert_eq!(report.resolved.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete());
        assert!(report.resolved[1].1.ends_with("#properties()"));
        assert_eq!(bridge.cache_stats().entries, 3);
    }
}
