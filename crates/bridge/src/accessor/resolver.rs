use std::sync::Arc;

use log::{debug, trace, warn};

use super::cache::{AccessorCache, Resolution};
use super::layout::{expand_package, CandidateLayout, LayoutTable};
use super::{AccessorRequest, MatchQuality, ResolutionError, ResolvedAccessor};
use crate::host::{HostRuntime, MemberHandle, MemberInfo, MemberKind, ANY_TYPE, CONSTRUCTOR_NAME};
use crate::keys::KeyRegistry;
use crate::version::{PackageTag, VersionDescriptor};

/// A host member that exists under the name a candidate expects, waiting
/// for its signature to be checked.
struct Target<'a> {
    layout: &'a CandidateLayout,
    class: String,
    expected: Vec<String>,
    members: Vec<MemberInfo>,
}

#[derive(Clone, Copy)]
enum Pass {
    Exact,
    Relaxed,
}

/// Walks the candidate layouts of a request's owner against the host and
/// binds the first structural match. Results go through the accessor
/// cache, so each distinct request is resolved once.
pub struct AccessorResolver {
    host: Arc<dyn HostRuntime>,
    layouts: LayoutTable,
    keys: KeyRegistry,
    version: VersionDescriptor,
    package: Option<PackageTag>,
    cache: AccessorCache,
}

impl AccessorResolver {
    pub fn new(
        host: Arc<dyn HostRuntime>,
        layouts: LayoutTable,
        keys: KeyRegistry,
        version: VersionDescriptor,
        package: Option<PackageTag>,
    ) -> Self {
        Self {
            host,
            layouts,
            keys,
            version,
            package,
            cache: AccessorCache::new(),
        }
    }

    pub fn resolve(&self, request: &AccessorRequest) -> Resolution {
        self.cache.get_or_resolve(request, |request| self.resolve_uncached(request))
    }

    /// Runs the candidate walk without consulting or filling the cache.
    pub fn resolve_uncached(&self, request: &AccessorRequest) -> Resolution {
        let mut tried = Vec::new();
        let mut targets = Vec::new();

        for layout in self.candidates_for(request) {
            let Some(class) = layout.class_name(self.package.as_ref()) else {
                trace!("{request}: skipping {}, host has no versioned package", layout.class);
                tried.push(format!("{} (no package tag)", layout.class));
                continue;
            };
            if !self.host.class_exists(&class) {
                trace!("{request}: skipping {class}, class not present");
                tried.push(format!("{class} (class missing)"));
                continue;
            }

            let binding = layout.binding(request.kind(), request.name());
            let internal = match (binding, request.kind()) {
                (Some(binding), _) => binding.internal_name().to_owned(),
                (None, MemberKind::Constructor) => CONSTRUCTOR_NAME.to_owned(),
                (None, _) => request.name().to_owned(),
            };
            let explicit = binding.and_then(|b| b.params.as_deref());
            let Some(expected) = self.expected_params(request, explicit) else {
                trace!("{request}: skipping {class}, parameters need a versioned package");
                tried.push(format!("{class} (no package tag)"));
                continue;
            };
            if expected.len() != request.params().len() {
                trace!(
                    "{request}: skipping {class}, binding declares {} parameters",
                    expected.len()
                );
                tried.push(format!("{class}#{internal} (parameter count mismatch)"));
                continue;
            }

            let members = self.host.members(&class, request.kind(), &internal);
            if members.is_empty() {
                trace!("{request}: skipping {class}, no {} `{internal}`", request.kind());
                tried.push(format!("{class}#{internal} (member missing)"));
                continue;
            }
            targets.push(Target {
                layout,
                class,
                expected,
                members,
            });
        }

        // Exact signatures across every candidate win over any relaxed one.
        for pass in [Pass::Exact, Pass::Relaxed] {
            for target in &targets {
                for member in &target.members {
                    if let Some(quality) = match_signature(pass, &target.expected, member) {
                        return self.bind(request, target, member, quality);
                    }
                }
            }
        }

        for target in &targets {
            trace!(
                "{request}: {} ({}) has no member matching ({})",
                target.class,
                target.layout.range(),
                target.expected.join(", ")
            );
            tried.push(format!(
                "{}({}) (signature mismatch)",
                target.class,
                target.expected.join(", ")
            ));
        }

        let error = ResolutionError::NotFound {
            request: request.clone(),
            version: self.version.to_string(),
            tried,
        };
        warn!("{error}");
        Err(error)
    }

    /// Candidates whose range contains the host version, in walk order.
    pub fn candidates_for(&self, request: &AccessorRequest) -> Vec<&CandidateLayout> {
        self.layouts
            .candidates(request.owner())
            .iter()
            .filter(|layout| layout.range().contains(&self.version))
            .collect()
    }

    pub fn invalidate(&self, request: &AccessorRequest) -> bool {
        let removed = self.cache.invalidate(request);
        debug!("invalidated {request} (cached: {removed})");
        removed
    }

    pub fn invalidate_all(&self) {
        debug!("invalidated {} cached accessors", self.cache.len());
        self.cache.invalidate_all();
    }

    pub fn cache(&self) -> &AccessorCache {
        &self.cache
    }

    pub fn host(&self) -> &Arc<dyn HostRuntime> {
        &self.host
    }

    pub fn layouts(&self) -> &LayoutTable {
        &self.layouts
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    pub fn version(&self) -> &VersionDescriptor {
        &self.version
    }

    pub fn package(&self) -> Option<&PackageTag> {
        self.package.as_ref()
    }

    fn expected_params(
        &self,
        request: &AccessorRequest,
        explicit: Option<&[String]>,
    ) -> Option<Vec<String>> {
        match explicit {
            Some(params) => params
                .iter()
                .map(|p| expand_package(p, self.package.as_ref()))
                .collect(),
            None => Some(
                request
                    .params()
                    .iter()
                    .map(|p| {
                        self.keys
                            .logical_to_internal(p)
                            .unwrap_or(p.as_str())
                            .to_owned()
                    })
                    .collect(),
            ),
        }
    }

    fn bind(
        &self,
        request: &AccessorRequest,
        target: &Target<'_>,
        member: &MemberInfo,
        quality: MatchQuality,
    ) -> Resolution {
        let inaccessible = |reason: String| {
            let error = ResolutionError::Inaccessible {
                request: request.clone(),
                class: target.class.clone(),
                member: member.name.clone(),
                reason,
            };
            warn!("{error}");
            error
        };

        let handle = self
            .host
            .bind(&target.class, member)
            .map_err(|e| inaccessible(e.to_string()))?;
        let shape_ok = match (&handle, member.kind) {
            (MemberHandle::Field { .. }, MemberKind::Field) => true,
            (MemberHandle::Callable(_), MemberKind::Constructor | MemberKind::Method) => true,
            _ => false,
        };
        if !shape_ok {
            return Err(inaccessible(format!(
                "host returned the wrong handle for a {}",
                member.kind
            )));
        }

        let accessor = ResolvedAccessor::new(
            request.clone(),
            target.class.clone(),
            member.clone(),
            quality,
            handle,
        );
        debug!("resolved {request} -> {accessor} ({quality:?})");
        Ok(Arc::new(accessor))
    }
}

fn match_signature(pass: Pass, expected: &[String], member: &MemberInfo) -> Option<MatchQuality> {
    match pass {
        Pass::Exact => (member.params == expected).then_some(MatchQuality::Exact),
        Pass::Relaxed => {
            let params = &member.params;
            if params.len() + 1 == expected.len() && expected.starts_with(params) {
                return Some(MatchQuality::DroppedTrailing);
            }
            let widened = params.len() == expected.len()
                && params
                    .iter()
                    .zip(expected)
                    .all(|(have, want)| have == want || have == ANY_TYPE);
            widened.then_some(MatchQuality::Widened)
        }
    }
}
