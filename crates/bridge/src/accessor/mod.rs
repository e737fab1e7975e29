//! Resolution of logical member requests to invocable host members.

mod builtin;
pub mod cache;
pub mod layout;
mod resolver;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{InvokeError, MemberHandle, MemberInfo, MemberKind, ObjectRef, Value};

pub use cache::{AccessorCache, CacheStats, MemoCache, Resolution};
pub use layout::{CandidateLayout, LayoutError, LayoutTable, MemberBinding};
pub use resolver::AccessorResolver;

/// What to resolve, in framework terms. Used as the cache key, so every
/// field takes part in equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessorRequest {
    owner: String,
    kind: MemberKind,
    name: String,
    params: Vec<String>,
}

impl AccessorRequest {
    pub const CONSTRUCTOR: &'static str = "new";

    pub fn constructor(owner: &str, params: &[&str]) -> Self {
        Self::new(owner, MemberKind::Constructor, Self::CONSTRUCTOR, params)
    }

    pub fn method(owner: &str, name: &str, params: &[&str]) -> Self {
        Self::new(owner, MemberKind::Method, name, params)
    }

    pub fn field(owner: &str, name: &str) -> Self {
        Self::new(owner, MemberKind::Field, name, &[])
    }

    fn new(owner: &str, kind: MemberKind, name: &str, params: &[&str]) -> Self {
        Self {
            owner: owner.to_owned(),
            kind,
            name: name.to_owned(),
            params: params.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Display for AccessorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MemberKind::Field => write!(f, "{}.{}", self.owner, self.name),
            MemberKind::Constructor => write!(f, "{}::new({})", self.owner, self.params.join(", ")),
            MemberKind::Method => {
                write!(f, "{}#{}({})", self.owner, self.name, self.params.join(", "))
            }
        }
    }
}

/// How closely the bound member matched the requested signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    Exact,
    /// The member takes one argument fewer; the last argument is dropped.
    DroppedTrailing,
    /// Same arity, some parameters declared as the host's top type.
    Widened,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no layout for {request} matches host {version} (tried: {})", .tried.join(", "))]
    NotFound {
        request: AccessorRequest,
        version: String,
        tried: Vec<String>,
    },
    #[error("{request} matched {class}#{member} but it cannot be made accessible: {reason}")]
    Inaccessible {
        request: AccessorRequest,
        class: String,
        member: String,
        reason: String,
    },
}

impl ResolutionError {
    pub fn request(&self) -> &AccessorRequest {
        match self {
            ResolutionError::NotFound { request, .. } => request,
            ResolutionError::Inaccessible { request, .. } => request,
        }
    }
}

/// A handle bound to one concrete host member. Constructors, methods and
/// fields share this one type; calling it the wrong way is an
/// [`InvokeError::WrongKind`].
pub struct ResolvedAccessor {
    request: AccessorRequest,
    class: String,
    member: MemberInfo,
    quality: MatchQuality,
    handle: MemberHandle,
}

impl ResolvedAccessor {
    pub(crate) fn new(
        request: AccessorRequest,
        class: String,
        member: MemberInfo,
        quality: MatchQuality,
        handle: MemberHandle,
    ) -> Self {
        Self {
            request,
            class,
            member,
            quality,
            handle,
        }
    }

    pub fn request(&self) -> &AccessorRequest {
        &self.request
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn member(&self) -> &MemberInfo {
        &self.member
    }

    pub fn kind(&self) -> MemberKind {
        self.member.kind
    }

    pub fn quality(&self) -> MatchQuality {
        self.quality
    }

    pub fn construct(&self, args: &[Value]) -> Result<Value, InvokeError> {
        self.call(MemberKind::Constructor, None, args)
    }

    pub fn invoke(&self, target: Option<&ObjectRef>, args: &[Value]) -> Result<Value, InvokeError> {
        self.call(MemberKind::Method, target, args)
    }

    pub fn get(&self, target: &ObjectRef) -> Result<Value, InvokeError> {
        match &self.handle {
            MemberHandle::Field { get, .. } => get(target),
            MemberHandle::Callable(_) => Err(self.wrong_kind(MemberKind::Field)),
        }
    }

    pub fn set(&self, target: &ObjectRef, value: Value) -> Result<(), InvokeError> {
        match &self.handle {
            MemberHandle::Field { set, .. } => set(target, value),
            MemberHandle::Callable(_) => Err(self.wrong_kind(MemberKind::Field)),
        }
    }

    /// Reads the field, writes back `patch(old)`, and returns the old value.
    pub fn update<F>(&self, target: &ObjectRef, patch: F) -> Result<Value, InvokeError>
    where
        F: FnOnce(&Value) -> Value,
    {
        let old = self.get(target)?;
        self.set(target, patch(&old))?;
        Ok(old)
    }

    fn call(
        &self,
        expected: MemberKind,
        target: Option<&ObjectRef>,
        args: &[Value],
    ) -> Result<Value, InvokeError> {
        if self.member.kind != expected {
            return Err(self.wrong_kind(expected));
        }
        let MemberHandle::Callable(invoker) = &self.handle else {
            return Err(self.wrong_kind(expected));
        };

        let requested = self.request.params.len();
        if args.len() != requested {
            return Err(InvokeError::Arity {
                accessor: self.request.to_string(),
                expected: requested,
                actual: args.len(),
            });
        }

        let args = match self.quality {
            MatchQuality::DroppedTrailing => args.get(..self.member.arity()),
            MatchQuality::Exact | MatchQuality::Widened => Some(args),
        };
        let Some(args) = args.filter(|args| args.len() == self.member.arity()) else {
            return Err(InvokeError::Arity {
                accessor: self.request.to_string(),
                expected: self.member.arity(),
                actual: requested,
            });
        };
        invoker(target, args)
    }

    fn wrong_kind(&self, expected: MemberKind) -> InvokeError {
        InvokeError::WrongKind {
            accessor: self.request.to_string(),
            expected,
            actual: self.member.kind,
        }
    }
}

impl fmt::Debug for ResolvedAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAccessor")
            .field("request", &self.request)
            .field("class", &self.class)
            .field("member", &self.member.name)
            .field("quality", &self.quality)
            .finish()
    }
}

impl fmt::Display for ResolvedAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({})", self.class, self.member.name, self.member.params.join(", "))
    }
}
