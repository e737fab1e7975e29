//! The host seen from the outside: a structural lookup surface plus the
//! dynamic values that flow through bound members.

pub mod memory;
pub mod shapes;
pub mod wire;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use memory::{ClassBuilder, InMemoryHost, PacketLog, SentPacket};
pub use shapes::HostShape;

/// Internal name every constructor is looked up under.
pub const CONSTRUCTOR_NAME: &str = "<init>";
/// Parameter descriptor that accepts any argument.
pub const ANY_TYPE: &str = "java.lang.Object";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Constructor,
    Method,
    Field,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberKind::Constructor => "constructor",
            MemberKind::Method => "method",
            MemberKind::Field => "field",
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u8 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const STATIC = 1 << 2;
        const FINAL = 1 << 3;
        /// Access checks on this member cannot be suppressed.
        const RESTRICTED = 1 << 4;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub params: Vec<String>,
    /// Return type for methods, declared type for fields.
    pub ty: Option<String>,
    pub flags: MemberFlags,
}

impl MemberInfo {
    pub fn constructor(params: &[&str]) -> Self {
        Self {
            name: CONSTRUCTOR_NAME.to_owned(),
            kind: MemberKind::Constructor,
            params: params.iter().map(|p| (*p).to_owned()).collect(),
            ty: None,
            flags: MemberFlags::PUBLIC,
        }
    }

    pub fn method(name: &str, params: &[&str], returns: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            kind: MemberKind::Method,
            params: params.iter().map(|p| (*p).to_owned()).collect(),
            ty: returns.map(str::to_owned),
            flags: MemberFlags::PUBLIC,
        }
    }

    pub fn field(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: MemberKind::Field,
            params: Vec::new(),
            ty: Some(ty.to_owned()),
            flags: MemberFlags::PRIVATE,
        }
    }

    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A host-side object. Slots hold field values and any state the host's own
/// members keep on the object.
pub struct HostObject {
    class: String,
    slots: RwLock<BTreeMap<String, Value>>,
}

pub type ObjectRef = Arc<HostObject>;

impl HostObject {
    pub fn new(class: impl Into<String>) -> ObjectRef {
        Arc::new(Self {
            class: class.into(),
            slots: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn get(&self, slot: &str) -> Option<Value> {
        self.slots.read().get(slot).cloned()
    }

    pub fn set(&self, slot: &str, value: Value) -> Option<Value> {
        self.slots.write().insert(slot.to_owned(), value)
    }

    pub fn slots(&self) -> Vec<(String, Value)> {
        self.slots
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.class)
            .field("slots", &self.slots.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(ObjectRef),
}

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Str(_) => "java.lang.String",
            Value::Object(object) => object.class(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_object(self, expected: &str) -> Result<ObjectRef, InvokeError> {
        match self {
            Value::Object(object) => Ok(object),
            other => Err(InvokeError::UnexpectedValue {
                expected: expected.to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("{accessor} is a {actual} accessor, not a {expected}")]
    WrongKind {
        accessor: String,
        expected: MemberKind,
        actual: MemberKind,
    },
    #[error("{accessor} takes {expected} arguments, got {actual}")]
    Arity {
        accessor: String,
        expected: usize,
        actual: usize,
    },
    #[error("{member} needs a receiver object")]
    MissingTarget { member: String },
    #[error("expected {expected}, found {found}")]
    UnexpectedValue { expected: String, found: String },
    #[error("host raised: {0}")]
    Host(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("{class}#{member} is restricted and cannot be made accessible")]
    Restricted { class: String, member: String },
    #[error("{class} has no member {member}")]
    Missing { class: String, member: String },
}

pub type Invoker =
    Arc<dyn Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, InvokeError> + Send + Sync>;
pub type FieldGetter = Arc<dyn Fn(&ObjectRef) -> Result<Value, InvokeError> + Send + Sync>;
pub type FieldSetter = Arc<dyn Fn(&ObjectRef, Value) -> Result<(), InvokeError> + Send + Sync>;

/// What a host hands back when a member is made invocable.
#[derive(Clone)]
pub enum MemberHandle {
    Callable(Invoker),
    Field { get: FieldGetter, set: FieldSetter },
}

impl fmt::Debug for MemberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberHandle::Callable(_) => f.write_str("MemberHandle::Callable"),
            MemberHandle::Field { .. } => f.write_str("MemberHandle::Field"),
        }
    }
}

/// Structural access to a running host. Lookups must be side-effect free;
/// only [`bind`](HostRuntime::bind) may touch access control.
pub trait HostRuntime: Send + Sync {
    /// Free-form version text as the host reports it.
    fn version_string(&self) -> &str;

    /// Fully qualified name of the host's server implementation class.
    fn server_class(&self) -> &str;

    fn class_exists(&self, class: &str) -> bool;

    /// Members of `class` with the given kind and name, in declaration order.
    fn members(&self, class: &str, kind: MemberKind, name: &str) -> Vec<MemberInfo>;

    fn bind(&self, class: &str, member: &MemberInfo) -> Result<MemberHandle, BindError>;
}
