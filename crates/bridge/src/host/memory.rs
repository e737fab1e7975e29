use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    BindError, FieldGetter, FieldSetter, HostRuntime, InvokeError, Invoker, MemberFlags,
    MemberHandle, MemberInfo, MemberKind, ObjectRef, Value,
};

#[derive(Clone)]
enum Body {
    Call(Invoker),
    Slot,
}

#[derive(Clone)]
struct MemberEntry {
    info: MemberInfo,
    body: Body,
}

#[derive(Clone)]
pub struct ClassBuilder {
    name: String,
    members: Vec<MemberEntry>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructor<F>(self, params: &[&str], body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |_: Option<&ObjectRef>, args: &[Value]| body(args));
        self.member(MemberInfo::constructor(params), invoker)
    }

    pub fn method<F>(self, name: &str, params: &[&str], returns: Option<&str>, body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        let member = format!("{}#{name}", self.name);
        let invoker: Invoker = Arc::new(move |target: Option<&ObjectRef>, args: &[Value]| {
            let target = target.ok_or_else(|| InvokeError::MissingTarget {
                member: member.clone(),
            })?;
            body(target, args)
        });
        self.member(MemberInfo::method(name, params, returns), invoker)
    }

    /// A method invoked without a receiver.
    pub fn static_method<F>(
        self,
        name: &str,
        params: &[&str],
        returns: Option<&str>,
        body: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |_: Option<&ObjectRef>, args: &[Value]| body(args));
        let info = MemberInfo::method(name, params, returns)
            .with_flags(MemberFlags::PUBLIC | MemberFlags::STATIC);
        self.member(info, invoker)
    }

    pub fn field(mut self, name: &str, ty: &str) -> Self {
        self.members.push(MemberEntry {
            info: MemberInfo::field(name, ty),
            body: Body::Slot,
        });
        self
    }

    pub fn member(mut self, info: MemberInfo, invoker: Invoker) -> Self {
        self.members.push(MemberEntry {
            info,
            body: Body::Call(invoker),
        });
        self
    }
}

/// A host made of registered classes whose members are Rust closures.
/// Field members are backed by the slot of the same name on the receiver.
#[derive(Clone)]
pub struct InMemoryHost {
    version: String,
    server_class: String,
    classes: HashMap<String, Vec<MemberEntry>>,
}

impl InMemoryHost {
    pub fn new(version: impl Into<String>, server_class: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            server_class: server_class.into(),
            classes: HashMap::new(),
        }
    }

    pub fn with_class(mut self, class: ClassBuilder) -> Self {
        self.add_class(class);
        self
    }

    /// Registering a class name again appends to its members.
    pub fn add_class(&mut self, class: ClassBuilder) {
        self.classes
            .entry(class.name)
            .or_default()
            .extend(class.members);
    }

    pub fn remove_class(&mut self, class: &str) -> bool {
        self.classes.remove(class).is_some()
    }

    pub fn remove_member(&mut self, class: &str, kind: MemberKind, name: &str) -> usize {
        let Some(members) = self.classes.get_mut(class) else {
            return 0;
        };
        let before = members.len();
        members.retain(|m| !(m.info.kind == kind && m.info.name == name));
        before - members.len()
    }

    pub fn restrict_member(&mut self, class: &str, kind: MemberKind, name: &str) -> usize {
        let Some(members) = self.classes.get_mut(class) else {
            return 0;
        };
        let mut restricted = 0;
        for member in members
            .iter_mut()
            .filter(|m| m.info.kind == kind && m.info.name == name)
        {
            member.info.flags |= MemberFlags::RESTRICTED;
            restricted += 1;
        }
        restricted
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }
}

impl HostRuntime for InMemoryHost {
    fn version_string(&self) -> &str {
        &self.version
    }

    fn server_class(&self) -> &str {
        &self.server_class
    }

    fn class_exists(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn members(&self, class: &str, kind: MemberKind, name: &str) -> Vec<MemberInfo> {
        self.classes
            .get(class)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.info.kind == kind && m.info.name == name)
                    .map(|m| m.info.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn bind(&self, class: &str, member: &MemberInfo) -> Result<MemberHandle, BindError> {
        let entry = self
            .classes
            .get(class)
            .and_then(|members| members.iter().find(|m| &m.info == member))
            .ok_or_else(|| BindError::Missing {
                class: class.to_owned(),
                member: member.name.clone(),
            })?;

        if entry.info.flags.contains(MemberFlags::RESTRICTED) {
            return Err(BindError::Restricted {
                class: class.to_owned(),
                member: member.name.clone(),
            });
        }

        Ok(match &entry.body {
            Body::Call(invoker) => MemberHandle::Callable(Arc::clone(invoker)),
            Body::Slot => {
                let read = member.name.clone();
                let write = member.name.clone();
                let get: FieldGetter =
                    Arc::new(move |target: &ObjectRef| Ok(target.get(&read).unwrap_or_default()));
                let set: FieldSetter = Arc::new(move |target: &ObjectRef, value: Value| {
                    target.set(&write, value);
                    Ok(())
                });
                MemberHandle::Field { get, set }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub player: String,
    pub bytes: Vec<u8>,
}

/// Everything the reference host's connections have put on the wire.
#[derive(Debug, Default)]
pub struct PacketLog {
    sent: Mutex<Vec<SentPacket>>,
}

impl PacketLog {
    pub fn record(&self, player: &str, bytes: Vec<u8>) {
        self.sent.lock().push(SentPacket {
            player: player.to_owned(),
            bytes,
        });
    }

    pub fn sent(&self) -> Vec<SentPacket> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentPacket> {
        self.sent.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}
