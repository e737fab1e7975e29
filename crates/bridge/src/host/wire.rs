//! Wire form of a packet object graph. Objects are flattened into a table
//! and referenced by index, so shared or cyclic references survive.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use rkyv::util::AlignedVec;
use rkyv::{rancor, Archive, Deserialize, Serialize};

use super::{HostObject, ObjectRef, Value};

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(u32),
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct WireField {
    pub name: String,
    pub value: WireValue,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct WireObject {
    pub class: String,
    pub fields: Vec<WireField>,
}

impl WireObject {
    pub fn field(&self, name: &str) -> Option<&WireValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

/// `objects[0]` is the packet itself.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct WirePacket {
    pub objects: Vec<WireObject>,
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl WirePacket {
    pub fn capture(root: &ObjectRef) -> Self {
        let mut objects = vec![WireObject {
            class: root.class().to_owned(),
            fields: Vec::new(),
        }];
        let mut index: HashMap<*const HostObject, u32> = HashMap::new();
        let mut queue = VecDeque::new();
        index.insert(Arc::as_ptr(root), 0);
        queue.push_back((0usize, Arc::clone(root)));

        while let Some((slot, object)) = queue.pop_front() {
            let mut fields = Vec::new();
            for (name, value) in object.slots() {
                let value = match value {
                    Value::Null => WireValue::Null,
                    Value::Bool(b) => WireValue::Bool(b),
                    Value::Int(i) => WireValue::Int(i),
                    Value::Str(s) => WireValue::Str(s),
                    Value::Object(child) => {
                        let id = match index.get(&Arc::as_ptr(&child)) {
                            Some(id) => *id,
                            None => {
                                let id = objects.len() as u32;
                                objects.push(WireObject {
                                    class: child.class().to_owned(),
                                    fields: Vec::new(),
                                });
                                index.insert(Arc::as_ptr(&child), id);
                                queue.push_back((id as usize, child));
                                id
                            }
                        };
                        WireValue::Object(id)
                    }
                };
                fields.push(WireField { name, value });
            }
            objects[slot].fields = fields;
        }

        Self { objects }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, WireError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(WireError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, WireError> {
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(WireError::Deserialize)
    }

    pub fn root(&self) -> Option<&WireObject> {
        self.objects.first()
    }

    pub fn object(&self, id: u32) -> Option<&WireObject> {
        self.objects.get(id as usize)
    }

    /// Walks object-valued fields from the root and returns the last one.
    pub fn follow(&self, path: &[&str]) -> Option<&WireValue> {
        let (last, parents) = path.split_last()?;
        let mut current = self.root()?;
        for name in parents {
            match current.field(name)? {
                WireValue::Object(id) => current = self.object(*id)?,
                _ => return None,
            }
        }
        current.field(last)
    }
}
