//! Reference hosts mirroring the internal layouts of known server lines.
//! They exist so layout tables can be checked offline and so the bridge can
//! be exercised end to end without a live server.

use std::sync::Arc;

use super::memory::{ClassBuilder, InMemoryHost, PacketLog};
use super::wire::WirePacket;
use super::{HostObject, HostRuntime, InvokeError, MemberKind, ObjectRef, Value};

pub const GAME_PROFILE: &str = "com.mojang.authlib.GameProfile";
pub const PROPERTY: &str = "com.mojang.authlib.properties.Property";
pub const PROPERTY_MAP: &str = "com.mojang.authlib.properties.PropertyMap";
pub const BUKKIT_ITEM_STACK: &str = "org.bukkit.inventory.ItemStack";

const OBJECT: &str = "java.lang.Object";
const STRING: &str = "java.lang.String";
const UUID: &str = "java.util.UUID";
const MATERIAL: &str = "org.bukkit.Material";
const ITEM_META: &str = "org.bukkit.inventory.meta.ItemMeta";

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn game_profile(properties_accessor: &str) -> ClassBuilder {
    ClassBuilder::new(GAME_PROFILE)
        .constructor(&[UUID, STRING], |args| {
            let profile = HostObject::new(GAME_PROFILE);
            profile.set("id", arg(args, 0));
            profile.set("name", arg(args, 1));
            profile.set("properties", Value::from(HostObject::new(PROPERTY_MAP)));
            Ok(Value::from(profile))
        })
        .method(properties_accessor, &[], Some(PROPERTY_MAP), |this, _| {
            Ok(this.get("properties").unwrap_or_default())
        })
}

fn property() -> ClassBuilder {
    fn build(args: &[Value]) -> Result<Value, InvokeError> {
        let property = HostObject::new(PROPERTY);
        property.set("name", arg(args, 0));
        property.set("value", arg(args, 1));
        property.set("signature", arg(args, 2));
        Ok(Value::from(property))
    }

    ClassBuilder::new(PROPERTY)
        .constructor(&[STRING, STRING], build)
        .constructor(&[STRING, STRING, STRING], build)
}

fn property_map() -> ClassBuilder {
    ClassBuilder::new(PROPERTY_MAP).method("put", &[OBJECT, OBJECT], Some("boolean"), |this, args| {
        let key = arg(args, 0);
        let Some(key) = key.as_str() else {
            return Err(InvokeError::UnexpectedValue {
                expected: STRING.to_owned(),
                found: key.type_name().to_owned(),
            });
        };
        this.set(key, arg(args, 1));
        Ok(Value::Bool(true))
    })
}

fn skull_meta(class: &str) -> ClassBuilder {
    let name = class.to_owned();
    ClassBuilder::new(class)
        .constructor(&[], move |_| Ok(Value::from(HostObject::new(name.clone()))))
        .field("profile", GAME_PROFILE)
}

/// Unwraps an object argument and checks its class, the way a typed
/// parameter would on a real host.
fn typed_arg(args: &[Value], index: usize, class: &str) -> Result<ObjectRef, InvokeError> {
    let object = arg(args, index).into_object(class)?;
    if object.class() != class {
        return Err(InvokeError::UnexpectedValue {
            expected: class.to_owned(),
            found: object.class().to_owned(),
        });
    }
    Ok(object)
}

fn bukkit_item_stack() -> ClassBuilder {
    ClassBuilder::new(BUKKIT_ITEM_STACK).constructor(&[MATERIAL, "int"], |args| {
        let stack = HostObject::new(BUKKIT_ITEM_STACK);
        stack.set("type", arg(args, 0));
        stack.set("amount", arg(args, 1));
        Ok(Value::from(stack))
    })
}

fn craft_item_stack(class: &str, item_type: &str) -> ClassBuilder {
    let copy_type = item_type.to_owned();
    let meta_type = item_type.to_owned();
    ClassBuilder::new(class)
        .static_method("asNMSCopy", &[BUKKIT_ITEM_STACK], Some(item_type), move |args| {
            let stack = typed_arg(args, 0, BUKKIT_ITEM_STACK)?;
            let item = HostObject::new(copy_type.clone());
            item.set("item", stack.get("type").unwrap_or_default());
            item.set("count", stack.get("amount").unwrap_or_default());
            Ok(Value::from(item))
        })
        .static_method("setItemMeta", &[item_type, ITEM_META], Some("boolean"), move |args| {
            let item = typed_arg(args, 0, &meta_type)?;
            let meta = arg(args, 1).into_object(ITEM_META)?;
            item.set("meta", Value::from(meta));
            Ok(Value::Bool(true))
        })
}

fn set_slot_packet(class: &str, item_type: &str) -> ClassBuilder {
    let name = class.to_owned();
    let item_class = item_type.to_owned();
    ClassBuilder::new(class).constructor(&["int", "int", item_type], move |args| {
        let item = typed_arg(args, 2, &item_class)?;
        let packet = HostObject::new(name.clone());
        packet.set("windowId", arg(args, 0));
        packet.set("slot", arg(args, 1));
        packet.set("item", Value::from(item));
        Ok(Value::from(packet))
    })
}

fn player_connection(
    class: &str,
    send: &str,
    packet_type: &str,
    log: Arc<PacketLog>,
) -> ClassBuilder {
    ClassBuilder::new(class).method(send, &[packet_type], None, move |this, args| {
        if this.get("open").and_then(|open| open.as_bool()) == Some(false) {
            return Err(InvokeError::Host("connection closed".into()));
        }
        let packet = arg(args, 0).into_object("packet")?;
        let bytes = WirePacket::capture(&packet)
            .serialize()
            .map_err(|e| InvokeError::Host(e.to_string()))?;
        let player = this
            .get("player")
            .and_then(|p| p.as_str().map(str::to_owned))
            .unwrap_or_default();
        log.record(&player, bytes);
        Ok(Value::Null)
    })
}

/// A named reference host plus the handles tests need to observe it.
pub struct HostShape {
    name: &'static str,
    host: InMemoryHost,
    connection_class: String,
    packets: Arc<PacketLog>,
}

impl HostShape {
    pub const NAMES: &'static [&'static str] = &["legacy", "modern", "unversioned"];

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "legacy" => Some(Self::legacy_1_8()),
            "modern" => Some(Self::modern_1_20()),
            "unversioned" => Some(Self::unversioned_1_21()),
            _ => None,
        }
    }

    /// Spigot 1.8.8: everything lives in `v1_8_R3` packages.
    pub fn legacy_1_8() -> Self {
        let packets = Arc::new(PacketLog::default());
        let connection_class = "net.minecraft.server.v1_8_R3.PlayerConnection";
        let host = InMemoryHost::new(
            "git-Spigot-21fe707-e1ebe52 (MC: 1.8.8)",
            "org.bukkit.craftbukkit.v1_8_R3.CraftServer",
        )
        .with_class(game_profile("getProperties"))
        .with_class(property())
        .with_class(property_map())
        .with_class(skull_meta("org.bukkit.craftbukkit.v1_8_R3.inventory.CraftMetaSkull"))
        .with_class(bukkit_item_stack())
        .with_class(craft_item_stack(
            "org.bukkit.craftbukkit.v1_8_R3.inventory.CraftItemStack",
            "net.minecraft.server.v1_8_R3.ItemStack",
        ))
        .with_class(set_slot_packet(
            "net.minecraft.server.v1_8_R3.PacketPlayOutSetSlot",
            "net.minecraft.server.v1_8_R3.ItemStack",
        ))
        .with_class(player_connection(
            connection_class,
            "sendPacket",
            "net.minecraft.server.v1_8_R3.Packet",
            Arc::clone(&packets),
        ));

        Self {
            name: "legacy",
            host,
            connection_class: connection_class.to_owned(),
            packets,
        }
    }

    /// Spigot 1.20.4: record-style profile accessor, relocated packets and an
    /// obfuscated send method.
    pub fn modern_1_20() -> Self {
        let packets = Arc::new(PacketLog::default());
        let connection_class = "net.minecraft.server.network.PlayerConnection";
        let host = InMemoryHost::new(
            "1.20.4-R0.1-SNAPSHOT",
            "org.bukkit.craftbukkit.v1_20_R3.CraftServer",
        )
        .with_class(game_profile("properties"))
        .with_class(property())
        .with_class(property_map())
        .with_class(skull_meta("org.bukkit.craftbukkit.v1_20_R3.inventory.CraftMetaSkull"))
        .with_class(bukkit_item_stack())
        .with_class(craft_item_stack(
            "org.bukkit.craftbukkit.v1_20_R3.inventory.CraftItemStack",
            "net.minecraft.world.item.ItemStack",
        ))
        .with_class(set_slot_packet(
            "net.minecraft.network.protocol.game.PacketPlayOutSetSlot",
            "net.minecraft.world.item.ItemStack",
        ))
        .with_class(player_connection(
            connection_class,
            "b",
            "net.minecraft.network.protocol.Packet",
            Arc::clone(&packets),
        ));

        Self {
            name: "modern",
            host,
            connection_class: connection_class.to_owned(),
            packets,
        }
    }

    /// Paper 1.21.1: unversioned CraftBukkit packages and Mojang-mapped names.
    pub fn unversioned_1_21() -> Self {
        let packets = Arc::new(PacketLog::default());
        let connection_class = "net.minecraft.server.network.ServerGamePacketListenerImpl";
        let host = InMemoryHost::new(
            "git-Paper-130 (MC: 1.21.1)",
            "org.bukkit.craftbukkit.CraftServer",
        )
        .with_class(game_profile("properties"))
        .with_class(property())
        .with_class(property_map())
        .with_class(skull_meta("org.bukkit.craftbukkit.inventory.CraftMetaSkull"))
        .with_class(bukkit_item_stack())
        .with_class(craft_item_stack(
            "org.bukkit.craftbukkit.inventory.CraftItemStack",
            "net.minecraft.world.item.ItemStack",
        ))
        .with_class(set_slot_packet(
            "net.minecraft.network.protocol.game.ClientboundContainerSetSlotPacket",
            "net.minecraft.world.item.ItemStack",
        ))
        .with_class(player_connection(
            connection_class,
            "send",
            "net.minecraft.network.protocol.Packet",
            Arc::clone(&packets),
        ));

        Self {
            name: "unversioned",
            host,
            connection_class: connection_class.to_owned(),
            packets,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn host(&self) -> &InMemoryHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut InMemoryHost {
        &mut self.host
    }

    pub fn without_member(mut self, class: &str, kind: MemberKind, name: &str) -> Self {
        self.host.remove_member(class, kind, name);
        self
    }

    pub fn with_restricted_member(mut self, class: &str, kind: MemberKind, name: &str) -> Self {
        self.host.restrict_member(class, kind, name);
        self
    }

    /// A snapshot of the host for the bridge. Later edits to this shape do
    /// not reach runtimes already handed out; the packet log is shared.
    pub fn runtime(&self) -> Arc<dyn HostRuntime> {
        Arc::new(self.host.clone())
    }

    pub fn open_connection(&self, player: &str) -> ObjectRef {
        let connection = HostObject::new(self.connection_class.clone());
        connection.set("player", Value::from(player));
        connection.set("open", Value::Bool(true));
        connection
    }

    pub fn close_connection(connection: &ObjectRef) {
        connection.set("open", Value::Bool(false));
    }

    pub fn packets(&self) -> Arc<PacketLog> {
        Arc::clone(&self.packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemberHandle;

    #[test]
    fn test_every_name_builds() {
        for name in HostShape::NAMES {
            let shape = HostShape::by_name(name).unwrap();
            assert_eq!(shape.name(), *name);
            assert!(shape.host().class_exists(GAME_PROFILE));
        }
        assert!(HostShape::by_name("beta").is_none());
    }

    #[test]
    fn test_layout_drift_between_shapes() {
        let legacy = HostShape::legacy_1_8();
        let modern = HostShape::modern_1_20();

        assert_eq!(
            legacy.host().members(GAME_PROFILE, MemberKind::Method, "getProperties").len(),
            1
        );
        assert!(
            legacy
                .host()
                .members(GAME_PROFILE, MemberKind::Method, "properties")
                .is_empty()
        );
        assert_eq!(
            modern.host().members(GAME_PROFILE, MemberKind::Method, "properties").len(),
            1
        );
        assert_eq!(
            modern.runtime().server_class(),
            "org.bukkit.craftbukkit.v1_20_R3.CraftServer"
        );
    }

    #[test]
    fn test_without_member() {
        let shape =
            HostShape::modern_1_20().without_member(PROPERTY_MAP, MemberKind::Method, "put");
        assert!(shape.host().members(PROPERTY_MAP, MemberKind::Method, "put").is_empty());
    }

    #[test]
    fn test_set_slot_rejects_non_item_argument() {
        let shape = HostShape::modern_1_20();
        let class = "net.minecraft.network.protocol.game.PacketPlayOutSetSlot";
        let ctor = &shape.host().members(class, MemberKind::Constructor, "<init>")[0];
        let MemberHandle::Callable(construct) = shape.host().bind(class, ctor).unwrap() else {
            panic!("constructor bound as a field");
        };

        let args = |item: &str| [Value::Int(0), Value::Int(36), Value::from(HostObject::new(item))];

        let err = construct(None, &args("org.bukkit.craftbukkit.v1_20_R3.inventory.CraftMetaSkull"))
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::UnexpectedValue { ref expected, .. }
                if expected == "net.minecraft.world.item.ItemStack"
        ));
        assert!(construct(None, &args("net.minecraft.world.item.ItemStack")).is_ok());
    }
}
