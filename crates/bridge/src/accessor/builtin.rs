//! Layouts shipped with the bridge. Extend this list when a new host line
//! moves something.

use super::layout::{CandidateLayout, MemberBinding};

const AUTHLIB: &str = "com.mojang.authlib";
const CRAFT_META_SKULL_LEGACY: &str = "org.bukkit.craftbukkit.{v}.inventory.CraftMetaSkull";
const CRAFT_META_SKULL: &str = "org.bukkit.craftbukkit.inventory.CraftMetaSkull";
const CRAFT_ITEM_STACK_LEGACY: &str = "org.bukkit.craftbukkit.{v}.inventory.CraftItemStack";
const CRAFT_ITEM_STACK: &str = "org.bukkit.craftbukkit.inventory.CraftItemStack";
const BUKKIT_ITEM_STACK: &str = "org.bukkit.inventory.ItemStack";
const NMS_ITEM_STACK_LEGACY: &str = "net.minecraft.server.{v}.ItemStack";
const NMS_ITEM_STACK: &str = "net.minecraft.world.item.ItemStack";

pub(crate) fn layouts() -> Vec<CandidateLayout> {
    let mut layouts = Vec::new();
    layouts.extend(profile());
    layouts.extend(skull_meta());
    layouts.extend(item_stack());
    layouts.extend(set_slot_packet());
    layouts.extend(player_connection());
    layouts
}

fn profile() -> Vec<CandidateLayout> {
    let game_profile = format!("{AUTHLIB}.GameProfile");
    vec![
        // authlib 5 turned GameProfile into a record-style class.
        CandidateLayout::new("GameProfile", &game_profile)
            .since("1.20.2")
            .member(MemberBinding::method("getProperties").internal("properties")),
        CandidateLayout::new("GameProfile", &game_profile),
        CandidateLayout::new("Property", &format!("{AUTHLIB}.properties.Property")),
        CandidateLayout::new("PropertyMap", &format!("{AUTHLIB}.properties.PropertyMap")),
    ]
}

fn skull_meta() -> Vec<CandidateLayout> {
    vec![
        CandidateLayout::new("SkullMeta", CRAFT_META_SKULL).since("1.20.5"),
        CandidateLayout::new("SkullMeta", CRAFT_META_SKULL_LEGACY),
    ]
}

fn item_stack() -> Vec<CandidateLayout> {
    let craft = |class: &str, host_item: &str| {
        CandidateLayout::new("CraftItemStack", class)
            .member(MemberBinding::method("asNMSCopy").params(&[BUKKIT_ITEM_STACK]))
            .member(
                MemberBinding::method("setItemMeta")
                    .params(&[host_item, "org.bukkit.inventory.meta.ItemMeta"]),
            )
    };
    vec![
        CandidateLayout::new("ItemStack", BUKKIT_ITEM_STACK).member(
            MemberBinding::constructor().params(&["org.bukkit.Material", "int"]),
        ),
        craft(CRAFT_ITEM_STACK, NMS_ITEM_STACK).since("1.20.5"),
        craft(CRAFT_ITEM_STACK_LEGACY, NMS_ITEM_STACK).since("1.17"),
        craft(CRAFT_ITEM_STACK_LEGACY, NMS_ITEM_STACK_LEGACY).until("1.17"),
    ]
}

fn set_slot_packet() -> Vec<CandidateLayout> {
    let ctor = |item: &str| MemberBinding::constructor().params(&["int", "int", item]);
    vec![
        CandidateLayout::new("SetSlotPacket", "net.minecraft.server.{v}.PacketPlayOutSetSlot")
            .until("1.17")
            .member(ctor(NMS_ITEM_STACK_LEGACY)),
        CandidateLayout::new(
            "SetSlotPacket",
            "net.minecraft.network.protocol.game.PacketPlayOutSetSlot",
        )
        .since("1.17")
        .until("1.20.5")
        .member(ctor(NMS_ITEM_STACK)),
        CandidateLayout::new(
            "SetSlotPacket",
            "net.minecraft.network.protocol.game.ClientboundContainerSetSlotPacket",
        )
        .since("1.20.5")
        .member(ctor(NMS_ITEM_STACK)),
    ]
}

fn player_connection() -> Vec<CandidateLayout> {
    const PACKET: &str = "net.minecraft.network.protocol.Packet";
    let send = |internal: &str, packet: &str| {
        MemberBinding::method("sendPacket")
            .internal(internal)
            .params(&[packet])
    };
    vec![
        CandidateLayout::new("PlayerConnection", "net.minecraft.server.{v}.PlayerConnection")
            .until("1.17")
            .member(send("sendPacket", "net.minecraft.server.{v}.Packet")),
        CandidateLayout::new("PlayerConnection", "net.minecraft.server.network.PlayerConnection")
            .since("1.17")
            .until("1.20.2")
            .member(send("a", PACKET)),
        CandidateLayout::new("PlayerConnection", "net.minecraft.server.network.PlayerConnection")
            .since("1.20.2")
            .until("1.20.5")
            .member(send("b", PACKET)),
        CandidateLayout::new(
            "PlayerConnection",
            "net.minecraft.server.network.ServerGamePacketListenerImpl",
        )
        .since("1.20.5")
        .member(send("send", PACKET)),
    ]
}
