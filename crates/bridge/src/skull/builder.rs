use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use super::texture::TextureValue;
use crate::accessor::{AccessorRequest, AccessorResolver, ResolutionError, ResolvedAccessor};
use crate::host::{InvokeError, ObjectRef, Value};
use crate::keys::TEXTURE_PROPERTY;
use crate::version::VersionGate;

/// Shown to players when the host lacks the internals a skull needs.
pub const UNSUPPORTED: &str = "unsupported on this server version";

const MAX_PROFILE_NAME: usize = 16;
const FALLBACK_TEXTURE_PROPERTY: &str = "textures";
const PLAYER_HEAD: &str = "PLAYER_HEAD";
const LEGACY_PLAYER_HEAD: &str = "SKULL_ITEM";

fn profile_ctor() -> AccessorRequest {
    AccessorRequest::constructor("GameProfile", &["UUID", "String"])
}

fn profile_properties() -> AccessorRequest {
    AccessorRequest::method("GameProfile", "getProperties", &[])
}

fn property_ctor(signed: bool) -> AccessorRequest {
    if signed {
        AccessorRequest::constructor("Property", &["String", "String", "String"])
    } else {
        AccessorRequest::constructor("Property", &["String", "String"])
    }
}

fn property_put() -> AccessorRequest {
    AccessorRequest::method("PropertyMap", "put", &["String", "Property"])
}

fn meta_ctor() -> AccessorRequest {
    AccessorRequest::constructor("SkullMeta", &[])
}

fn meta_profile() -> AccessorRequest {
    AccessorRequest::field("SkullMeta", "profile")
}

fn item_ctor() -> AccessorRequest {
    AccessorRequest::constructor("ItemStack", &["Material", "int"])
}

fn host_item_copy() -> AccessorRequest {
    AccessorRequest::method("CraftItemStack", "asNMSCopy", &["ItemStack"])
}

fn host_item_meta() -> AccessorRequest {
    AccessorRequest::method("CraftItemStack", "setItemMeta", &["HostItemStack", "ItemMeta"])
}

fn set_slot_ctor() -> AccessorRequest {
    AccessorRequest::constructor("SetSlotPacket", &["int", "int", "ItemStack"])
}

fn send_packet() -> AccessorRequest {
    AccessorRequest::method("PlayerConnection", "sendPacket", &["Packet"])
}

/// Where a finished skull should be shown: a slot in one player's open
/// window, over the connection the caller already holds.
#[derive(Debug, Clone)]
pub struct SkullDelivery {
    pub connection: ObjectRef,
    pub window_id: i64,
    pub slot: i64,
}

impl SkullDelivery {
    /// Slot in the player's own inventory (window 0).
    pub fn inventory(connection: ObjectRef, slot: i64) -> Self {
        Self {
            connection,
            window_id: 0,
            slot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkullRequest {
    pub texture: TextureValue,
    pub profile_id: Option<Uuid>,
    pub profile_name: Option<String>,
    /// Existing item meta to bind onto. A fresh one is constructed if unset.
    pub meta: Option<ObjectRef>,
    pub delivery: Option<SkullDelivery>,
}

impl SkullRequest {
    pub fn new(texture: TextureValue) -> Self {
        Self {
            texture,
            profile_id: None,
            profile_name: None,
            meta: None,
            delivery: None,
        }
    }

    pub fn with_profile_id(mut self, id: Uuid) -> Self {
        self.profile_id = Some(id);
        self
    }

    pub fn with_profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    pub fn onto(mut self, meta: ObjectRef) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn deliver_to(mut self, delivery: SkullDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkullStage {
    Profile,
    Texture,
    Meta,
    Item,
    Packet,
}

impl fmt::Display for SkullStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkullStage::Profile => "profile",
            SkullStage::Texture => "texture",
            SkullStage::Meta => "meta",
            SkullStage::Item => "item",
            SkullStage::Packet => "packet",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkullError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("{stage} step failed: {source}")]
    Invoke {
        stage: SkullStage,
        source: InvokeError,
    },
    #[error("packet delivery failed: {0}")]
    Transport(InvokeError),
}

impl SkullError {
    fn invoke(stage: SkullStage) -> impl FnOnce(InvokeError) -> Self {
        move |source| SkullError::Invoke { stage, source }
    }

    /// True when the host simply lacks the needed internals.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SkullError::Resolution(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkullState {
    Start,
    ProfileConstructed,
    ItemBound,
    Done,
    Sent,
    SendFailed(SkullError),
    Failed(SkullError),
}

impl SkullState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SkullState::Done | SkullState::Sent | SkullState::SendFailed(_) | SkullState::Failed(_)
        )
    }

    fn name(&self) -> &'static str {
        match self {
            SkullState::Start => "start",
            SkullState::ProfileConstructed => "profile-constructed",
            SkullState::ItemBound => "item-bound",
            SkullState::Done => "done",
            SkullState::Sent => "sent",
            SkullState::SendFailed(_) => "send-failed",
            SkullState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SkullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkullState::SendFailed(error) | SkullState::Failed(error) => {
                write!(f, "{} ({error})", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// What one build did: the accessor calls in order and the states passed
/// through. Built per request and never reused.
#[derive(Debug, Clone, Default)]
pub struct SkullPacketPlan {
    steps: Vec<String>,
    states: Vec<SkullState>,
}

impl SkullPacketPlan {
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn states(&self) -> &[SkullState] {
        &self.states
    }

    fn step(&mut self, stage: SkullStage, accessor: &ResolvedAccessor) {
        self.steps.push(format!("{stage}: {accessor}"));
    }

    fn enter(&mut self, state: SkullState) {
        debug!("skull: -> {state}");
        self.states.push(state);
    }

    fn finish(mut self, state: SkullState, built: Option<BuiltSkull>) -> SkullOutcome {
        if matches!(state, SkullState::Failed(_) | SkullState::SendFailed(_)) {
            warn!("skull: {state}");
        }
        if self.states.last() != Some(&state) {
            self.enter(state.clone());
        }
        let (meta, item) = built.map(|b| (b.meta, b.item)).unzip();
        SkullOutcome {
            state,
            meta,
            item,
            plan: self,
        }
    }
}

struct BuiltSkull {
    meta: ObjectRef,
    item: ObjectRef,
}

#[derive(Debug, Clone)]
pub struct SkullOutcome {
    state: SkullState,
    meta: Option<ObjectRef>,
    item: Option<ObjectRef>,
    plan: SkullPacketPlan,
}

impl SkullOutcome {
    pub fn state(&self) -> &SkullState {
        &self.state
    }

    /// The host item stack the meta was bound onto.
    pub fn item(&self) -> Option<&ObjectRef> {
        self.item.as_ref()
    }

    /// The item meta carrying the profile.
    pub fn meta(&self) -> Option<&ObjectRef> {
        self.meta.as_ref()
    }

    pub fn plan(&self) -> &SkullPacketPlan {
        &self.plan
    }

    pub fn is_success(&self) -> bool {
        matches!(self.state, SkullState::Done | SkullState::Sent)
    }

    pub fn error(&self) -> Option<&SkullError> {
        match &self.state {
            SkullState::Failed(error) | SkullState::SendFailed(error) => Some(error),
            _ => None,
        }
    }

    /// A message fit for players. Missing internals read as
    /// [`UNSUPPORTED`] rather than the raw resolution failure.
    pub fn user_message(&self) -> Option<String> {
        self.error().map(|error| {
            if error.is_unsupported() {
                UNSUPPORTED.to_owned()
            } else {
                error.to_string()
            }
        })
    }
}

enum MetaSource {
    Supplied(ObjectRef),
    Construct(Arc<ResolvedAccessor>),
}

struct ItemAccessors {
    profile: Arc<ResolvedAccessor>,
    properties: Arc<ResolvedAccessor>,
    property: Arc<ResolvedAccessor>,
    put: Arc<ResolvedAccessor>,
    meta: MetaSource,
    meta_profile: Arc<ResolvedAccessor>,
    stack: Arc<ResolvedAccessor>,
    host_copy: Arc<ResolvedAccessor>,
    bind_meta: Arc<ResolvedAccessor>,
}

/// Builds textured player heads through resolved accessors, and optionally
/// shows them to a player with a set-slot packet.
pub struct SkullPacketBuilder<'a> {
    resolver: &'a AccessorResolver,
}

impl<'a> SkullPacketBuilder<'a> {
    pub fn new(resolver: &'a AccessorResolver) -> Self {
        Self { resolver }
    }

    /// Every accessor a build may touch, for warming the cache.
    pub fn requests(signed: bool, deliver: bool) -> Vec<AccessorRequest> {
        let mut requests = vec![
            profile_ctor(),
            profile_properties(),
            property_ctor(signed),
            property_put(),
            meta_ctor(),
            meta_profile(),
            item_ctor(),
            host_item_copy(),
            host_item_meta(),
        ];
        if deliver {
            requests.push(set_slot_ctor());
            requests.push(send_packet());
        }
        requests
    }

    pub fn build(&self, request: &SkullRequest) -> SkullOutcome {
        let mut plan = SkullPacketPlan::default();
        plan.enter(SkullState::Start);

        let built = match self.assemble(request, &mut plan) {
            Ok(built) => built,
            Err(error) => return plan.finish(SkullState::Failed(error), None),
        };
        plan.enter(SkullState::Done);

        let Some(delivery) = &request.delivery else {
            return plan.finish(SkullState::Done, Some(built));
        };
        match self.deliver(delivery, &built.item, &mut plan) {
            Ok(()) => plan.finish(SkullState::Sent, Some(built)),
            Err(error) => plan.finish(SkullState::SendFailed(error), Some(built)),
        }
    }

    fn resolve_item_accessors(
        &self,
        request: &SkullRequest,
    ) -> Result<ItemAccessors, ResolutionError> {
        let resolve = |request: AccessorRequest| self.resolver.resolve(&request);
        let meta = match &request.meta {
            Some(meta) => MetaSource::Supplied(Arc::clone(meta)),
            None => MetaSource::Construct(resolve(meta_ctor())?),
        };
        Ok(ItemAccessors {
            profile: resolve(profile_ctor())?,
            properties: resolve(profile_properties())?,
            property: resolve(property_ctor(request.texture.is_signed()))?,
            put: resolve(property_put())?,
            meta,
            meta_profile: resolve(meta_profile())?,
            stack: resolve(item_ctor())?,
            host_copy: resolve(host_item_copy())?,
            bind_meta: resolve(host_item_meta())?,
        })
    }

    fn assemble(
        &self,
        request: &SkullRequest,
        plan: &mut SkullPacketPlan,
    ) -> Result<BuiltSkull, SkullError> {
        let accessors = self.resolve_item_accessors(request)?;

        let id = request.profile_id.unwrap_or_else(Uuid::new_v4);
        let mut name = request
            .profile_name
            .clone()
            .unwrap_or_else(|| id.simple().to_string());
        let end = name
            .char_indices()
            .nth(MAX_PROFILE_NAME)
            .map_or(name.len(), |(index, _)| index);
        name.truncate(end);

        let profile = accessors
            .profile
            .construct(&[Value::from(id.to_string()), Value::from(name)])
            .and_then(|profile| profile.into_object("GameProfile"))
            .map_err(SkullError::invoke(SkullStage::Profile))?;
        plan.step(SkullStage::Profile, &accessors.profile);
        plan.enter(SkullState::ProfileConstructed);

        let properties = accessors
            .properties
            .invoke(Some(&profile), &[])
            .and_then(|map| map.into_object("PropertyMap"))
            .map_err(SkullError::invoke(SkullStage::Texture))?;
        plan.step(SkullStage::Texture, &accessors.properties);

        let key = self
            .resolver
            .keys()
            .logical_to_internal(TEXTURE_PROPERTY)
            .unwrap_or(FALLBACK_TEXTURE_PROPERTY);
        let mut args = vec![Value::from(key), Value::from(request.texture.value())];
        if let Some(signature) = request.texture.signature() {
            args.push(Value::from(signature));
        }
        let property = accessors
            .property
            .construct(&args)
            .map_err(SkullError::invoke(SkullStage::Texture))?;
        plan.step(SkullStage::Texture, &accessors.property);

        accessors
            .put
            .invoke(Some(&properties), &[Value::from(key), property])
            .map_err(SkullError::invoke(SkullStage::Texture))?;
        plan.step(SkullStage::Texture, &accessors.put);

        let meta = match accessors.meta {
            MetaSource::Supplied(meta) => meta,
            MetaSource::Construct(ctor) => {
                let meta = ctor
                    .construct(&[])
                    .and_then(|meta| meta.into_object("SkullMeta"))
                    .map_err(SkullError::invoke(SkullStage::Meta))?;
                plan.step(SkullStage::Meta, &ctor);
                meta
            }
        };
        accessors
            .meta_profile
            .set(&meta, Value::from(profile))
            .map_err(SkullError::invoke(SkullStage::Meta))?;
        plan.step(SkullStage::Meta, &accessors.meta_profile);

        let material = if VersionGate::new(self.resolver.version().clone()).is_modern() {
            PLAYER_HEAD
        } else {
            LEGACY_PLAYER_HEAD
        };
        let stack = accessors
            .stack
            .construct(&[Value::from(material), Value::Int(1)])
            .map_err(SkullError::invoke(SkullStage::Item))?;
        plan.step(SkullStage::Item, &accessors.stack);

        let item = accessors
            .host_copy
            .invoke(None, &[stack])
            .and_then(|item| item.into_object("ItemStack"))
            .map_err(SkullError::invoke(SkullStage::Item))?;
        plan.step(SkullStage::Item, &accessors.host_copy);

        accessors
            .bind_meta
            .invoke(None, &[Value::from(Arc::clone(&item)), Value::from(Arc::clone(&meta))])
            .map_err(SkullError::invoke(SkullStage::Item))?;
        plan.step(SkullStage::Item, &accessors.bind_meta);
        plan.enter(SkullState::ItemBound);

        Ok(BuiltSkull { meta, item })
    }

    fn deliver(
        &self,
        delivery: &SkullDelivery,
        item: &ObjectRef,
        plan: &mut SkullPacketPlan,
    ) -> Result<(), SkullError> {
        let packet_ctor = self.resolver.resolve(&set_slot_ctor())?;
        let send = self.resolver.resolve(&send_packet())?;

        let packet = packet_ctor
            .construct(&[
                Value::Int(delivery.window_id),
                Value::Int(delivery.slot),
                Value::from(Arc::clone(item)),
            ])
            .map_err(SkullError::invoke(SkullStage::Packet))?;
        plan.step(SkullStage::Packet, &packet_ctor);

        send.invoke(Some(&delivery.connection), &[packet])
            .map_err(SkullError::Transport)?;
        plan.step(SkullStage::Packet, &send);
        Ok(())
    }
}
