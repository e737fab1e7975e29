//! Textured player heads built through resolved accessors.

mod builder;
mod custom;
mod texture;

pub use builder::{
    SkullDelivery, SkullError, SkullOutcome, SkullPacketBuilder, SkullPacketPlan, SkullRequest,
    SkullStage, SkullState, UNSUPPORTED,
};
pub use custom::{CustomSkull, CustomSkulls};
pub use texture::TextureValue;
