// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
2D sprite rendering on top of effects.

[`SpriteBatch`] is the entry point.  The remaining modules hold the value types
it takes, and the vertex and index formats it writes.
*/

pub mod geometry;
pub mod index_algorithms;
pub mod sort_mode;
pub mod sprite_batch;
pub mod sprite_info;
pub mod vertex_layout;
mod vertex_ring;

pub use geometry::{Color, Matrix, Rectangle, RectangleF, SpriteEffects, Vector2};
pub use sort_mode::SpriteSortMode;
pub use sprite_batch::{DrawOptions, SpriteBatch, SpriteBatchConfig, SpriteBatchSettings};
pub use sprite_info::{SpriteInfo, TextureInfo};
pub use vertex_layout::VertexPositionColorTexture;

use crate::bindings::BindingError;
use crate::device::DeviceError;
use crate::effects::EffectError;

#[derive(Debug, thiserror::Error)]
pub enum SpriteBatchError {
    #[error("draw called before begin")]
    DrawWithoutBegin,
    #[error("end called before begin")]
    EndWithoutBegin,
    #[error("begin called twice without end")]
    BeginCalledTwice,
    #[error("another sprite batch on this device is already in immediate mode")]
    ImmediateModeInUse,
    #[error("the effect has no shader resource parameter named {0}")]
    MissingTextureParameter(String),
    #[error("invalid sprite batch configuration: {0}")]
    InvalidConfig(String),
    #[error("max_batch_size {requested} exceeds the device's vertex ring of {capacity} sprites")]
    SharedCapacityMismatch { requested: u32, capacity: u32 },
    #[error("vertex buffer holds {available} bytes, {needed} needed")]
    VertexBufferOverflow { needed: usize, available: usize },
    #[error("the sprite batch was created on another device")]
    ForeignDevice,
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
