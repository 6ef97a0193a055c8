// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Queued sprites, and their expansion into vertices.

use crate::device::NativeHandle;
use crate::sprites::geometry::{Color, RectangleF, SpriteEffects, Vector2};
use crate::sprites::index_algorithms::VERTICES_PER_SPRITE;
use crate::sprites::vertex_layout::VertexPositionColorTexture;

/// A texture view with its dimensions, resolved once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureInfo {
    pub view: NativeHandle,
    pub width: u32,
    pub height: u32,
}

/// Everything needed to draw one queued sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteInfo {
    /// Texel rectangle read from the texture.
    pub source: RectangleF,
    /// Screen rectangle, in pixels, before rotation.
    pub destination: RectangleF,
    /// Rotation pivot, in source texels.
    pub origin: Vector2,
    /// Clockwise, in radians.
    pub rotation: f32,
    pub depth: f32,
    pub effects: SpriteEffects,
    pub color: Color,
    pub texture: TextureInfo,
}

pub type SpriteQuad = [VertexPositionColorTexture; VERTICES_PER_SPRITE];

/// Corner order of a quad: top-left, top-right, bottom-left, bottom-right.
const CORNER_OFFSETS: [Vector2; VERTICES_PER_SPRITE] = [
    Vector2::new(0.0, 0.0),
    Vector2::new(1.0, 0.0),
    Vector2::new(0.0, 1.0),
    Vector2::new(1.0, 1.0),
];

/// Divisor that keeps a zero-sized source from producing an infinite origin.
fn nonzero(extent: f32) -> f32 {
    if extent == 0.0 { f32::EPSILON } else { extent }
}

impl SpriteInfo {
    /**
    Expands the sprite into its 4 corner vertices.

    The origin is normalized by the source size, so it stays put when the
    destination scales the sprite.  Texture coordinates pick the corner
    `i ^ effects`, which mirrors the quad along whichever axes are flipped.
    */
    pub fn quad(&self) -> SpriteQuad {
        let source = self.source;
        let destination = self.destination;
        let origin = Vector2::new(
            self.origin.x / nonzero(source.width),
            self.origin.y / nonzero(source.height),
        );
        let (sin, cos) = if self.rotation == 0.0 {
            (0.0, 1.0)
        } else {
            self.rotation.sin_cos()
        };
        let delta_x = 1.0 / self.texture.width.max(1) as f32;
        let delta_y = 1.0 / self.texture.height.max(1) as f32;
        let flip = (self.effects.bits() & 3) as usize;
        let color = [self.color.r, self.color.g, self.color.b, self.color.a];

        std::array::from_fn(|corner| {
            let offset = CORNER_OFFSETS[corner];
            let x = (offset.x - origin.x) * destination.width;
            let y = (offset.y - origin.y) * destination.height;
            let texture_corner = CORNER_OFFSETS[corner ^ flip];
            VertexPositionColorTexture {
                position: [
                    destination.x + x * cos - y * sin,
                    destination.y + x * sin + y * cos,
                    self.depth,
                ],
                color,
                texture_coordinate: [
                    (source.x + texture_corner.x * source.width) * delta_x,
                    (source.y + texture_corner.y * source.height) * delta_y,
                ],
            }
        })
    }
}
