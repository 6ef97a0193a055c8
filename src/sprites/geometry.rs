// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Small value types used to describe sprites.

use std::ops::BitOr;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };
    pub const ONE: Vector2 = Vector2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }
}

/// An integer rectangle, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rectangle { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectangleF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectangleF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        RectangleF { x, y, width, height }
    }
}

impl From<Rectangle> for RectangleF {
    fn from(r: Rectangle) -> Self {
        RectangleF::new(r.x as f32, r.y as f32, r.width as f32, r.height as f32)
    }
}

/// An 8-bit RGBA color, laid out the way the vertex shader reads it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }
}

/**
Flip flags for a sprite.

The bit values matter: the vertex fill XORs them into the corner index to pick
texture coordinates, so bit 0 flips horizontally and bit 1 vertically.
*/
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpriteEffects(u8);

impl SpriteEffects {
    pub const NONE: SpriteEffects = SpriteEffects(0);
    pub const FLIP_HORIZONTALLY: SpriteEffects = SpriteEffects(1);
    pub const FLIP_VERTICALLY: SpriteEffects = SpriteEffects(2);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: SpriteEffects) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SpriteEffects {
    type Output = SpriteEffects;
    fn bitor(self, rhs: SpriteEffects) -> SpriteEffects {
        SpriteEffects(self.0 | rhs.0)
    }
}

/// A row-major 4x4 matrix transforming row vectors (`v * M`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Matrix {
    pub rows: [[f32; 4]; 4],
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Maps pixel coordinates with a top-left origin and y down onto clip space.
    pub fn viewport_projection(width: f32, height: f32) -> Matrix {
        let x_scale = if width > 0.0 { 2.0 / width } else { 0.0 };
        let y_scale = if height > 0.0 { 2.0 / height } else { 0.0 };
        Matrix {
            rows: [
                [x_scale, 0.0, 0.0, 0.0],
                [0.0, -y_scale, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0, 1.0],
            ],
        }
    }

    pub fn multiply(&self, rhs: &Matrix) -> Matrix {
        let mut rows = [[0.0f32; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Matrix { rows }
    }

    /// Transforms the point `(x, y, z, 1)`.
    pub fn transform_point(&self, x: f32, y: f32, z: f32) -> [f32; 4] {
        let v = [x, y, z, 1.0];
        let mut out = [0.0f32; 4];
        for (j, cell) in out.iter_mut().enumerate() {
            *cell = (0..4).map(|k| v[k] * self.rows[k][j]).sum();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_maps_viewport_corners() {
        let projection = Matrix::viewport_projection(64.0, 32.0);
        assert_eq!(projection.transform_point(0.0, 0.0, 0.0), [-1.0, 1.0, 0.0, 1.0]);
        assert_eq!(projection.transform_point(64.0, 32.0, 0.0), [1.0, -1.0, 0.0, 1.0]);
        assert_eq!(projection.transform_point(32.0, 16.0, 0.5), [0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn identity_is_neutral() {
        let projection = Matrix::viewport_projection(64.0, 32.0);
        assert_eq!(Matrix::IDENTITY.multiply(&projection), projection);
        assert_eq!(projection.multiply(&Matrix::IDENTITY), projection);
    }

    #[test]
    fn flips_combine() {
        let both = SpriteEffects::FLIP_HORIZONTALLY | SpriteEffects::FLIP_VERTICALLY;
        assert_eq!(both.bits(), 3);
        assert!(both.contains(SpriteEffects::FLIP_VERTICALLY));
        assert!(!SpriteEffects::NONE.contains(SpriteEffects::FLIP_HORIZONTALLY));
    }
}
