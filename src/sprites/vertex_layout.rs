// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vertex buffer layout descriptions.
//!
//! The GPU needs to know how to interpret the raw bytes of a vertex buffer.  A
//! [`VertexLayout`] lists the attributes of one vertex, in memory order, and
//! derives the stride the vertex buffer is bound with.
//!
//! # Example
//!
//! ```
//! use passes_and_sprites::sprites::vertex_layout::{VertexLayout, VertexFieldType};
//!
//! let mut layout = VertexLayout::new();
//! layout.add_field("SV_Position", VertexFieldType::F32x3);
//! layout.add_field("COLOR", VertexFieldType::Unorm8x4);
//! assert_eq!(layout.stride(), 16);
//! ```

/// Describes the layout of one vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub(crate) fields: Vec<VertexField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexField {
    pub name: &'static str,
    pub r#type: VertexFieldType,
    /// Byte offset from the start of the vertex.
    pub offset: usize,
}

/// The data type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VertexFieldType {
    F32,
    F32x2,
    F32x3,
    F32x4,
    /// Four bytes, normalized to `0.0..=1.0` by the input assembler.
    Unorm8x4,
}

impl VertexFieldType {
    pub const fn stride(self) -> usize {
        match self {
            VertexFieldType::F32 => 4,
            VertexFieldType::F32x2 => 8,
            VertexFieldType::F32x3 => 12,
            VertexFieldType::F32x4 => 16,
            VertexFieldType::Unorm8x4 => 4,
        }
    }
}

impl VertexLayout {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends an attribute.  Fields are laid out in the order they are added, without padding.
    pub fn add_field(&mut self, name: &'static str, r#type: VertexFieldType) {
        let offset = self.stride();
        self.fields.push(VertexField { name, r#type, offset });
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> usize {
        self.fields.last().map_or(0, |f| f.offset + f.r#type.stride())
    }

    pub fn fields(&self) -> &[VertexField] {
        &self.fields
    }
}

/// The vertex the sprite batch writes: position, color, texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexPositionColorTexture {
    pub position: [f32; 3],
    pub color: [u8; 4],
    pub texture_coordinate: [f32; 2],
}

impl VertexPositionColorTexture {
    pub const SIZE: usize = std::mem::size_of::<VertexPositionColorTexture>();

    pub fn layout() -> VertexLayout {
        let mut layout = VertexLayout::new();
        layout.add_field("SV_Position", VertexFieldType::F32x3);
        layout.add_field("COLOR", VertexFieldType::Unorm8x4);
        layout.add_field("TEXCOORD", VertexFieldType::F32x2);
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_struct() {
        let layout = VertexPositionColorTexture::layout();
        assert_eq!(layout.stride(), VertexPositionColorTexture::SIZE);
        assert_eq!(layout.stride(), 24);
        assert_eq!(layout.fields()[1].offset, std::mem::offset_of!(VertexPositionColorTexture, color));
        assert_eq!(
            layout.fields()[2].offset,
            std::mem::offset_of!(VertexPositionColorTexture, texture_coordinate)
        );
    }

    #[test]
    fn empty_layout_has_no_stride() {
        assert_eq!(VertexLayout::new().stride(), 0);
    }
}
