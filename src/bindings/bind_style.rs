// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Defines the way a shader declares the resources it reads.
//!
//! This module describes, for a single shader, which named parameters it binds
//! and at which native slot.  A [`BindStyle`] is usually filled from shader
//! reflection, in slot order, and handed to an effect pass together with the
//! shader bytecode.
//!
//! # Key Concepts
//!
//! - **Bind Slots**: Native bind-point indices.  Each [`ResourceKind`] has its own
//!   slot space per stage.
//! - **Shader Stages**: A pass has at most one shader per [`Stage`].
//! - **Parameters**: Bindings are named.  Bindings with the same name in different
//!   shaders of one effect refer to the same parameter.
//!
//! # Example
//!
//! ```
//! use passes_and_sprites::bindings::bind_style::{BindSlot, BindStyle};
//!
//! let mut bind_style = BindStyle::new();
//! bind_style.bind_constant_buffer("MatrixTransform", BindSlot::new(0), 64);
//! bind_style.bind_shader_resource("Texture", BindSlot::new(0));
//! bind_style.bind_sampler("TextureSampler", BindSlot::new(0));
//! assert_eq!(bind_style.len(), 3);
//! ```

use crate::bindings::resource_kind::ResourceKind;

/// A pipeline stage that can have a shader and bound resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
    Compute,
}

impl Stage {
    pub const COUNT: usize = 6;

    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Vertex,
        Stage::Hull,
        Stage::Domain,
        Stage::Geometry,
        Stage::Pixel,
        Stage::Compute,
    ];

    pub const fn index(self) -> usize {
        match self {
            Stage::Vertex => 0,
            Stage::Hull => 1,
            Stage::Domain => 2,
            Stage::Geometry => 3,
            Stage::Pixel => 4,
            Stage::Compute => 5,
        }
    }
}

/// A native bind-point index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindSlot {
    pub(crate) slot: u32,
}

impl BindSlot {
    pub const fn new(slot: u32) -> Self {
        BindSlot { slot }
    }

    pub const fn index(self) -> u32 {
        self.slot
    }
}

/// One named binding declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBinding {
    pub(crate) name: String,
    pub(crate) kind: ResourceKind,
    pub(crate) slot: BindSlot,
    /// Number of consecutive slots (array length).
    pub(crate) count: u32,
    /// Size of the buffer for constant buffers, 0 otherwise.
    pub(crate) size_in_bytes: u32,
}

impl ShaderBinding {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
    pub fn slot(&self) -> BindSlot {
        self.slot
    }
    pub fn count(&self) -> u32 {
        self.count
    }
    pub fn size_in_bytes(&self) -> u32 {
        self.size_in_bytes
    }
}

/// Describes the resource bindings of one shader.
///
/// Bindings keep the order they were declared in.  Within each [`ResourceKind`]
/// they must be declared in ascending slot order; effect pass initialization
/// rejects a `BindStyle` that breaks this.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindStyle {
    pub(crate) binds: Vec<ShaderBinding>,
}

impl BindStyle {
    /// Creates a new, empty `BindStyle`.
    pub fn new() -> Self {
        BindStyle { binds: Vec::new() }
    }

    /// Internal method to declare a binding.
    ///
    /// # Panics
    ///
    /// Panics if a resource of the same kind is already declared at `slot`.
    fn bind(&mut self, name: &str, kind: ResourceKind, slot: BindSlot, count: u32, size_in_bytes: u32) {
        let taken = self
            .binds
            .iter()
            .any(|b| b.kind == kind && b.slot == slot);
        assert!(!taken, "Already bound {:?} to slot {:?}", kind, slot);
        self.binds.push(ShaderBinding {
            name: name.to_string(),
            kind,
            slot,
            count,
            size_in_bytes,
        });
    }

    /// Declares a constant buffer of `size_in_bytes` bytes.
    pub fn bind_constant_buffer(&mut self, name: &str, slot: BindSlot, size_in_bytes: u32) {
        self.bind(name, ResourceKind::ConstantBuffer, slot, 1, size_in_bytes);
    }

    /// Declares a single shader resource view, such as a texture.
    pub fn bind_shader_resource(&mut self, name: &str, slot: BindSlot) {
        self.bind_shader_resource_array(name, slot, 1);
    }

    /// Declares an array of `count` shader resource views starting at `slot`.
    pub fn bind_shader_resource_array(&mut self, name: &str, slot: BindSlot, count: u32) {
        self.bind(name, ResourceKind::ShaderResourceView, slot, count, 0);
    }

    pub fn bind_unordered_access(&mut self, name: &str, slot: BindSlot) {
        self.bind(name, ResourceKind::UnorderedAccessView, slot, 1, 0);
    }

    pub fn bind_sampler(&mut self, name: &str, slot: BindSlot) {
        self.bind(name, ResourceKind::SamplerState, slot, 1, 0);
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderBinding> {
        self.binds.iter()
    }
}
