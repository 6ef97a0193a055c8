// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The primitives this crate needs from a native device context.
//!
//! Everything above this trait is backend independent.  A backend implements
//! [`NativeContext`] once and gets effect passes and sprite batching on top of it.

use crate::bindings::bind_style::Stage;
use crate::bindings::resource_kind::ResourceKind;
use crate::device::handles::{BufferHandle, NativeHandle, ShaderHandle, StateHandle};
use crate::effects::shader::ShaderDescription;

/// Initial counter value meaning "keep whatever counter the view already has".
pub const UAV_COUNTER_UNCHANGED: i32 = -1;

/// Capability tier of a device.  Ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureLevel {
    Level9_1,
    Level9_2,
    Level9_3,
    Level10_0,
    Level10_1,
    Level11_0,
    Level11_1,
}

/// How a mapped buffer region may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    /// The previous contents are abandoned.  Safe to write anywhere immediately.
    Discard,
    /// The caller promises not to touch any region the GPU may still be reading.
    NoOverwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Constant,
    /// CPU-writable vertex buffer, written through [`MapMode`].
    DynamicVertex,
    /// Immutable index buffer.
    Index,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDescription<'a> {
    pub kind: BufferKind,
    pub size_in_bytes: usize,
    pub initial_data: Option<&'a [u8]>,
    pub debug_name: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("shader {name} could not be created: {reason}")]
    ShaderCreation { name: String, reason: String },
    #[error("buffer {0:?} is not known to the context")]
    UnknownBuffer(BufferHandle),
    #[error("buffer {0:?} is already mapped")]
    AlreadyMapped(BufferHandle),
    #[error("view {0:?} does not refer to a texture")]
    NotATexture(NativeHandle),
    #[error("the device is out of memory")]
    OutOfMemory,
}

/**
A native device context.

All calls happen on the thread that owns the context and complete before they
return.  Resource arrays are passed as slices of `Option<NativeHandle>`; `None`
unbinds a slot.
*/
pub trait NativeContext {
    fn feature_level(&self) -> FeatureLevel;

    /// True for command-list recording contexts.
    fn is_deferred(&self) -> bool;

    /// Width and height of the current viewport in pixels.
    fn viewport(&self) -> (f32, f32);

    fn create_shader(&mut self, description: &ShaderDescription) -> Result<ShaderHandle, DeviceError>;

    fn create_buffer(&mut self, description: BufferDescription<'_>) -> Result<BufferHandle, DeviceError>;

    /// Queries the dimensions of the resource behind a texture view.
    fn texture_size(&self, view: NativeHandle) -> Result<(u32, u32), DeviceError>;

    fn bind_shader(&mut self, stage: Stage, shader: Option<ShaderHandle>);

    /// Binds `resources` to `start_slot..start_slot + resources.len()`.
    ///
    /// Used for every kind except [`ResourceKind::UnorderedAccessView`].
    fn bind_resources(
        &mut self,
        stage: Stage,
        kind: ResourceKind,
        start_slot: u32,
        resources: &[Option<NativeHandle>],
    );

    /// `initial_counters` is parallel to `views`; see [`UAV_COUNTER_UNCHANGED`].
    fn bind_unordered_access(
        &mut self,
        stage: Stage,
        start_slot: u32,
        views: &[Option<NativeHandle>],
        initial_counters: &[i32],
    );

    /// Replaces the whole contents of a constant buffer.
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]);

    fn map_for_write(&mut self, buffer: BufferHandle, mode: MapMode) -> Result<(), DeviceError>;

    /// The CPU view of a buffer between [`map_for_write`](Self::map_for_write) and [`unmap`](Self::unmap).
    fn mapped_bytes(&mut self, buffer: BufferHandle) -> &mut [u8];

    fn unmap(&mut self, buffer: BufferHandle);

    fn set_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32);

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat);

    fn set_blend_state(&mut self, state: Option<StateHandle>);

    fn set_depth_stencil_state(&mut self, state: Option<StateHandle>);

    fn set_rasterizer_state(&mut self, state: Option<StateHandle>);

    /// Draws an indexed triangle list from the bound vertex and index buffers.
    fn draw_indexed(&mut self, index_count: u32, start_index: u32);
}
