// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A [`NativeContext`] that records instead of rendering.

[`RecordingContext`] keeps every call it receives as a [`Command`], and keeps
the contents of the buffers it creates, so the exact bind and draw traffic of
effects and sprite batches can be inspected.  It is used by this crate's tests,
and works for capturing the traffic of a frame for debugging.

```
use passes_and_sprites::bindings::{ResourceKind, Stage};
use passes_and_sprites::device::NativeContext;
use passes_and_sprites::recording::{Command, RecordingContext};

let mut context = RecordingContext::new();
let texture = context.create_texture(32, 32);
context.bind_resources(Stage::Pixel, ResourceKind::ShaderResourceView, 0, &[Some(texture)]);
context.draw_indexed(6, 0);

assert_eq!(context.bound(Stage::Pixel, ResourceKind::ShaderResourceView, 0), Some(texture));
let draws = context.draw_calls();
assert_eq!(draws[0].texture, Some(texture));
assert!(matches!(context.commands().last(), Some(Command::DrawIndexed { index_count: 6, .. })));
```
*/

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;

use crate::bindings::bind_style::Stage;
use crate::bindings::resource_kind::ResourceKind;
use crate::device::{
    BufferDescription, BufferHandle, BufferKind, DeviceError, FeatureLevel, IndexFormat, MapMode,
    NativeContext, NativeHandle, ShaderHandle, StateHandle,
};
use crate::effects::shader::ShaderDescription;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateShader {
        name: String,
        stage: Stage,
        shader: ShaderHandle,
    },
    CreateBuffer {
        kind: BufferKind,
        size_in_bytes: usize,
        buffer: BufferHandle,
    },
    BindShader {
        stage: Stage,
        shader: Option<ShaderHandle>,
    },
    BindResources {
        stage: Stage,
        kind: ResourceKind,
        start_slot: u32,
        resources: Vec<Option<NativeHandle>>,
    },
    BindUnorderedAccess {
        stage: Stage,
        start_slot: u32,
        views: Vec<Option<NativeHandle>>,
        initial_counters: Vec<i32>,
    },
    UpdateBuffer {
        buffer: BufferHandle,
        len: usize,
    },
    Map {
        buffer: BufferHandle,
        mode: MapMode,
    },
    Unmap {
        buffer: BufferHandle,
    },
    SetVertexBuffer {
        buffer: BufferHandle,
        stride: u32,
    },
    SetIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
    },
    SetBlendState(Option<StateHandle>),
    SetDepthStencilState(Option<StateHandle>),
    SetRasterizerState(Option<StateHandle>),
    DrawIndexed {
        index_count: u32,
        start_index: u32,
    },
}

/// A draw, with the state it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub index_count: u32,
    pub start_index: u32,
    /// Mode of the most recent map before the draw.
    pub map_mode: Option<MapMode>,
    /// Shader resource bound to pixel slot 0 at the time of the draw.
    pub texture: Option<NativeHandle>,
}

#[derive(Debug)]
struct RecordedBuffer {
    kind: BufferKind,
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Debug)]
pub struct RecordingContext {
    feature_level: FeatureLevel,
    deferred: bool,
    viewport: (f32, f32),
    allocated: u64,
    buffers: HashMap<BufferHandle, RecordedBuffer>,
    textures: HashMap<NativeHandle, (u32, u32)>,
    rejected_shaders: HashSet<String>,
    failing_maps: bool,
    commands: Vec<Command>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        RecordingContext::new()
    }
}

impl RecordingContext {
    /// An immediate context at feature level 11.0 with an 800x600 viewport.
    pub fn new() -> Self {
        RecordingContext {
            feature_level: FeatureLevel::Level11_0,
            deferred: false,
            viewport: (800.0, 600.0),
            allocated: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            rejected_shaders: HashSet::new(),
            failing_maps: false,
            commands: Vec::new(),
        }
    }

    pub fn with_feature_level(mut self, level: FeatureLevel) -> Self {
        self.feature_level = level;
        self
    }

    /// Behaves as a command-list recording context.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = (width, height);
        self
    }

    /// Makes `create_shader` fail for the shader named `name`.
    pub fn reject_shader(mut self, name: &str) -> Self {
        self.rejected_shaders.insert(name.to_string());
        self
    }

    /// While set, every `map_for_write` fails as if the device ran out of memory.
    pub fn set_failing_maps(&mut self, failing: bool) {
        self.failing_maps = failing;
    }

    fn allocate(&mut self) -> NonZeroU64 {
        let raw = NonZeroU64::MIN.saturating_add(self.allocated);
        self.allocated += 1;
        raw
    }

    /// A texture view of the given size.
    pub fn create_texture(&mut self, width: u32, height: u32) -> NativeHandle {
        let view = NativeHandle::new(self.allocate());
        self.textures.insert(view, (width, height));
        view
    }

    /// A view that is not a texture, such as a sampler or an unordered access view.
    pub fn create_view(&mut self) -> NativeHandle {
        NativeHandle::new(self.allocate())
    }

    pub fn create_state(&mut self) -> StateHandle {
        StateHandle::new(self.allocate())
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_kind(&self, buffer: BufferHandle) -> Option<BufferKind> {
        self.buffers.get(&buffer).map(|b| b.kind)
    }

    /// How many times `buffer` was uploaded with `update_buffer`.
    pub fn uploads(&self, buffer: BufferHandle) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::UpdateBuffer { buffer: b, .. } if *b == buffer))
            .count()
    }

    /// What is currently bound at `slot`, replaying every bind so far.
    pub fn bound(&self, stage: Stage, kind: ResourceKind, slot: u32) -> Option<NativeHandle> {
        let mut current = None;
        for command in &self.commands {
            let (start_slot, resources) = match command {
                Command::BindResources {
                    stage: s,
                    kind: k,
                    start_slot,
                    resources,
                } if *s == stage && *k == kind => (*start_slot, resources),
                Command::BindUnorderedAccess {
                    stage: s,
                    start_slot,
                    views,
                    ..
                } if *s == stage && kind == ResourceKind::UnorderedAccessView => (*start_slot, views),
                _ => continue,
            };
            if let Some(offset) = slot.checked_sub(start_slot)
                && let Some(resource) = resources.get(offset as usize)
            {
                current = *resource;
            }
        }
        current
    }

    /// The shader currently bound to `stage`.
    pub fn bound_shader(&self, stage: Stage) -> Option<ShaderHandle> {
        self.commands
            .iter()
            .rev()
            .find_map(|c| match c {
                Command::BindShader { stage: s, shader } if *s == stage => Some(*shader),
                _ => None,
            })
            .flatten()
    }

    /// Every draw so far, with the texture and map mode it used.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        let mut texture = None;
        let mut map_mode = None;
        let mut draws = Vec::new();
        for command in &self.commands {
            match command {
                Command::BindResources {
                    stage: Stage::Pixel,
                    kind: ResourceKind::ShaderResourceView,
                    start_slot: 0,
                    resources,
                } => texture = resources.first().copied().flatten(),
                Command::Map { mode, .. } => map_mode = Some(*mode),
                Command::DrawIndexed {
                    index_count,
                    start_index,
                } => draws.push(DrawCall {
                    index_count: *index_count,
                    start_index: *start_index,
                    map_mode,
                    texture,
                }),
                _ => {}
            }
        }
        draws
    }
}

impl NativeContext for RecordingContext {
    fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    fn is_deferred(&self) -> bool {
        self.deferred
    }

    fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    fn create_shader(&mut self, description: &ShaderDescription) -> Result<ShaderHandle, DeviceError> {
        if self.rejected_shaders.contains(description.name()) {
            return Err(DeviceError::ShaderCreation {
                name: description.name().to_string(),
                reason: "rejected by the recording context".to_string(),
            });
        }
        let shader = ShaderHandle::new(self.allocate());
        self.commands.push(Command::CreateShader {
            name: description.name().to_string(),
            stage: description.stage(),
            shader,
        });
        Ok(shader)
    }

    fn create_buffer(&mut self, description: BufferDescription<'_>) -> Result<BufferHandle, DeviceError> {
        let buffer = BufferHandle::new(self.allocate());
        let mut data = vec![0; description.size_in_bytes];
        if let Some(initial) = description.initial_data {
            let len = initial.len().min(data.len());
            data[..len].copy_from_slice(&initial[..len]);
        }
        self.buffers.insert(
            buffer,
            RecordedBuffer {
                kind: description.kind,
                data,
                mapped: false,
            },
        );
        self.commands.push(Command::CreateBuffer {
            kind: description.kind,
            size_in_bytes: description.size_in_bytes,
            buffer,
        });
        Ok(buffer)
    }

    fn texture_size(&self, view: NativeHandle) -> Result<(u32, u32), DeviceError> {
        self.textures
            .get(&view)
            .copied()
            .ok_or(DeviceError::NotATexture(view))
    }

    fn bind_shader(&mut self, stage: Stage, shader: Option<ShaderHandle>) {
        self.commands.push(Command::BindShader { stage, shader });
    }

    fn bind_resources(
        &mut self,
        stage: Stage,
        kind: ResourceKind,
        start_slot: u32,
        resources: &[Option<NativeHandle>],
    ) {
        self.commands.push(Command::BindResources {
            stage,
            kind,
            start_slot,
            resources: resources.to_vec(),
        });
    }

    fn bind_unordered_access(
        &mut self,
        stage: Stage,
        start_slot: u32,
        views: &[Option<NativeHandle>],
        initial_counters: &[i32],
    ) {
        self.commands.push(Command::BindUnorderedAccess {
            stage,
            start_slot,
            views: views.to_vec(),
            initial_counters: initial_counters.to_vec(),
        });
    }

    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
        if let Some(recorded) = self.buffers.get_mut(&buffer) {
            let len = data.len().min(recorded.data.len());
            recorded.data[..len].copy_from_slice(&data[..len]);
        }
        self.commands.push(Command::UpdateBuffer {
            buffer,
            len: data.len(),
        });
    }

    fn map_for_write(&mut self, buffer: BufferHandle, mode: MapMode) -> Result<(), DeviceError> {
        if self.failing_maps {
            return Err(DeviceError::OutOfMemory);
        }
        let recorded = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;
        if recorded.mapped {
            return Err(DeviceError::AlreadyMapped(buffer));
        }
        recorded.mapped = true;
        self.commands.push(Command::Map { buffer, mode });
        Ok(())
    }

    fn mapped_bytes(&mut self, buffer: BufferHandle) -> &mut [u8] {
        self.buffers
            .get_mut(&buffer)
            .filter(|b| b.mapped)
            .map(|b| b.data.as_mut_slice())
            .unwrap_or_default()
    }

    fn unmap(&mut self, buffer: BufferHandle) {
        if let Some(recorded) = self.buffers.get_mut(&buffer) {
            recorded.mapped = false;
        }
        self.commands.push(Command::Unmap { buffer });
    }

    fn set_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32) {
        self.commands.push(Command::SetVertexBuffer { buffer, stride });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat) {
        self.commands.push(Command::SetIndexBuffer { buffer, format });
    }

    fn set_blend_state(&mut self, state: Option<StateHandle>) {
        self.commands.push(Command::SetBlendState(state));
    }

    fn set_depth_stencil_state(&mut self, state: Option<StateHandle>) {
        self.commands.push(Command::SetDepthStencilState(state));
    }

    fn set_rasterizer_state(&mut self, state: Option<StateHandle>) {
        self.commands.push(Command::SetRasterizerState(state));
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32) {
        self.commands.push(Command::DrawIndexed {
            index_count,
            start_index,
        });
    }
}
