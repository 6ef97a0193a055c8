// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
CPU-side constant buffers with dirty tracking.

Writes only touch the CPU copy and mark the buffer dirty.  The GPU copy is
refreshed the next time a pass that reads the buffer is applied, and only if
something changed since the last upload.
*/

use crate::device::{BufferHandle, NativeContext};
use crate::effects::EffectError;

#[derive(Debug, Clone)]
pub struct ConstantBuffer {
    name: String,
    data: Vec<u8>,
    buffer: BufferHandle,
    dirty: bool,
}

impl ConstantBuffer {
    pub(crate) fn new(name: &str, buffer: BufferHandle, size_in_bytes: usize) -> Self {
        ConstantBuffer {
            name: name.to_string(),
            data: vec![0; size_in_bytes],
            buffer,
            //the GPU copy starts out undefined
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn handle(&self) -> BufferHandle {
        self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes `bytes` at `offset`.  The write must fit inside the buffer.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), EffectError> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| EffectError::ConstantBufferOverflow {
                name: self.name.clone(),
                size: self.data.len(),
                offset,
                len: bytes.len(),
            })?;
        self.data[offset..end].copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }

    pub fn set<T: bytemuck::Pod>(&mut self, offset: usize, value: &T) -> Result<(), EffectError> {
        self.set_bytes(offset, bytemuck::bytes_of(value))
    }

    /// Uploads the CPU copy if it changed.  Returns whether an upload happened.
    pub(crate) fn upload_if_dirty<C: NativeContext + ?Sized>(&mut self, context: &mut C) -> bool {
        if !self.dirty {
            return false;
        }
        context.update_buffer(self.buffer, &self.data);
        self.dirty = false;
        true
    }
}
