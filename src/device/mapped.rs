// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::device::context::{DeviceError, MapMode, NativeContext};
use crate::device::handles::BufferHandle;

/**
A buffer mapped for CPU writes.

The buffer is unmapped when the guard is dropped, so a write can never leave a
buffer mapped across a draw call.
*/
#[derive(Debug)]
pub struct MappedBuffer<'a, C: NativeContext + ?Sized> {
    context: &'a mut C,
    buffer: BufferHandle,
}

impl<'a, C: NativeContext + ?Sized> MappedBuffer<'a, C> {
    pub fn map(context: &'a mut C, buffer: BufferHandle, mode: MapMode) -> Result<Self, DeviceError> {
        context.map_for_write(buffer, mode)?;
        Ok(MappedBuffer { context, buffer })
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.context.mapped_bytes(self.buffer)
    }
}

impl<C: NativeContext + ?Sized> Drop for MappedBuffer<'_, C> {
    fn drop(&mut self) {
        self.context.unmap(self.buffer);
    }
}
