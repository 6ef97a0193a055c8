// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The dynamic vertex buffer sprite batches write into, shared per device.

Batches append behind a write cursor using [`MapMode::NoOverwrite`], so the GPU
can keep reading earlier batches while later ones are written.  When a batch no
longer fits and the space left is too small to be worth using, the cursor wraps
to 0 and the buffer is mapped with [`MapMode::Discard`] instead.

```text
capacity:  [ drawn ........ | cursor -> free ..... ]
           ^ wrap here with Discard once free < min_batch_size
```
*/

use crate::device::{
    BufferDescription, BufferHandle, BufferKind, IndexFormat, MapMode, MappedBuffer, NativeContext,
};
use crate::sprites::SpriteBatchError;
use crate::sprites::index_algorithms::{INDICES_PER_SPRITE, IndexGenerator};
use crate::sprites::sprite_info::{SpriteInfo, SpriteQuad};
use crate::sprites::vertex_layout::VertexPositionColorTexture;

const QUAD_SIZE: usize = std::mem::size_of::<SpriteQuad>();

/// Per-device sprite rendering state, kept in the device's shared resources.
#[derive(Debug)]
pub(crate) struct VertexRing {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    /// In sprites.
    capacity: u32,
    /// Next free sprite in the vertex buffer.
    position: u32,
    /// Set while a batch in immediate mode is between `begin` and `end`.
    pub(crate) is_in_immediate_mode: bool,
}

impl VertexRing {
    pub(crate) fn create<C: NativeContext + ?Sized>(context: &mut C, capacity: u32) -> Result<Self, SpriteBatchError> {
        let generator = IndexGenerator::new(capacity as usize);
        let indices: Vec<u16> = generator.indices_u16().collect();
        let index_buffer = context.create_buffer(BufferDescription {
            kind: BufferKind::Index,
            size_in_bytes: indices.len() * std::mem::size_of::<u16>(),
            initial_data: Some(bytemuck::cast_slice(&indices)),
            debug_name: "SpriteBatch.IndexBuffer",
        })?;
        let vertex_buffer = context.create_buffer(BufferDescription {
            kind: BufferKind::DynamicVertex,
            size_in_bytes: capacity as usize * QUAD_SIZE,
            initial_data: None,
            debug_name: "SpriteBatch.VertexBuffer",
        })?;
        logwise::info_sync!(
            "Created sprite vertex ring for {capacity} sprites",
            capacity = capacity
        );
        Ok(VertexRing {
            vertex_buffer,
            index_buffer,
            capacity,
            position: 0,
            is_in_immediate_mode: false,
        })
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> u32 {
        self.position
    }

    /// Binds the ring's buffers.  Deferred contexts restart at the beginning of the ring.
    pub(crate) fn bind<C: NativeContext + ?Sized>(&mut self, context: &mut C) {
        if context.is_deferred() {
            self.position = 0;
        }
        let stride = VertexPositionColorTexture::layout().stride() as u32;
        context.set_vertex_buffer(self.vertex_buffer, stride);
        context.set_index_buffer(self.index_buffer, IndexFormat::U16);
    }

    /**
    Writes and draws `sprites`, splitting them into as many draw calls as the
    ring requires.

    Each draw holds at most `max_batch_size` sprites.  A batch that does not fit
    behind the cursor is shortened to the space left, unless less than
    `min_batch_size` sprites would fit, in which case the ring wraps.
    */
    pub(crate) fn draw<C: NativeContext + ?Sized>(
        &mut self,
        context: &mut C,
        sprites: &[SpriteInfo],
        max_batch_size: u32,
        min_batch_size: u32,
    ) -> Result<(), SpriteBatchError> {
        let mut remaining = sprites;
        while !remaining.is_empty() {
            let mut batch = remaining.len().min(max_batch_size as usize);
            let mut mode = if self.position == 0 {
                MapMode::Discard
            } else {
                MapMode::NoOverwrite
            };
            let space = (self.capacity - self.position) as usize;
            if batch > space {
                if space < min_batch_size as usize {
                    self.position = 0;
                    mode = MapMode::Discard;
                } else {
                    batch = space;
                }
            }
            let start = self.position as usize;
            self.write(context, mode, start, &remaining[..batch])?;
            context.draw_indexed(
                (batch * INDICES_PER_SPRITE) as u32,
                (start * INDICES_PER_SPRITE) as u32,
            );
            logwise::trace_sync!(
                "Sprite batch of {batch} at {start} ({mode})",
                batch = batch,
                start = start,
                mode = logwise::privacy::LogIt(&mode)
            );
            self.position += batch as u32;
            remaining = &remaining[batch..];
        }
        Ok(())
    }

    fn write<C: NativeContext + ?Sized>(
        &self,
        context: &mut C,
        mode: MapMode,
        start: usize,
        sprites: &[SpriteInfo],
    ) -> Result<(), SpriteBatchError> {
        let mut mapped = MappedBuffer::map(context, self.vertex_buffer, mode)?;
        let bytes = mapped.bytes_mut();
        let needed = (start + sprites.len()) * QUAD_SIZE;
        if bytes.len() < needed {
            return Err(SpriteBatchError::VertexBufferOverflow {
                needed,
                available: bytes.len(),
            });
        }
        let fill = logwise::perfwarn_begin!("SpriteBatch vertex fill");
        let region = &mut bytes[start * QUAD_SIZE..needed];
        for (chunk, sprite) in region.chunks_exact_mut(QUAD_SIZE).zip(sprites) {
            chunk.copy_from_slice(bytemuck::bytes_of(&sprite.quad()));
        }
        drop(fill);
        Ok(())
    }
}
