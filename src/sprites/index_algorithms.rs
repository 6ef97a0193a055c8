// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Index generation for batches of independent quads.

Every sprite is a quad of 4 vertices, drawn as a triangle list of 2 triangles.
Since all quads share the same pattern, one static index buffer serves every
batch: draw `n` sprites starting at sprite `s` with `n * 6` indices from index
`s * 6`.

# Example

```
use passes_and_sprites::sprites::index_algorithms::IndexGenerator;

let generator = IndexGenerator::new(2);
assert_eq!(generator.num_indices(), 12);

let indices: Vec<u16> = generator.indices_u16().collect();
assert_eq!(&indices[..6], &[0, 1, 2, 1, 3, 2]);
assert_eq!(&indices[6..], &[4, 5, 6, 5, 7, 6]);
```
*/

/**
Vertices of one quad, and the order its triangles use them.

```text
  0 ────────── 1
  │ ╲    B     │
  │   ╲        │
  │  A  ╲      │
  │       ╲    │
  2 ────────── 3
```

Triangle A is (0, 1, 2), triangle B is (1, 3, 2), both clockwise in screen space.
*/
const QUAD_PATTERN: [usize; INDICES_PER_SPRITE] = [0, 1, 2, 1, 3, 2];

pub const VERTICES_PER_SPRITE: usize = 4;
pub const INDICES_PER_SPRITE: usize = 6;

/// Generates indices for `sprites` quads laid out back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGenerator {
    sprites: usize,
}

impl IndexGenerator {
    pub fn new(sprites: usize) -> Self {
        Self { sprites }
    }

    pub fn num_indices(&self) -> usize {
        self.sprites * INDICES_PER_SPRITE
    }

    pub fn num_vertices(&self) -> usize {
        self.sprites * VERTICES_PER_SPRITE
    }

    /// The vertex index stored at position `buffer_pos` of the index buffer.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_pos` is out of bounds.
    ///
    /// ```
    /// use passes_and_sprites::sprites::index_algorithms::IndexGenerator;
    ///
    /// let generator = IndexGenerator::new(3);
    /// // second triangle of the third sprite
    /// assert_eq!(generator.index_for(15), 8 + 1);
    /// ```
    pub fn index_for(&self, buffer_pos: usize) -> usize {
        assert!(buffer_pos < self.num_indices(), "Index out of bounds");
        let sprite = buffer_pos / INDICES_PER_SPRITE;
        sprite * VERTICES_PER_SPRITE + QUAD_PATTERN[buffer_pos % INDICES_PER_SPRITE]
    }

    /// All indices as 16-bit values.
    ///
    /// # Panics
    ///
    /// Panics if the quads need more than 65536 vertices.
    pub fn indices_u16(&self) -> impl Iterator<Item = u16> + '_ {
        assert!(self.num_vertices() <= u16::MAX as usize + 1, "Too many sprites for 16-bit indices");
        (0..self.num_indices()).map(|pos| self.index_for(pos) as u16)
    }
}
