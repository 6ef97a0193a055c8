// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

/// How a sprite batch orders its sprites when it flushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpriteSortMode {
    /// Submission order, drawn at `end`.
    #[default]
    Deferred,
    /// Each sprite is drawn inside `draw`.  Only one batch per device may use this at a time.
    Immediate,
    /// Grouped by texture view.
    Texture,
    /// Decreasing depth.
    BackToFront,
    /// Increasing depth.
    FrontToBack,
}

impl SpriteSortMode {
    /// Whether `end` sorts before drawing.
    pub const fn sorts(self) -> bool {
        matches!(
            self,
            SpriteSortMode::Texture | SpriteSortMode::BackToFront | SpriteSortMode::FrontToBack
        )
    }
}
