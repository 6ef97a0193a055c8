// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

/// The kinds of resource a shader stage binds, each with its own slot space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ConstantBuffer,
    ShaderResourceView,
    UnorderedAccessView,
    SamplerState,
}

impl ResourceKind {
    pub const COUNT: usize = 4;

    pub const ALL: [ResourceKind; ResourceKind::COUNT] = [
        ResourceKind::ConstantBuffer,
        ResourceKind::ShaderResourceView,
        ResourceKind::UnorderedAccessView,
        ResourceKind::SamplerState,
    ];

    pub const fn index(self) -> usize {
        match self {
            ResourceKind::ConstantBuffer => 0,
            ResourceKind::ShaderResourceView => 1,
            ResourceKind::UnorderedAccessView => 2,
            ResourceKind::SamplerState => 3,
        }
    }

    /// Number of slots the native API exposes for this kind in one stage.
    pub const fn max_slots(self) -> u32 {
        match self {
            ResourceKind::ConstantBuffer => 14,
            ResourceKind::ShaderResourceView => 128,
            ResourceKind::UnorderedAccessView => 64,
            ResourceKind::SamplerState => 16,
        }
    }

    /// The largest [`max_slots`](Self::max_slots) over all kinds.
    pub const MAX_SLOTS: usize = 128;
}
