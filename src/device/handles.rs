// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Opaque handles to objects owned by the native context.
//!
//! Handles are plain `Copy` values.  A null native pointer is expressed as
//! `Option::None`, never as a zero handle, so every handle that exists refers
//! to something the context created.

use std::num::NonZeroU64;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU64);

        impl $name {
            pub const fn new(raw: NonZeroU64) -> Self {
                Self(raw)
            }

            /// Returns `None` for the null value.
            pub const fn from_raw(raw: u64) -> Option<Self> {
                match NonZeroU64::new(raw) {
                    Some(raw) => Some(Self(raw)),
                    None => None,
                }
            }

            /// The value the native layer knows this object by.
            pub const fn raw(self) -> u64 {
                self.0.get()
            }
        }
    };
}

native_handle!(
    /// Anything bindable to a shader slot: a constant buffer, a shader resource
    /// view, an unordered access view or a sampler state.
    NativeHandle
);

native_handle!(
    /// A compiled shader for one pipeline stage.
    ShaderHandle
);

native_handle!(
    /// A GPU buffer that the CPU can write through the context.
    BufferHandle
);

native_handle!(
    /// A blend, depth-stencil or rasterizer state object.
    StateHandle
);

impl BufferHandle {
    /// The handle used when this buffer is bound to a constant buffer slot.
    pub const fn as_native(self) -> NativeHandle {
        NativeHandle(self.0)
    }
}
