// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The device layer: what we need from the native graphics API, and the state
//! we keep per native context.
//!
//! [`GraphicsDevice`] owns a [`NativeContext`] together with the small amount of
//! state that must be shared by everything rendering through that context: which
//! effect pass is currently active, and resources such as the sprite vertex ring
//! buffer that exist once per context.

pub mod context;
pub mod handles;
mod mapped;
mod shared;

pub use context::{
    BufferDescription, BufferKind, DeviceError, FeatureLevel, IndexFormat, MapMode,
    NativeContext, UAV_COUNTER_UNCHANGED,
};
pub use handles::{BufferHandle, NativeHandle, ShaderHandle, StateHandle};
pub use mapped::MappedBuffer;
pub use shared::SharedResources;

use crate::effects::{EffectId, PassKey};

/**
A native context plus the per-context state the rest of the crate relies on.

Only one effect pass is active on a device at a time.  Applying a pass replaces
whichever pass was active before; no explicit unapply is required.
*/
#[derive(Debug)]
pub struct GraphicsDevice<C> {
    context: C,
    feature_level: FeatureLevel,
    current_pass: Option<PassKey>,
    shared: SharedResources,
    next_effect_id: u64,
}

impl<C: NativeContext> GraphicsDevice<C> {
    pub fn new(context: C) -> Self {
        let feature_level = context.feature_level();
        logwise::info_sync!(
            "GraphicsDevice created at {level} (deferred: {deferred})",
            level = logwise::privacy::LogIt(&feature_level),
            deferred = context.is_deferred()
        );
        GraphicsDevice {
            context,
            feature_level,
            current_pass: None,
            shared: SharedResources::new(),
            next_effect_id: 1,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    pub fn is_deferred(&self) -> bool {
        self.context.is_deferred()
    }

    /// The pass most recently applied and not yet unapplied.
    pub fn current_pass(&self) -> Option<PassKey> {
        self.current_pass
    }

    pub fn shared(&self) -> &SharedResources {
        &self.shared
    }

    pub(crate) fn set_current_pass(&mut self, pass: Option<PassKey>) {
        self.current_pass = pass;
    }

    pub(crate) fn allocate_effect_id(&mut self) -> EffectId {
        let id = EffectId::new(self.next_effect_id);
        self.next_effect_id += 1;
        id
    }

    /// Borrows the context and the shared resources at the same time.
    pub(crate) fn split_mut(&mut self) -> (&mut C, &mut SharedResources) {
        (&mut self.context, &mut self.shared)
    }
}
