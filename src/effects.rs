// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Effects, their passes, and the parameters the passes read.

An [`Effect`] is built from [`PassDescriptor`]s.  Each descriptor lists one
[`ShaderDescription`] per stage; the bindings those shaders declare become the
effect's parameters, shared by name across stages and passes.
*/

pub mod constant_buffer;
mod effect;
pub mod parameters;
pub mod pass;
pub mod shader;

pub use constant_buffer::ConstantBuffer;
pub use effect::{ApplyStrategy, DefaultStrategy, Effect, EffectId, PassKey, PassSelection};
pub use parameters::EffectParameters;
pub use pass::{EffectPass, PassDescriptor, RenderStates};
pub use shader::ShaderDescription;

use crate::bindings::BindingError;
use crate::device::DeviceError;

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("effect {effect} has no pass {index}")]
    NoSuchPass { effect: String, index: usize },
    #[error("pass {pass} has no sub-pass {index}")]
    NoSuchSubPass { pass: String, index: usize },
    #[error("writing {len} bytes at offset {offset} overflows constant buffer {name} of {size} bytes")]
    ConstantBufferOverflow {
        name: String,
        size: usize,
        offset: usize,
        len: usize,
    },
}
