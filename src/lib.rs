// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! passes_and_sprites binds effect parameters and batches sprites on top of a
native, slot-based GPU API.

Slot-based APIs bind resources per shader stage, per resource kind, into
contiguous ranges of numbered slots.  Effects on the other hand think in named
parameters, shared by every stage and pass that declares them.  This crate
bridges the two:

| Layer                                 | Does                                                                        | Per apply                                |
|---------------------------------------|-----------------------------------------------------------------------------|------------------------------------------|
| [`bindings::slot_link`]               | Coalesces a stage's bindings into the fewest contiguous slot ranges         | nothing, runs once per pass              |
| [`bindings::slot_link_layout`]        | Plans descriptors and gather buffers for a pass in one sized-once layout    | gathers only the ranges that need it     |
| [`effects`]                           | Parameters, constant buffers, passes, sub-passes and the apply state machine | one bind call per range                  |
| [`sprites`]                           | Queues, sorts and batches sprites into a shared vertex ring                 | one draw call per texture run and pass   |

# Backends

The native API is reached only through [`device::NativeContext`].  A backend
implements that trait once.  [`recording::RecordingContext`] is a backend that
records every call instead of rendering, which is what the tests run against.

# Threading

Everything here is synchronous and single threaded: a [`device::GraphicsDevice`]
and everything created from it live on the thread that owns the native context.
*/

pub mod bindings;
pub mod device;
pub mod effects;
pub mod recording;
pub mod sprites;
