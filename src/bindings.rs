// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Defines binding types, and the compiler that turns per-parameter bindings into native bind ranges. */

pub mod bind_style;
pub mod parameter;
pub mod resource_kind;
pub mod resource_table;
pub mod slot_link;
pub mod slot_link_layout;

pub use bind_style::{BindSlot, BindStyle, Stage};
pub use resource_kind::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("{kind:?} binding at slot {slot} starts before the previous binding ends at slot {previous_end}")]
    UnorderedSlots {
        kind: ResourceKind,
        slot: u32,
        previous_end: u32,
    },
    #[error("{kind:?} binding of {count} at slot {slot} exceeds the {max} native slots")]
    SlotOutOfRange {
        kind: ResourceKind,
        slot: u32,
        count: u32,
        max: u32,
    },
    #[error("no parameter named {0}")]
    UnknownParameter(String),
    #[error("parameter {name} is a {actual:?}, not a {expected:?}")]
    KindMismatch {
        name: String,
        expected: ResourceKind,
        actual: ResourceKind,
    },
    #[error("parameter {name} has {element_count} elements; index {index} is out of range")]
    ElementOutOfRange {
        name: String,
        index: u32,
        element_count: u32,
    },
}
