// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Named shader parameters shared by every pass and stage of an effect.

Each parameter owns a contiguous run of entries in the effect's flat resource
table, starting at its global offset.  Shaders that declare the same name share
the parameter, which is what lets a texture set once be seen by every stage
that reads it.
*/

use std::collections::HashMap;

use crate::bindings::BindingError;
use crate::bindings::bind_style::ShaderBinding;
use crate::bindings::resource_kind::ResourceKind;

/// Index of a parameter inside its [`ParameterRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(u32);

impl ParameterId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    kind: ResourceKind,
    element_count: u32,
    size_in_bytes: u32,
    offset: u32,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
    /// Array length; 1 for non-arrays.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }
    /// Constant buffer size, 0 for other kinds.
    pub fn size_in_bytes(&self) -> u32 {
        self.size_in_bytes
    }
    /// First entry of this parameter in the resource table.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    fn is_compatible_with(&self, binding: &ShaderBinding) -> bool {
        self.kind == binding.kind
            && self.element_count == binding.count
            && self.size_in_bytes == binding.size_in_bytes
    }
}

/// The outcome of declaring a binding against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time this name was seen.
    Added(ParameterId),
    /// The name was already declared with the same definition.
    Shared(ParameterId),
    /// The name was already declared differently.  The first declaration wins.
    Conflicting(ParameterId),
}

impl Registration {
    pub fn id(self) -> ParameterId {
        match self {
            Registration::Added(id) | Registration::Shared(id) | Registration::Conflicting(id) => id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    parameters: Vec<Parameter>,
    by_name: HashMap<String, ParameterId>,
    resource_count: u32,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Declares the parameter behind `binding`.

    Redeclaring a name with a different kind, array length or buffer size is
    logged as an error and resolved in favor of the first declaration, so that
    one bad shader does not take the whole effect down.

    A binding whose slots run past the native limit for its kind is rejected
    before anything is recorded.
    */
    pub fn register(&mut self, binding: &ShaderBinding) -> Result<Registration, BindingError> {
        let max = binding.kind.max_slots();
        if binding
            .slot
            .index()
            .checked_add(binding.count)
            .is_none_or(|end| end > max)
        {
            return Err(BindingError::SlotOutOfRange {
                kind: binding.kind,
                slot: binding.slot.index(),
                count: binding.count,
                max,
            });
        }
        if let Some(&id) = self.by_name.get(binding.name()) {
            let existing = &self.parameters[id.index()];
            if existing.is_compatible_with(binding) {
                return Ok(Registration::Shared(id));
            }
            logwise::error_sync!(
                "Parameter {name} redeclared as {kind} x{count} ({size} bytes); keeping {old_kind} x{old_count} ({old_size} bytes)",
                name = logwise::privacy::LogIt(&binding.name),
                kind = logwise::privacy::LogIt(&binding.kind),
                count = binding.count,
                size = binding.size_in_bytes,
                old_kind = logwise::privacy::LogIt(&existing.kind),
                old_count = existing.element_count,
                old_size = existing.size_in_bytes
            );
            return Ok(Registration::Conflicting(id));
        }
        let offset = self.resource_count;
        // count is bounded by the slot limit above
        self.resource_count = offset.saturating_add(binding.count);
        let id = ParameterId(self.parameters.len() as u32);
        self.parameters.push(Parameter {
            name: binding.name.clone(),
            kind: binding.kind,
            element_count: binding.count,
            size_in_bytes: binding.size_in_bytes,
            offset,
        });
        self.by_name.insert(binding.name.clone(), id);
        Ok(Registration::Added(id))
    }

    pub fn find(&self, name: &str) -> Option<ParameterId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ParameterId) -> &Parameter {
        &self.parameters[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, &Parameter)> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (ParameterId(i as u32), p))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Total number of resource table entries used by all parameters.
    pub fn resource_count(&self) -> u32 {
        self.resource_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::bind_style::{BindSlot, BindStyle};

    fn bindings(f: impl FnOnce(&mut BindStyle)) -> Vec<ShaderBinding> {
        let mut style = BindStyle::new();
        f(&mut style);
        style.binds
    }

    #[test]
    fn offsets_are_packed_in_declaration_order() {
        let binds = bindings(|s| {
            s.bind_shader_resource("A", BindSlot::new(0));
            s.bind_shader_resource_array("B", BindSlot::new(1), 3);
            s.bind_sampler("C", BindSlot::new(0));
        });
        let mut registry = ParameterRegistry::new();
        let ids: Vec<_> = binds.iter().map(|b| registry.register(b).unwrap().id()).collect();
        assert_eq!(registry.get(ids[0]).offset(), 0);
        assert_eq!(registry.get(ids[1]).offset(), 1);
        assert_eq!(registry.get(ids[2]).offset(), 4);
        assert_eq!(registry.resource_count(), 5);
    }

    #[test]
    fn same_name_across_shaders_is_shared() {
        let vertex = bindings(|s| s.bind_shader_resource("Texture", BindSlot::new(2)));
        let pixel = bindings(|s| s.bind_shader_resource("Texture", BindSlot::new(0)));
        let mut registry = ParameterRegistry::new();
        let a = registry.register(&vertex[0]).unwrap();
        let b = registry.register(&pixel[0]).unwrap();
        assert!(matches!(a, Registration::Added(_)));
        assert_eq!(b, Registration::Shared(a.id()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflicting_redeclaration_keeps_first() {
        let first = bindings(|s| s.bind_constant_buffer("Globals", BindSlot::new(0), 64));
        let second = bindings(|s| s.bind_constant_buffer("Globals", BindSlot::new(0), 128));
        let mut registry = ParameterRegistry::new();
        let a = registry.register(&first[0]).unwrap().id();
        let b = registry.register(&second[0]).unwrap();
        assert_eq!(b, Registration::Conflicting(a));
        assert_eq!(registry.get(a).size_in_bytes(), 64);
        assert_eq!(registry.resource_count(), 1);
    }

    #[test]
    fn bindings_past_the_slot_limit_are_rejected() {
        let binds = bindings(|s| {
            s.bind_shader_resource("Far", BindSlot::new(u32::MAX));
            s.bind_shader_resource_array("Wide", BindSlot::new(120), 9);
        });
        let mut registry = ParameterRegistry::new();
        assert_eq!(
            registry.register(&binds[0]),
            Err(BindingError::SlotOutOfRange {
                kind: ResourceKind::ShaderResourceView,
                slot: u32::MAX,
                count: 1,
                max: 128,
            })
        );
        assert!(matches!(
            registry.register(&binds[1]),
            Err(BindingError::SlotOutOfRange { slot: 120, count: 9, .. })
        ));
        assert!(registry.is_empty());
        assert_eq!(registry.resource_count(), 0);
    }
}
