// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The parameters of an effect and the resources currently set on them.

Parameters are discovered while the effect's passes are built.  Each parameter
owns a run of entries in one flat [`ResourceTable`]; constant buffer parameters
additionally own a [`ConstantBuffer`] whose native buffer sits in that table.
*/

use std::collections::HashMap;

use crate::bindings::BindingError;
use crate::bindings::bind_style::ShaderBinding;
use crate::bindings::parameter::{Parameter, ParameterId, ParameterRegistry, Registration};
use crate::bindings::resource_kind::ResourceKind;
use crate::bindings::resource_table::ResourceTable;
use crate::bindings::slot_link::StageBinding;
use crate::device::{BufferDescription, BufferKind, NativeContext, NativeHandle, UAV_COUNTER_UNCHANGED};
use crate::effects::EffectError;
use crate::effects::constant_buffer::ConstantBuffer;

/// A shader binding after it has been resolved against the effect's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeclaredBinding {
    pub(crate) binding: StageBinding,
    /// Index into the effect's constant buffers, for constant buffer bindings.
    pub(crate) constant_buffer: Option<usize>,
}

#[derive(Debug, Default)]
pub struct EffectParameters {
    registry: ParameterRegistry,
    table: ResourceTable,
    constant_buffers: Vec<ConstantBuffer>,
    constant_buffer_by_offset: HashMap<u32, usize>,
}

impl EffectParameters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /**
    Resolves one shader binding, creating the parameter (and its constant buffer)
    on first sight.

    Returns `None` when the binding names an existing parameter of another kind;
    that binding is left out of its stage.
    */
    pub(crate) fn declare<C: NativeContext + ?Sized>(
        &mut self,
        context: &mut C,
        binding: &ShaderBinding,
    ) -> Result<Option<DeclaredBinding>, EffectError> {
        let registration = self.registry.register(binding)?;
        let parameter = self.registry.get(registration.id()).clone();
        if parameter.kind() != binding.kind() {
            logwise::warn_sync!(
                "Binding {name} at slot {slot} dropped: parameter is a {kind}",
                name = logwise::privacy::LogIt(binding.name()),
                slot = binding.slot().index(),
                kind = logwise::privacy::LogIt(&parameter.kind())
            );
            return Ok(None);
        }
        if let Registration::Added(_) = registration {
            self.table.resize(self.registry.resource_count() as usize);
            if parameter.kind() == ResourceKind::ConstantBuffer {
                let size = parameter.size_in_bytes() as usize;
                let buffer = context.create_buffer(BufferDescription {
                    kind: BufferKind::Constant,
                    size_in_bytes: size,
                    initial_data: None,
                    debug_name: parameter.name(),
                })?;
                self.constant_buffer_by_offset
                    .insert(parameter.offset(), self.constant_buffers.len());
                self.constant_buffers
                    .push(ConstantBuffer::new(parameter.name(), buffer, size));
                self.table
                    .set(parameter.offset() as usize, Some(buffer.as_native()));
            }
        }
        Ok(Some(DeclaredBinding {
            binding: StageBinding::new(
                parameter.kind(),
                binding.slot().index(),
                parameter.offset(),
                binding.count().min(parameter.element_count()),
            ),
            constant_buffer: self
                .constant_buffer_by_offset
                .get(&parameter.offset())
                .copied(),
        }))
    }

    pub fn find(&self, name: &str) -> Option<ParameterId> {
        self.registry.find(name)
    }

    pub fn get(&self, id: ParameterId) -> &Parameter {
        self.registry.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, &Parameter)> {
        self.registry.iter()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<ParameterId, BindingError> {
        self.registry
            .find(name)
            .ok_or_else(|| BindingError::UnknownParameter(name.to_string()))
    }

    /// Table index of element `element` of `id`, if `id` has kind `expected`.
    fn entry(&self, id: ParameterId, element: u32, expected: ResourceKind) -> Result<usize, BindingError> {
        let parameter = self.registry.get(id);
        if parameter.kind() != expected {
            return Err(BindingError::KindMismatch {
                name: parameter.name().to_string(),
                expected,
                actual: parameter.kind(),
            });
        }
        if element >= parameter.element_count() {
            return Err(BindingError::ElementOutOfRange {
                name: parameter.name().to_string(),
                index: element,
                element_count: parameter.element_count(),
            });
        }
        Ok((parameter.offset() + element) as usize)
    }

    /// The resource currently set on the first element of `name`.
    pub fn resource(&self, name: &str) -> Option<NativeHandle> {
        let parameter = self.registry.get(self.registry.find(name)?);
        self.table.get(parameter.offset() as usize)
    }

    /// Sets a shader resource view or sampler parameter.
    pub fn set_resource(&mut self, name: &str, resource: Option<NativeHandle>) -> Result<(), BindingError> {
        let id = self.lookup(name)?;
        let kind = self.registry.get(id).kind();
        self.set_resource_by_id(id, kind, 0, resource)
    }

    /// Sets consecutive elements of an array parameter, starting at `first`.
    ///
    /// Either every element is set or, on error, none is.
    pub fn set_resource_array(
        &mut self,
        name: &str,
        first: u32,
        resources: &[Option<NativeHandle>],
    ) -> Result<(), BindingError> {
        let id = self.lookup(name)?;
        let parameter = self.registry.get(id);
        let kind = parameter.kind();
        let element_count = parameter.element_count();
        let fits = u32::try_from(resources.len())
            .ok()
            .and_then(|len| first.checked_add(len))
            .is_some_and(|end| end <= element_count);
        if !fits {
            return Err(BindingError::ElementOutOfRange {
                name: parameter.name().to_string(),
                index: first.max(element_count),
                element_count,
            });
        }
        // in range from here on, so only the first element can fail, on its kind
        for (element, resource) in (first..).zip(resources) {
            self.set_resource_by_id(id, kind, element, *resource)?;
        }
        Ok(())
    }

    /// Sets element `element` of `id`, which must be of kind `kind`.
    ///
    /// Constant buffer parameters own their buffer and cannot be set this way.
    pub fn set_resource_by_id(
        &mut self,
        id: ParameterId,
        kind: ResourceKind,
        element: u32,
        resource: Option<NativeHandle>,
    ) -> Result<(), BindingError> {
        if kind == ResourceKind::ConstantBuffer {
            return Err(BindingError::KindMismatch {
                name: self.registry.get(id).name().to_string(),
                expected: ResourceKind::ShaderResourceView,
                actual: kind,
            });
        }
        let index = self.entry(id, element, kind)?;
        if kind == ResourceKind::UnorderedAccessView {
            self.table.set_unordered_access(index, resource, UAV_COUNTER_UNCHANGED);
        } else {
            self.table.set(index, resource);
        }
        Ok(())
    }

    /// Sets an unordered access view and the counter it is bound with.
    pub fn set_unordered_access(
        &mut self,
        name: &str,
        view: Option<NativeHandle>,
        initial_count: i32,
    ) -> Result<(), BindingError> {
        let id = self.lookup(name)?;
        let index = self.entry(id, 0, ResourceKind::UnorderedAccessView)?;
        self.table.set_unordered_access(index, view, initial_count);
        Ok(())
    }

    pub fn constant_buffer(&self, name: &str) -> Option<&ConstantBuffer> {
        let offset = self.registry.get(self.registry.find(name)?).offset();
        let index = *self.constant_buffer_by_offset.get(&offset)?;
        Some(&self.constant_buffers[index])
    }

    pub fn constant_buffer_mut(&mut self, name: &str) -> Option<&mut ConstantBuffer> {
        let offset = self.registry.get(self.registry.find(name)?).offset();
        let index = *self.constant_buffer_by_offset.get(&offset)?;
        Some(&mut self.constant_buffers[index])
    }

    pub fn set_constant_bytes(&mut self, name: &str, offset: usize, bytes: &[u8]) -> Result<(), EffectError> {
        let id = self.lookup(name)?;
        self.entry(id, 0, ResourceKind::ConstantBuffer)?;
        match self.constant_buffer_mut(name) {
            Some(buffer) => buffer.set_bytes(offset, bytes),
            None => Err(BindingError::UnknownParameter(name.to_string()).into()),
        }
    }

    pub fn set_constant<T: bytemuck::Pod>(&mut self, name: &str, offset: usize, value: &T) -> Result<(), EffectError> {
        self.set_constant_bytes(name, offset, bytemuck::bytes_of(value))
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    /// The resource table and the constant buffers, borrowed together for applying a pass.
    pub(crate) fn split_for_apply(&mut self) -> (&ResourceTable, &mut [ConstantBuffer]) {
        (&self.table, &mut self.constant_buffers)
    }
}
