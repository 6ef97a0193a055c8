// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Effects: named passes over one shared set of parameters.

# Applying

[`Effect::apply`] asks the effect's [`ApplyStrategy`] which pass should actually
run.  The strategy may keep the requested pass or substitute one of its
sub-passes; anything else is an error.  The effective pass is then gathered
and bound, its declared render states are set, and the device records it as the
current pass.

When a sub-pass is substituted, the requested pass's declared render states are
set after the sub-pass's own, so the requested pass's overrides win.

# Unapplying

[`Effect::unapply`] undoes the bindings of the pass.  A partial unapply only
clears shader resource and unordered access ranges; a full one also clears
constant buffers, samplers, shaders and the declared render states.
*/

use std::fmt;

use crate::bindings::BindingError;
use crate::bindings::parameter::{Parameter, ParameterId};
use crate::device::{GraphicsDevice, NativeContext, NativeHandle};
use crate::effects::EffectError;
use crate::effects::constant_buffer::ConstantBuffer;
use crate::effects::parameters::EffectParameters;
use crate::effects::pass::{EffectPass, PassDescriptor, RenderStates};

/// Identifies an effect within its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    pub(crate) const fn new(raw: u64) -> Self {
        EffectId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Which pass is active on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassKey {
    pub effect: EffectId,
    /// The requested pass.
    pub pass: usize,
    /// The sub-pass the strategy substituted, if any.
    pub sub_pass: Option<usize>,
}

/// The pass an [`ApplyStrategy`] chooses to run in place of a requested pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSelection {
    /// Run the requested pass itself.
    Pass,
    /// Run this sub-pass of the requested pass.
    SubPass(usize),
}

/// Chooses the effective pass each time a pass is applied.
///
/// Any `FnMut(usize, &EffectPass) -> PassSelection` is a strategy.
pub trait ApplyStrategy {
    fn select(&mut self, pass_index: usize, pass: &EffectPass) -> PassSelection;
}

/// Always runs the requested pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl ApplyStrategy for DefaultStrategy {
    fn select(&mut self, _pass_index: usize, _pass: &EffectPass) -> PassSelection {
        PassSelection::Pass
    }
}

impl<F: FnMut(usize, &EffectPass) -> PassSelection> ApplyStrategy for F {
    fn select(&mut self, pass_index: usize, pass: &EffectPass) -> PassSelection {
        self(pass_index, pass)
    }
}

pub struct Effect {
    id: EffectId,
    name: String,
    parameters: EffectParameters,
    passes: Vec<EffectPass>,
    strategy: Box<dyn ApplyStrategy>,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}

impl Effect {
    /// Compiles every pass.  Shaders the device cannot run are logged and left out.
    pub fn new<C: NativeContext>(
        device: &mut GraphicsDevice<C>,
        name: &str,
        passes: Vec<PassDescriptor>,
    ) -> Result<Self, EffectError> {
        let id = device.allocate_effect_id();
        let feature_level = device.feature_level();
        let mut parameters = EffectParameters::new();
        let context = device.context_mut();
        let passes = passes
            .into_iter()
            .map(|pass| EffectPass::compile(context, feature_level, &mut parameters, pass))
            .collect::<Result<Vec<_>, _>>()?;
        logwise::info_sync!(
            "Effect {name} created with {passes} passes and {parameters} parameters",
            name = logwise::privacy::LogIt(name),
            passes = passes.len(),
            parameters = parameters.len()
        );
        Ok(Effect {
            id,
            name: name.to_string(),
            parameters,
            passes,
            strategy: Box::new(DefaultStrategy),
        })
    }

    pub fn with_strategy(mut self, strategy: impl ApplyStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &EffectParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut EffectParameters {
        &mut self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.find(name).map(|id| self.parameters.get(id))
    }

    pub fn find_parameter(&self, name: &str) -> Option<ParameterId> {
        self.parameters.find(name)
    }

    pub fn set_resource(&mut self, name: &str, resource: Option<NativeHandle>) -> Result<(), BindingError> {
        self.parameters.set_resource(name, resource)
    }

    pub fn set_resource_array(
        &mut self,
        name: &str,
        first: u32,
        resources: &[Option<NativeHandle>],
    ) -> Result<(), BindingError> {
        self.parameters.set_resource_array(name, first, resources)
    }

    pub fn set_unordered_access(
        &mut self,
        name: &str,
        view: Option<NativeHandle>,
        initial_count: i32,
    ) -> Result<(), BindingError> {
        self.parameters.set_unordered_access(name, view, initial_count)
    }

    pub fn constant_buffer(&self, name: &str) -> Option<&ConstantBuffer> {
        self.parameters.constant_buffer(name)
    }

    pub fn set_constant_bytes(&mut self, name: &str, offset: usize, bytes: &[u8]) -> Result<(), EffectError> {
        self.parameters.set_constant_bytes(name, offset, bytes)
    }

    pub fn set_constant<T: bytemuck::Pod>(&mut self, name: &str, offset: usize, value: &T) -> Result<(), EffectError> {
        self.parameters.set_constant(name, offset, value)
    }

    pub fn passes(&self) -> &[EffectPass] {
        &self.passes
    }

    pub fn pass(&self, index: usize) -> Option<&EffectPass> {
        self.passes.get(index)
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn find_pass(&self, name: &str) -> Option<usize> {
        self.passes.iter().position(|p| p.name() == name)
    }

    /// Applies pass `pass` (or the sub-pass the strategy picks) and makes it the
    /// device's current pass.
    pub fn apply<C: NativeContext>(&mut self, device: &mut GraphicsDevice<C>, pass: usize) -> Result<PassKey, EffectError> {
        let Effect {
            id,
            name,
            parameters,
            passes,
            strategy,
        } = self;
        let requested = passes.get_mut(pass).ok_or_else(|| EffectError::NoSuchPass {
            effect: name.clone(),
            index: pass,
        })?;
        let sub_pass = match strategy.select(pass, requested) {
            PassSelection::Pass => None,
            PassSelection::SubPass(index) => Some(index),
        };
        let (effective, parent_states) = Self::effective(requested, sub_pass)?;

        let context = device.context_mut();
        effective.apply_internal(context, parameters);
        effective.states().apply(context);
        // a substituted sub-pass still gets the requested pass's overrides
        if let Some(parent_states) = parent_states {
            parent_states.apply(context);
        }
        let key = PassKey {
            effect: *id,
            pass,
            sub_pass,
        };
        device.set_current_pass(Some(key));
        logwise::trace_sync!(
            "Applied pass {pass} of effect {effect}",
            pass = logwise::privacy::LogIt(effective.name()),
            effect = id.raw()
        );
        Ok(key)
    }

    /// Undoes [`apply`](Self::apply) for pass `pass`.
    ///
    /// If that pass is the device's current pass, the sub-pass it was applied as is
    /// unapplied and the device no longer has a current pass.
    pub fn unapply<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        pass: usize,
        full: bool,
    ) -> Result<(), EffectError> {
        let current = device
            .current_pass()
            .filter(|key| key.effect == self.id && key.pass == pass);
        let requested = self.passes.get_mut(pass).ok_or_else(|| EffectError::NoSuchPass {
            effect: self.name.clone(),
            index: pass,
        })?;
        let (effective, parent_states) = Self::effective(requested, current.and_then(|key| key.sub_pass))?;
        let context = device.context_mut();
        effective.unapply_internal(context, full);
        if full {
            effective.states().reset(context);
            if let Some(parent_states) = parent_states {
                parent_states.reset(context);
            }
        }
        if current.is_some() {
            device.set_current_pass(None);
        }
        Ok(())
    }

    /// Resolves a selection against `requested`.
    ///
    /// When a sub-pass is selected, the requested pass's own render states are
    /// returned alongside it.
    fn effective(
        requested: &mut EffectPass,
        sub_pass: Option<usize>,
    ) -> Result<(&mut EffectPass, Option<RenderStates>), EffectError> {
        let Some(index) = sub_pass else {
            return Ok((requested, None));
        };
        let parent_states = requested.states();
        let parent_name = requested.name().to_string();
        match requested.sub_pass_mut(index) {
            Some(sub) => Ok((sub, Some(parent_states))),
            None => Err(EffectError::NoSuchSubPass {
                pass: parent_name,
                index,
            }),
        }
    }
}
