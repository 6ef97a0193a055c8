// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Effect passes: a set of stage shaders, their compiled bind layout, and the
render states the pass overrides.

A pass is compiled once, when its effect is created.  Compiling resolves each
shader's bindings against the effect's parameters, runs the slot-link compiler
per stage and plans the pass's [`SlotLinkLayout`].  Applying a pass afterwards
is a walk over precomputed descriptors; the only data-dependent step is the
gather of whatever resources are currently set.
*/

use crate::bindings::bind_style::Stage;
use crate::bindings::resource_kind::ResourceKind;
use crate::bindings::slot_link::{StageBinding, StageSlotLinks, prepare_slot_links};
use crate::bindings::slot_link_layout::SlotLinkLayout;
use crate::device::{FeatureLevel, NativeContext, NativeHandle, ShaderHandle, StateHandle, UAV_COUNTER_UNCHANGED};
use crate::effects::EffectError;
use crate::effects::parameters::EffectParameters;
use crate::effects::shader::ShaderDescription;

const NO_RESOURCES: [Option<NativeHandle>; ResourceKind::MAX_SLOTS] = [None; ResourceKind::MAX_SLOTS];
const UNCHANGED_COUNTERS: [i32; ResourceKind::UnorderedAccessView.max_slots() as usize] =
    [UAV_COUNTER_UNCHANGED; ResourceKind::UnorderedAccessView.max_slots() as usize];

/// Device states a pass may override.  `None` means "leave the device alone".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStates {
    pub blend: Option<StateHandle>,
    pub depth_stencil: Option<StateHandle>,
    pub rasterizer: Option<StateHandle>,
}

impl RenderStates {
    pub(crate) fn apply<C: NativeContext + ?Sized>(self, context: &mut C) {
        if let Some(blend) = self.blend {
            context.set_blend_state(Some(blend));
        }
        if let Some(depth_stencil) = self.depth_stencil {
            context.set_depth_stencil_state(Some(depth_stencil));
        }
        if let Some(rasterizer) = self.rasterizer {
            context.set_rasterizer_state(Some(rasterizer));
        }
    }

    /// Resets the declared states to the device defaults.
    pub(crate) fn reset<C: NativeContext + ?Sized>(self, context: &mut C) {
        if self.blend.is_some() {
            context.set_blend_state(None);
        }
        if self.depth_stencil.is_some() {
            context.set_depth_stencil_state(None);
        }
        if self.rasterizer.is_some() {
            context.set_rasterizer_state(None);
        }
    }
}

/// Describes a pass before it is compiled.
///
/// ```
/// use passes_and_sprites::bindings::{BindSlot, BindStyle, Stage};
/// use passes_and_sprites::effects::{PassDescriptor, ShaderDescription};
///
/// let mut pixel_bindings = BindStyle::new();
/// pixel_bindings.bind_shader_resource("Texture", BindSlot::new(0));
/// let pass = PassDescriptor::new("Draw")
///     .with_shader(ShaderDescription::new("draw_ps", Stage::Pixel, vec![0; 4], pixel_bindings))
///     .with_sub_pass(PassDescriptor::new("Draw.Outline"));
/// assert_eq!(pass.name(), "Draw");
/// ```
#[derive(Debug, Clone)]
pub struct PassDescriptor {
    name: String,
    shaders: Vec<ShaderDescription>,
    states: RenderStates,
    sub_passes: Vec<PassDescriptor>,
}

impl PassDescriptor {
    pub fn new(name: &str) -> Self {
        PassDescriptor {
            name: name.to_string(),
            shaders: Vec::new(),
            states: RenderStates::default(),
            sub_passes: Vec::new(),
        }
    }

    pub fn with_shader(mut self, shader: ShaderDescription) -> Self {
        self.shaders.push(shader);
        self
    }

    pub fn with_blend_state(mut self, state: StateHandle) -> Self {
        self.states.blend = Some(state);
        self
    }

    pub fn with_depth_stencil_state(mut self, state: StateHandle) -> Self {
        self.states.depth_stencil = Some(state);
        self
    }

    pub fn with_rasterizer_state(mut self, state: StateHandle) -> Self {
        self.states.rasterizer = Some(state);
        self
    }

    pub fn with_sub_pass(mut self, sub_pass: PassDescriptor) -> Self {
        self.sub_passes.push(sub_pass);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct PassStage {
    stage: Stage,
    shader: ShaderHandle,
    /// Constant buffers this stage reads, as indices into the effect's buffers.
    constant_buffers: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct EffectPass {
    name: String,
    stages: Vec<PassStage>,
    layout: SlotLinkLayout,
    states: RenderStates,
    sub_passes: Vec<EffectPass>,
}

impl EffectPass {
    pub(crate) fn compile<C: NativeContext + ?Sized>(
        context: &mut C,
        feature_level: FeatureLevel,
        parameters: &mut EffectParameters,
        descriptor: PassDescriptor,
    ) -> Result<EffectPass, EffectError> {
        let mut stages: Vec<PassStage> = Vec::with_capacity(descriptor.shaders.len());
        let mut compiled: Vec<(Stage, StageSlotLinks)> = Vec::with_capacity(descriptor.shaders.len());
        for shader in &descriptor.shaders {
            if stages.iter().any(|s| s.stage == shader.stage()) {
                logwise::warn_sync!(
                    "Pass {pass} already has a {stage} shader; ignoring {shader}",
                    pass = logwise::privacy::LogIt(&descriptor.name),
                    stage = logwise::privacy::LogIt(&shader.stage()),
                    shader = logwise::privacy::LogIt(shader.name())
                );
                continue;
            }
            if shader.minimum_feature_level() > feature_level {
                logwise::error_sync!(
                    "Shader {shader} needs {required} but the device is {level}; {stage} stage of pass {pass} stays unbound",
                    shader = logwise::privacy::LogIt(shader.name()),
                    required = logwise::privacy::LogIt(&shader.minimum_feature_level()),
                    level = logwise::privacy::LogIt(&feature_level),
                    stage = logwise::privacy::LogIt(&shader.stage()),
                    pass = logwise::privacy::LogIt(&descriptor.name)
                );
                continue;
            }
            let handle = match context.create_shader(shader) {
                Ok(handle) => handle,
                Err(e) => {
                    logwise::error_sync!(
                        "{stage} stage of pass {pass} stays unbound: {error}",
                        stage = logwise::privacy::LogIt(&shader.stage()),
                        pass = logwise::privacy::LogIt(&descriptor.name),
                        error = logwise::privacy::LogIt(&e)
                    );
                    continue;
                }
            };

            let mut bindings: Vec<StageBinding> = Vec::with_capacity(shader.bind_style().len());
            let mut constant_buffers = Vec::new();
            for binding in shader.bind_style().iter() {
                let Some(declared) = parameters.declare(context, binding)? else {
                    continue;
                };
                bindings.push(declared.binding);
                if let Some(buffer) = declared.constant_buffer
                    && !constant_buffers.contains(&buffer)
                {
                    constant_buffers.push(buffer);
                }
            }
            // reflection order is not guaranteed to be slot order
            bindings.sort_by_key(|b| (b.kind, b.slot));
            compiled.push((shader.stage(), prepare_slot_links(&bindings)?));
            stages.push(PassStage {
                stage: shader.stage(),
                shader: handle,
                constant_buffers,
            });
        }

        let layout = SlotLinkLayout::plan(&compiled);
        let sub_passes = descriptor
            .sub_passes
            .into_iter()
            .map(|sub_pass| EffectPass::compile(context, feature_level, parameters, sub_pass))
            .collect::<Result<Vec<_>, _>>()?;
        logwise::info_sync!(
            "Pass {pass} compiled: {stages} stages, {descriptors} bind ranges, {gather} gathered slots",
            pass = logwise::privacy::LogIt(&descriptor.name),
            stages = stages.len(),
            descriptors = layout.descriptor_count(),
            gather = layout.gather_len()
        );
        Ok(EffectPass {
            name: descriptor.name,
            stages,
            layout,
            states: descriptor.states,
            sub_passes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The render states this pass declares.
    pub fn states(&self) -> RenderStates {
        self.states
    }

    pub fn layout(&self) -> &SlotLinkLayout {
        &self.layout
    }

    /// Stages that have a shader in this pass.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().map(|s| s.stage)
    }

    pub fn sub_passes(&self) -> &[EffectPass] {
        &self.sub_passes
    }

    pub(crate) fn sub_pass_mut(&mut self, index: usize) -> Option<&mut EffectPass> {
        self.sub_passes.get_mut(index)
    }

    /// Gathers the current resources and binds shaders, constant buffers and
    /// every resource range.  Render states are handled by the caller.
    pub(crate) fn apply_internal<C: NativeContext + ?Sized>(
        &mut self,
        context: &mut C,
        parameters: &mut EffectParameters,
    ) {
        let (table, constant_buffers) = parameters.split_for_apply();
        self.layout.gather(table);
        for stage in &self.stages {
            context.bind_shader(stage.stage, Some(stage.shader));
            for &buffer in &stage.constant_buffers {
                if constant_buffers[buffer].upload_if_dirty(context) {
                    logwise::trace_sync!(
                        "Uploaded constant buffer {name}",
                        name = logwise::privacy::LogIt(constant_buffers[buffer].name())
                    );
                }
            }
            for kind in ResourceKind::ALL {
                for descriptor in self.layout.descriptors(stage.stage, kind) {
                    let resources = self.layout.resources(descriptor, table);
                    if kind == ResourceKind::UnorderedAccessView {
                        let counters = self.layout.uav_initial_counts(descriptor, table);
                        context.bind_unordered_access(stage.stage, descriptor.start_slot, resources, counters);
                    } else {
                        context.bind_resources(stage.stage, kind, descriptor.start_slot, resources);
                    }
                }
            }
        }
    }

    /**
    Unbinds what [`apply_internal`](Self::apply_internal) bound.

    Shader resource and unordered access ranges are always cleared, so their
    resources can be bound as outputs afterwards.  Constant buffers, samplers and
    shaders are only cleared by a full unapply.
    */
    pub(crate) fn unapply_internal<C: NativeContext + ?Sized>(&self, context: &mut C, full: bool) {
        for stage in &self.stages {
            for kind in ResourceKind::ALL {
                let always = matches!(
                    kind,
                    ResourceKind::ShaderResourceView | ResourceKind::UnorderedAccessView
                );
                if !always && !full {
                    continue;
                }
                for descriptor in self.layout.descriptors(stage.stage, kind) {
                    let count = descriptor.slot_count as usize;
                    if kind == ResourceKind::UnorderedAccessView {
                        context.bind_unordered_access(
                            stage.stage,
                            descriptor.start_slot,
                            &NO_RESOURCES[..count],
                            &UNCHANGED_COUNTERS[..count],
                        );
                    } else {
                        context.bind_resources(stage.stage, kind, descriptor.start_slot, &NO_RESOURCES[..count]);
                    }
                }
            }
            if full {
                context.bind_shader(stage.stage, None);
            }
        }
    }
}
