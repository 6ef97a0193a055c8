// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Applying and unapplying effect passes, checked against the recorded native calls.

use passes_and_sprites::bindings::{BindSlot, BindStyle, BindingError, ResourceKind, Stage};
use passes_and_sprites::device::{FeatureLevel, GraphicsDevice, NativeHandle};
use passes_and_sprites::effects::{
    Effect, EffectError, EffectPass, PassDescriptor, PassKey, PassSelection, ShaderDescription,
};
use passes_and_sprites::recording::{Command, RecordingContext};

const SRV: ResourceKind = ResourceKind::ShaderResourceView;

fn shader(name: &str, stage: Stage, bind: impl FnOnce(&mut BindStyle)) -> ShaderDescription {
    let mut style = BindStyle::new();
    bind(&mut style);
    ShaderDescription::new(name, stage, vec![0x44, 0x58, 0x42, 0x43], style)
}

fn resource_binds(device: &GraphicsDevice<RecordingContext>, stage: Stage, kind: ResourceKind) -> Vec<(u32, Vec<Option<NativeHandle>>)> {
    device
        .context()
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::BindResources {
                stage: s,
                kind: k,
                start_slot,
                resources,
            } if *s == stage && *k == kind => Some((*start_slot, resources.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn parameters_are_shared_across_stages() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main")
        .with_shader(shader("vs", Stage::Vertex, |s| {
            s.bind_shader_resource("A", BindSlot::new(0));
            s.bind_shader_resource("B", BindSlot::new(1));
        }))
        .with_shader(shader("ps", Stage::Pixel, |s| {
            s.bind_shader_resource("B", BindSlot::new(0));
            s.bind_shader_resource("A", BindSlot::new(1));
        }));
    let mut effect = Effect::new(&mut device, "Shared", vec![pass]).unwrap();
    assert_eq!(effect.parameters().len(), 2);

    let a = device.context_mut().create_texture(1, 1);
    let b = device.context_mut().create_texture(1, 1);
    effect.set_resource("A", Some(a)).unwrap();
    effect.set_resource("B", Some(b)).unwrap();
    effect.apply(&mut device, 0).unwrap();

    // each stage gets exactly one bind call, in its own slot order
    assert_eq!(resource_binds(&device, Stage::Vertex, SRV), vec![(0, vec![Some(a), Some(b)])]);
    assert_eq!(resource_binds(&device, Stage::Pixel, SRV), vec![(0, vec![Some(b), Some(a)])]);

    let layout = effect.pass(0).unwrap().layout();
    // the vertex range reads the table directly, the pixel range is gathered
    assert_eq!(layout.gather_len(), 2);
}

#[test]
fn gathered_ranges_see_resources_set_between_applies() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_shader_resource("Second", BindSlot::new(2));
        s.bind_shader_resource("First", BindSlot::new(0));
    }));
    let mut effect = Effect::new(&mut device, "Gap", vec![pass]).unwrap();
    let first = device.context_mut().create_texture(1, 1);
    let second = device.context_mut().create_texture(1, 1);

    effect.set_resource("Second", Some(second)).unwrap();
    effect.apply(&mut device, 0).unwrap();
    effect.set_resource("First", Some(first)).unwrap();
    effect.apply(&mut device, 0).unwrap();

    // one gap slot is bridged; the range covers slots 0..3
    assert_eq!(
        resource_binds(&device, Stage::Pixel, SRV),
        vec![
            (0, vec![None, None, Some(second)]),
            (0, vec![Some(first), None, Some(second)]),
        ]
    );
}

#[test]
fn dirty_constant_buffers_upload_once() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main")
        .with_shader(shader("vs", Stage::Vertex, |s| s.bind_constant_buffer("Globals", BindSlot::new(0), 16)))
        .with_shader(shader("ps", Stage::Pixel, |s| s.bind_constant_buffer("Globals", BindSlot::new(1), 16)));
    let mut effect = Effect::new(&mut device, "Constants", vec![pass]).unwrap();
    let buffer = effect.constant_buffer("Globals").unwrap().handle();

    effect.apply(&mut device, 0).unwrap();
    assert_eq!(device.context().uploads(buffer), 1);
    effect.apply(&mut device, 0).unwrap();
    assert_eq!(device.context().uploads(buffer), 1);

    effect.set_constant("Globals", 4, &2.5f32).unwrap();
    assert!(effect.constant_buffer("Globals").unwrap().is_dirty());
    effect.apply(&mut device, 0).unwrap();
    assert_eq!(device.context().uploads(buffer), 2);
    assert_eq!(&device.context().buffer_contents(buffer).unwrap()[4..8], &2.5f32.to_ne_bytes());

    // both stages bind the same native buffer
    let native = Some(buffer.as_native());
    assert_eq!(device.context().bound(Stage::Vertex, ResourceKind::ConstantBuffer, 0), native);
    assert_eq!(device.context().bound(Stage::Pixel, ResourceKind::ConstantBuffer, 1), native);
}

#[test]
fn constant_writes_are_checked() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_constant_buffer("Globals", BindSlot::new(0), 8);
        s.bind_shader_resource("Texture", BindSlot::new(0));
    }));
    let mut effect = Effect::new(&mut device, "Constants", vec![pass]).unwrap();
    assert!(matches!(
        effect.set_constant("Globals", 4, &[0u32; 2]),
        Err(EffectError::ConstantBufferOverflow { size: 8, .. })
    ));
    assert!(matches!(
        effect.set_constant_bytes("Texture", 0, &[0]),
        Err(EffectError::Binding(BindingError::KindMismatch { .. }))
    ));
    assert!(matches!(
        effect.set_resource("Globals", None),
        Err(BindingError::KindMismatch { .. })
    ));
    assert!(matches!(
        effect.set_resource("Missing", None),
        Err(BindingError::UnknownParameter(_))
    ));
}

#[test]
fn shaders_the_device_cannot_run_leave_their_stage_unbound() {
    let context = RecordingContext::new()
        .with_feature_level(FeatureLevel::Level10_0)
        .reject_shader("broken_gs");
    let mut device = GraphicsDevice::new(context);
    let pass = PassDescriptor::new("Main")
        .with_shader(
            shader("hs", Stage::Hull, |s| s.bind_shader_resource("HullOnly", BindSlot::new(0)))
                .with_minimum_feature_level(FeatureLevel::Level11_0),
        )
        .with_shader(shader("broken_gs", Stage::Geometry, |_| {}))
        .with_shader(shader("ps", Stage::Pixel, |s| s.bind_shader_resource("Texture", BindSlot::new(0))));
    let mut effect = Effect::new(&mut device, "Degraded", vec![pass]).unwrap();
    effect.apply(&mut device, 0).unwrap();

    assert_eq!(effect.pass(0).unwrap().stages().collect::<Vec<_>>(), vec![Stage::Pixel]);
    assert!(effect.parameter("HullOnly").is_none());
    assert_eq!(device.context().bound_shader(Stage::Hull), None);
    assert_eq!(device.context().bound_shader(Stage::Geometry), None);
    assert!(device.context().bound_shader(Stage::Pixel).is_some());
}

#[test]
fn partial_unapply_only_releases_views() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_constant_buffer("Globals", BindSlot::new(0), 16);
        s.bind_shader_resource("Texture", BindSlot::new(0));
        s.bind_unordered_access("Output", BindSlot::new(1));
        s.bind_sampler("Sampler", BindSlot::new(0));
    }));
    let mut effect = Effect::new(&mut device, "Unapply", vec![pass]).unwrap();
    let texture = device.context_mut().create_texture(4, 4);
    let output = device.context_mut().create_view();
    let sampler = device.context_mut().create_view();
    effect.set_resource("Texture", Some(texture)).unwrap();
    effect.set_unordered_access("Output", Some(output), 0).unwrap();
    effect.set_resource("Sampler", Some(sampler)).unwrap();

    let key = effect.apply(&mut device, 0).unwrap();
    assert_eq!(device.current_pass(), Some(key));
    let ctx = device.context();
    assert_eq!(ctx.bound(Stage::Pixel, SRV, 0), Some(texture));
    assert_eq!(ctx.bound(Stage::Pixel, ResourceKind::UnorderedAccessView, 1), Some(output));
    let counters = ctx.commands().iter().find_map(|c| match c {
        Command::BindUnorderedAccess { initial_counters, .. } => Some(initial_counters.clone()),
        _ => None,
    });
    assert_eq!(counters, Some(vec![0]));

    effect.unapply(&mut device, 0, false).unwrap();
    assert_eq!(device.current_pass(), None);
    let ctx = device.context();
    assert_eq!(ctx.bound(Stage::Pixel, SRV, 0), None);
    assert_eq!(ctx.bound(Stage::Pixel, ResourceKind::UnorderedAccessView, 1), None);
    assert_eq!(ctx.bound(Stage::Pixel, ResourceKind::SamplerState, 0), Some(sampler));
    assert!(ctx.bound(Stage::Pixel, ResourceKind::ConstantBuffer, 0).is_some());
    assert!(ctx.bound_shader(Stage::Pixel).is_some());

    effect.apply(&mut device, 0).unwrap();
    effect.unapply(&mut device, 0, true).unwrap();
    let ctx = device.context();
    assert_eq!(ctx.bound(Stage::Pixel, ResourceKind::SamplerState, 0), None);
    assert_eq!(ctx.bound(Stage::Pixel, ResourceKind::ConstantBuffer, 0), None);
    assert_eq!(ctx.bound_shader(Stage::Pixel), None);
}

#[test]
fn substituted_sub_pass_gets_the_requested_pass_states() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let parent_blend = device.context_mut().create_state();
    let parent_rasterizer = device.context_mut().create_state();
    let sub_blend = device.context_mut().create_state();
    let pass = PassDescriptor::new("Outline")
        .with_shader(shader("ps", Stage::Pixel, |_| {}))
        .with_blend_state(parent_blend)
        .with_rasterizer_state(parent_rasterizer)
        .with_sub_pass(
            PassDescriptor::new("Outline.Wide")
                .with_shader(shader("ps_wide", Stage::Pixel, |_| {}))
                .with_blend_state(sub_blend),
        );
    let mut effect = Effect::new(&mut device, "States", vec![pass])
        .unwrap()
        .with_strategy(|_: usize, pass: &EffectPass| {
            if pass.sub_passes().is_empty() {
                PassSelection::Pass
            } else {
                PassSelection::SubPass(0)
            }
        });

    let key = effect.apply(&mut device, 0).unwrap();
    assert_eq!(
        key,
        PassKey {
            effect: effect.id(),
            pass: 0,
            sub_pass: Some(0)
        }
    );
    let states: Vec<_> = device
        .context()
        .commands()
        .iter()
        .filter(|c| {
            matches!(
                c,
                Command::SetBlendState(_) | Command::SetDepthStencilState(_) | Command::SetRasterizerState(_)
            )
        })
        .cloned()
        .collect();
    // the sub-pass's states first, then the requested pass's on top
    assert_eq!(
        states,
        vec![
            Command::SetBlendState(Some(sub_blend)),
            Command::SetBlendState(Some(parent_blend)),
            Command::SetRasterizerState(Some(parent_rasterizer)),
        ]
    );

    // the sub-pass shader is what got bound
    let wide = device.context().commands().iter().find_map(|c| match c {
        Command::CreateShader { name, shader, .. } if name == "ps_wide" => Some(*shader),
        _ => None,
    });
    assert_eq!(device.context().bound_shader(Stage::Pixel), wide);

    device.context_mut().clear_commands();
    effect.unapply(&mut device, 0, true).unwrap();
    assert!(device.context().commands().contains(&Command::SetBlendState(None)));
    assert!(device.context().commands().contains(&Command::SetRasterizerState(None)));
    assert!(!device.context().commands().contains(&Command::SetDepthStencilState(None)));
}

#[test]
fn strategies_cannot_pick_missing_sub_passes() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |_| {}));
    let mut effect = Effect::new(&mut device, "Bad", vec![pass])
        .unwrap()
        .with_strategy(|_: usize, _: &EffectPass| PassSelection::SubPass(3));
    assert!(matches!(
        effect.apply(&mut device, 0),
        Err(EffectError::NoSuchSubPass { index: 3, .. })
    ));
    assert!(matches!(
        effect.apply(&mut device, 1),
        Err(EffectError::NoSuchPass { index: 1, .. })
    ));
    assert_eq!(device.current_pass(), None);
}

#[test]
fn applying_a_pass_supersedes_the_current_one() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let passes = vec![
        PassDescriptor::new("First").with_shader(shader("ps0", Stage::Pixel, |_| {})),
        PassDescriptor::new("Second").with_shader(shader("ps1", Stage::Pixel, |_| {})),
    ];
    let mut effect = Effect::new(&mut device, "Two", passes).unwrap();
    assert_eq!(effect.find_pass("Second"), Some(1));
    effect.apply(&mut device, 0).unwrap();
    let second = effect.apply(&mut device, 1).unwrap();
    assert_eq!(device.current_pass(), Some(second));

    // unapplying a pass that is not current leaves the current pass alone
    effect.unapply(&mut device, 0, false).unwrap();
    assert_eq!(device.current_pass(), Some(second));
}

#[test]
fn conflicting_declarations_keep_the_first() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main")
        .with_shader(shader("vs", Stage::Vertex, |s| s.bind_shader_resource("Texture", BindSlot::new(0))))
        .with_shader(shader("ps", Stage::Pixel, |s| {
            s.bind_sampler("Texture", BindSlot::new(0));
            s.bind_shader_resource("Other", BindSlot::new(0));
        }));
    let mut effect = Effect::new(&mut device, "Conflict", vec![pass]).unwrap();
    assert_eq!(effect.parameter("Texture").unwrap().kind(), SRV);

    let texture = device.context_mut().create_texture(1, 1);
    effect.set_resource("Texture", Some(texture)).unwrap();
    effect.apply(&mut device, 0).unwrap();
    assert_eq!(device.context().bound(Stage::Vertex, SRV, 0), Some(texture));
    // the conflicting pixel binding was dropped
    assert!(resource_binds(&device, Stage::Pixel, ResourceKind::SamplerState).is_empty());
}

#[test]
fn overlapping_slots_fail_the_effect() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_shader_resource_array("Array", BindSlot::new(0), 4);
        s.bind_shader_resource("Inside", BindSlot::new(2));
    }));
    assert!(matches!(
        Effect::new(&mut device, "Overlap", vec![pass]),
        Err(EffectError::Binding(BindingError::UnorderedSlots { .. }))
    ));
}

#[test]
fn slots_past_the_native_limit_fail_the_effect() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_shader_resource("Far", BindSlot::new(u32::MAX));
    }));
    assert!(matches!(
        Effect::new(&mut device, "Far", vec![pass]),
        Err(EffectError::Binding(BindingError::SlotOutOfRange { slot: u32::MAX, max: 128, .. }))
    ));
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_shader_resource_array("Wide", BindSlot::new(1), u32::MAX);
    }));
    assert!(matches!(
        Effect::new(&mut device, "Wide", vec![pass]),
        Err(EffectError::Binding(BindingError::SlotOutOfRange { count: u32::MAX, .. }))
    ));
}

#[test]
fn array_writes_that_do_not_fit_change_nothing() {
    let mut device = GraphicsDevice::new(RecordingContext::new());
    let pass = PassDescriptor::new("Main").with_shader(shader("ps", Stage::Pixel, |s| {
        s.bind_shader_resource_array("Layers", BindSlot::new(0), 2);
    }));
    let mut effect = Effect::new(&mut device, "Layers", vec![pass]).unwrap();
    let a = device.context_mut().create_texture(1, 1);
    let b = device.context_mut().create_texture(1, 1);

    assert_eq!(
        effect.set_resource_array("Layers", 1, &[Some(a), Some(b)]),
        Err(BindingError::ElementOutOfRange {
            name: "Layers".to_string(),
            index: 2,
            element_count: 2,
        })
    );
    assert!(matches!(
        effect.set_resource_array("Layers", u32::MAX, &[Some(a)]),
        Err(BindingError::ElementOutOfRange { index: u32::MAX, .. })
    ));
    assert_eq!(effect.parameters().table().resources().to_vec(), vec![None, None]);

    effect.set_resource_array("Layers", 0, &[Some(a), Some(b)]).unwrap();
    assert_eq!(effect.parameters().table().resources().to_vec(), vec![Some(a), Some(b)]);
}
