// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Batches 2D sprites into as few draw calls as possible.

A [`SpriteBatch`] collects sprites between [`begin`](SpriteBatch::begin) and
[`end`](SpriteBatch::end) without touching the GPU.  At `end` it orders them
according to the [`SpriteSortMode`], cuts the sequence into runs that share a
texture, and draws every run once per pass of its effect through the device's
shared vertex ring.

# Example

```
use passes_and_sprites::bindings::{BindSlot, BindStyle, Stage};
use passes_and_sprites::device::GraphicsDevice;
use passes_and_sprites::effects::{Effect, PassDescriptor, ShaderDescription};
use passes_and_sprites::recording::RecordingContext;
use passes_and_sprites::sprites::{
    Color, Rectangle, SpriteBatch, SpriteBatchConfig, SpriteBatchSettings, SpriteSortMode,
};

let mut context = RecordingContext::new();
let texture = context.create_texture(64, 64);
let mut device = GraphicsDevice::new(context);

let mut pixel = BindStyle::new();
pixel.bind_shader_resource("Texture", BindSlot::new(0));
let pass = PassDescriptor::new("Sprite")
    .with_shader(ShaderDescription::new("sprite_ps", Stage::Pixel, vec![1], pixel));
let effect = Effect::new(&mut device, "SpriteEffect", vec![pass]).unwrap();

let mut batch = SpriteBatch::new(&mut device, effect, SpriteBatchConfig::default()).unwrap();
batch.begin(&mut device, SpriteBatchSettings::new(SpriteSortMode::Deferred)).unwrap();
for i in 0..3 {
    batch.draw(&mut device, texture, Rectangle::new(i * 64, 0, 64, 64), Color::WHITE).unwrap();
}
batch.end(&mut device).unwrap();

let draws = device.context().draw_calls();
assert_eq!(draws.len(), 1);
assert_eq!(draws[0].index_count, 18);
```
*/

use std::collections::HashMap;

use crate::bindings::bind_style::Stage;
use crate::bindings::parameter::ParameterId;
use crate::bindings::resource_kind::ResourceKind;
use crate::device::{GraphicsDevice, NativeContext, NativeHandle, StateHandle};
use crate::effects::Effect;
use crate::sprites::SpriteBatchError;
use crate::sprites::geometry::{Color, Matrix, Rectangle, RectangleF, SpriteEffects, Vector2};
use crate::sprites::sort_mode::SpriteSortMode;
use crate::sprites::sprite_info::{SpriteInfo, TextureInfo};
use crate::sprites::vertex_ring::VertexRing;

/// Sizes and parameter names a sprite batch is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteBatchConfig {
    /// Most sprites drawn by one draw call.
    pub max_batch_size: u32,
    /// Fewest sprites worth drawing at the end of the vertex ring before wrapping.
    pub min_batch_size: u32,
    /// Shader resource parameter receiving each run's texture.
    pub texture_parameter: String,
    /// Constant buffer receiving the transform, if the effect has one.
    pub transform_parameter: String,
    pub initial_queue_capacity: usize,
}

impl Default for SpriteBatchConfig {
    fn default() -> Self {
        SpriteBatchConfig {
            max_batch_size: 2048,
            min_batch_size: 128,
            texture_parameter: "Texture".to_string(),
            transform_parameter: "MatrixTransform".to_string(),
            initial_queue_capacity: 64,
        }
    }
}

impl SpriteBatchConfig {
    pub fn validate(&self) -> Result<(), SpriteBatchError> {
        // 16-bit indices address at most 65536 vertices
        if self.max_batch_size as usize * 4 > u16::MAX as usize + 1 {
            return Err(SpriteBatchError::InvalidConfig(format!(
                "max_batch_size {} needs more than 65536 vertices",
                self.max_batch_size
            )));
        }
        if self.min_batch_size == 0 || self.min_batch_size > self.max_batch_size {
            return Err(SpriteBatchError::InvalidConfig(format!(
                "min_batch_size {} must be in 1..={}",
                self.min_batch_size, self.max_batch_size
            )));
        }
        Ok(())
    }
}

/// Per-`begin` settings.  States left `None` are not touched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpriteBatchSettings {
    pub sort_mode: SpriteSortMode,
    pub blend_state: Option<StateHandle>,
    pub depth_stencil_state: Option<StateHandle>,
    pub rasterizer_state: Option<StateHandle>,
    /// Bound to pixel sampler slot 0 after each pass is applied.
    pub sampler_state: Option<NativeHandle>,
    /// Applied before the viewport projection.
    pub transform: Matrix,
}

impl SpriteBatchSettings {
    pub fn new(sort_mode: SpriteSortMode) -> Self {
        SpriteBatchSettings {
            sort_mode,
            ..Default::default()
        }
    }
}

/// Optional per-sprite parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOptions {
    /// Texels to draw; the whole texture when `None`.
    pub source: Option<Rectangle>,
    pub color: Color,
    pub rotation: f32,
    /// Pivot in source texels.
    pub origin: Vector2,
    pub effects: SpriteEffects,
    pub depth: f32,
}

impl Default for DrawOptions {
    fn default() -> Self {
        DrawOptions {
            source: None,
            color: Color::WHITE,
            rotation: 0.0,
            origin: Vector2::ZERO,
            effects: SpriteEffects::NONE,
            depth: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct SpriteBatch {
    effect: Effect,
    config: SpriteBatchConfig,
    texture_parameter: ParameterId,
    has_transform: bool,
    settings: SpriteBatchSettings,
    is_batching: bool,
    queue: Vec<SpriteInfo>,
    sort_indices: Vec<usize>,
    sorted: Vec<SpriteInfo>,
    texture_cache: HashMap<NativeHandle, TextureInfo>,
}

fn vertex_ring<C: NativeContext>(device: &mut GraphicsDevice<C>) -> Result<(&mut C, &mut VertexRing), SpriteBatchError> {
    let (context, shared) = device.split_mut();
    let ring = shared
        .get_mut::<VertexRing>()
        .ok_or(SpriteBatchError::ForeignDevice)?;
    Ok((context, ring))
}

impl SpriteBatch {
    /// Creates a batch drawing with `effect`.
    ///
    /// The first batch on a device creates the shared vertex ring, sized for that
    /// batch's `max_batch_size`.  Later batches must not need more.
    pub fn new<C: NativeContext>(
        device: &mut GraphicsDevice<C>,
        effect: Effect,
        config: SpriteBatchConfig,
    ) -> Result<Self, SpriteBatchError> {
        config.validate()?;
        let texture_parameter = effect
            .find_parameter(&config.texture_parameter)
            .filter(|&id| effect.parameters().get(id).kind() == ResourceKind::ShaderResourceView)
            .ok_or_else(|| SpriteBatchError::MissingTextureParameter(config.texture_parameter.clone()))?;
        let has_transform = effect.constant_buffer(&config.transform_parameter).is_some();
        if !has_transform {
            logwise::warn_sync!(
                "Effect {effect} has no {parameter} constant buffer; sprites are drawn untransformed",
                effect = logwise::privacy::LogIt(effect.name()),
                parameter = logwise::privacy::LogIt(&config.transform_parameter)
            );
        }

        let (context, shared) = device.split_mut();
        let ring = shared.get_or_try_insert_with(|| VertexRing::create(context, config.max_batch_size))?;
        if config.max_batch_size > ring.capacity() {
            return Err(SpriteBatchError::SharedCapacityMismatch {
                requested: config.max_batch_size,
                capacity: ring.capacity(),
            });
        }

        Ok(SpriteBatch {
            effect,
            texture_parameter,
            has_transform,
            settings: SpriteBatchSettings::default(),
            is_batching: false,
            queue: Vec::with_capacity(config.initial_queue_capacity),
            sort_indices: Vec::new(),
            sorted: Vec::new(),
            texture_cache: HashMap::new(),
            config,
        })
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut Effect {
        &mut self.effect
    }

    pub fn config(&self) -> &SpriteBatchConfig {
        &self.config
    }

    pub fn is_batching(&self) -> bool {
        self.is_batching
    }

    /// Sprites queued since `begin`.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Starts collecting sprites.
    ///
    /// In [`SpriteSortMode::Immediate`] rendering state is set up right away, and no
    /// other batch on the device may use immediate mode until this one ends.
    pub fn begin<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        settings: SpriteBatchSettings,
    ) -> Result<(), SpriteBatchError> {
        if self.is_batching {
            return Err(SpriteBatchError::BeginCalledTwice);
        }
        if settings.sort_mode == SpriteSortMode::Immediate {
            let (_, ring) = vertex_ring(device)?;
            if ring.is_in_immediate_mode {
                return Err(SpriteBatchError::ImmediateModeInUse);
            }
            ring.is_in_immediate_mode = true;
            self.settings = settings;
            if let Err(e) = self.prepare_for_rendering(device) {
                vertex_ring(device)?.1.is_in_immediate_mode = false;
                return Err(e);
            }
        }
        self.settings = settings;
        self.is_batching = true;
        Ok(())
    }

    /// Draws `texture` stretched over `destination`.
    pub fn draw<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        texture: NativeHandle,
        destination: Rectangle,
        color: Color,
    ) -> Result<(), SpriteBatchError> {
        let options = DrawOptions {
            color,
            ..Default::default()
        };
        self.draw_sprite(device, texture, destination.into(), false, &options)
    }

    /// Draws `texture` at its own size with its top-left corner at `position`.
    pub fn draw_at<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        texture: NativeHandle,
        position: Vector2,
        color: Color,
    ) -> Result<(), SpriteBatchError> {
        let options = DrawOptions {
            color,
            ..Default::default()
        };
        self.draw_scaled(device, texture, position, Vector2::ONE, &options)
    }

    /// Draws the source texels at `position`, scaled by `scale`.
    pub fn draw_scaled<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        texture: NativeHandle,
        position: Vector2,
        scale: Vector2,
        options: &DrawOptions,
    ) -> Result<(), SpriteBatchError> {
        let destination = RectangleF::new(position.x, position.y, scale.x, scale.y);
        self.draw_sprite(device, texture, destination, true, options)
    }

    /// Draws the source texels over `destination`, in pixels.
    pub fn draw_to<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        texture: NativeHandle,
        destination: RectangleF,
        options: &DrawOptions,
    ) -> Result<(), SpriteBatchError> {
        self.draw_sprite(device, texture, destination, false, options)
    }

    /**
    Queues one sprite, or draws it right away in immediate mode.

    With `scale_destination`, the destination's width and height are factors
    applied to the source size rather than pixels.
    */
    fn draw_sprite<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        texture: NativeHandle,
        destination: RectangleF,
        scale_destination: bool,
        options: &DrawOptions,
    ) -> Result<(), SpriteBatchError> {
        if !self.is_batching {
            return Err(SpriteBatchError::DrawWithoutBegin);
        }
        let info = match self.texture_cache.get(&texture) {
            Some(info) => *info,
            None => {
                let (width, height) = device.context().texture_size(texture)?;
                let info = TextureInfo {
                    view: texture,
                    width,
                    height,
                };
                self.texture_cache.insert(texture, info);
                info
            }
        };
        let source = match options.source {
            Some(source) => RectangleF::from(source),
            None => RectangleF::new(0.0, 0.0, info.width as f32, info.height as f32),
        };
        let mut destination = destination;
        if scale_destination {
            destination.width *= source.width;
            destination.height *= source.height;
        }
        let sprite = SpriteInfo {
            source,
            destination,
            origin: options.origin,
            rotation: options.rotation,
            depth: options.depth,
            effects: options.effects,
            color: options.color,
            texture: info,
        };

        if self.settings.sort_mode == SpriteSortMode::Immediate {
            return self.draw_batch_per_texture(device, std::slice::from_ref(&sprite));
        }
        if self.queue.len() == self.queue.capacity() {
            let grow = self.queue.capacity().max(self.config.initial_queue_capacity).max(1);
            self.queue.reserve_exact(grow);
        }
        self.queue.push(sprite);
        Ok(())
    }

    /// Draws everything queued since `begin` and returns to idle.
    ///
    /// The batch is idle afterwards even if drawing failed.
    pub fn end<C: NativeContext>(&mut self, device: &mut GraphicsDevice<C>) -> Result<(), SpriteBatchError> {
        if !self.is_batching {
            return Err(SpriteBatchError::EndWithoutBegin);
        }
        let immediate = self.settings.sort_mode == SpriteSortMode::Immediate;
        let result = if immediate || self.queue.is_empty() {
            Ok(())
        } else {
            self.prepare_for_rendering(device)
                .and_then(|()| self.flush(device))
        };
        let released = self.release_pass(device);

        self.is_batching = false;
        self.queue.clear();
        self.texture_cache.clear();
        if immediate {
            vertex_ring(device)?.1.is_in_immediate_mode = false;
        }
        result.and(released)
    }

    /// Clears the texture the last pass bound, so it can be used as a render target.
    fn release_pass<C: NativeContext>(&mut self, device: &mut GraphicsDevice<C>) -> Result<(), SpriteBatchError> {
        match device.current_pass() {
            Some(key) if key.effect == self.effect.id() => {
                self.effect.unapply(device, key.pass, false)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn prepare_for_rendering<C: NativeContext>(&mut self, device: &mut GraphicsDevice<C>) -> Result<(), SpriteBatchError> {
        let settings = self.settings;
        if self.has_transform {
            let (width, height) = device.context().viewport();
            let transform = settings
                .transform
                .multiply(&Matrix::viewport_projection(width, height));
            self.effect
                .set_constant(&self.config.transform_parameter, 0, &transform)?;
        }
        let (context, ring) = vertex_ring(device)?;
        if let Some(state) = settings.blend_state {
            context.set_blend_state(Some(state));
        }
        if let Some(state) = settings.depth_stencil_state {
            context.set_depth_stencil_state(Some(state));
        }
        if let Some(state) = settings.rasterizer_state {
            context.set_rasterizer_state(Some(state));
        }
        ring.bind(context);
        Ok(())
    }

    fn flush<C: NativeContext>(&mut self, device: &mut GraphicsDevice<C>) -> Result<(), SpriteBatchError> {
        let sort_mode = self.settings.sort_mode;
        let sorts = sort_mode.sorts();
        if sorts {
            let sort = logwise::perfwarn_begin!("SpriteBatch sort");
            let queue = &self.queue;
            self.sort_indices.clear();
            self.sort_indices.extend(0..queue.len());
            // stable: sprites that compare equal keep their submission order
            match sort_mode {
                SpriteSortMode::Texture => self.sort_indices.sort_by_key(|&i| queue[i].texture.view),
                SpriteSortMode::BackToFront => self
                    .sort_indices
                    .sort_by(|&a, &b| queue[b].depth.total_cmp(&queue[a].depth)),
                SpriteSortMode::FrontToBack => self
                    .sort_indices
                    .sort_by(|&a, &b| queue[a].depth.total_cmp(&queue[b].depth)),
                SpriteSortMode::Deferred | SpriteSortMode::Immediate => {}
            }
            self.sorted.clear();
            self.sorted.extend(self.sort_indices.iter().map(|&i| queue[i]));
            drop(sort);
        }

        let sprites = std::mem::take(if sorts { &mut self.sorted } else { &mut self.queue });
        let result = self.draw_runs(device, &sprites);
        // hand the storage back so its capacity is reused
        if sorts {
            self.sorted = sprites;
        } else {
            self.queue = sprites;
        }
        result
    }

    /// Draws each maximal run of sprites sharing a texture.
    fn draw_runs<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        sprites: &[SpriteInfo],
    ) -> Result<(), SpriteBatchError> {
        let mut offset = 0;
        for i in 1..=sprites.len() {
            if i == sprites.len() || sprites[i].texture.view != sprites[offset].texture.view {
                self.draw_batch_per_texture(device, &sprites[offset..i])?;
                offset = i;
            }
        }
        logwise::trace_sync!("Flushed {count} sprites", count = sprites.len());
        Ok(())
    }

    /// Draws sprites sharing one texture once per effect pass.
    fn draw_batch_per_texture<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        sprites: &[SpriteInfo],
    ) -> Result<(), SpriteBatchError> {
        let Some(first) = sprites.first() else {
            return Ok(());
        };
        self.effect.parameters_mut().set_resource_by_id(
            self.texture_parameter,
            ResourceKind::ShaderResourceView,
            0,
            Some(first.texture.view),
        )?;
        let drawn = self.draw_every_pass(device, sprites);
        if drawn.is_err() {
            // a failed draw leaves no texture behind on the effect
            self.effect.parameters_mut().set_resource_by_id(
                self.texture_parameter,
                ResourceKind::ShaderResourceView,
                0,
                None,
            )?;
        }
        drawn
    }

    fn draw_every_pass<C: NativeContext>(
        &mut self,
        device: &mut GraphicsDevice<C>,
        sprites: &[SpriteInfo],
    ) -> Result<(), SpriteBatchError> {
        for pass in 0..self.effect.pass_count() {
            self.effect.apply(device, pass)?;
            let (context, ring) = vertex_ring(device)?;
            if let Some(sampler) = self.settings.sampler_state {
                context.bind_resources(Stage::Pixel, ResourceKind::SamplerState, 0, &[Some(sampler)]);
            }
            ring.draw(
                context,
                sprites,
                self.config.max_batch_size,
                self.config.min_batch_size,
            )?;
        }
        Ok(())
    }
}
