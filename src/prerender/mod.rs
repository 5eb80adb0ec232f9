//! Pre-rendered image tier
//!
//! When interactive rendering is ruled out, the viewer falls back to a set
//! of stills rendered offscreen at fixed orbit angles. The set is keyed by
//! the full configuration signature; a configuration change only marks the
//! set stale, and the expensive regeneration happens on the next tick so a
//! burst of changes costs one render pass.

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::config::signature::full_signature;
use crate::config::{ConfigSignature, ProductConfiguration};
use crate::core::Error;
use crate::render::cache::ResourceCache;
use crate::render::camera::{CameraUniform, OrbitCamera};
use crate::render::context::OffscreenContext;
use crate::render::environment::EnvironmentMap;
use crate::render::model::WatchModel;
use crate::render::pipeline::{CompositePipeline, PbrPipeline};
use crate::render::post::{CompositeParams, PostSettings};
use crate::render::session::{create_environment_texture, environment_bind_group};

use wgpu::util::DeviceExt;

/// Orbit angles of the still set, in degrees
pub const ANGLES: [u32; 8] = [0, 45, 90, 135, 180, 225, 270, 315];

const VIEW_PITCH: f32 = 0.4;

/// One generated set of stills
pub struct PrerenderedImageSet {
    pub signature: ConfigSignature,
    pub images: BTreeMap<u32, RgbaImage>,
}

/// Renders the full angle set for one configuration
pub trait AngleRenderer {
    fn render_set(&mut self, config: &ProductConfiguration) -> Result<PrerenderedImageSet, Error>;
}

/// What the cache tier can show right now
pub enum CacheView<'a> {
    Image { image: &'a RgbaImage, angle: u32 },
    /// No stills available; hosts show this summary next to a static card
    Placeholder { summary: &'a str },
}

/// Pre-rendered tier driver: deferred regeneration plus discrete angle stepping
pub struct CacheTier<R: AngleRenderer> {
    renderer: R,
    current: Option<PrerenderedImageSet>,
    pending: Option<ProductConfiguration>,
    angle_index: usize,
    summary: String,
}

impl<R: AngleRenderer> CacheTier<R> {
    pub fn new(renderer: R, config: &ProductConfiguration) -> Self {
        Self {
            renderer,
            current: None,
            pending: Some(config.clone()),
            angle_index: 0,
            summary: config.summary(),
        }
    }

    /// Mark the set stale; regeneration waits for [`tick`](Self::tick)
    pub fn set_config(&mut self, config: &ProductConfiguration) {
        self.summary = config.summary();
        let signature = full_signature(config);
        let up_to_date = self
            .current
            .as_ref()
            .is_some_and(|set| set.signature == signature);
        self.pending = if up_to_date {
            None
        } else {
            Some(config.clone())
        };
    }

    /// Regenerate if stale; returns true when a new set was produced
    pub fn tick(&mut self) -> bool {
        let Some(config) = self.pending.take() else {
            return false;
        };
        match self.renderer.render_set(&config) {
            Ok(set) => {
                log::info!("pre-rendered {} stills for {}", set.images.len(), set.signature);
                self.current = Some(set);
                true
            }
            Err(e) => {
                log::warn!("still generation failed, showing placeholder: {e}");
                self.current = None;
                false
            }
        }
    }

    /// Step to the neighbouring angle; negative steps go the other way
    pub fn step_angle(&mut self, steps: i32) {
        let len = ANGLES.len() as i32;
        self.angle_index = (self.angle_index as i32 + steps).rem_euclid(len) as usize;
    }

    pub fn angle(&self) -> u32 {
        ANGLES[self.angle_index]
    }

    pub fn view(&self) -> CacheView<'_> {
        let angle = self.angle();
        match self
            .current
            .as_ref()
            .and_then(|set| set.images.get(&angle))
        {
            Some(image) => CacheView::Image { image, angle },
            None => CacheView::Placeholder {
                summary: &self.summary,
            },
        }
    }
}

/// Flat card shown while no stills exist
pub fn placeholder_image(width: u32, height: u32) -> RgbaImage {
    let cx = width as f32 * 0.5;
    let cy = height as f32 * 0.5;
    let radius = width.min(height) as f32 * 0.3;
    RgbaImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        if (dx * dx + dy * dy).sqrt() < radius {
            image::Rgba([70, 70, 78, 255])
        } else {
            image::Rgba([24, 24, 28, 255])
        }
    })
}

/// GPU still generator over a surfaceless device
pub struct OffscreenRenderer {
    context: OffscreenContext,
    pbr: PbrPipeline,
    composite: CompositePipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    environment_bind_group: wgpu::BindGroup,
    cache: ResourceCache,
    model: Option<WatchModel>,
    width: u32,
    height: u32,
}

const STILL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

impl OffscreenRenderer {
    pub fn new(
        context: OffscreenContext,
        width: u32,
        height: u32,
        environment: &EnvironmentMap,
    ) -> Self {
        let device = &context.device;
        let pbr = PbrPipeline::new(device);
        let composite = CompositePipeline::new(device, STILL_FORMAT);

        let camera = OrbitCamera::new(width as f32 / height as f32);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("still_camera"),
            contents: bytemuck::bytes_of(&CameraUniform::from_camera(&camera)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("still_camera_bind_group"),
            layout: pbr.camera_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("still_environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let texture = create_environment_texture(device, &context.queue, environment);
        let environment_bind_group =
            environment_bind_group(device, pbr.environment_layout(), &texture, &sampler);

        Self {
            context,
            pbr,
            composite,
            camera_buffer,
            camera_bind_group,
            environment_bind_group,
            cache: ResourceCache::new(),
            model: None,
            width,
            height,
        }
    }

    fn render_angle(
        &mut self,
        camera: &mut OrbitCamera,
        angle: u32,
        targets: &StillTargets,
    ) -> Result<RgbaImage, Error> {
        camera.yaw = (angle as f32).to_radians();
        camera.pitch = VIEW_PITCH;
        self.context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(camera)),
        );

        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::RenderLoop("still model missing".into()))?;
        let draws = model.draws();

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("still_encoder"),
                });
        self.pbr.render(
            &mut encoder,
            &targets.color_view,
            &targets.depth_view,
            &self.camera_bind_group,
            &self.environment_bind_group,
            &draws,
        );
        self.composite
            .render(&mut encoder, &targets.output_view, &targets.input_bind_group);

        // Copy out with 256-byte aligned rows for the readback
        let bytes_per_pixel = 4u32;
        let padded_bytes_per_row = (self.width * bytes_per_pixel).div_ceil(256) * 256;
        let staging = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("still_staging"),
            size: (padded_bytes_per_row * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &targets.output,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.context
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .ok();

        match rx.recv() {
            Ok(Ok(())) => {}
            _ => return Err(Error::RenderLoop("still readback map failed".into())),
        }

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in 0..self.height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + (self.width * 4) as usize]);
        }
        drop(data);
        staging.unmap();

        RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| Error::RenderLoop("still readback size mismatch".into()))
    }
}

struct StillTargets {
    output: wgpu::Texture,
    output_view: wgpu::TextureView,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    input_bind_group: wgpu::BindGroup,
}

impl AngleRenderer for OffscreenRenderer {
    fn render_set(&mut self, config: &ProductConfiguration) -> Result<PrerenderedImageSet, Error> {
        let device = &self.context.device;

        match self.model.as_mut() {
            Some(model) => {
                model.apply_config(device, self.pbr.part_layout(), &mut self.cache, config);
            }
            None => {
                self.model = Some(WatchModel::build(
                    device,
                    self.pbr.part_layout(),
                    &mut self.cache,
                    config,
                ));
            }
        }

        // Stills always use the full post look
        let params = CompositeParams::from_settings(
            &PostSettings::for_tier(crate::capability::Tier::High),
            0.0,
        );
        self.composite.update_params(&self.context.queue, &params);

        let targets = self.create_targets();
        let mut camera = OrbitCamera::new(self.width as f32 / self.height as f32);

        let mut images = BTreeMap::new();
        for angle in ANGLES {
            images.insert(angle, self.render_angle(&mut camera, angle, &targets)?);
        }

        Ok(PrerenderedImageSet {
            signature: full_signature(config),
            images,
        })
    }
}

impl OffscreenRenderer {
    fn create_targets(&self) -> StillTargets {
        let device = &self.context.device;
        let size = wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("still_hdr"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PbrPipeline::COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("still_depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PbrPipeline::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let output = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("still_output"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STILL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("still_input_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let input_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("still_input_bind_group"),
            layout: self.composite.input_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        StillTargets {
            output,
            output_view,
            color_view,
            depth_view,
            input_bind_group,
        }
    }
}
