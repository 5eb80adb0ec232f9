//! Windowed render session
//!
//! One session owns the GPU context, the resource cache, the watch model and
//! both pipelines. The session is created after the orchestrator commits to
//! the GPU tier and torn down completely when the tier fails or the viewer
//! unmounts, releasing the platform context.

use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::capability::Tier;
use crate::config::ProductConfiguration;
use crate::core::time::FrameTimer;
use crate::core::Error;
use crate::render::cache::ResourceCache;
use crate::render::camera::{CameraUniform, OrbitCamera, OrbitController};
use crate::render::context::GpuContext;
use crate::render::environment::EnvironmentMap;
use crate::render::model::WatchModel;
use crate::render::pipeline::{CompositePipeline, PbrPipeline};
use crate::render::post::{CompositeParams, PostSettings, TARGET_FPS};
use crate::render::update::UpdateThrottle;

use wgpu::util::DeviceExt;

/// Consecutive frame failures before the session reports itself broken
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Minimum spacing between quality downgrades
const DOWNGRADE_COOLDOWN: Duration = Duration::from_secs(5);

/// Result of driving one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Frame presented (or recoverably skipped)
    Ok,
    /// Too many consecutive failures; the caller should fall back
    Faulted,
}

/// Cancellation handle for work spawned on behalf of a session
///
/// Background loads (environment presets, pre-rendered refresh) hold the
/// receiver and drop their results once the session is gone, so a torn-down
/// session never receives late uploads.
pub struct CancelGuard {
    tx: watch::Sender<bool>,
}

impl CancelGuard {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn cancel(&self) {
        // Receivers may already be gone; that is fine
        let _ = self.tx.send(true);
    }
}

/// Check a receiver without awaiting
pub fn is_cancelled(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

struct FrameTargets {
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    input_bind_group: wgpu::BindGroup,
}

pub struct RenderSession {
    context: GpuContext,
    pbr: PbrPipeline,
    composite: CompositePipeline,
    camera: OrbitCamera,
    controller: OrbitController,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    environment_bind_group: wgpu::BindGroup,
    environment_sampler: wgpu::Sampler,
    targets: FrameTargets,
    cache: ResourceCache,
    model: WatchModel,
    post: PostSettings,
    throttle: UpdateThrottle,
    timer: FrameTimer,
    cancel: CancelGuard,
    started: Instant,
    last_downgrade: Option<Instant>,
    consecutive_failures: u32,
}

impl RenderSession {
    pub fn new(
        context: GpuContext,
        tier: Tier,
        config: &ProductConfiguration,
        environment: &EnvironmentMap,
    ) -> Self {
        let device = &context.device;
        let (width, height) = context.size();

        let pbr = PbrPipeline::new(device);
        let composite = CompositePipeline::new(device, context.format());

        let camera = OrbitCamera::new(width as f32 / height as f32);
        let camera_uniform = CameraUniform::from_camera(&camera);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_uniform"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: pbr.camera_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let environment_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let mut cache = ResourceCache::new();
        let environment_texture = cache
            .textures
            .get_or_insert_with(&format!("env:{}", environment.name), || {
                create_environment_texture(device, &context.queue, environment)
            });
        let environment_bind_group = environment_bind_group(
            device,
            pbr.environment_layout(),
            &environment_texture,
            &environment_sampler,
        );

        let targets = create_targets(device, composite.input_layout(), width, height);

        let model = WatchModel::build(device, pbr.part_layout(), &mut cache, config);

        let post = PostSettings::for_tier(tier);
        log::info!("render session started: tier {tier:?}, {width}x{height}");

        let (cancel, _rx) = CancelGuard::new();

        Self {
            context,
            pbr,
            composite,
            camera,
            controller: OrbitController::new(),
            camera_buffer,
            camera_bind_group,
            environment_bind_group,
            environment_sampler,
            targets,
            cache,
            model,
            post,
            throttle: UpdateThrottle::new(),
            timer: FrameTimer::new(),
            cancel,
            started: Instant::now(),
            last_downgrade: None,
            consecutive_failures: 0,
        }
    }

    /// Cancellation receiver for background work tied to this session
    pub fn cancel_token(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context.resize(width, height);
        self.camera.set_aspect(width, height);
        self.targets = create_targets(
            &self.context.device,
            self.composite.input_layout(),
            width,
            height,
        );
    }

    /// Queue a configuration change; applied on a later frame by the throttle
    pub fn submit_config(&mut self, config: ProductConfiguration) {
        self.throttle.submit(config);
    }

    /// Apply pointer input for this frame
    pub fn apply_camera_input(&mut self, drag: (f32, f32), wheel: f32) {
        self.controller.update(&mut self.camera, drag, wheel);
    }

    /// Replace the environment probe (preset switch); textures are cached
    /// per preset so switching back costs nothing
    pub fn set_environment(&mut self, environment: &EnvironmentMap) {
        let texture = self
            .cache
            .textures
            .get_or_insert_with(&format!("env:{}", environment.name), || {
                create_environment_texture(&self.context.device, &self.context.queue, environment)
            });
        self.environment_bind_group = environment_bind_group(
            &self.context.device,
            self.pbr.environment_layout(),
            &texture,
            &self.environment_sampler,
        );
    }

    pub fn post_settings(&self) -> &PostSettings {
        &self.post
    }

    pub fn current_config(&self) -> &ProductConfiguration {
        self.model.config()
    }

    /// Drive one frame; after three consecutive failures the session asks
    /// the caller to fall back instead of erroring forever
    pub fn drive_frame(&mut self) -> FrameStatus {
        match self.render_frame() {
            Ok(()) => {
                self.consecutive_failures = 0;
                FrameStatus::Ok
            }
            Err(e) => {
                self.consecutive_failures += 1;
                log::warn!(
                    "frame failed ({} consecutive): {e}",
                    self.consecutive_failures
                );
                if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    FrameStatus::Faulted
                } else {
                    FrameStatus::Ok
                }
            }
        }
    }

    fn render_frame(&mut self) -> Result<(), Error> {
        self.timer.tick();

        if let Some(config) = self.throttle.poll(Instant::now()) {
            self.model.apply_config(
                &self.context.device,
                self.pbr.part_layout(),
                &mut self.cache,
                &config,
            );
        }

        self.adapt_quality();

        let camera_uniform = CameraUniform::from_camera(&self.camera);
        self.context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&camera_uniform),
        );

        let params =
            CompositeParams::from_settings(&self.post, self.started.elapsed().as_secs_f32());
        self.composite.update_params(&self.context.queue, &params);

        let surface_texture = self.context.get_current_texture()?;
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame_encoder"),
                });

        let draws = self.model.draws();
        self.pbr.render(
            &mut encoder,
            &self.targets.color_view,
            &self.targets.depth_view,
            &self.camera_bind_group,
            &self.environment_bind_group,
            &draws,
        );
        self.composite
            .render(&mut encoder, &surface_view, &self.targets.input_bind_group);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Step down the post chain when frame rate stays under target
    fn adapt_quality(&mut self) {
        if !self.timer.sustained_fps_below(TARGET_FPS) {
            return;
        }
        let cooled_down = self
            .last_downgrade
            .map_or(true, |at| at.elapsed() >= DOWNGRADE_COOLDOWN);
        if !cooled_down {
            return;
        }
        if self.post.downgrade() {
            self.last_downgrade = Some(Instant::now());
            let stats = self.timer.fps_stats();
            log::info!(
                "sustained {:.1} fps (target {TARGET_FPS}), reduced post chain: {:?}",
                stats.five_sec.avg,
                self.post
            );
        }
    }

    /// Release every GPU resource and the context itself
    pub fn teardown(mut self) {
        self.cancel.cancel();
        self.cache.dispose();
        log::info!("render session torn down");
        // `self.context` drops here, releasing the surface and device
    }
}

fn create_targets(
    device: &wgpu::Device,
    input_layout: &wgpu::BindGroupLayout,
    width: u32,
    height: u32,
) -> FrameTargets {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("hdr_color"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PbrPipeline::COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PbrPipeline::DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("composite_input_sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    let input_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("composite_input_bind_group"),
        layout: input_layout,
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

    FrameTargets {
        color_view,
        depth_view,
        input_bind_group,
    }
}

/// Upload an environment probe as a texture
///
/// Probe data is already clamped to [0, 1]; 8-bit sRGB keeps the texture
/// filterable without extra device features.
pub fn create_environment_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    environment: &EnvironmentMap,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: environment.width,
        height: environment.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("environment_probe"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &environment.to_rgba8(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * environment.width),
            rows_per_image: Some(environment.height),
        },
        size,
    );

    texture
}

/// Bind an environment texture for the PBR pass
pub fn environment_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("environment_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_guard_flips_receiver() {
        let (guard, rx) = CancelGuard::new();
        assert!(!is_cancelled(&rx));
        guard.cancel();
        assert!(is_cancelled(&rx));
    }

    #[test]
    fn test_cancel_guard_survives_dropped_receivers() {
        let (guard, rx) = CancelGuard::new();
        drop(rx);
        // Must not panic with no receivers left
        guard.cancel();
    }

    #[tokio::test]
    async fn test_late_result_dropped_after_cancel() {
        let (guard, rx) = CancelGuard::new();
        guard.cancel();

        // A background loader checks the token before applying its result
        let applied = if is_cancelled(&rx) { None } else { Some(42) };
        assert!(applied.is_none());
    }

    #[tokio::test]
    async fn test_spawned_task_drops_result_after_teardown() {
        let (guard, token) = CancelGuard::new();
        let (tx, mut results) = tokio::sync::mpsc::unbounded_channel();

        // Preload task finishing only after the session is gone
        let task = tokio::spawn(async move {
            tokio::task::yield_now().await;
            if is_cancelled(&token) {
                return;
            }
            let _ = tx.send("showroom");
        });

        guard.cancel();
        task.await.unwrap();
        assert!(results.try_recv().is_err());
    }
}
