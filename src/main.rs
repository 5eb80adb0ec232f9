//! Vitrine viewer
//!
//! Desktop shell around the adaptive viewer: probes the device, lets the
//! orchestrator pick a tier, then either drives the windowed GPU session or
//! emits the non-interactive tiers' output as PNG files.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use vitrine::capability::CapabilityProbe;
use vitrine::config::{
    CaseMaterial, DialColor, ProductConfiguration, StrapColor, StrapMaterial,
};
use vitrine::core::{input::InputState, logging};
use vitrine::orchestrator::{Orchestrator, ViewerState};
use vitrine::prerender::{AngleRenderer, CacheTier, CacheView, OffscreenRenderer};
use vitrine::raster::SoftwareRenderer;
use vitrine::render::environment::{EnvironmentLoader, EnvironmentMap, HttpFetcher};
use vitrine::render::session::{is_cancelled, FrameStatus, RenderSession};
use vitrine::render::GpuContext;

struct App {
    runtime: tokio::runtime::Handle,
    orchestrator: Orchestrator,
    config: ProductConfiguration,
    window: Option<Arc<Window>>,
    session: Option<RenderSession>,
    input: InputState,
    /// Presets warmed by the background preload task
    environments: Vec<Arc<EnvironmentMap>>,
    environment_index: usize,
    preloaded: Option<tokio::sync::mpsc::UnboundedReceiver<Arc<EnvironmentMap>>>,
}

impl App {
    fn new(
        runtime: tokio::runtime::Handle,
        orchestrator: Orchestrator,
        config: ProductConfiguration,
    ) -> Self {
        Self {
            runtime,
            orchestrator,
            config,
            window: None,
            session: None,
            input: InputState::new(),
            environments: Vec::new(),
            environment_index: 0,
            preloaded: None,
        }
    }

    /// Cycle one configuration field from the keyboard and resubmit
    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::KeyC => {
                self.config.case_material = match self.config.case_material {
                    CaseMaterial::Steel => CaseMaterial::Gold,
                    CaseMaterial::Gold => CaseMaterial::RoseGold,
                    CaseMaterial::RoseGold => CaseMaterial::Titanium,
                    CaseMaterial::Titanium => CaseMaterial::Steel,
                };
            }
            KeyCode::KeyD => {
                self.config.dial_color = match self.config.dial_color {
                    DialColor::Black => DialColor::White,
                    DialColor::White => DialColor::Silver,
                    DialColor::Silver => DialColor::Blue,
                    DialColor::Blue => DialColor::Green,
                    DialColor::Green => DialColor::Champagne,
                    DialColor::Champagne => DialColor::Black,
                };
            }
            KeyCode::KeyS => {
                self.config.strap_color = match self.config.strap_color {
                    StrapColor::Black => StrapColor::Brown,
                    StrapColor::Brown => StrapColor::Tan,
                    StrapColor::Tan => StrapColor::Navy,
                    StrapColor::Navy => StrapColor::Black,
                };
            }
            KeyCode::KeyB => {
                self.config.strap_material = match self.config.strap_material {
                    StrapMaterial::Leather => StrapMaterial::Rubber,
                    StrapMaterial::Rubber => StrapMaterial::SteelBracelet,
                    StrapMaterial::SteelBracelet => StrapMaterial::Leather,
                };
            }
            KeyCode::KeyE => {
                if self.environments.len() > 1 {
                    self.environment_index =
                        (self.environment_index + 1) % self.environments.len();
                    let environment = self.environments[self.environment_index].clone();
                    log::info!("environment: {}", environment.name);
                    if let Some(session) = &mut self.session {
                        session.set_environment(&environment);
                    }
                }
                return;
            }
            _ => return,
        }
        log::info!("configuration: {}", self.config.summary());
        if let Some(session) = &mut self.session {
            session.submit_config(self.config.clone());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Vitrine")
            .with_inner_size(PhysicalSize::new(900, 900));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        // Bootstrap the GPU tier under the orchestrator's timeout
        let mut context = None;
        let state = self.runtime.block_on(self.orchestrator.initialize_gpu(|| {
            let window = window.clone();
            let slot = &mut context;
            async move {
                *slot = Some(GpuContext::new(window).await?);
                Ok(())
            }
        }));

        match (state, context) {
            (ViewerState::RenderingGpu, Some(context)) => {
                let environment = self.runtime.block_on(async {
                    EnvironmentLoader::new(HttpFetcher::new()).load("studio").await
                });
                let tier = self.orchestrator.capabilities().tier;
                let session = RenderSession::new(context, tier, &self.config, &environment);
                self.environments.push(environment);

                // Warm the remaining presets off the critical path; the
                // session's token makes the task drop its results once the
                // session is torn down
                let token = session.cancel_token();
                let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
                self.runtime.spawn(async move {
                    let mut loader = EnvironmentLoader::new(HttpFetcher::new());
                    for preset in ["showroom", "outdoor"] {
                        let map = loader.load(preset).await;
                        if is_cancelled(&token) {
                            return;
                        }
                        if tx.send(map).is_err() {
                            return;
                        }
                    }
                });
                self.preloaded = Some(rx);

                self.session = Some(session);
                self.window = Some(window);
                log_diagnostics(&self.orchestrator);
            }
            (state, _) => {
                // GPU bootstrap failed; hand over to the non-interactive tiers
                log::warn!("GPU tier unavailable, badge: {}", state.badge());
                run_fallback(&self.runtime, &mut self.orchestrator, &self.config);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(session) = &mut self.session {
                    session.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(code),
            WindowEvent::RedrawRequested => {
                if let Some(rx) = &mut self.preloaded {
                    while let Ok(map) = rx.try_recv() {
                        log::info!("environment '{}' preloaded", map.name);
                        self.environments.push(map);
                    }
                }
                if let Some(session) = &mut self.session {
                    session.apply_camera_input(
                        self.input.drag_delta(),
                        self.input.wheel_delta(),
                    );
                    if session.drive_frame() == FrameStatus::Faulted {
                        log::warn!("GPU tier failed while rendering, falling back");
                        if let Some(session) = self.session.take() {
                            session.teardown();
                        }
                        self.orchestrator
                            .step(vitrine::orchestrator::ViewerEvent::GpuFailed);
                        run_fallback(&self.runtime, &mut self.orchestrator, &self.config);
                        event_loop.exit();
                    }
                }
                self.input.end_frame();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Emit the diagnostic snapshot the host would poll
fn log_diagnostics(orchestrator: &Orchestrator) {
    match serde_json::to_string(&orchestrator.report()) {
        Ok(json) => log::info!("diagnostics: {json}"),
        Err(e) => log::warn!("diagnostics serialization failed: {e}"),
    }
}

/// Drive whichever non-GPU tier the orchestrator settled on, writing PNGs
fn run_fallback(
    runtime: &tokio::runtime::Handle,
    orchestrator: &mut Orchestrator,
    config: &ProductConfiguration,
) {
    log_diagnostics(orchestrator);
    if orchestrator.state() == ViewerState::CacheFallback {
        match run_cache_tier(runtime, config) {
            Ok(()) => return,
            Err(e) => {
                log::warn!("cache tier failed: {e}");
                orchestrator.step(vitrine::orchestrator::ViewerEvent::TierFailed);
            }
        }
    }
    run_software_tier(config);
}

/// Pre-rendered tier: render the angle set and write one PNG per angle
fn run_cache_tier(
    runtime: &tokio::runtime::Handle,
    config: &ProductConfiguration,
) -> Result<(), vitrine::core::Error> {
    let context = pollster::block_on(vitrine::render::OffscreenContext::new())?;
    let environment = runtime.block_on(async {
        EnvironmentLoader::new(HttpFetcher::new()).load("studio").await
    });

    let renderer = OffscreenRenderer::new(context, 800, 800, &environment);
    write_stills(renderer, config)
}

fn write_stills<R: AngleRenderer>(
    renderer: R,
    config: &ProductConfiguration,
) -> Result<(), vitrine::core::Error> {
    let mut tier = CacheTier::new(renderer, config);
    tier.tick();

    for _ in 0..vitrine::prerender::ANGLES.len() {
        match tier.view() {
            CacheView::Image { image, angle } => {
                let path = format!("vitrine_still_{angle:03}.png");
                image
                    .save(&path)
                    .map_err(|e| vitrine::core::Error::ResourceLoad(e.to_string()))?;
                log::info!("wrote {path}");
            }
            CacheView::Placeholder { summary } => {
                let image = vitrine::prerender::placeholder_image(800, 800);
                image
                    .save("vitrine_placeholder.png")
                    .map_err(|e| vitrine::core::Error::ResourceLoad(e.to_string()))?;
                log::info!("wrote vitrine_placeholder.png ({summary})");
                return Ok(());
            }
        }
        tier.step_angle(1);
    }
    Ok(())
}

/// Software tier: rasterize one frame and write it out
fn run_software_tier(config: &ProductConfiguration) {
    let mut renderer = SoftwareRenderer::new(800, 800, config);
    let surface = renderer.render();
    let result = image::save_buffer(
        "vitrine_software.png",
        surface.data(),
        surface.width(),
        surface.height(),
        image::ExtendedColorType::Rgba8,
    );
    match result {
        Ok(()) => log::info!("wrote vitrine_software.png"),
        Err(e) => log::error!("failed to write software frame: {e}"),
    }
}

/// Load an initial configuration from a JSON file
fn load_config(path: &str) -> Result<ProductConfiguration, vitrine::core::Error> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| vitrine::core::Error::ResourceLoad(e.to_string()))
}

fn main() {
    logging::init();
    log::info!("vitrine starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).unwrap_or_else(|e| {
            log::warn!("could not load configuration from {path}: {e}, using default");
            ProductConfiguration::default()
        }),
        None => ProductConfiguration::default(),
    };
    log::info!("configuration: {}", config.summary());
    let probe = CapabilityProbe::new(1.0, false);
    let capabilities = runtime.block_on(probe.detect());
    let mut orchestrator = Orchestrator::new(capabilities);

    match orchestrator.apply_probe() {
        ViewerState::InitializingGpu => {
            let event_loop = EventLoop::new().expect("failed to create event loop");
            let mut app = App::new(runtime.handle().clone(), orchestrator, config);
            event_loop.run_app(&mut app).expect("event loop error");
        }
        _ => run_fallback(runtime.handle(), &mut orchestrator, &config),
    }
}
