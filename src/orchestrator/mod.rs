//! Tier orchestration
//!
//! A small state machine decides which of the three render tiers is active
//! and how failures move the viewer between them. Transitions are a pure
//! `step` function; the async driver layers the initialization timeout on
//! top so time-to-first-frame has a hard upper bound regardless of what the
//! GPU driver does.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::{DeviceCapabilities, Strategy, Tier};
use crate::core::Error;

/// Hard upper bound on GPU initialization, independent of the score
pub const GPU_INIT_TIMEOUT: Duration = Duration::from_secs(8);

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Capability probe in flight
    Detecting,
    /// GPU tier chosen, pipeline being built
    InitializingGpu,
    /// GPU tier active
    RenderingGpu,
    /// Software tier active
    SoftwareFallback,
    /// Pre-rendered tier active
    CacheFallback,
    /// Every tier failed; unreachable in practice because the cache tier's
    /// placeholder path cannot fail
    Failed,
}

impl ViewerState {
    /// Terminal states keep rendering and never transition on their own
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RenderingGpu | Self::SoftwareFallback | Self::CacheFallback | Self::Failed
        )
    }

    /// Badge text surfaced to the host ("3D" / "Software" / "Static")
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Detecting | Self::InitializingGpu => "Loading",
            Self::RenderingGpu => "3D",
            Self::SoftwareFallback => "Software",
            Self::CacheFallback => "Static",
            Self::Failed => "Unavailable",
        }
    }

    /// Coarse bootstrap progress for the host's loading indicator
    pub fn progress(&self) -> f32 {
        match self {
            Self::Detecting => 0.25,
            Self::InitializingGpu => 0.6,
            _ => 1.0,
        }
    }
}

/// Diagnostic snapshot the host can poll and serialize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// Badge reflecting the tier actually achieved
    pub badge: String,
    pub tier: Tier,
    pub strategy: Strategy,
    pub performance_score: u32,
    /// True once a terminal tier is active
    pub ready: bool,
    /// Coarse bootstrap progress in [0.0, 1.0]
    pub progress: f32,
}

/// Events that drive transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    ProbeCompleted(Strategy),
    GpuReady,
    /// Initialization exception, context loss, or repeated frame failures
    GpuFailed,
    TimeoutExpired,
    /// The active non-GPU tier threw
    TierFailed,
}

/// Coordinates tier selection and fallback
pub struct Orchestrator {
    state: ViewerState,
    capabilities: DeviceCapabilities,
    init_timeout: Duration,
}

impl Orchestrator {
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self {
            state: ViewerState::Detecting,
            capabilities,
            init_timeout: GPU_INIT_TIMEOUT,
        }
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Loading flag: false until a terminal state is reached
    pub fn ready(&self) -> bool {
        self.state.is_terminal()
    }

    /// Snapshot of badge, tier, score, and readiness for the host
    pub fn report(&self) -> DiagnosticsReport {
        DiagnosticsReport {
            badge: self.state.badge().to_owned(),
            tier: self.capabilities.tier,
            strategy: self.capabilities.strategy,
            performance_score: self.capabilities.performance_score,
            ready: self.ready(),
            progress: self.state.progress(),
        }
    }

    /// The state GPU failures fall back to
    ///
    /// With a context still obtainable the cache tier can pregenerate
    /// offscreen; without one only the software rasterizer remains.
    fn fallback_state(&self) -> ViewerState {
        if self.capabilities.gpu_available {
            ViewerState::CacheFallback
        } else {
            ViewerState::SoftwareFallback
        }
    }

    /// Apply one event; invalid combinations leave the state unchanged
    pub fn step(&mut self, event: ViewerEvent) -> ViewerState {
        use ViewerEvent as E;
        use ViewerState as S;

        let next = match (self.state, event) {
            (S::Detecting, E::ProbeCompleted(Strategy::Gpu)) => S::InitializingGpu,
            (S::Detecting, E::ProbeCompleted(Strategy::Software)) => S::SoftwareFallback,
            (S::Detecting, E::ProbeCompleted(Strategy::Cache)) => S::CacheFallback,
            (S::InitializingGpu, E::GpuReady) => S::RenderingGpu,
            (S::InitializingGpu, E::GpuFailed | E::TimeoutExpired) => self.fallback_state(),
            (S::RenderingGpu, E::GpuFailed) => self.fallback_state(),
            (S::SoftwareFallback, E::TierFailed) => S::CacheFallback,
            (S::CacheFallback, E::TierFailed) => S::Failed,
            (state, _) => state,
        };

        if next != self.state {
            log::info!("viewer state: {:?} -> {:?} on {:?}", self.state, next, event);
            self.state = next;
        }
        next
    }

    /// Resolve the probe result into the first tier
    pub fn apply_probe(&mut self) -> ViewerState {
        self.step(ViewerEvent::ProbeCompleted(self.capabilities.strategy))
    }

    /// Run GPU initialization under the configured timeout
    ///
    /// `init` is the actual pipeline bootstrap; any error or timeout becomes
    /// a fallback transition, never a propagated error. The returned state
    /// is always terminal.
    pub async fn initialize_gpu<F, Fut>(&mut self, init: F) -> ViewerState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        if self.state != ViewerState::InitializingGpu {
            return self.state;
        }

        match tokio::time::timeout(self.init_timeout, init()).await {
            Ok(Ok(())) => self.step(ViewerEvent::GpuReady),
            Ok(Err(err)) => {
                log::warn!("GPU initialization failed, falling back: {err}");
                self.step(ViewerEvent::GpuFailed)
            }
            Err(_) => {
                log::warn!(
                    "GPU initialization exceeded {:?}, falling back",
                    self.init_timeout
                );
                self.step(ViewerEvent::TimeoutExpired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ProbeSignals, capabilities};

    fn caps(gpu_available: bool, extended: bool) -> DeviceCapabilities {
        capabilities(&ProbeSignals {
            gpu_available,
            extended_features: extended,
            logical_cores: 8,
            total_memory_bytes: 16 * 1024 * 1024 * 1024,
            pixel_ratio: 1.0,
            is_mobile: false,
            max_texture_size: 8192,
        })
    }

    #[test]
    fn test_probe_routes_to_strategy() {
        let mut orch = Orchestrator::new(caps(true, true));
        assert_eq!(orch.apply_probe(), ViewerState::InitializingGpu);

        let mut orch = Orchestrator::new(caps(false, false));
        assert_eq!(orch.apply_probe(), ViewerState::SoftwareFallback);
    }

    #[test]
    fn test_init_failure_prefers_cache_when_context_exists() {
        let mut orch = Orchestrator::new(caps(true, true));
        orch.apply_probe();
        assert_eq!(orch.step(ViewerEvent::GpuFailed), ViewerState::CacheFallback);
    }

    #[test]
    fn test_context_loss_during_rendering_falls_back() {
        let mut orch = Orchestrator::new(caps(true, true));
        orch.apply_probe();
        orch.step(ViewerEvent::GpuReady);
        assert_eq!(orch.state(), ViewerState::RenderingGpu);
        assert_eq!(orch.step(ViewerEvent::GpuFailed), ViewerState::CacheFallback);
    }

    #[test]
    fn test_failed_only_after_every_tier() {
        let mut orch = Orchestrator::new(caps(false, false));
        orch.apply_probe();
        assert_eq!(orch.state(), ViewerState::SoftwareFallback);
        assert_eq!(orch.step(ViewerEvent::TierFailed), ViewerState::CacheFallback);
        assert_eq!(orch.step(ViewerEvent::TierFailed), ViewerState::Failed);
    }

    #[test]
    fn test_terminal_states_ignore_stray_events() {
        let mut orch = Orchestrator::new(caps(true, true));
        orch.apply_probe();
        orch.step(ViewerEvent::GpuReady);
        assert_eq!(orch.step(ViewerEvent::TimeoutExpired), ViewerState::RenderingGpu);
        assert_eq!(orch.step(ViewerEvent::TierFailed), ViewerState::RenderingGpu);
    }

    #[tokio::test]
    async fn test_initialize_gpu_success() {
        let mut orch = Orchestrator::new(caps(true, true));
        orch.apply_probe();
        let state = orch.initialize_gpu(|| async { Ok(()) }).await;
        assert_eq!(state, ViewerState::RenderingGpu);
    }

    #[tokio::test]
    async fn test_initialize_gpu_error_falls_back() {
        let mut orch = Orchestrator::new(caps(true, true));
        orch.apply_probe();
        let state = orch
            .initialize_gpu(|| async { Err(Error::GpuInit("shader compile".into())) })
            .await;
        assert_eq!(state, ViewerState::CacheFallback);
        assert!(state.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_gpu_timeout_is_bounded() {
        let mut orch =
            Orchestrator::new(caps(true, true)).with_init_timeout(Duration::from_millis(250));
        orch.apply_probe();

        // An initializer that never completes
        let state = orch
            .initialize_gpu(|| async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
        assert_eq!(state, ViewerState::CacheFallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_score_no_context_reaches_non_gpu_terminal() {
        // score=0 path: no context at all
        let mut orch = Orchestrator::new(caps(false, false))
            .with_init_timeout(Duration::from_millis(100));
        let state = orch.apply_probe();
        assert!(state.is_terminal());
        assert_ne!(state, ViewerState::RenderingGpu);

        // initialize_gpu is a no-op outside InitializingGpu
        let state = orch.initialize_gpu(|| async { Ok(()) }).await;
        assert_eq!(state, ViewerState::SoftwareFallback);
    }

    #[test]
    fn test_badges() {
        assert_eq!(ViewerState::RenderingGpu.badge(), "3D");
        assert_eq!(ViewerState::SoftwareFallback.badge(), "Software");
        assert_eq!(ViewerState::CacheFallback.badge(), "Static");
    }

    #[test]
    fn test_report_tracks_bootstrap() {
        let mut orch = Orchestrator::new(caps(true, true));
        let report = orch.report();
        assert!(!report.ready);
        assert!(report.progress < 1.0);
        assert_eq!(report.badge, "Loading");

        orch.apply_probe();
        assert!(!orch.ready());

        orch.step(ViewerEvent::GpuReady);
        let report = orch.report();
        assert!(report.ready);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.badge, "3D");
        assert_eq!(report.tier, Tier::Ultra);
        assert_eq!(report.performance_score, 100);
    }

    #[test]
    fn test_report_serializes_for_the_host() {
        let mut orch = Orchestrator::new(caps(false, false));
        orch.apply_probe();
        let json = serde_json::to_string(&orch.report()).unwrap();
        assert!(json.contains("\"badge\":\"Software\""));
        assert!(json.contains("\"ready\":true"));
    }
}
