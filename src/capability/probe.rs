//! Capability probe: one bounded detection pass per mount
//!
//! The probe acquires a throwaway GPU context, combines hardware signals
//! into a performance score, and maps the score to a tier and render
//! strategy. The throwaway context is dropped before the probe returns and
//! has no other side effects. Scoring itself is a pure function over
//! `ProbeSignals` so every branch is testable without hardware.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Performance tier derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Medium,
    High,
    Ultra,
}

/// Render strategy: one of the three mutually exclusive tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Gpu,
    Software,
    Cache,
}

/// Immutable capability snapshot, computed exactly once per mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub gpu_available: bool,
    /// Performance score in [0, 100]
    pub performance_score: u32,
    pub is_mobile: bool,
    pub max_texture_size: u32,
    pub tier: Tier,
    pub strategy: Strategy,
}

/// Raw signals the scorer combines
///
/// Collected from the throwaway context and the platform; kept separate so
/// the scoring rules stay a pure function.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeSignals {
    /// A GPU context could be acquired at all
    pub gpu_available: bool,
    /// Context supports the extended feature set (timestamp queries,
    /// filterable float textures)
    pub extended_features: bool,
    pub logical_cores: u32,
    pub total_memory_bytes: u64,
    /// Display pixel ratio (e.g. 2.0 on HiDPI panels)
    pub pixel_ratio: f32,
    pub is_mobile: bool,
    pub max_texture_size: u32,
}

/// Score baseline once a context exists; signals adjust from here
const BASE_SCORE: i32 = 60;
/// Hard bound on the whole detection pass
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const FOUR_GIB: u64 = 4 * 1024 * 1024 * 1024;

/// Combine signals into a performance score in [0, 100]
///
/// No context means score 0 unconditionally.
pub fn score(signals: &ProbeSignals) -> u32 {
    if !signals.gpu_available {
        return 0;
    }

    let mut score = BASE_SCORE;
    if signals.extended_features {
        score += 20;
    }
    if signals.logical_cores > 4 {
        score += 10;
    }
    if signals.total_memory_bytes > FOUR_GIB {
        score += 10;
    }
    // A dense panel without the memory to back it is a cost, not a signal
    // of a fast device.
    if signals.pixel_ratio >= 2.0 && signals.total_memory_bytes <= FOUR_GIB {
        score -= 10;
    }
    if signals.is_mobile {
        score -= 20;
    }
    score.clamp(0, 100) as u32
}

/// Map a score to a tier (monotonic non-decreasing)
pub fn tier(score: u32) -> Tier {
    match score {
        80.. => Tier::Ultra,
        70..=79 => Tier::High,
        40..=69 => Tier::Medium,
        _ => Tier::Low,
    }
}

/// Pick the render strategy
///
/// GPU requires a context and a score of at least 40. Below that the cache
/// tier is preferred whenever a context exists at all, because pre-rendered
/// generation can use it offscreen; only a device with no context at all
/// falls back to the software rasterizer.
pub fn strategy(gpu_available: bool, score: u32) -> Strategy {
    if gpu_available && score >= 40 {
        Strategy::Gpu
    } else if gpu_available {
        Strategy::Cache
    } else {
        Strategy::Software
    }
}

/// Assemble the full capability snapshot from raw signals
pub fn capabilities(signals: &ProbeSignals) -> DeviceCapabilities {
    let score = score(signals);
    DeviceCapabilities {
        gpu_available: signals.gpu_available,
        performance_score: score,
        is_mobile: signals.is_mobile,
        max_texture_size: signals.max_texture_size,
        tier: tier(score),
        strategy: strategy(signals.gpu_available, score),
    }
}

/// One-shot hardware probe
pub struct CapabilityProbe {
    /// Pixel ratio reported by the windowing system, passed in by the host
    pixel_ratio: f32,
    is_mobile: bool,
}

impl CapabilityProbe {
    pub fn new(pixel_ratio: f32, is_mobile: bool) -> Self {
        Self { pixel_ratio, is_mobile }
    }

    /// Run the probe, bounded by [`PROBE_TIMEOUT`]
    ///
    /// Timing out or failing to acquire an adapter is not an error: it
    /// resolves to a usable non-GPU capability snapshot.
    pub async fn detect(&self) -> DeviceCapabilities {
        let signals = match tokio::time::timeout(PROBE_TIMEOUT, self.collect_signals()).await {
            Ok(signals) => signals,
            Err(_) => {
                log::warn!("capability probe timed out after {:?}", PROBE_TIMEOUT);
                self.platform_signals(false, false, 0)
            }
        };

        let caps = capabilities(&signals);
        log::info!(
            "capability probe: score={} tier={:?} strategy={:?} (gpu={}, cores={}, mem={}MB)",
            caps.performance_score,
            caps.tier,
            caps.strategy,
            signals.gpu_available,
            signals.logical_cores,
            signals.total_memory_bytes / 1024 / 1024,
        );
        caps
    }

    /// Acquire and immediately release a throwaway context
    async fn collect_signals(&self) -> ProbeSignals {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(err) => {
                log::info!("capability probe: no adapter ({err:?})");
                return self.platform_signals(false, false, 0);
            }
        };

        let features = adapter.features();
        let extended = features.contains(wgpu::Features::TIMESTAMP_QUERY)
            && features.contains(wgpu::Features::FLOAT32_FILTERABLE);
        let max_texture_size = adapter.limits().max_texture_dimension_2d;

        // Confirm a device can actually be created; some adapters enumerate
        // but refuse device creation.
        let device_ok = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vitrine_probe_device"),
                ..Default::default()
            })
            .await
            .is_ok();
        // Adapter and device drop here; the probe keeps nothing alive.

        self.platform_signals(device_ok, extended, max_texture_size)
    }

    fn platform_signals(
        &self,
        gpu_available: bool,
        extended_features: bool,
        max_texture_size: u32,
    ) -> ProbeSignals {
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        let total_memory_bytes = {
            let mut system = sysinfo::System::new();
            system.refresh_memory();
            system.total_memory()
        };

        ProbeSignals {
            gpu_available,
            extended_features,
            logical_cores,
            total_memory_bytes,
            pixel_ratio: self.pixel_ratio,
            is_mobile: self.is_mobile,
            max_texture_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop_signals() -> ProbeSignals {
        ProbeSignals {
            gpu_available: true,
            extended_features: true,
            logical_cores: 8,
            total_memory_bytes: 16 * 1024 * 1024 * 1024,
            pixel_ratio: 1.0,
            is_mobile: false,
            max_texture_size: 8192,
        }
    }

    #[test]
    fn test_no_context_scores_zero() {
        let signals = ProbeSignals { gpu_available: false, ..desktop_signals() };
        assert_eq!(score(&signals), 0);

        let caps = capabilities(&signals);
        assert_eq!(caps.tier, Tier::Low);
        assert_eq!(caps.strategy, Strategy::Software);
    }

    #[test]
    fn test_desktop_scores_ultra() {
        // 60 + 20 + 10 + 10 = 100
        let caps = capabilities(&desktop_signals());
        assert_eq!(caps.performance_score, 100);
        assert_eq!(caps.tier, Tier::Ultra);
        assert_eq!(caps.strategy, Strategy::Gpu);
    }

    #[test]
    fn test_mobile_penalty() {
        let signals = ProbeSignals {
            extended_features: false,
            logical_cores: 4,
            total_memory_bytes: 3 * 1024 * 1024 * 1024,
            pixel_ratio: 3.0,
            is_mobile: true,
            ..desktop_signals()
        };
        // 60 - 10 (dense panel, low memory) - 20 (mobile) = 30
        assert_eq!(score(&signals), 30);
        let caps = capabilities(&signals);
        assert_eq!(caps.tier, Tier::Low);
        // Context exists, so the cache tier can pregenerate offscreen
        assert_eq!(caps.strategy, Strategy::Cache);
    }

    #[test]
    fn test_dense_panel_penalty_needs_low_memory() {
        let with_memory = ProbeSignals { pixel_ratio: 2.0, ..desktop_signals() };
        assert_eq!(score(&with_memory), 100);

        let without_memory = ProbeSignals {
            pixel_ratio: 2.0,
            total_memory_bytes: 2 * 1024 * 1024 * 1024,
            ..desktop_signals()
        };
        // 60 + 20 + 10 - 10 = 80
        assert_eq!(score(&without_memory), 80);
    }

    #[test]
    fn test_tier_is_monotonic_and_total() {
        let mut last = tier(0);
        for s in 0..=100 {
            let t = tier(s);
            assert!(t >= last, "tier must not decrease: {s}");
            last = t;
            // Exactly one of the four variants by construction
            assert!(matches!(t, Tier::Low | Tier::Medium | Tier::High | Tier::Ultra));
        }
        assert_eq!(tier(39), Tier::Low);
        assert_eq!(tier(40), Tier::Medium);
        assert_eq!(tier(70), Tier::High);
        assert_eq!(tier(80), Tier::Ultra);
    }

    #[test]
    fn test_gpu_strategy_needs_context_and_score() {
        assert_eq!(strategy(true, 40), Strategy::Gpu);
        assert_eq!(strategy(true, 39), Strategy::Cache);
        assert_eq!(strategy(false, 90), Strategy::Software);
        assert_eq!(strategy(false, 0), Strategy::Software);
    }

    #[test]
    fn test_score_clamped() {
        let weak = ProbeSignals {
            gpu_available: true,
            extended_features: false,
            logical_cores: 2,
            total_memory_bytes: 1024 * 1024 * 1024,
            pixel_ratio: 3.0,
            is_mobile: true,
            max_texture_size: 2048,
        };
        let s = score(&weak);
        assert!(s <= 100);
        // 60 - 10 - 20 = 30, still in range
        assert_eq!(s, 30);
    }
}
