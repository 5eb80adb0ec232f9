//! Post-processing chain configuration
//!
//! Which effects run is gated by the capability tier at session start, then
//! downgraded step by step at runtime if the sustained frame rate falls
//! below the target. The shader-facing uniform is derived from the settings
//! each frame.

use bytemuck::{Pod, Zeroable};

use crate::capability::Tier;

/// Sustained-FPS floor below which effects are shed
pub const TARGET_FPS: f32 = 30.0;

/// Anti-aliasing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AaMode {
    Off,
    Fxaa,
}

/// Active post-processing configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostSettings {
    pub enabled: bool,
    pub depth_of_field: bool,
    pub bloom: bool,
    pub bloom_strength: f32,
    pub chromatic_aberration: f32,
    pub film_grain: f32,
    pub anti_aliasing: AaMode,
}

impl PostSettings {
    /// Everything off (software/cache tiers, or fully shed)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            depth_of_field: false,
            bloom: false,
            bloom_strength: 0.0,
            chromatic_aberration: 0.0,
            film_grain: 0.0,
            anti_aliasing: AaMode::Off,
        }
    }

    /// Initial chain for a capability tier
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Ultra => Self {
                enabled: true,
                depth_of_field: true,
                bloom: true,
                bloom_strength: 0.8,
                chromatic_aberration: 0.35,
                film_grain: 0.06,
                anti_aliasing: AaMode::Fxaa,
            },
            Tier::High => Self {
                enabled: true,
                depth_of_field: false,
                bloom: true,
                bloom_strength: 0.6,
                chromatic_aberration: 0.2,
                film_grain: 0.04,
                anti_aliasing: AaMode::Fxaa,
            },
            Tier::Medium => Self {
                enabled: true,
                depth_of_field: false,
                bloom: true,
                bloom_strength: 0.3,
                chromatic_aberration: 0.0,
                film_grain: 0.0,
                anti_aliasing: AaMode::Fxaa,
            },
            Tier::Low => Self::disabled(),
        }
    }

    /// Shed one rung of cost; returns false once nothing is left to shed
    ///
    /// Order: halve bloom, drop grain + aberration, drop depth of field,
    /// drop bloom, drop AA, then disable the chain.
    pub fn downgrade(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        if self.bloom && self.bloom_strength > 0.35 {
            self.bloom_strength *= 0.5;
            return true;
        }
        if self.film_grain > 0.0 || self.chromatic_aberration > 0.0 {
            self.film_grain = 0.0;
            self.chromatic_aberration = 0.0;
            return true;
        }
        if self.depth_of_field {
            self.depth_of_field = false;
            return true;
        }
        if self.bloom {
            self.bloom = false;
            self.bloom_strength = 0.0;
            return true;
        }
        if self.anti_aliasing != AaMode::Off {
            self.anti_aliasing = AaMode::Off;
            return true;
        }
        self.enabled = false;
        true
    }
}

/// Shader-side composite parameters
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CompositeParams {
    /// x: bloom strength, y: chromatic aberration, z: film grain, w: time
    pub effects: [f32; 4],
    /// x: dof enabled, y: fxaa enabled, z: chain enabled, w: unused
    pub toggles: [f32; 4],
}

impl CompositeParams {
    pub fn from_settings(settings: &PostSettings, time_secs: f32) -> Self {
        Self {
            effects: [
                if settings.bloom { settings.bloom_strength } else { 0.0 },
                settings.chromatic_aberration,
                settings.film_grain,
                time_secs,
            ],
            toggles: [
                if settings.depth_of_field { 1.0 } else { 0.0 },
                if settings.anti_aliasing == AaMode::Fxaa { 1.0 } else { 0.0 },
                if settings.enabled { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ultra_gets_full_chain() {
        let settings = PostSettings::for_tier(Tier::Ultra);
        assert!(settings.enabled);
        assert!(settings.depth_of_field);
        assert!(settings.bloom);
        assert!(settings.film_grain > 0.0);
        assert_eq!(settings.anti_aliasing, AaMode::Fxaa);
    }

    #[test]
    fn test_low_gets_nothing() {
        let settings = PostSettings::for_tier(Tier::Low);
        assert_eq!(settings, PostSettings::disabled());
    }

    #[test]
    fn test_first_downgrade_reduces_bloom() {
        let mut settings = PostSettings::for_tier(Tier::Ultra);
        let before = settings.bloom_strength;
        assert!(settings.downgrade());
        assert!(settings.bloom_strength < before);
        assert!(settings.bloom);
    }

    #[test]
    fn test_downgrade_ladder_terminates() {
        let mut settings = PostSettings::for_tier(Tier::Ultra);
        let mut steps = 0;
        while settings.downgrade() {
            steps += 1;
            assert!(steps < 20, "downgrade must terminate");
        }
        assert!(!settings.enabled);
        // Once exhausted, further calls are no-ops
        assert!(!settings.downgrade());
    }

    #[test]
    fn test_params_zero_out_disabled_effects() {
        let mut settings = PostSettings::for_tier(Tier::Ultra);
        settings.bloom = false;
        let params = CompositeParams::from_settings(&settings, 1.0);
        assert_eq!(params.effects[0], 0.0);
        assert_eq!(params.effects[3], 1.0);
    }

    #[test]
    fn test_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<CompositeParams>() % 16, 0);
    }
}
