//! PBR material descriptors
//!
//! Material selection is a tagged variant (family × finish) resolved through
//! one lookup, not per-part conditionals scattered through the model code.
//! Each family carries its own default metalness/roughness/clearcoat/sheen/
//! anisotropy/IOR; the finish nudges roughness.

use bytemuck::{Pod, Zeroable};

use crate::config::{CaseMaterial, StrapColor, StrapMaterial};

/// Material family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialFamily {
    Gold,
    RoseGold,
    Steel,
    Titanium,
    Sapphire,
    Leather,
    Rubber,
    Lacquer,
}

/// Surface finish applied on top of the family defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finish {
    Polished,
    Brushed,
    Matte,
}

/// Tagged material descriptor for one part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDesc {
    pub family: MaterialFamily,
    pub finish: Finish,
    /// Base color override; families with a fixed tint ignore it
    pub tint: Option<[f32; 3]>,
}

impl MaterialDesc {
    pub fn new(family: MaterialFamily, finish: Finish) -> Self {
        Self { family, finish, tint: None }
    }

    pub fn tinted(family: MaterialFamily, finish: Finish, tint: [f32; 3]) -> Self {
        Self { family, finish, tint: Some(tint) }
    }
}

impl From<CaseMaterial> for MaterialDesc {
    fn from(material: CaseMaterial) -> Self {
        match material {
            CaseMaterial::Gold => Self::new(MaterialFamily::Gold, Finish::Polished),
            CaseMaterial::RoseGold => Self::new(MaterialFamily::RoseGold, Finish::Polished),
            CaseMaterial::Steel => Self::new(MaterialFamily::Steel, Finish::Brushed),
            CaseMaterial::Titanium => Self::new(MaterialFamily::Titanium, Finish::Brushed),
        }
    }
}

impl MaterialDesc {
    /// Strap material + color to descriptor
    pub fn for_strap(material: StrapMaterial, color: StrapColor) -> Self {
        match material {
            StrapMaterial::Leather => {
                Self::tinted(MaterialFamily::Leather, Finish::Matte, color.rgb())
            }
            StrapMaterial::Rubber => {
                Self::tinted(MaterialFamily::Rubber, Finish::Matte, color.rgb())
            }
            StrapMaterial::SteelBracelet => Self::new(MaterialFamily::Steel, Finish::Brushed),
        }
    }
}

/// Resolved shading parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PbrParams {
    pub base_color: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub clearcoat: f32,
    pub sheen: f32,
    pub anisotropy: f32,
    pub ior: f32,
    /// Crystal transparency; 1.0 everywhere else
    pub opacity: f32,
}

impl PbrParams {
    /// Resolve a descriptor into shading parameters — the single lookup
    /// every part goes through
    pub fn resolve(desc: &MaterialDesc) -> Self {
        let mut params = match desc.family {
            MaterialFamily::Gold => Self {
                base_color: [1.0, 0.77, 0.34],
                metallic: 1.0,
                roughness: 0.12,
                clearcoat: 0.0,
                sheen: 0.0,
                anisotropy: 0.3,
                ior: 0.47,
                opacity: 1.0,
            },
            MaterialFamily::RoseGold => Self {
                base_color: [0.93, 0.66, 0.52],
                metallic: 1.0,
                roughness: 0.14,
                clearcoat: 0.0,
                sheen: 0.0,
                anisotropy: 0.3,
                ior: 0.47,
                opacity: 1.0,
            },
            MaterialFamily::Steel => Self {
                base_color: [0.84, 0.85, 0.86],
                metallic: 1.0,
                roughness: 0.25,
                clearcoat: 0.0,
                sheen: 0.0,
                anisotropy: 0.6,
                ior: 2.5,
                opacity: 1.0,
            },
            MaterialFamily::Titanium => Self {
                base_color: [0.62, 0.62, 0.64],
                metallic: 1.0,
                roughness: 0.38,
                clearcoat: 0.0,
                sheen: 0.0,
                anisotropy: 0.5,
                ior: 2.2,
                opacity: 1.0,
            },
            MaterialFamily::Sapphire => Self {
                base_color: [0.96, 0.97, 1.0],
                metallic: 0.0,
                roughness: 0.02,
                clearcoat: 1.0,
                sheen: 0.0,
                anisotropy: 0.0,
                ior: 1.77,
                opacity: 0.15,
            },
            MaterialFamily::Leather => Self {
                base_color: [0.3, 0.18, 0.1],
                metallic: 0.0,
                roughness: 0.75,
                clearcoat: 0.05,
                sheen: 0.4,
                anisotropy: 0.0,
                ior: 1.45,
                opacity: 1.0,
            },
            MaterialFamily::Rubber => Self {
                base_color: [0.08, 0.08, 0.08],
                metallic: 0.0,
                roughness: 0.9,
                clearcoat: 0.0,
                sheen: 0.1,
                anisotropy: 0.0,
                ior: 1.5,
                opacity: 1.0,
            },
            MaterialFamily::Lacquer => Self {
                base_color: [0.1, 0.1, 0.1],
                metallic: 0.0,
                roughness: 0.1,
                clearcoat: 1.0,
                sheen: 0.0,
                anisotropy: 0.0,
                ior: 1.5,
                opacity: 1.0,
            },
        };

        if let Some(tint) = desc.tint {
            params.base_color = tint;
        }

        params.roughness = match desc.finish {
            Finish::Polished => params.roughness,
            Finish::Brushed => (params.roughness + 0.15).min(1.0),
            Finish::Matte => (params.roughness + 0.3).min(1.0),
        };

        params
    }
}

/// Shader-side material block, std140-compatible
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x: metallic, y: roughness, z: clearcoat, w: sheen
    pub surface: [f32; 4],
    /// x: anisotropy, y: ior, z: opacity, w: unused
    pub extra: [f32; 4],
}

impl From<PbrParams> for MaterialUniform {
    fn from(params: PbrParams) -> Self {
        Self {
            base_color: [
                params.base_color[0],
                params.base_color[1],
                params.base_color[2],
                1.0,
            ],
            surface: [params.metallic, params.roughness, params.clearcoat, params.sheen],
            extra: [params.anisotropy, params.ior, params.opacity, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families_have_distinct_defaults() {
        let families = [
            MaterialFamily::Gold,
            MaterialFamily::RoseGold,
            MaterialFamily::Steel,
            MaterialFamily::Titanium,
            MaterialFamily::Sapphire,
            MaterialFamily::Leather,
            MaterialFamily::Rubber,
            MaterialFamily::Lacquer,
        ];
        let mut seen = Vec::new();
        for family in families {
            let params = PbrParams::resolve(&MaterialDesc::new(family, Finish::Polished));
            assert!(!seen.contains(&params), "{family:?} duplicates another family");
            seen.push(params);
        }
    }

    #[test]
    fn test_metals_are_metallic() {
        for family in [
            MaterialFamily::Gold,
            MaterialFamily::Steel,
            MaterialFamily::Titanium,
        ] {
            let params = PbrParams::resolve(&MaterialDesc::new(family, Finish::Polished));
            assert_eq!(params.metallic, 1.0);
        }
        let leather = PbrParams::resolve(&MaterialDesc::new(MaterialFamily::Leather, Finish::Matte));
        assert_eq!(leather.metallic, 0.0);
    }

    #[test]
    fn test_finish_raises_roughness() {
        let polished =
            PbrParams::resolve(&MaterialDesc::new(MaterialFamily::Steel, Finish::Polished));
        let brushed =
            PbrParams::resolve(&MaterialDesc::new(MaterialFamily::Steel, Finish::Brushed));
        let matte = PbrParams::resolve(&MaterialDesc::new(MaterialFamily::Steel, Finish::Matte));
        assert!(polished.roughness < brushed.roughness);
        assert!(brushed.roughness < matte.roughness);
        assert!(matte.roughness <= 1.0);
    }

    #[test]
    fn test_tint_overrides_base_color() {
        let desc = MaterialDesc::tinted(MaterialFamily::Leather, Finish::Matte, [0.5, 0.2, 0.1]);
        let params = PbrParams::resolve(&desc);
        assert_eq!(params.base_color, [0.5, 0.2, 0.1]);
    }

    #[test]
    fn test_crystal_is_transparent() {
        let params =
            PbrParams::resolve(&MaterialDesc::new(MaterialFamily::Sapphire, Finish::Polished));
        assert!(params.opacity < 1.0);
        assert!(params.clearcoat > 0.5);
    }

    #[test]
    fn test_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }
}
