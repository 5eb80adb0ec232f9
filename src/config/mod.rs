//! Product configuration model
//!
//! A `ProductConfiguration` is the sole external input to the engine: a flat
//! snapshot of the option selected for every customizable slot of the watch.
//! It is an immutable value, replaced wholesale on each user selection.

pub mod signature;

use serde::{Deserialize, Serialize};

pub use signature::{ConfigSignature, PartKind};

/// Case material family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMaterial {
    Steel,
    Gold,
    RoseGold,
    Titanium,
}

impl CaseMaterial {
    /// Stable key used in cache signatures
    pub fn key(&self) -> &'static str {
        match self {
            Self::Steel => "steel",
            Self::Gold => "gold",
            Self::RoseGold => "rose_gold",
            Self::Titanium => "titanium",
        }
    }
}

/// Case silhouette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseShape {
    Round,
    Cushion,
    Tonneau,
}

impl CaseShape {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Cushion => "cushion",
            Self::Tonneau => "tonneau",
        }
    }
}

/// Bezel finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BezelStyle {
    Smooth,
    Fluted,
    Engraved,
}

impl BezelStyle {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Smooth => "smooth",
            Self::Fluted => "fluted",
            Self::Engraved => "engraved",
        }
    }
}

/// Dial base color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialColor {
    Black,
    White,
    Silver,
    Blue,
    Green,
    Champagne,
}

impl DialColor {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::White => "white",
            Self::Silver => "silver",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Champagne => "champagne",
        }
    }

    /// Linear RGB base color for both render tiers
    pub fn rgb(&self) -> [f32; 3] {
        match self {
            Self::Black => [0.04, 0.04, 0.05],
            Self::White => [0.92, 0.92, 0.90],
            Self::Silver => [0.75, 0.76, 0.78],
            Self::Blue => [0.07, 0.15, 0.38],
            Self::Green => [0.06, 0.25, 0.14],
            Self::Champagne => [0.83, 0.69, 0.45],
        }
    }
}

/// Dial surface pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialPattern {
    Plain,
    Sunburst,
    Guilloche,
}

impl DialPattern {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Sunburst => "sunburst",
            Self::Guilloche => "guilloche",
        }
    }
}

/// Hour marker style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    Baton,
    Roman,
    Arabic,
}

impl MarkerStyle {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Baton => "baton",
            Self::Roman => "roman",
            Self::Arabic => "arabic",
        }
    }
}

/// Hands style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandsStyle {
    Dauphine,
    Baton,
    Sword,
}

impl HandsStyle {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Dauphine => "dauphine",
            Self::Baton => "baton",
            Self::Sword => "sword",
        }
    }
}

/// Crystal variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrystalKind {
    FlatSapphire,
    DomedSapphire,
}

impl CrystalKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::FlatSapphire => "flat_sapphire",
            Self::DomedSapphire => "domed_sapphire",
        }
    }
}

/// Strap material family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrapMaterial {
    Leather,
    Rubber,
    SteelBracelet,
}

impl StrapMaterial {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Leather => "leather",
            Self::Rubber => "rubber",
            Self::SteelBracelet => "steel_bracelet",
        }
    }
}

/// Strap color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrapColor {
    Black,
    Brown,
    Tan,
    Navy,
}

impl StrapColor {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Brown => "brown",
            Self::Tan => "tan",
            Self::Navy => "navy",
        }
    }

    /// Linear RGB base color for both render tiers
    pub fn rgb(&self) -> [f32; 3] {
        match self {
            Self::Black => [0.05, 0.05, 0.05],
            Self::Brown => [0.28, 0.15, 0.07],
            Self::Tan => [0.55, 0.38, 0.20],
            Self::Navy => [0.06, 0.09, 0.22],
        }
    }
}

/// Flat snapshot of every selected option
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductConfiguration {
    pub case_material: CaseMaterial,
    pub case_shape: CaseShape,
    pub bezel_style: BezelStyle,
    pub dial_color: DialColor,
    pub dial_pattern: DialPattern,
    pub marker_style: MarkerStyle,
    pub hands_style: HandsStyle,
    pub crystal: CrystalKind,
    pub strap_material: StrapMaterial,
    pub strap_color: StrapColor,
}

impl ProductConfiguration {
    /// Human-readable summary, used by the pre-rendered tier placeholder
    pub fn summary(&self) -> String {
        format!(
            "{} {} case, {} bezel, {} {} dial, {} hands, {} {} strap",
            self.case_material.key(),
            self.case_shape.key(),
            self.bezel_style.key(),
            self.dial_color.key(),
            self.dial_pattern.key(),
            self.hands_style.key(),
            self.strap_color.key(),
            self.strap_material.key(),
        )
    }
}

impl Default for ProductConfiguration {
    fn default() -> Self {
        Self {
            case_material: CaseMaterial::Steel,
            case_shape: CaseShape::Round,
            bezel_style: BezelStyle::Smooth,
            dial_color: DialColor::Black,
            dial_pattern: DialPattern::Sunburst,
            marker_style: MarkerStyle::Baton,
            hands_style: HandsStyle::Dauphine,
            crystal: CrystalKind::FlatSapphire,
            strap_material: StrapMaterial::Leather,
            strap_color: StrapColor::Black,
        }
    }
}
