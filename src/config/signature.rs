//! Deterministic cache-key derivation
//!
//! Every swappable part of the watch derives its cache key from the subset
//! of configuration fields that actually affect it. Two configurations that
//! agree on that subset produce byte-identical signatures, which is what the
//! resource cache relies on to reuse geometry and materials.

use crate::config::ProductConfiguration;

/// Deterministic cache key for one part of the model
pub type ConfigSignature = String;

/// The swappable parts of the watch model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Body,
    Bezel,
    Markers,
    Dial,
    Hands,
    Crown,
    Lugs,
    Strap,
    Crystal,
}

impl PartKind {
    /// All parts in a fixed, stable order
    pub const ALL: [PartKind; 9] = [
        PartKind::Body,
        PartKind::Bezel,
        PartKind::Markers,
        PartKind::Dial,
        PartKind::Hands,
        PartKind::Crown,
        PartKind::Lugs,
        PartKind::Strap,
        PartKind::Crystal,
    ];

    /// Stable prefix used in signatures and debug labels
    pub fn label(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Bezel => "bezel",
            Self::Markers => "markers",
            Self::Dial => "dial",
            Self::Hands => "hands",
            Self::Crown => "crown",
            Self::Lugs => "lugs",
            Self::Strap => "strap",
            Self::Crystal => "crystal",
        }
    }
}

/// Derive the signature for one part from its relevant fields
///
/// The field subsets below are the contract: adding a field here invalidates
/// cached resources for that part whenever the field changes, and nothing
/// else does.
pub fn part_signature(part: PartKind, config: &ProductConfiguration) -> ConfigSignature {
    let fields: Vec<&str> = match part {
        PartKind::Body => vec![config.case_material.key(), config.case_shape.key()],
        PartKind::Bezel => vec![
            config.case_material.key(),
            config.case_shape.key(),
            config.bezel_style.key(),
        ],
        // Markers are cut from the case metal and sit on the dial color
        PartKind::Markers => vec![config.marker_style.key(), config.case_material.key()],
        PartKind::Dial => vec![config.dial_color.key(), config.dial_pattern.key()],
        PartKind::Hands => vec![config.hands_style.key(), config.case_material.key()],
        PartKind::Crown => vec![config.case_material.key()],
        PartKind::Lugs => vec![config.case_material.key(), config.case_shape.key()],
        PartKind::Strap => vec![config.strap_material.key(), config.strap_color.key()],
        PartKind::Crystal => vec![config.crystal.key()],
    };
    format!("{}:{}", part.label(), fields.join("/"))
}

/// Full-configuration signature, used by the pre-rendered image cache
pub fn full_signature(config: &ProductConfiguration) -> ConfigSignature {
    let parts: Vec<ConfigSignature> = PartKind::ALL
        .iter()
        .map(|&part| part_signature(part, config))
        .collect();
    parts.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaseMaterial, DialColor, StrapColor, StrapMaterial};

    #[test]
    fn test_signature_is_deterministic() {
        let config = ProductConfiguration::default();
        for part in PartKind::ALL {
            assert_eq!(part_signature(part, &config), part_signature(part, &config));
        }
        assert_eq!(full_signature(&config), full_signature(&config));
    }

    #[test]
    fn test_equal_configs_equal_signatures() {
        let a = ProductConfiguration::default();
        let b = a.clone();
        assert_eq!(full_signature(&a), full_signature(&b));
    }

    #[test]
    fn test_strap_change_only_touches_strap() {
        let a = ProductConfiguration::default();
        let b = ProductConfiguration {
            strap_material: StrapMaterial::Rubber,
            strap_color: StrapColor::Navy,
            ..a.clone()
        };

        for part in PartKind::ALL {
            let sig_a = part_signature(part, &a);
            let sig_b = part_signature(part, &b);
            if part == PartKind::Strap {
                assert_ne!(sig_a, sig_b);
            } else {
                assert_eq!(sig_a, sig_b, "{:?} must not depend on strap fields", part);
            }
        }
        assert_ne!(full_signature(&a), full_signature(&b));
    }

    #[test]
    fn test_relevant_field_always_changes_signature() {
        let base = ProductConfiguration::default();

        let dial = ProductConfiguration { dial_color: DialColor::Blue, ..base.clone() };
        assert_ne!(
            part_signature(PartKind::Dial, &base),
            part_signature(PartKind::Dial, &dial)
        );

        let case = ProductConfiguration { case_material: CaseMaterial::Gold, ..base.clone() };
        for part in [PartKind::Body, PartKind::Bezel, PartKind::Crown, PartKind::Lugs, PartKind::Hands] {
            assert_ne!(
                part_signature(part, &base),
                part_signature(part, &case),
                "{:?} must track case material",
                part
            );
        }
    }

    #[test]
    fn test_part_prefixes_are_distinct() {
        let config = ProductConfiguration::default();
        let mut seen = std::collections::HashSet::new();
        for part in PartKind::ALL {
            assert!(seen.insert(part_signature(part, &config)));
        }
    }
}
