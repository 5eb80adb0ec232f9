//! Fixed low-polygon watch for the software tier
//!
//! A few dozen vertices: octagonal case prism, dial face, crown box and
//! strap quads. Geometry never varies; only the face colors track the
//! configuration, so the mesh is rebuilt only when a color-relevant field
//! changes.

use crate::config::{CaseMaterial, DialColor, ProductConfiguration, StrapColor, StrapMaterial};

const SIDES: usize = 8;
const CASE_RADIUS: f32 = 20.0;
const CASE_TOP: f32 = 6.0;
const DIAL_RADIUS: f32 = 16.0;

/// Flat-colored polygon, indices wound counter-clockwise seen from outside
pub struct Face {
    pub indices: Vec<usize>,
    pub color: [u8; 4],
}

pub struct SoftMesh {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<Face>,
}

/// The configuration fields the software mesh actually renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorKey {
    pub case_material: CaseMaterial,
    pub dial_color: DialColor,
    pub strap_material: StrapMaterial,
    pub strap_color: StrapColor,
}

impl ColorKey {
    pub fn of(config: &ProductConfiguration) -> Self {
        Self {
            case_material: config.case_material,
            dial_color: config.dial_color,
            strap_material: config.strap_material,
            strap_color: config.strap_color,
        }
    }
}

fn metal_rgba(material: CaseMaterial) -> [u8; 4] {
    match material {
        CaseMaterial::Steel => [198, 200, 206, 255],
        CaseMaterial::Gold => [214, 178, 98, 255],
        CaseMaterial::RoseGold => [212, 162, 132, 255],
        CaseMaterial::Titanium => [150, 152, 158, 255],
    }
}

fn to_rgba8(rgb: [f32; 3]) -> [u8; 4] {
    [
        (rgb[0] * 255.0) as u8,
        (rgb[1] * 255.0) as u8,
        (rgb[2] * 255.0) as u8,
        255,
    ]
}

impl SoftMesh {
    /// Build the watch for one configuration's colors
    pub fn watch(config: &ProductConfiguration) -> Self {
        let metal = metal_rgba(config.case_material);
        let dial = to_rgba8(config.dial_color.rgb());
        let strap = match config.strap_material {
            StrapMaterial::SteelBracelet => metal_rgba(CaseMaterial::Steel),
            _ => to_rgba8(config.strap_color.rgb()),
        };

        let mut mesh = Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        };

        mesh.add_prism(CASE_RADIUS, 0.0, CASE_TOP, metal);
        mesh.add_polygon_y(DIAL_RADIUS, CASE_TOP + 0.05, dial);
        mesh.add_box([CASE_RADIUS + 1.5, 3.0, 0.0], [1.5, 1.5, 1.5], metal);

        // Strap: two segments per side
        for (z0, z1) in [(20.0, 34.0), (34.0, 46.0)] {
            mesh.add_quad_y(7.0, 2.0, z0, z1, strap);
            mesh.add_quad_y(7.0, 2.0, -z1, -z0, strap);
        }

        // Hands at the classic pose, flat on the dial
        mesh.add_hand(-0.9, 10.0, CASE_TOP + 0.1, metal);
        mesh.add_hand(2.2, 14.0, CASE_TOP + 0.15, metal);

        mesh
    }

    fn ring(&mut self, radius: f32, y: f32) -> Vec<usize> {
        (0..SIDES)
            .map(|i| {
                let angle = i as f32 / SIDES as f32 * std::f32::consts::TAU;
                self.push([radius * angle.cos(), y, radius * angle.sin()])
            })
            .collect()
    }

    fn push(&mut self, v: [f32; 3]) -> usize {
        self.vertices.push(v);
        self.vertices.len() - 1
    }

    /// Octagonal prism: sides, top and bottom
    fn add_prism(&mut self, radius: f32, y0: f32, y1: f32, color: [u8; 4]) {
        let bottom = self.ring(radius, y0);
        let top = self.ring(radius, y1);
        for i in 0..SIDES {
            let j = (i + 1) % SIDES;
            self.faces.push(Face {
                indices: vec![bottom[i], top[i], top[j], bottom[j]],
                color,
            });
        }
        // Top winds against the ring order, bottom with it
        self.faces.push(Face {
            indices: top.iter().rev().copied().collect(),
            color,
        });
        self.faces.push(Face {
            indices: bottom,
            color,
        });
    }

    /// Upward-facing octagon
    fn add_polygon_y(&mut self, radius: f32, y: f32, color: [u8; 4]) {
        let ring = self.ring(radius, y);
        self.faces.push(Face {
            indices: ring.into_iter().rev().collect(),
            color,
        });
    }

    /// Upward-facing rectangle spanning x in [-w, w], z in [z0, z1]
    fn add_quad_y(&mut self, w: f32, y: f32, z0: f32, z1: f32, color: [u8; 4]) {
        let a = self.push([-w, y, z0]);
        let b = self.push([-w, y, z1]);
        let c = self.push([w, y, z1]);
        let d = self.push([w, y, z0]);
        self.faces.push(Face {
            indices: vec![a, b, c, d],
            color,
        });
    }

    /// Axis-aligned box from center and half extents
    fn add_box(&mut self, center: [f32; 3], half: [f32; 3], color: [u8; 4]) {
        let [cx, cy, cz] = center;
        let [hx, hy, hz] = half;
        let corners: Vec<usize> = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ]
        .iter()
        .map(|s| self.push([cx + s[0] * hx, cy + s[1] * hy, cz + s[2] * hz]))
        .collect();

        for quad in [
            [0, 3, 2, 1], // -z
            [4, 5, 6, 7], // +z
            [0, 4, 7, 3], // -x
            [1, 2, 6, 5], // +x
            [3, 7, 6, 2], // +y
            [0, 1, 5, 4], // -y
        ] {
            self.faces.push(Face {
                indices: quad.iter().map(|&i| corners[i]).collect(),
                color,
            });
        }
    }

    /// Thin rectangle rotated to `angle` radians, anchored at the dial center
    fn add_hand(&mut self, angle: f32, length: f32, y: f32, color: [u8; 4]) {
        let (sin, cos) = angle.sin_cos();
        let dir = [sin, cos];
        let perp = [cos, -sin];
        let w = 0.8;

        let corner = |along: f32, side: f32| {
            [
                dir[0] * along + perp[0] * side,
                y,
                dir[1] * along + perp[1] * side,
            ]
        };

        let a = self.push(corner(0.0, -w));
        let b = self.push(corner(length, -w));
        let c = self.push(corner(length, w));
        let d = self.push(corner(0.0, w));
        self.faces.push(Face {
            indices: vec![a, b, c, d],
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_mesh_stays_small() {
        let mesh = SoftMesh::watch(&ProductConfiguration::default());
        assert!(mesh.vertices.len() < 100, "vertex count {}", mesh.vertices.len());
        assert!(!mesh.faces.is_empty());
    }

    #[test]
    fn test_color_key_ignores_shape_fields() {
        let base = ProductConfiguration::default();
        let reshaped = ProductConfiguration {
            case_shape: crate::config::CaseShape::Tonneau,
            bezel_style: crate::config::BezelStyle::Fluted,
            ..base.clone()
        };
        assert_eq!(ColorKey::of(&base), ColorKey::of(&reshaped));

        let recolored = ProductConfiguration {
            dial_color: DialColor::Blue,
            ..base.clone()
        };
        assert_ne!(ColorKey::of(&base), ColorKey::of(&recolored));
    }

    #[test]
    fn test_bracelet_strap_uses_metal_color() {
        let config = ProductConfiguration {
            strap_material: StrapMaterial::SteelBracelet,
            strap_color: StrapColor::Tan,
            ..Default::default()
        };
        let mesh = SoftMesh::watch(&config);
        let tan = to_rgba8(StrapColor::Tan.rgb());
        assert!(mesh.faces.iter().all(|f| f.color != tan));
    }
}
