//! Watch model builder and incremental updates
//!
//! The model is a set of layered parts, each keyed by its part-scoped
//! configuration signature. A configuration change recomputes signatures and
//! rebuilds only the parts whose signature moved — the scene is never torn
//! down wholesale. Mesh and material planning are pure functions; GPU upload
//! sits behind them.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::config::signature::{PartKind, part_signature};
use crate::config::{
    BezelStyle, CrystalKind, DialPattern, MarkerStyle, ProductConfiguration,
};
use crate::render::cache::{GpuMesh, ResourceCache};
use crate::render::geometry::{self, MeshData};
use crate::render::material::{Finish, MaterialDesc, MaterialFamily, PbrParams};
use crate::render::pipeline::pbr::{InstanceRaw, PartUniform};

/// Case dimensions in millimetres
const CASE_RADIUS: f32 = 20.0;
const CASE_HEIGHT: f32 = 6.0;
const DIAL_RADIUS: f32 = 16.0;
const DIAL_HEIGHT: f32 = 5.2;

/// Fixed display time, the classic 10:09:30 catalogue pose
const HOUR_ANGLE: f32 = -(10.0 + 9.0 / 60.0) / 12.0 * std::f32::consts::TAU;
const MINUTE_ANGLE: f32 = -9.0 / 60.0 * std::f32::consts::TAU;
const SECOND_ANGLE: f32 = -30.0 / 60.0 * std::f32::consts::TAU;

/// Build the CPU mesh for one part
pub fn part_mesh(part: PartKind, config: &ProductConfiguration) -> MeshData {
    let squareness = match config.case_shape {
        crate::config::CaseShape::Round => 0.0,
        crate::config::CaseShape::Cushion => 1.0,
        crate::config::CaseShape::Tonneau => 0.6,
    };

    match part {
        PartKind::Body => {
            let mut mesh = geometry::tube(CASE_RADIUS, 0.0, CASE_HEIGHT, 64, squareness);
            // Caseback faces down
            mesh.append(
                &geometry::disc(CASE_RADIUS, 0.0, 64)
                    .transformed(Mat4::from_rotation_x(std::f32::consts::PI)),
            );
            mesh
        }
        PartKind::Bezel => {
            let notches = match config.bezel_style {
                BezelStyle::Smooth => 0,
                BezelStyle::Fluted => 36,
                BezelStyle::Engraved => 12,
            };
            let mut mesh =
                geometry::annulus(DIAL_RADIUS + 0.5, CASE_RADIUS + 1.0, CASE_HEIGHT, 96, notches);
            mesh.append(&geometry::tube(
                CASE_RADIUS + 1.0,
                CASE_HEIGHT - 1.5,
                CASE_HEIGHT,
                96,
                squareness,
            ));
            mesh
        }
        PartKind::Markers => {
            // One marker mesh; placement comes from the 12 instances
            let size = match config.marker_style {
                MarkerStyle::Baton => Vec3::new(1.0, 0.5, 3.2),
                MarkerStyle::Roman => Vec3::new(1.6, 0.5, 3.6),
                MarkerStyle::Arabic => Vec3::new(2.0, 0.5, 2.4),
            };
            geometry::cuboid(size)
        }
        PartKind::Dial => geometry::disc(DIAL_RADIUS, DIAL_HEIGHT, 64),
        PartKind::Hands => {
            let (base, tip) = match config.hands_style {
                crate::config::HandsStyle::Dauphine => (2.4, 0.4),
                crate::config::HandsStyle::Baton => (1.4, 1.2),
                crate::config::HandsStyle::Sword => (2.0, 0.8),
            };
            let mut mesh = geometry::hand_blade(9.0, base, tip, DIAL_HEIGHT + 0.3)
                .transformed(Mat4::from_rotation_y(HOUR_ANGLE));
            mesh.append(
                &geometry::hand_blade(13.0, base * 0.8, tip * 0.8, DIAL_HEIGHT + 0.5)
                    .transformed(Mat4::from_rotation_y(MINUTE_ANGLE)),
            );
            mesh.append(
                &geometry::hand_blade(14.0, 0.5, 0.3, DIAL_HEIGHT + 0.7)
                    .transformed(Mat4::from_rotation_y(SECOND_ANGLE)),
            );
            mesh
        }
        PartKind::Crown => {
            // Small fluted cylinder lying along +X at the case flank
            let mut mesh = geometry::tube(2.2, -1.5, 1.5, 24, 0.0);
            mesh.append(&geometry::disc(2.2, 1.5, 24));
            mesh.transformed(
                Mat4::from_translation(Vec3::new(CASE_RADIUS + 2.2, CASE_HEIGHT * 0.5, 0.0))
                    * Mat4::from_rotation_z(-std::f32::consts::FRAC_PI_2),
            )
        }
        PartKind::Lugs => {
            let mut mesh = MeshData::default();
            let lug = geometry::cuboid(Vec3::new(4.0, 3.0, 6.0));
            for (x, z) in [(-8.0, 19.0), (8.0, 19.0), (-8.0, -19.0), (8.0, -19.0)] {
                mesh.append(
                    &lug.clone()
                        .transformed(Mat4::from_translation(Vec3::new(x, 2.0, z))),
                );
            }
            mesh
        }
        PartKind::Strap => {
            let mut mesh = MeshData::default();
            let segment = geometry::cuboid(Vec3::new(14.0, 2.5, 7.0));
            for z in [24.0f32, 32.0, 40.0, -24.0, -32.0, -40.0] {
                mesh.append(
                    &segment
                        .clone()
                        .transformed(Mat4::from_translation(Vec3::new(0.0, 1.5, z))),
                );
            }
            mesh
        }
        PartKind::Crystal => match config.crystal {
            CrystalKind::FlatSapphire => geometry::disc(DIAL_RADIUS + 0.5, CASE_HEIGHT + 0.3, 64),
            CrystalKind::DomedSapphire => {
                geometry::dome(DIAL_RADIUS + 0.5, 2.2, CASE_HEIGHT + 0.2, 48, 6)
            }
        },
    }
}

/// Resolve the material descriptor for one part
pub fn part_material(part: PartKind, config: &ProductConfiguration) -> MaterialDesc {
    match part {
        PartKind::Body | PartKind::Lugs | PartKind::Crown => config.case_material.into(),
        PartKind::Bezel | PartKind::Markers | PartKind::Hands => MaterialDesc {
            finish: Finish::Polished,
            ..config.case_material.into()
        },
        PartKind::Dial => {
            let finish = match config.dial_pattern {
                DialPattern::Plain => Finish::Matte,
                DialPattern::Sunburst => Finish::Brushed,
                DialPattern::Guilloche => Finish::Polished,
            };
            MaterialDesc::tinted(MaterialFamily::Lacquer, finish, config.dial_color.rgb())
        }
        PartKind::Strap => MaterialDesc::for_strap(config.strap_material, config.strap_color),
        PartKind::Crystal => MaterialDesc::new(MaterialFamily::Sapphire, Finish::Polished),
    }
}

/// Instance transforms for a part; markers get twelve, everything else one
pub fn part_instances(part: PartKind) -> Vec<Mat4> {
    match part {
        PartKind::Markers => (0..12)
            .map(|hour| {
                let angle = hour as f32 / 12.0 * std::f32::consts::TAU;
                Mat4::from_rotation_y(-angle)
                    * Mat4::from_translation(Vec3::new(0.0, DIAL_HEIGHT + 0.3, 13.0))
            })
            .collect(),
        _ => vec![Mat4::IDENTITY],
    }
}

/// Parts whose signature differs between two configurations
pub fn changed_parts(
    old: &ProductConfiguration,
    new: &ProductConfiguration,
) -> Vec<PartKind> {
    PartKind::ALL
        .iter()
        .copied()
        .filter(|&part| part_signature(part, old) != part_signature(part, new))
        .collect()
}

/// Draw order: opaque parts first, crystal last for blending
const DRAW_ORDER: [PartKind; 9] = [
    PartKind::Body,
    PartKind::Lugs,
    PartKind::Strap,
    PartKind::Crown,
    PartKind::Bezel,
    PartKind::Dial,
    PartKind::Markers,
    PartKind::Hands,
    PartKind::Crystal,
];

/// One GPU-resident part
pub struct PartNode {
    pub signature: String,
    pub mesh: std::sync::Arc<GpuMesh>,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// The assembled watch
pub struct WatchModel {
    parts: HashMap<PartKind, PartNode>,
    config: ProductConfiguration,
}

impl WatchModel {
    /// Build every part for the initial configuration
    pub fn build(
        device: &wgpu::Device,
        part_layout: &wgpu::BindGroupLayout,
        cache: &mut ResourceCache,
        config: &ProductConfiguration,
    ) -> Self {
        let mut parts = HashMap::new();
        for part in PartKind::ALL {
            parts.insert(part, build_part(device, part_layout, cache, part, config));
        }
        Self {
            parts,
            config: config.clone(),
        }
    }

    /// Replace only the parts whose signature changed; returns them
    pub fn apply_config(
        &mut self,
        device: &wgpu::Device,
        part_layout: &wgpu::BindGroupLayout,
        cache: &mut ResourceCache,
        config: &ProductConfiguration,
    ) -> Vec<PartKind> {
        let changed = changed_parts(&self.config, config);
        for &part in &changed {
            let node = build_part(device, part_layout, cache, part, config);
            self.parts.insert(part, node);
        }
        if !changed.is_empty() {
            log::debug!("model update rebuilt {} part(s): {:?}", changed.len(), changed);
        }
        self.config = config.clone();
        changed
    }

    pub fn config(&self) -> &ProductConfiguration {
        &self.config
    }

    /// Parts in draw order
    pub fn draws(&self) -> Vec<crate::render::pipeline::pbr::PartDraw<'_>> {
        DRAW_ORDER
            .iter()
            .filter_map(|part| self.parts.get(part))
            .map(|node| crate::render::pipeline::pbr::PartDraw {
                mesh: &node.mesh,
                part_bind_group: &node.bind_group,
            })
            .collect()
    }

}

fn build_part(
    device: &wgpu::Device,
    part_layout: &wgpu::BindGroupLayout,
    cache: &mut ResourceCache,
    part: PartKind,
    config: &ProductConfiguration,
) -> PartNode {
    let signature = part_signature(part, config);

    let mesh = cache.geometry.get_or_insert_with(&signature, || {
        let data = part_mesh(part, config);
        let instances: Vec<InstanceRaw> = part_instances(part)
            .iter()
            .map(|m| InstanceRaw { model: m.to_cols_array_2d() })
            .collect();
        upload_mesh(device, &signature, &data, &instances)
    });

    let material = PbrParams::resolve(&part_material(part, config));
    let uniform = PartUniform {
        model: Mat4::IDENTITY.to_cols_array_2d(),
        material: material.into(),
    };

    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("part_uniform_{}", part.label())),
        contents: bytemuck::bytes_of(&uniform),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("part_bind_group_{}", part.label())),
        layout: part_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    PartNode {
        signature,
        mesh,
        uniform_buffer,
        bind_group,
    }
}

fn upload_mesh(
    device: &wgpu::Device,
    label: &str,
    data: &MeshData,
    instances: &[InstanceRaw],
) -> GpuMesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("vertices_{label}")),
        contents: bytemuck::cast_slice(&data.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("indices_{label}")),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("instances_{label}")),
        contents: bytemuck::cast_slice(instances),
        usage: wgpu::BufferUsages::VERTEX,
    });

    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: data.indices.len() as u32,
        instance_buffer: Some(instance_buffer),
        instance_count: instances.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaseMaterial, DialColor, StrapColor, StrapMaterial};

    #[test]
    fn test_every_part_has_geometry() {
        let config = ProductConfiguration::default();
        for part in PartKind::ALL {
            let mesh = part_mesh(part, &config);
            assert!(!mesh.is_empty(), "{part:?} produced an empty mesh");
            assert_eq!(mesh.indices.len() % 3, 0);
        }
    }

    #[test]
    fn test_markers_are_instanced_twelve_times() {
        assert_eq!(part_instances(PartKind::Markers).len(), 12);
        assert_eq!(part_instances(PartKind::Dial).len(), 1);
    }

    #[test]
    fn test_strap_change_only_rebuilds_strap() {
        let old = ProductConfiguration::default();
        let new = ProductConfiguration {
            strap_material: StrapMaterial::Rubber,
            strap_color: StrapColor::Navy,
            ..old.clone()
        };
        assert_eq!(changed_parts(&old, &new), vec![PartKind::Strap]);
    }

    #[test]
    fn test_case_material_change_rebuilds_metal_parts() {
        let old = ProductConfiguration::default();
        let new = ProductConfiguration {
            case_material: CaseMaterial::Gold,
            ..old.clone()
        };
        let changed = changed_parts(&old, &new);
        for part in [
            PartKind::Body,
            PartKind::Bezel,
            PartKind::Markers,
            PartKind::Hands,
            PartKind::Crown,
            PartKind::Lugs,
        ] {
            assert!(changed.contains(&part), "{part:?} should rebuild");
        }
        assert!(!changed.contains(&PartKind::Dial));
        assert!(!changed.contains(&PartKind::Strap));
        assert!(!changed.contains(&PartKind::Crystal));
    }

    #[test]
    fn test_identical_config_changes_nothing() {
        let config = ProductConfiguration::default();
        assert!(changed_parts(&config, &config.clone()).is_empty());
    }

    #[test]
    fn test_dial_material_tracks_color() {
        let config = ProductConfiguration {
            dial_color: DialColor::Green,
            ..Default::default()
        };
        let desc = part_material(PartKind::Dial, &config);
        assert_eq!(desc.tint, Some(DialColor::Green.rgb()));
    }

    #[test]
    fn test_crystal_variants_differ() {
        let flat = ProductConfiguration::default();
        let domed = ProductConfiguration {
            crystal: CrystalKind::DomedSapphire,
            ..flat.clone()
        };
        let flat_mesh = part_mesh(PartKind::Crystal, &flat);
        let domed_mesh = part_mesh(PartKind::Crystal, &domed);
        assert_ne!(flat_mesh.vertices.len(), domed_mesh.vertices.len());
    }
}
