//! Procedural mesh generation for the watch parts
//!
//! All generators are pure CPU code producing [`MeshData`]; GPU upload lives
//! in the model builder. Y is up, the dial faces +Y, units are millimetres.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Vertex layout shared by every pipeline
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side mesh
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Transform positions and normals in place
    pub fn transform(&mut self, matrix: Mat4) {
        let normal_matrix = matrix.inverse().transpose();
        for vertex in &mut self.vertices {
            let pos = matrix.transform_point3(Vec3::from_array(vertex.position));
            let normal = normal_matrix
                .transform_vector3(Vec3::from_array(vertex.normal))
                .normalize_or_zero();
            vertex.position = pos.to_array();
            vertex.normal = normal.to_array();
        }
    }

    pub fn transformed(mut self, matrix: Mat4) -> Self {
        self.transform(matrix);
        self
    }
}

/// Flat disc in the XZ plane at height `y`, facing +Y
pub fn disc(radius: f32, y: f32, segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    mesh.vertices.push(Vertex {
        position: [0.0, y, 0.0],
        normal: [0.0, 1.0, 0.0],
        uv: [0.5, 0.5],
    });
    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = angle.sin_cos();
        mesh.vertices.push(Vertex {
            position: [radius * cos, y, radius * sin],
            normal: [0.0, 1.0, 0.0],
            uv: [0.5 + 0.5 * cos, 0.5 + 0.5 * sin],
        });
    }
    for i in 1..=segments {
        mesh.indices.extend_from_slice(&[0, i + 1, i]);
    }
    mesh
}

/// Flat annulus (ring) in the XZ plane at height `y`, facing +Y
///
/// `notches` > 0 scallops the outer edge, used for the fluted bezel.
pub fn annulus(inner: f32, outer: f32, y: f32, segments: u32, notches: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = angle.sin_cos();
        let flute = if notches > 0 {
            1.0 + 0.03 * (angle * notches as f32).cos()
        } else {
            1.0
        };
        let r_outer = outer * flute;
        mesh.vertices.push(Vertex {
            position: [inner * cos, y, inner * sin],
            normal: [0.0, 1.0, 0.0],
            uv: [i as f32 / segments as f32, 0.0],
        });
        mesh.vertices.push(Vertex {
            position: [r_outer * cos, y, r_outer * sin],
            normal: [0.0, 1.0, 0.0],
            uv: [i as f32 / segments as f32, 1.0],
        });
    }
    for i in 0..segments {
        let a = i * 2;
        mesh.indices.extend_from_slice(&[a, a + 3, a + 1, a, a + 2, a + 3]);
    }
    mesh
}

/// Open cylinder wall between `y0` and `y1`
///
/// `squareness` in [0, 1] morphs the cross-section from a circle toward a
/// rounded square (cushion and tonneau case shapes).
pub fn tube(radius: f32, y0: f32, y1: f32, segments: u32, squareness: f32) -> MeshData {
    let mut mesh = MeshData::default();
    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = angle.sin_cos();
        // Superellipse-style bulge toward the diagonals
        let bulge = 1.0 + squareness * 0.18 * (2.0 * angle).cos().abs();
        let (x, z) = (radius * bulge * cos, radius * bulge * sin);
        let normal = Vec3::new(cos, 0.0, sin);
        let u = i as f32 / segments as f32;
        mesh.vertices.push(Vertex {
            position: [x, y0, z],
            normal: normal.to_array(),
            uv: [u, 0.0],
        });
        mesh.vertices.push(Vertex {
            position: [x, y1, z],
            normal: normal.to_array(),
            uv: [u, 1.0],
        });
    }
    for i in 0..segments {
        let a = i * 2;
        mesh.indices.extend_from_slice(&[a, a + 1, a + 3, a, a + 3, a + 2]);
    }
    mesh
}

/// Axis-aligned box centered at the origin
pub fn cuboid(size: Vec3) -> MeshData {
    let h = size * 0.5;
    // (normal, right, up) chosen so right x up == normal, keeping every
    // face wound counter-clockwise seen from outside
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut mesh = MeshData::default();
    for (normal, right, up) in faces {
        let base = mesh.vertices.len() as u32;
        let center = normal * h;
        let u = right * h;
        let v = up * h;
        let corners = [
            center - u - v,
            center + u - v,
            center + u + v,
            center - u + v,
        ];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        for (corner, uv) in corners.iter().zip(uvs) {
            mesh.vertices.push(Vertex {
                position: corner.to_array(),
                normal: normal.normalize().to_array(),
                uv,
            });
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Watch-hand blade: a tapered quad from the pivot outward along +Z
pub fn hand_blade(length: f32, base_width: f32, tip_width: f32, y: f32) -> MeshData {
    let mut mesh = MeshData::default();
    let hb = base_width * 0.5;
    let ht = tip_width * 0.5;
    let positions = [
        [-hb, y, -length * 0.15],
        [hb, y, -length * 0.15],
        [ht, y, length],
        [-ht, y, length],
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    for (position, uv) in positions.iter().zip(uvs) {
        mesh.vertices.push(Vertex {
            position: *position,
            normal: [0.0, 1.0, 0.0],
            uv,
        });
    }
    mesh.indices.extend_from_slice(&[0, 2, 1, 0, 3, 2]);
    mesh
}

/// Shallow spherical cap over the dial, used for the domed crystal
pub fn dome(radius: f32, height: f32, y: f32, segments: u32, rings: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for ring in 0..=rings {
        let t = ring as f32 / rings as f32;
        let r = radius * (1.0 - t * t);
        let h = y + height * t;
        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = angle.sin_cos();
            // Normal leans outward near the rim, upward at the apex
            let normal = Vec3::new(cos * (1.0 - t), 0.4 + t, sin * (1.0 - t)).normalize();
            mesh.vertices.push(Vertex {
                position: [r * cos, h, r * sin],
                normal: normal.to_array(),
                uv: [i as f32 / segments as f32, t],
            });
        }
    }
    let stride = segments + 1;
    for ring in 0..rings {
        for i in 0..segments {
            let a = ring * stride + i;
            let b = a + stride;
            mesh.indices.extend_from_slice(&[a, b, b + 1, a, b + 1, a + 1]);
        }
    }
    mesh
}
