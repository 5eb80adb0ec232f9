//! Flat-shaded perspective renderer over [`PixelSurface`]
//!
//! Faces draw in definition order with back-face culling but no depth sort;
//! the fixed watch mesh is authored so overlap is rare at the allowed
//! orbits. A face is visible only when it strictly faces the viewer, so
//! edge-on faces are culled.

use crate::config::ProductConfiguration;
use crate::raster::mesh::{ColorKey, SoftMesh};
use crate::raster::surface::PixelSurface;

const DRAG_SENSITIVITY: f32 = 0.01;
const PITCH_LIMIT: f32 = 1.3;
const ZOOM_MIN: f32 = 0.5;
const ZOOM_MAX: f32 = 2.0;
const ZOOM_STEP: f32 = 0.1;
const CAMERA_DISTANCE: f32 = 120.0;
/// Rough bounding radius of the watch, for brightness normalization
const MODEL_RADIUS: f32 = 46.0;
const BACKGROUND: [u8; 4] = [18, 18, 22, 255];
/// Low-opacity edge stroke drawn over every filled face
const WIREFRAME: [u8; 4] = [235, 235, 240, 40];

pub struct SoftwareRenderer {
    surface: PixelSurface,
    mesh: SoftMesh,
    key: ColorKey,
    yaw: f32,
    pitch: f32,
    zoom: f32,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32, config: &ProductConfiguration) -> Self {
        Self {
            surface: PixelSurface::new(width, height),
            mesh: SoftMesh::watch(config),
            key: ColorKey::of(config),
            yaw: 0.6,
            pitch: 0.5,
            zoom: 1.0,
        }
    }

    /// Rebuilds the mesh only when a color-relevant field changed
    pub fn set_config(&mut self, config: &ProductConfiguration) {
        let key = ColorKey::of(config);
        if key != self.key {
            self.mesh = SoftMesh::watch(config);
            self.key = key;
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }

    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * DRAG_SENSITIVITY;
        self.pitch = (self.pitch + dy * DRAG_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Wheel steps; positive zooms in
    pub fn zoom_by(&mut self, steps: f32) {
        self.zoom = (self.zoom + steps * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Draw the current view and return the pixel buffer
    pub fn render(&mut self) -> &PixelSurface {
        self.surface.clear(BACKGROUND);

        let faces: Vec<(Vec<(f32, f32)>, [u8; 4])> = self
            .mesh
            .faces
            .iter()
            .filter_map(|face| self.project_face(&face.indices, face.color))
            .collect();
        for (points, color) in faces {
            self.surface.fill_polygon(&points, color);
            self.surface.stroke_polygon(&points, WIREFRAME);
        }
        &self.surface
    }

    /// Number of faces surviving the cull at the current orientation
    pub fn visible_faces(&self) -> usize {
        self.mesh
            .faces
            .iter()
            .filter(|face| self.project_face(&face.indices, face.color).is_some())
            .count()
    }

    /// Project one face; `None` when culled
    fn project_face(
        &self,
        indices: &[usize],
        color: [u8; 4],
    ) -> Option<(Vec<(f32, f32)>, [u8; 4])> {
        let rotated: Vec<[f32; 3]> = indices
            .iter()
            .map(|&i| rotate(self.mesh.vertices[i], self.yaw, self.pitch))
            .collect();

        let width = self.surface.width() as f32;
        let height = self.surface.height() as f32;
        let focal = width.min(height) * 1.2 * self.zoom;

        let points: Vec<(f32, f32)> = rotated
            .iter()
            .map(|v| {
                let depth = CAMERA_DISTANCE - v[2];
                (
                    width * 0.5 + v[0] * focal / depth,
                    height * 0.5 - v[1] * focal / depth,
                )
            })
            .collect();

        // Screen y runs down, so an outward-wound face projects clockwise:
        // strictly negative signed area means it faces the viewer
        if signed_area(&points) >= 0.0 {
            return None;
        }

        let avg_z = rotated.iter().map(|v| v[2]).sum::<f32>() / rotated.len() as f32;
        Some((points, shade(color, avg_z)))
    }
}

/// Yaw about the y axis, then pitch about the x axis
fn rotate(v: [f32; 3], yaw: f32, pitch: f32) -> [f32; 3] {
    let (sy, cy) = yaw.sin_cos();
    let x = v[0] * cy + v[2] * sy;
    let z = -v[0] * sy + v[2] * cy;

    let (sp, cp) = pitch.sin_cos();
    let y = v[1] * cp - z * sp;
    let z = v[1] * sp + z * cp;
    [x, y, z]
}

fn signed_area(points: &[(f32, f32)]) -> f32 {
    let mut area = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        area += x0 * y1 - x1 * y0;
    }
    area * 0.5
}

/// Brightness is linear in the face's mean rotated depth
fn shade(color: [u8; 4], avg_z: f32) -> [u8; 4] {
    let brightness = (0.65 + 0.35 * avg_z / MODEL_RADIUS).clamp(0.3, 1.0);
    [
        (color[0] as f32 * brightness) as u8,
        (color[1] as f32 * brightness) as u8,
        (color[2] as f32 * brightness) as u8,
        color[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialColor;
    use crate::raster::mesh::Face;

    fn cube(half: f32) -> SoftMesh {
        let mut mesh = SoftMesh {
            vertices: Vec::new(),
            faces: Vec::new(),
        };
        for s in [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ] {
            mesh.vertices.push([s[0] * half, s[1] * half, s[2] * half]);
        }
        for quad in [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 4, 7, 3],
            [1, 2, 6, 5],
            [3, 7, 6, 2],
            [0, 1, 5, 4],
        ] {
            mesh.faces.push(Face {
                indices: quad.to_vec(),
                color: [255, 255, 255, 255],
            });
        }
        mesh
    }

    fn renderer_with(mesh: SoftMesh) -> SoftwareRenderer {
        let mut renderer = SoftwareRenderer::new(64, 64, &ProductConfiguration::default());
        renderer.mesh = mesh;
        renderer.yaw = 0.0;
        renderer.pitch = 0.0;
        renderer
    }

    #[test]
    fn test_cube_sweep_shows_one_to_three_faces() {
        // Level camera orbiting a cube: between one and three faces survive
        // the cull at every 15 degree step
        for step in 0..24 {
            let mut renderer = renderer_with(cube(10.0));
            renderer.yaw = step as f32 * 15.0_f32.to_radians();
            let visible = renderer.visible_faces();
            assert!(
                (1..=3).contains(&visible),
                "yaw step {step}: {visible} faces visible"
            );
        }
    }

    #[test]
    fn test_face_on_cube_shows_single_face() {
        let renderer = renderer_with(cube(10.0));
        assert_eq!(renderer.visible_faces(), 1);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut renderer = SoftwareRenderer::new(32, 32, &ProductConfiguration::default());
        renderer.zoom_by(100.0);
        assert_eq!(renderer.zoom(), ZOOM_MAX);
        renderer.zoom_by(-100.0);
        assert_eq!(renderer.zoom(), ZOOM_MIN);
    }

    #[test]
    fn test_pitch_clamps() {
        let mut renderer = SoftwareRenderer::new(32, 32, &ProductConfiguration::default());
        renderer.drag(0.0, 1e6);
        assert_eq!(renderer.pitch, PITCH_LIMIT);
        renderer.drag(0.0, -1e7);
        assert_eq!(renderer.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn test_drag_rotates() {
        let mut renderer = SoftwareRenderer::new(32, 32, &ProductConfiguration::default());
        let before = renderer.yaw();
        renderer.drag(50.0, 0.0);
        assert!(renderer.yaw() > before);
    }

    #[test]
    fn test_render_paints_model_pixels() {
        let mut renderer = SoftwareRenderer::new(64, 64, &ProductConfiguration::default());
        let surface = renderer.render();
        let center = surface.pixel(32, 32);
        assert_ne!(center, BACKGROUND);
    }

    #[test]
    fn test_face_edges_stroked_over_fill() {
        // A face-on cube face must not come out as one flat color: the
        // blended edge stroke darkens or lightens its outline
        let mut renderer = renderer_with(cube(10.0));
        let surface = renderer.render();

        let mut colors = std::collections::HashSet::new();
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                let pixel = surface.pixel(x, y);
                if pixel != BACKGROUND {
                    colors.insert(pixel);
                }
            }
        }
        assert!(
            colors.len() > 1,
            "face painted as a single flat color: {colors:?}"
        );
    }

    #[test]
    fn test_config_change_swaps_colors() {
        let mut renderer = SoftwareRenderer::new(64, 64, &ProductConfiguration::default());
        let before = renderer.render().data().to_vec();

        let recolored = ProductConfiguration {
            dial_color: DialColor::White,
            ..Default::default()
        };
        renderer.set_config(&recolored);
        let after = renderer.render().data().to_vec();
        assert_ne!(before, after);
    }

    #[test]
    fn test_shade_brightness_bounds() {
        let bright = shade([200, 200, 200, 255], MODEL_RADIUS * 2.0);
        let dark = shade([200, 200, 200, 255], -MODEL_RADIUS * 2.0);
        assert_eq!(bright[0], 200);
        assert_eq!(dark[0], 60);
        assert_eq!(dark[3], 255);
    }
}
