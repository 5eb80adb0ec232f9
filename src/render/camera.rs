//! Orbit camera for the product viewport

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Camera orbiting the watch at a fixed target
pub struct OrbitCamera {
    pub target: Vec3,
    /// Orbit distance in model units (millimetres)
    pub distance: f32,
    /// Rotation around Y, radians
    pub yaw: f32,
    /// Elevation, radians, clamped to avoid pole flip
    pub pitch: f32,
    pub fovy: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl OrbitCamera {
    pub const MIN_DISTANCE: f32 = 40.0;
    pub const MAX_DISTANCE: f32 = 160.0;

    pub fn new(aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 90.0,
            yaw: 0.6,
            pitch: 0.5,
            fovy: 35f32.to_radians(),
            aspect,
            znear: 1.0,
            zfar: 500.0,
        }
    }

    /// Eye position derived from yaw/pitch/distance
    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + Vec3::new(
                self.distance * cos_pitch * sin_yaw,
                self.distance * sin_pitch,
                self.distance * cos_pitch * cos_yaw,
            )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect.max(0.01), self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

/// Drag/wheel controller with fixed sensitivity
pub struct OrbitController {
    /// Radians per pixel of drag
    pub sensitivity: f32,
    /// Distance change per wheel line
    pub zoom_step: f32,
}

impl OrbitController {
    pub fn new() -> Self {
        Self {
            sensitivity: 0.008,
            zoom_step: 6.0,
        }
    }

    /// Apply this frame's drag and wheel deltas
    pub fn update(&self, camera: &mut OrbitCamera, drag: (f32, f32), wheel: f32) {
        camera.yaw -= drag.0 * self.sensitivity;
        camera.pitch = (camera.pitch + drag.1 * self.sensitivity).clamp(-1.4, 1.4);
        camera.distance = (camera.distance - wheel * self.zoom_step)
            .clamp(OrbitCamera::MIN_DISTANCE, OrbitCamera::MAX_DISTANCE);
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

/// Shader-side camera block
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &OrbitCamera) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position().extend(1.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_clamped() {
        let mut camera = OrbitCamera::new(1.0);
        let controller = OrbitController::new();
        controller.update(&mut camera, (0.0, 100000.0), 0.0);
        assert!(camera.pitch <= 1.4);
        controller.update(&mut camera, (0.0, -200000.0), 0.0);
        assert!(camera.pitch >= -1.4);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut camera = OrbitCamera::new(1.0);
        let controller = OrbitController::new();
        controller.update(&mut camera, (0.0, 0.0), 1000.0);
        assert_eq!(camera.distance, OrbitCamera::MIN_DISTANCE);
        controller.update(&mut camera, (0.0, 0.0), -1000.0);
        assert_eq!(camera.distance, OrbitCamera::MAX_DISTANCE);
    }

    #[test]
    fn test_position_respects_distance() {
        let camera = OrbitCamera::new(1.0);
        let eye = camera.position();
        assert!((eye.distance(camera.target) - camera.distance).abs() < 1e-3);
    }
}
