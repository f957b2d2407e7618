/// Perspective camera in left-handed world space (+Z forward, +Y up).
/// Projection maps depth to [0, 1] so the rasterizer can range-test z directly.
use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,   // Rotation around Y axis (radians)
    pub pitch: f32, // Rotation around X axis (radians)
    pub fov: f32,   // Vertical, radians
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: 45.0f32.to_radians(),
            near: 0.1,
            far: 100.0,
            aspect_ratio,
        }
    }

    /// Update camera orientation to look at a specific target point.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = dir.x.atan2(dir.z);
        self.pitch = -dir.y.clamp(-1.0, 1.0).asin();
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation_quat();
        Mat4::look_to_lh(self.position, rotation * Vec3::Z, rotation * Vec3::Y)
    }

    /// View to world transform (camera basis and position as columns)
    pub fn inverse_view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation_quat(), self.position)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get forward direction vector
    pub fn forward(&self) -> Vec3 {
        self.rotation_quat() * Vec3::Z
    }

    /// Get right direction vector
    pub fn right(&self) -> Vec3 {
        self.rotation_quat() * Vec3::X
    }

    /// Get up direction vector
    pub fn up(&self) -> Vec3 {
        self.rotation_quat() * Vec3::Y
    }

    fn rotation_quat(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Update aspect ratio (call when the output size changes)
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}
