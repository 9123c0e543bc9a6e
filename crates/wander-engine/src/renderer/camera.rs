use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};

/// Perspective camera for the 3D field.
/// Pose is a position plus an orientation quaternion; the presenter reads the
/// packed `CameraUniform` each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub orientation: Quat,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

/// GPU-side uniform data for the camera.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_projection: [[f32; 4]; 4],
    /// Orientation quaternion (x, y, z, w), used for billboarding.
    pub orientation: [f32; 4],
    pub position: [f32; 4],
}

impl Camera3D {
    pub const DEFAULT_FOV: f32 = 75.0;

    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            orientation: Quat::IDENTITY,
            fov_y: Self::DEFAULT_FOV,
            near: 0.1,
            far: 1000.0,
            viewport: Vec2::new(viewport_width.max(1.0), viewport_height.max(1.0)),
        }
    }

    // ── Axes ─────────────────────────────────────────────────────────

    /// Viewing direction (local -Z).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    // ── Pose ─────────────────────────────────────────────────────────

    /// Move along the camera's own axes.
    pub fn translate_local(&mut self, offset: Vec3) {
        self.position += self.orientation * offset;
    }

    /// Rotate about the camera's local Y axis.
    pub fn yaw(&mut self, angle: f32) {
        self.orientation = (self.orientation * Quat::from_rotation_y(angle)).normalize();
    }

    /// Rotate about the camera's local X axis. Unclamped.
    pub fn pitch(&mut self, angle: f32) {
        self.orientation = (self.orientation * Quat::from_rotation_x(angle)).normalize();
    }

    /// Orient toward `target` keeping world Y as up. Degenerate directions are ignored.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = target - self.position;
        if dir.length_squared() < 1e-10 {
            return;
        }
        let dir = dir.normalize();
        if dir.cross(Vec3::Y).length_squared() < 1e-8 {
            return;
        }
        let view = Mat4::look_at_rh(self.position, target, Vec3::Y);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.orientation = rotation.normalize();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width.max(1.0), height.max(1.0));
    }

    // ── Matrices ─────────────────────────────────────────────────────

    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    /// OpenGL-style projection (NDC z in [-1, 1]).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y.to_radians(), self.aspect(), self.near, self.far)
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_projection: (self.projection_matrix() * self.view_matrix()).to_cols_array_2d(),
            orientation: self.orientation.to_array(),
            position: self.position.extend(1.0).to_array(),
        }
    }

    // ── Space conversion ─────────────────────────────────────────────

    /// Camera-local point to world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// World point to camera-local space.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.orientation.inverse() * (world - self.position)
    }

    /// World point to NDC.
    pub fn project(&self, world: Vec3) -> Vec3 {
        (self.projection_matrix() * self.view_matrix()).project_point3(world)
    }

    /// NDC point to world space.
    pub fn unproject(&self, ndc: Vec3) -> Vec3 {
        (self.world_matrix() * self.projection_matrix().inverse()).project_point3(ndc)
    }

    /// Pixel coordinates (origin top-left) to NDC.
    pub fn pixel_to_ndc(&self, px: f32, py: f32) -> Vec2 {
        Vec2::new(px / self.viewport.x * 2.0 - 1.0, -(py / self.viewport.y) * 2.0 + 1.0)
    }

    /// Ray from the eye through an NDC point: (origin, unit direction).
    pub fn ray(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let through = self.unproject(ndc.extend(0.5));
        (self.position, (through - self.position).normalize_or_zero())
    }

    /// Intersect the NDC ray with the plane facing the camera at `depth`.
    /// Returns `None` when the ray runs parallel to that plane.
    pub fn point_at_depth(&self, ndc: Vec2, depth: f32) -> Option<Vec3> {
        let (origin, dir) = self.ray(ndc);
        let denom = dir.dot(self.forward());
        if denom.abs() < 1e-4 {
            return None;
        }
        Some(origin + dir * (depth / denom))
    }

    /// Height of the visible frustum slice at `depth`.
    pub fn visible_height(&self, depth: f32) -> f32 {
        2.0 * (self.fov_y.to_radians() / 2.0).tan() * depth.abs()
    }

    /// World units covered by one pixel at `depth`.
    pub fn units_per_pixel(&self, depth: f32) -> f32 {
        self.visible_height(depth) / self.viewport.y
    }
}

impl Default for Camera3D {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn default_axes() {
        let cam = Camera3D::new(800.0, 600.0);
        assert!(close(cam.forward(), Vec3::NEG_Z));
        assert!(close(cam.right(), Vec3::X));
        assert!(close(cam.up(), Vec3::Y));
    }

    #[test]
    fn translate_follows_orientation() {
        let mut cam = Camera3D::new(800.0, 600.0);
        cam.position = Vec3::ZERO;
        cam.yaw(FRAC_PI_2);
        cam.translate_local(Vec3::new(0.0, 0.0, -1.0));
        // Yawing left by 90° faces -X.
        assert!(close(cam.position, Vec3::new(-1.0, 0.0, 0.0)), "{:?}", cam.position);
    }

    #[test]
    fn look_at_faces_target() {
        let mut cam = Camera3D::new(800.0, 600.0);
        cam.position = Vec3::new(3.0, 2.0, 4.0);
        cam.look_at(Vec3::ZERO);
        let expected = (Vec3::ZERO - cam.position).normalize();
        assert!(close(cam.forward(), expected), "{:?}", cam.forward());
    }

    #[test]
    fn centre_ray_hits_plane_at_depth() {
        let mut cam = Camera3D::new(800.0, 600.0);
        cam.pitch(0.3);
        let p = cam.point_at_depth(Vec2::ZERO, 4.2).unwrap();
        assert!(close(p, cam.position + cam.forward() * 4.2));
    }

    #[test]
    fn project_inverts_unproject() {
        let mut cam = Camera3D::new(1024.0, 768.0);
        cam.yaw(0.4);
        let world = cam.to_world(Vec3::new(0.5, -0.3, -6.0));
        let ndc = cam.project(world);
        assert!(close(cam.unproject(ndc), world));
    }

    #[test]
    fn local_round_trip() {
        let mut cam = Camera3D::new(800.0, 600.0);
        cam.yaw(1.1);
        cam.pitch(-0.2);
        let local = Vec3::new(0.0, 0.0, -5.0);
        assert!(close(cam.to_local(cam.to_world(local)), local));
    }

    #[test]
    fn visible_height_matches_fov() {
        let mut cam = Camera3D::new(800.0, 600.0);
        cam.fov_y = 90.0;
        assert!((cam.visible_height(1.0) - 2.0).abs() < 1e-4);
        assert!((cam.units_per_pixel(3.0) - 6.0 / 600.0).abs() < 1e-5);
    }

    #[test]
    fn pixel_to_ndc_corners() {
        let cam = Camera3D::new(800.0, 600.0);
        assert_eq!(cam.pixel_to_ndc(0.0, 0.0), Vec2::new(-1.0, 1.0));
        assert_eq!(cam.pixel_to_ndc(800.0, 600.0), Vec2::new(1.0, -1.0));
    }
}
