use cubelight_input::{Action, ControlState};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Pitch limit in degrees. Keeps the look direction off the world-up pole.
pub const PITCH_LIMIT: f32 = 89.0;

/// First-person camera driven by held keys.
///
/// Only position, yaw and pitch are stored. The look and right vectors are
/// derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Degrees; -90 looks down -Z.
    pub yaw: f32,
    /// Degrees, clamped to +-PITCH_LIMIT.
    pub pitch: f32,
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per second.
    pub look_speed: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: -90.0,
            pitch: 0.0,
            move_speed: 10.0,
            look_speed: 45.0,
        }
    }
}

impl FlyCamera {
    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Advance one frame: turn first, then move along the new basis.
    pub fn apply_controls(&mut self, controls: &ControlState, dt: f32) {
        let turn = self.look_speed * dt;
        if controls.is_active(Action::LookUp) {
            self.pitch += turn;
        }
        if controls.is_active(Action::LookDown) {
            self.pitch -= turn;
        }
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        if controls.is_active(Action::LookLeft) {
            self.yaw -= turn;
        }
        if controls.is_active(Action::LookRight) {
            self.yaw += turn;
        }

        let step = self.move_speed * dt;
        let forward = self.forward();
        let right = self.right();
        if controls.is_active(Action::StrafeLeft) {
            self.position -= right * step;
        }
        if controls.is_active(Action::StrafeRight) {
            self.position += right * step;
        }
        if controls.is_active(Action::MoveForward) {
            self.position += forward * step;
        }
        if controls.is_active(Action::MoveBackward) {
            self.position -= forward * step;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }
}

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            aspect: 640.0 / 480.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(actions: &[Action]) -> ControlState {
        ControlState::from_actions(actions.iter().copied())
    }

    #[test]
    fn default_looks_down_negative_z() {
        let cam = FlyCamera::default();
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut cam = FlyCamera::default();
        let up = hold(&[Action::LookUp]);
        for _ in 0..1000 {
            cam.apply_controls(&up, 0.1);
            assert!(cam.pitch <= PITCH_LIMIT);
        }
        assert_eq!(cam.pitch, PITCH_LIMIT);

        let down = hold(&[Action::LookDown]);
        for _ in 0..1000 {
            cam.apply_controls(&down, 0.25);
            assert!(cam.pitch >= -PITCH_LIMIT);
        }
        assert_eq!(cam.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn forward_is_unit_length() {
        let mut cam = FlyCamera::default();
        for yaw in (-360..=360).step_by(15) {
            for pitch in (-89..=89).step_by(7) {
                cam.yaw = yaw as f32;
                cam.pitch = pitch as f32;
                assert!((cam.forward().length() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn right_is_orthogonal_to_forward() {
        let mut cam = FlyCamera::default();
        for yaw in (-180..=180).step_by(20) {
            for pitch in (-85..=85).step_by(17) {
                cam.yaw = yaw as f32;
                cam.pitch = pitch as f32;
                assert!(cam.forward().dot(cam.right()).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn one_second_forward_moves_ten_units() {
        let mut cam = FlyCamera::default();
        cam.apply_controls(&hold(&[Action::MoveForward]), 1.0);
        assert!((cam.position - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-4);
    }

    #[test]
    fn strafe_right_moves_along_positive_x() {
        let mut cam = FlyCamera::default();
        cam.apply_controls(&hold(&[Action::StrafeRight]), 0.5);
        assert!((cam.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn look_right_increases_yaw() {
        let mut cam = FlyCamera::default();
        cam.apply_controls(&hold(&[Action::LookRight]), 2.0);
        assert!((cam.yaw - 0.0).abs() < 1e-5);
        assert!((cam.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn projection_uses_viewport_aspect() {
        let proj = Projection::for_viewport(640, 480);
        assert!((proj.aspect - 4.0 / 3.0).abs() < 1e-6);
        assert!(!proj.matrix().col(0).x.is_nan());
        assert!(Projection::for_viewport(0, 0).aspect.is_finite());
    }
}
