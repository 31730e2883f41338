use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Spatial transform: position, rotation, scale.
///
/// Missing fields deserialize to their identity values, so a YAML placement
/// can be as short as `position: [1.0, 2.0, 3.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Rotate by `degrees` about `axis`. The axis is normalized here; a zero
    /// axis leaves the rotation untouched.
    pub fn with_axis_angle(mut self, axis: Vec3, degrees: f32) -> Self {
        if let Some(axis) = axis.try_normalize() {
            self.rotation = Quat::from_axis_angle(axis, degrees.to_radians());
        }
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Model matrix: translate * rotate * scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn model_matrix_scales_before_translating() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).with_uniform_scale(0.5);
        let p = t.model_matrix().transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(2.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn zero_axis_keeps_identity_rotation() {
        let t = Transform::default().with_axis_angle(Vec3::ZERO, 45.0);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let t: Transform = serde_yaml::from_str("position: [1.0, 2.0, 3.0]").unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::ONE);
    }
}
