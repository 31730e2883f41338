use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Distance falloff: `1 / (constant + linear*d + quadratic*d^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    /// Roughly a 50 unit range.
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::NEG_Y,
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            ambient: Vec3::splat(0.01),
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            attenuation: Attenuation::default(),
        }
    }
}

/// Cone light. Its position and direction follow the camera every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
    /// Half-angle of the cone in degrees.
    pub cutoff_degrees: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            attenuation: Attenuation::default(),
            cutoff_degrees: 12.5,
        }
    }
}

impl SpotLight {
    /// Cosine of the cutoff, the form the shader compares against.
    pub fn cutoff_cos(&self) -> f32 {
        self.cutoff_degrees.to_radians().cos()
    }
}

/// The three lights of the lit scene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRig {
    pub directional: DirectionalLight,
    pub point: PointLight,
    pub spot: SpotLight,
}

impl LightRig {
    /// Attach the spot light to the camera.
    pub fn track_camera(&mut self, eye: Vec3, look_dir: Vec3) {
        self.spot.position = eye;
        self.spot.direction = look_dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_tracks_camera_only() {
        let mut rig = LightRig::default();
        let point_before = rig.point;
        rig.track_camera(Vec3::new(1.0, 2.0, 3.0), Vec3::X);
        assert_eq!(rig.spot.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(rig.spot.direction, Vec3::X);
        assert_eq!(rig.point, point_before);
    }

    #[test]
    fn cutoff_cosine() {
        let spot = SpotLight {
            cutoff_degrees: 60.0,
            ..SpotLight::default()
        };
        assert!((spot.cutoff_cos() - 0.5).abs() < 1e-6);
    }
}
