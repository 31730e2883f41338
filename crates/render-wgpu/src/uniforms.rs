//! Uniform blocks, laid out to match the WGSL structs byte for byte.
//!
//! WGSL aligns `vec3<f32>` to 16 bytes, so every vec3 is followed by either a
//! scalar that packs into its fourth lane or an explicit pad.

use bytemuck::{Pod, Zeroable};
use cubelight_render::{DirectionalLight, FrameView, LightRig, PointLight, SpotLight};
use glam::{Mat4, Vec3};

/// Group 0: camera matrices and eye position.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl From<&FrameView> for FrameUniform {
    fn from(frame: &FrameView) -> Self {
        Self {
            view: frame.view.to_cols_array_2d(),
            proj: frame.projection.to_cols_array_2d(),
            eye: frame.eye.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    pub direction: [f32; 3],
    _pad0: f32,
    pub ambient: [f32; 3],
    _pad1: f32,
    pub diffuse: [f32; 3],
    _pad2: f32,
    pub specular: [f32; 3],
    _pad3: f32,
}

impl From<&DirectionalLight> for DirectionalLightUniform {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction.to_array(),
            ambient: light.ambient.to_array(),
            diffuse: light.diffuse.to_array(),
            specular: light.specular.to_array(),
            ..Self::zeroed()
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position: [f32; 3],
    pub att_constant: f32,
    pub ambient: [f32; 3],
    pub att_linear: f32,
    pub diffuse: [f32; 3],
    pub att_quadratic: f32,
    pub specular: [f32; 3],
    _pad: f32,
}

impl From<&PointLight> for PointLightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.to_array(),
            att_constant: light.attenuation.constant,
            ambient: light.ambient.to_array(),
            att_linear: light.attenuation.linear,
            diffuse: light.diffuse.to_array(),
            att_quadratic: light.attenuation.quadratic,
            specular: light.specular.to_array(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpotLightUniform {
    pub position: [f32; 3],
    pub att_constant: f32,
    pub direction: [f32; 3],
    pub att_linear: f32,
    pub ambient: [f32; 3],
    pub att_quadratic: f32,
    pub diffuse: [f32; 3],
    pub cutoff_cos: f32,
    pub specular: [f32; 3],
    _pad: f32,
}

impl From<&SpotLight> for SpotLightUniform {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: light.position.to_array(),
            att_constant: light.attenuation.constant,
            direction: light.direction.to_array(),
            att_linear: light.attenuation.linear,
            ambient: light.ambient.to_array(),
            att_quadratic: light.attenuation.quadratic,
            diffuse: light.diffuse.to_array(),
            cutoff_cos: light.cutoff_cos(),
            specular: light.specular.to_array(),
            _pad: 0.0,
        }
    }
}

/// Group 1 of the lit program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightsUniform {
    pub directional: DirectionalLightUniform,
    pub point: PointLightUniform,
    pub spot: SpotLightUniform,
}

impl From<&LightRig> for LightsUniform {
    fn from(rig: &LightRig) -> Self {
        Self {
            directional: (&rig.directional).into(),
            point: (&rig.point).into(),
            spot: (&rig.spot).into(),
        }
    }
}

/// Group 1 of the light marker program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MarkerUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl MarkerUniform {
    pub fn new(model: Mat4, color: Vec3) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: color.extend(1.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn sizes_match_wgsl() {
        assert_eq!(size_of::<FrameUniform>(), 144);
        assert_eq!(size_of::<DirectionalLightUniform>(), 64);
        assert_eq!(size_of::<PointLightUniform>(), 64);
        assert_eq!(size_of::<SpotLightUniform>(), 80);
        assert_eq!(size_of::<LightsUniform>(), 208);
        assert_eq!(size_of::<MarkerUniform>(), 80);
    }

    #[test]
    fn nested_lights_start_on_16_byte_boundaries() {
        assert_eq!(offset_of!(LightsUniform, point), 64);
        assert_eq!(offset_of!(LightsUniform, spot), 128);
        assert_eq!(offset_of!(SpotLightUniform, specular), 64);
    }

    #[test]
    fn scalars_pack_after_vec3() {
        let rig = LightRig::default();
        let uniform = LightsUniform::from(&rig);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&uniform));
        // point light: position.xyz, constant
        assert_eq!(floats[16 + 3], 1.0);
        // point light: quadratic after diffuse
        assert_eq!(floats[16 + 11], 0.032);
        // spot light cutoff after its diffuse
        assert!((floats[32 + 15] - 12.5_f32.to_radians().cos()).abs() < 1e-6);
    }

    #[test]
    fn frame_uniform_carries_eye() {
        let frame = FrameView {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            eye: Vec3::new(1.0, 2.0, 3.0),
            look_dir: Vec3::NEG_Z,
        };
        assert_eq!(FrameUniform::from(&frame).eye, [1.0, 2.0, 3.0, 1.0]);
    }
}
