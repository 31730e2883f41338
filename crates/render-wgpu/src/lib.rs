//! wgpu render backend for the cubelight demo.
//!
//! Builds a render pipeline per shader program through the shared
//! [`ShaderBackend`](cubelight_render::ShaderBackend) seam, uploads the cube
//! meshes and textures once, and draws a [`SceneDescriptor`](cubelight_render::SceneDescriptor)
//! every frame.
//!
//! # Invariants
//! - All GPU objects are created before the first frame; only the frame and
//!   light uniforms are written afterwards.
//! - The skybox is drawn first, at the far plane, without depth writes.
//! - Uniform structs match their WGSL declarations byte for byte.

mod mesh;
mod program;
mod renderer;
mod texture;
mod uniforms;

pub use mesh::{BufferLayout, GpuMesh, InstanceBuffer, vertex_format};
pub use program::{DEPTH_FORMAT, DepthMode, PipelineConfig, WgpuShaderBackend, WgpuStage};
pub use renderer::{CubeRenderer, RenderError, instance_data};
pub use texture::{
    Cubemap, DecodedImage, TexelEncoding, Texture2d, TextureError, cubemap_sampler, decode_rgba,
    load_cubemap, load_texture_2d, surface_sampler,
};
pub use uniforms::{FrameUniform, LightsUniform, MarkerUniform};

pub fn crate_info() -> &'static str {
    "cubelight-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render-wgpu"));
    }
}
