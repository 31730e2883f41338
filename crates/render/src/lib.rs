//! Renderer-agnostic core of the cubelight demo.
//!
//! Builds shader programs through a backend trait, describes the cube meshes
//! and their attribute layouts, and owns the per-frame camera and light
//! update. Nothing here touches a GPU device.
//!
//! # Invariants
//! - Pitch stays within +-89 degrees; look and right vectors are derived,
//!   never stored.
//! - A program exists only if both stages compiled and the link succeeded.
//! - Vertex attribute tables are declared beside the vertex structs.
//! - The projection matrix is computed once per run.

mod camera;
mod frame;
mod light;
pub mod mesh;
mod naga_backend;
mod scene;
pub mod shader;

pub use camera::{FlyCamera, PITCH_LIMIT, Projection};
pub use frame::{FrameClock, FrameView, MAX_FRAME_DT, SceneState, frame_duration};
pub use light::{Attenuation, DirectionalLight, LightRig, PointLight, SpotLight};
pub use naga_backend::{
    CompiledStage, FRAGMENT_ENTRY, NagaBackend, StageInterface, VERTEX_ENTRY, ValidatedProgram,
    compile_wgsl_stage, link_interfaces,
};
pub use scene::{
    CubeFace, CubemapFaces, LitCubes, MAX_INSTANCES, ProgramKind, SceneDescriptor, SceneError,
    SceneKind,
};
pub use shader::{ShaderBackend, ShaderError, StageKind, build_program, build_program_from_files};

pub fn crate_info() -> &'static str {
    "cubelight-render v0.1.0"
}
