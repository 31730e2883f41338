//! Scene descriptors: what a run draws and with which assets.
//!
//! The lit scene and the skybox scene are two values of the same type, so one
//! renderer serves both. Descriptors can also be written as YAML.

use crate::camera::FlyCamera;
use crate::light::LightRig;
use crate::mesh::{AttributeLayout, ColorVertex, InstanceTransform, LitVertex, SkyboxVertex};
use cubelight_common::Transform;
use cubelight_input::KeyBindings;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on cubes per instanced draw.
pub const MAX_INSTANCES: usize = 1024;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("cannot access scene file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scene YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown scene '{0}' (expected 'lit' or 'skybox')")]
    UnknownKind(String),

    #[error("scene '{0}' draws nothing")]
    Empty(String),

    #[error("scene '{name}' has {count} cubes in one group (limit {limit})", limit = MAX_INSTANCES)]
    TooManyInstances { name: String, count: usize },
}

/// Built-in scene selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    Lit,
    Skybox,
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SceneKind::Lit => "lit",
            SceneKind::Skybox => "skybox",
        })
    }
}

impl FromStr for SceneKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lit" => Ok(SceneKind::Lit),
            "skybox" => Ok(SceneKind::Skybox),
            other => Err(SceneError::UnknownKind(other.to_string())),
        }
    }
}

/// A shader program the renderer may build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgramKind {
    /// Textured cubes under the light rig.
    Lit,
    /// Unlit marker at the point light.
    LightMarker,
    /// Vertex-colored cubes.
    Colored,
    Skybox,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 4] = [
        ProgramKind::Lit,
        ProgramKind::LightMarker,
        ProgramKind::Colored,
        ProgramKind::Skybox,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Lit => "lit",
            ProgramKind::LightMarker => "light",
            ProgramKind::Colored => "colored",
            ProgramKind::Skybox => "skybox",
        }
    }

    pub fn vertex_file(self) -> String {
        format!("{}.vert.wgsl", self.label())
    }

    pub fn fragment_file(self) -> String {
        format!("{}.frag.wgsl", self.label())
    }

    /// Vertex buffers in slot order.
    pub fn vertex_layouts(self) -> Vec<AttributeLayout> {
        match self {
            ProgramKind::Lit => vec![
                AttributeLayout::of::<LitVertex>(),
                AttributeLayout::of::<InstanceTransform>(),
            ],
            // Reads positions out of the lit cube's buffer.
            ProgramKind::LightMarker => vec![AttributeLayout::of::<LitVertex>().with_locations(&[0])],
            ProgramKind::Colored => vec![
                AttributeLayout::of::<ColorVertex>(),
                AttributeLayout::of::<InstanceTransform>(),
            ],
            ProgramKind::Skybox => vec![AttributeLayout::of::<SkyboxVertex>()],
        }
    }
}

/// Which image goes on which cubemap face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    NegativeZ,
    PositiveZ,
}

impl CubeFace {
    /// Array layer of this face in a cube texture (+X, -X, +Y, -Y, +Z, -Z).
    pub fn layer(self) -> u32 {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }
}

/// Six image paths for a skybox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubemapFaces {
    pub right: PathBuf,
    pub left: PathBuf,
    pub top: PathBuf,
    pub bottom: PathBuf,
    pub back: PathBuf,
    pub front: PathBuf,
}

impl CubemapFaces {
    /// Face images in `dir` named right, left, top, bottom, back and front,
    /// all with `extension`.
    pub fn in_dir(dir: impl AsRef<Path>, extension: &str) -> Self {
        let dir = dir.as_ref();
        let face = |name: &str| dir.join(name).with_extension(extension);
        Self {
            right: face("right"),
            left: face("left"),
            top: face("top"),
            bottom: face("bottom"),
            back: face("back"),
            front: face("front"),
        }
    }

    /// Faces in upload order: +X, -X, +Y, -Y, -Z, +Z.
    pub fn upload_order(&self) -> [(CubeFace, &Path); 6] {
        [
            (CubeFace::PositiveX, self.right.as_path()),
            (CubeFace::NegativeX, self.left.as_path()),
            (CubeFace::PositiveY, self.top.as_path()),
            (CubeFace::NegativeY, self.bottom.as_path()),
            (CubeFace::NegativeZ, self.back.as_path()),
            (CubeFace::PositiveZ, self.front.as_path()),
        ]
    }
}

fn default_light_marker() -> bool {
    true
}

/// Textured cubes lit by the three-light rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitCubes {
    pub diffuse_map: PathBuf,
    pub specular_map: PathBuf,
    pub placements: Vec<Transform>,
    #[serde(default)]
    pub lights: LightRig,
    /// Draw a small white cube at the point light.
    #[serde(default = "default_light_marker")]
    pub light_marker: bool,
}

impl LitCubes {
    /// Model matrix of the light marker.
    pub fn marker_transform(&self) -> Transform {
        Transform::from_position(self.lights.point.position).with_uniform_scale(0.1)
    }
}

fn default_shader_dir() -> PathBuf {
    PathBuf::from("assets/shaders")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub name: String,
    #[serde(default = "default_shader_dir")]
    pub shader_dir: PathBuf,
    #[serde(default)]
    pub camera: FlyCamera,
    #[serde(default)]
    pub bindings: KeyBindings,
    #[serde(default)]
    pub lit: Option<LitCubes>,
    #[serde(default)]
    pub colored_cubes: Vec<Transform>,
    #[serde(default)]
    pub skybox: Option<CubemapFaces>,
}

/// Positions of the nine textured cubes.
const LIT_CUBE_POSITIONS: [Vec3; 9] = [
    Vec3::new(2.0, 5.0, -15.0),
    Vec3::new(-1.5, -2.2, -2.5),
    Vec3::new(-3.8, -2.0, -12.3),
    Vec3::new(2.4, -0.4, -3.5),
    Vec3::new(-1.7, 3.0, -7.5),
    Vec3::new(1.3, -2.0, -2.5),
    Vec3::new(1.5, 2.0, -2.5),
    Vec3::new(1.5, 0.2, -1.5),
    Vec3::new(-1.3, 1.0, -1.5),
];

impl SceneDescriptor {
    pub fn builtin(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Lit => Self::lit(),
            SceneKind::Skybox => Self::skybox(),
        }
    }

    /// Nine half-size textured cubes, each turned 20 degrees further than the
    /// last, under a directional, a point and a camera-held spot light.
    pub fn lit() -> Self {
        let placements = LIT_CUBE_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                Transform::from_position(p)
                    .with_axis_angle(Vec3::ONE, 20.0 * i as f32)
                    .with_uniform_scale(0.5)
            })
            .collect();
        Self {
            name: "lit".into(),
            shader_dir: default_shader_dir(),
            camera: FlyCamera::default(),
            bindings: KeyBindings::default(),
            lit: Some(LitCubes {
                diffuse_map: PathBuf::from("assets/textures/container-diffuse.png"),
                specular_map: PathBuf::from("assets/textures/container-specular.png"),
                placements,
                lights: LightRig::default(),
                light_marker: true,
            }),
            colored_cubes: Vec::new(),
            skybox: None,
        }
    }

    /// One vertex-colored cube in front of the camera inside a skybox.
    pub fn skybox() -> Self {
        Self {
            name: "skybox".into(),
            shader_dir: default_shader_dir(),
            camera: FlyCamera::default(),
            bindings: KeyBindings::default(),
            lit: None,
            colored_cubes: vec![Transform::from_position(Vec3::new(0.0, 0.0, -5.0))],
            skybox: Some(CubemapFaces::in_dir("assets/textures/skybox", "png")),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SceneError> {
        let scene: Self = serde_yaml::from_str(yaml)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn to_yaml(&self) -> Result<String, SceneError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scene = Self::from_yaml_str(&text)?;
        tracing::info!("loaded scene '{}' from {}", scene.name, path.display());
        Ok(scene)
    }

    pub fn save(&self, path: &Path) -> Result<(), SceneError> {
        fs::write(path, self.to_yaml()?).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.programs().is_empty() {
            return Err(SceneError::Empty(self.name.clone()));
        }
        let lit_count = self.lit.as_ref().map_or(0, |l| l.placements.len());
        let largest = lit_count.max(self.colored_cubes.len());
        if largest > MAX_INSTANCES {
            return Err(SceneError::TooManyInstances {
                name: self.name.clone(),
                count: largest,
            });
        }
        Ok(())
    }

    /// Programs this scene needs, in draw order.
    pub fn programs(&self) -> Vec<ProgramKind> {
        let mut programs = Vec::new();
        if self.skybox.is_some() {
            programs.push(ProgramKind::Skybox);
        }
        if let Some(lit) = &self.lit {
            if !lit.placements.is_empty() {
                programs.push(ProgramKind::Lit);
            }
            if lit.light_marker {
                programs.push(ProgramKind::LightMarker);
            }
        }
        if !self.colored_cubes.is_empty() {
            programs.push(ProgramKind::Colored);
        }
        programs
    }

    /// Vertex and fragment source paths for `program`.
    pub fn shader_paths(&self, program: ProgramKind) -> (PathBuf, PathBuf) {
        (
            self.shader_dir.join(program.vertex_file()),
            self.shader_dir.join(program.fragment_file()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_kind_parses() {
        assert_eq!("lit".parse::<SceneKind>().unwrap(), SceneKind::Lit);
        assert_eq!(" Skybox ".parse::<SceneKind>().unwrap(), SceneKind::Skybox);
        assert!(matches!(
            "fog".parse::<SceneKind>(),
            Err(SceneError::UnknownKind(_))
        ));
    }

    #[test]
    fn lit_scene_places_nine_rotated_cubes() {
        let scene = SceneDescriptor::lit();
        let lit = scene.lit.as_ref().unwrap();
        assert_eq!(lit.placements.len(), 9);
        assert_eq!(lit.placements[0].rotation, glam::Quat::IDENTITY);
        assert_ne!(lit.placements[1].rotation, glam::Quat::IDENTITY);
        assert!(lit.placements.iter().all(|t| t.scale == Vec3::splat(0.5)));
        assert_eq!(
            scene.programs(),
            vec![ProgramKind::Lit, ProgramKind::LightMarker]
        );
        assert_eq!(lit.marker_transform().scale, Vec3::splat(0.1));
    }

    #[test]
    fn skybox_scene_draws_sky_first() {
        let scene = SceneDescriptor::skybox();
        assert_eq!(
            scene.programs(),
            vec![ProgramKind::Skybox, ProgramKind::Colored]
        );
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn cubemap_upload_order() {
        let faces = CubemapFaces::in_dir("sky", "jpg");
        let order = faces.upload_order();
        let names: Vec<_> = order
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            ["right.jpg", "left.jpg", "top.jpg", "bottom.jpg", "back.jpg", "front.jpg"]
        );
        let layers: Vec<u32> = order.iter().map(|(f, _)| f.layer()).collect();
        assert_eq!(layers, [0, 1, 2, 3, 5, 4]);
    }

    #[test]
    fn shader_paths_follow_naming() {
        let scene = SceneDescriptor::lit();
        let (vs, fs) = scene.shader_paths(ProgramKind::LightMarker);
        assert_eq!(vs, PathBuf::from("assets/shaders/light.vert.wgsl"));
        assert_eq!(fs, PathBuf::from("assets/shaders/light.frag.wgsl"));
    }

    #[test]
    fn marker_layout_reads_positions_only() {
        let layouts = ProgramKind::LightMarker.vertex_layouts();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].stride, 32);
        assert_eq!(layouts[0].attributes.len(), 1);
    }

    #[test]
    fn empty_scene_is_rejected() {
        let yaml = "name: nothing\n";
        assert!(matches!(
            SceneDescriptor::from_yaml_str(yaml),
            Err(SceneError::Empty(_))
        ));
    }

    #[test]
    fn marker_alone_is_drawable() {
        let mut scene = SceneDescriptor::lit();
        if let Some(lit) = scene.lit.as_mut() {
            lit.placements.clear();
        }
        assert_eq!(scene.programs(), vec![ProgramKind::LightMarker]);
        assert!(scene.validate().is_ok());

        if let Some(lit) = scene.lit.as_mut() {
            lit.light_marker = false;
        }
        assert!(matches!(scene.validate(), Err(SceneError::Empty(_))));
    }

    #[test]
    fn yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.yaml");
        let scene = SceneDescriptor::lit();
        scene.save(&path).unwrap();
        let loaded = SceneDescriptor::load(&path).unwrap();
        assert_eq!(loaded, scene);
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let yaml = r#"
name: one-cube
colored_cubes:
  - position: [0.0, 0.0, -3.0]
"#;
        let scene = SceneDescriptor::from_yaml_str(yaml).unwrap();
        assert_eq!(scene.shader_dir, PathBuf::from("assets/shaders"));
        assert_eq!(scene.camera, FlyCamera::default());
        assert_eq!(scene.programs(), vec![ProgramKind::Colored]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SceneDescriptor::load(Path::new("/nonexistent/scene.yaml")).unwrap_err();
        assert!(matches!(err, SceneError::Io { .. }));
    }
}
