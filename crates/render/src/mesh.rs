//! Vertex formats, attribute layouts and the cube meshes.
//!
//! Every vertex struct declares its attribute table next to its fields, with
//! offsets taken from the struct itself, so the layout handed to the GPU
//! cannot drift from the bytes in the buffer.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::mem::{offset_of, size_of};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    F32,
    U8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    Float32x2,
    Float32x3,
    Float32x4,
    /// Four bytes read as normalized floats in [0, 1].
    Unorm8x4,
}

impl AttributeFormat {
    pub fn components(self) -> u32 {
        match self {
            AttributeFormat::Float32x2 => 2,
            AttributeFormat::Float32x3 => 3,
            AttributeFormat::Float32x4 | AttributeFormat::Unorm8x4 => 4,
        }
    }

    pub fn component_type(self) -> ComponentType {
        match self {
            AttributeFormat::Unorm8x4 => ComponentType::U8,
            _ => ComponentType::F32,
        }
    }

    pub fn normalized(self) -> bool {
        matches!(self, AttributeFormat::Unorm8x4)
    }

    pub fn byte_size(self) -> u64 {
        let component = match self.component_type() {
            ComponentType::F32 => 4,
            ComponentType::U8 => 1,
        };
        u64::from(self.components()) * component
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: AttributeFormat,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Vertex,
    Instance,
}

/// Byte layout of one vertex buffer as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    pub stride: u64,
    pub step: StepMode,
    pub attributes: Vec<VertexAttribute>,
}

impl AttributeLayout {
    pub fn of<V: Vertex>() -> Self {
        Self {
            stride: size_of::<V>() as u64,
            step: V::STEP,
            attributes: V::ATTRIBUTES.to_vec(),
        }
    }

    /// Keep only the listed locations. The stride is unchanged, so the same
    /// buffer can feed a pipeline that reads fewer fields.
    pub fn with_locations(&self, locations: &[u32]) -> Self {
        Self {
            stride: self.stride,
            step: self.step,
            attributes: self
                .attributes
                .iter()
                .filter(|a| locations.contains(&a.location))
                .copied()
                .collect(),
        }
    }

    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }
}

/// A plain-old-data record that can live in a vertex buffer.
pub trait Vertex: Pod {
    const ATTRIBUTES: &'static [VertexAttribute];
    const STEP: StepMode = StepMode::Vertex;
}

/// Position, normal and texture coordinate. Used by the lit cubes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LitVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex for LitVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute {
            location: 0,
            format: AttributeFormat::Float32x3,
            offset: offset_of!(LitVertex, position) as u64,
        },
        VertexAttribute {
            location: 1,
            format: AttributeFormat::Float32x3,
            offset: offset_of!(LitVertex, normal) as u64,
        },
        VertexAttribute {
            location: 2,
            format: AttributeFormat::Float32x2,
            offset: offset_of!(LitVertex, uv) as u64,
        },
    ];
}

/// Position plus an RGBA byte color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

impl Vertex for ColorVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute {
            location: 0,
            format: AttributeFormat::Float32x3,
            offset: offset_of!(ColorVertex, position) as u64,
        },
        VertexAttribute {
            location: 1,
            format: AttributeFormat::Unorm8x4,
            offset: offset_of!(ColorVertex, color) as u64,
        },
    ];
}

/// Position only. The skybox samples its cubemap by direction.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyboxVertex {
    pub position: [f32; 3],
}

impl Vertex for SkyboxVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[VertexAttribute {
        location: 0,
        format: AttributeFormat::Float32x3,
        offset: offset_of!(SkyboxVertex, position) as u64,
    }];
}

/// Per-instance model matrix, one column per attribute.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub model_0: [f32; 4],
    pub model_1: [f32; 4],
    pub model_2: [f32; 4],
    pub model_3: [f32; 4],
}

impl From<Mat4> for InstanceTransform {
    fn from(model: Mat4) -> Self {
        let cols = model.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
        }
    }
}

impl Vertex for InstanceTransform {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute {
            location: 3,
            format: AttributeFormat::Float32x4,
            offset: offset_of!(InstanceTransform, model_0) as u64,
        },
        VertexAttribute {
            location: 4,
            format: AttributeFormat::Float32x4,
            offset: offset_of!(InstanceTransform, model_1) as u64,
        },
        VertexAttribute {
            location: 5,
            format: AttributeFormat::Float32x4,
            offset: offset_of!(InstanceTransform, model_2) as u64,
        },
        VertexAttribute {
            location: 6,
            format: AttributeFormat::Float32x4,
            offset: offset_of!(InstanceTransform, model_3) as u64,
        },
    ];
    const STEP: StepMode = StepMode::Instance;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// Indexed triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

impl<V> Mesh<V> {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(self.indices.len()));
        }
        let vertex_count = self.vertices.len();
        for (position, &index) in self.indices.iter().enumerate() {
            if index as usize >= vertex_count {
                return Err(MeshError::IndexOutOfRange {
                    position,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

struct CubeFace {
    normal: [f32; 3],
    /// Corners counter-clockwise seen from outside: bottom-left, bottom-right,
    /// top-right, top-left.
    corners: [[f32; 3]; 4],
}

#[rustfmt::skip]
const CUBE_FACES: [CubeFace; 6] = [
    // front (+Z)
    CubeFace { normal: [0.0, 0.0, 1.0], corners: [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]] },
    // back (-Z)
    CubeFace { normal: [0.0, 0.0, -1.0], corners: [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]] },
    // left (-X)
    CubeFace { normal: [-1.0, 0.0, 0.0], corners: [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]] },
    // right (+X)
    CubeFace { normal: [1.0, 0.0, 0.0], corners: [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]] },
    // top (+Y)
    CubeFace { normal: [0.0, 1.0, 0.0], corners: [[-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]] },
    // bottom (-Y)
    CubeFace { normal: [0.0, -1.0, 0.0], corners: [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]] },
];

/// Texture coordinates per corner, origin at the image's top-left.
const FACE_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// One color per face, in face order.
const FACE_COLORS: [[u8; 4]; 6] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
    [0, 255, 255, 255],
    [255, 0, 255, 255],
];

pub const CUBE_VERTEX_COUNT: usize = 24;

/// Two triangles per face: (i, i+1, i+2) and (i+2, i+3, i).
#[rustfmt::skip]
pub const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0,        // front
    4, 5, 6, 6, 7, 4,        // back
    8, 9, 10, 10, 11, 8,     // left
    12, 13, 14, 14, 15, 12,  // right
    16, 17, 18, 18, 19, 16,  // top
    20, 21, 22, 22, 23, 20,  // bottom
];

fn cube_with<V>(mut make: impl FnMut(usize, usize, &CubeFace) -> V) -> Mesh<V> {
    let mut vertices = Vec::with_capacity(CUBE_VERTEX_COUNT);
    for (face_index, face) in CUBE_FACES.iter().enumerate() {
        for corner in 0..4 {
            vertices.push(make(face_index, corner, face));
        }
    }
    Mesh {
        vertices,
        indices: CUBE_INDICES.to_vec(),
    }
}

/// Cube spanning [-1, 1] with per-face normals and full-face UVs.
pub fn lit_cube() -> Mesh<LitVertex> {
    cube_with(|_, corner, face| LitVertex {
        position: face.corners[corner],
        normal: face.normal,
        uv: FACE_UVS[corner],
    })
}

/// Cube spanning [-1, 1] with a solid color per face.
pub fn colored_cube() -> Mesh<ColorVertex> {
    cube_with(|face_index, corner, face| ColorVertex {
        position: face.corners[corner],
        color: FACE_COLORS[face_index],
    })
}

pub fn skybox_cube() -> Mesh<SkyboxVertex> {
    cube_with(|_, corner, face| SkyboxVertex {
        position: face.corners[corner],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn cube_indices_stay_in_range() {
        let mesh = lit_cube();
        assert_eq!(mesh.vertices.len(), CUBE_VERTEX_COUNT);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < CUBE_VERTEX_COUNT));
        assert_eq!(mesh.validate(), Ok(()));
    }

    #[test]
    fn cube_has_two_triangles_per_face() {
        let mesh = lit_cube();
        assert_eq!(mesh.triangle_count(), 12);
        for (t, tri) in mesh.indices.chunks(3).enumerate() {
            let face = t / 2;
            assert!(tri.iter().all(|&i| i as usize / 4 == face), "triangle {t} crosses faces");
        }
    }

    #[test]
    fn faces_wind_counter_clockwise_from_outside() {
        let mesh = lit_cube();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(mesh.vertices[tri[k] as usize].position));
            let n = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn variants_share_positions() {
        let lit = lit_cube();
        let colored = colored_cube();
        let sky = skybox_cube();
        for i in 0..CUBE_VERTEX_COUNT {
            assert_eq!(lit.vertices[i].position, colored.vertices[i].position);
            assert_eq!(lit.vertices[i].position, sky.vertices[i].position);
        }
        assert_eq!(colored.vertices[4].color, FACE_COLORS[1]);
    }

    #[test]
    fn validate_rejects_bad_indices() {
        let mut mesh = skybox_cube();
        mesh.indices[7] = 24;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange {
                position: 7,
                index: 24,
                vertex_count: 24
            })
        );
        mesh.indices.truncate(35);
        assert_eq!(mesh.validate(), Err(MeshError::IncompleteTriangle(35)));
    }

    #[test]
    fn layouts_follow_struct_offsets() {
        let lit = AttributeLayout::of::<LitVertex>();
        assert_eq!(lit.stride, 32);
        let offsets: Vec<u64> = lit.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);

        let colored = AttributeLayout::of::<ColorVertex>();
        assert_eq!(colored.stride, 16);
        let color = colored.attribute(1).unwrap();
        assert_eq!(color.offset, 12);
        assert!(color.format.normalized());
        assert_eq!(color.format.component_type(), ComponentType::U8);

        assert_eq!(AttributeLayout::of::<SkyboxVertex>().stride, 12);

        let instance = AttributeLayout::of::<InstanceTransform>();
        assert_eq!(instance.step, StepMode::Instance);
        assert_eq!(instance.stride, 64);
    }

    #[test]
    fn attributes_fit_inside_stride() {
        for layout in [
            AttributeLayout::of::<LitVertex>(),
            AttributeLayout::of::<ColorVertex>(),
            AttributeLayout::of::<SkyboxVertex>(),
            AttributeLayout::of::<InstanceTransform>(),
        ] {
            for a in &layout.attributes {
                assert!(a.offset + a.format.byte_size() <= layout.stride);
            }
        }
    }

    #[test]
    fn subset_layout_keeps_stride() {
        let positions = AttributeLayout::of::<LitVertex>().with_locations(&[0]);
        assert_eq!(positions.stride, 32);
        assert_eq!(positions.attributes.len(), 1);
        assert!(positions.attribute(1).is_none());
    }

    #[test]
    fn instance_transform_columns() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let inst = InstanceTransform::from(m);
        assert_eq!(inst.model_3, [1.0, 2.0, 3.0, 1.0]);
    }
}
