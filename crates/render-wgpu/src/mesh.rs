use cubelight_render::mesh::{AttributeFormat, AttributeLayout, InstanceTransform, Mesh, StepMode, Vertex};
use wgpu::util::DeviceExt;

pub fn vertex_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        AttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        AttributeFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        AttributeFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

/// Owned form of [`wgpu::VertexBufferLayout`], built from an
/// [`AttributeLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct BufferLayout {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl From<&AttributeLayout> for BufferLayout {
    fn from(layout: &AttributeLayout) -> Self {
        Self {
            array_stride: layout.stride,
            step_mode: match layout.step {
                StepMode::Vertex => wgpu::VertexStepMode::Vertex,
                StepMode::Instance => wgpu::VertexStepMode::Instance,
            },
            attributes: layout
                .attributes
                .iter()
                .map(|a| wgpu::VertexAttribute {
                    format: vertex_format(a.format),
                    offset: a.offset,
                    shader_location: a.location,
                })
                .collect(),
        }
    }
}

impl BufferLayout {
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// Vertex and index buffers for one indexed triangle list.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    /// Upload once; the buffers are never written again.
    pub fn upload<V: Vertex>(device: &wgpu::Device, label: &str, mesh: &Mesh<V>) -> Self {
        debug_assert!(mesh.validate().is_ok(), "mesh '{label}' has bad indices");
        let vertex_label = format!("{label}_vertex_buffer");
        let index_label = format!("{label}_index_buffer");
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(vertex_label.as_str()),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(index_label.as_str()),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        tracing::debug!(
            "uploaded mesh '{label}': {} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }
}

/// Static per-instance model matrices.
pub struct InstanceBuffer {
    pub buffer: wgpu::Buffer,
    pub count: u32,
}

impl InstanceBuffer {
    pub fn upload(device: &wgpu::Device, label: &str, instances: &[InstanceTransform]) -> Self {
        let buffer_label = format!("{label}_instance_buffer");
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(buffer_label.as_str()),
            contents: bytemuck::cast_slice(instances),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            buffer,
            count: instances.len() as u32,
        }
    }
}
