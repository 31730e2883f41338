use crate::mesh::BufferLayout;
use cubelight_render::{
    CompiledStage, ShaderBackend, ShaderError, StageKind, compile_wgsl_stage, link_interfaces,
};

/// Depth behaviour of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    /// Depth-tested and depth-writing geometry.
    Opaque,
    /// Drawn at the far plane behind everything; never writes depth.
    Background,
}

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

impl DepthMode {
    pub fn state(self) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match self {
            DepthMode::Opaque => (true, wgpu::CompareFunction::Less),
            DepthMode::Background => (false, wgpu::CompareFunction::LessEqual),
        };
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }
    }
}

/// Fixed-function state a linked program is built against.
pub struct PipelineConfig<'a> {
    pub layout: &'a wgpu::PipelineLayout,
    pub vertex_buffers: &'a [BufferLayout],
    pub color_format: wgpu::TextureFormat,
    pub depth: DepthMode,
    pub cull_mode: Option<wgpu::Face>,
}

pub struct WgpuStage {
    compiled: CompiledStage,
    module: wgpu::ShaderModule,
}

/// Compiles stages into shader modules and links them into render
/// pipelines. Device validation errors are caught with error scopes.
pub struct WgpuShaderBackend<'a> {
    device: &'a wgpu::Device,
    config: PipelineConfig<'a>,
}

impl<'a> WgpuShaderBackend<'a> {
    pub fn new(device: &'a wgpu::Device, config: PipelineConfig<'a>) -> Self {
        Self { device, config }
    }

    fn scoped<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }
}

impl ShaderBackend for WgpuShaderBackend<'_> {
    type Stage = WgpuStage;
    type Program = wgpu::RenderPipeline;

    fn compile_stage(
        &mut self,
        kind: StageKind,
        label: &str,
        source: &str,
    ) -> Result<WgpuStage, ShaderError> {
        // naga gives readable diagnostics before the device sees the source.
        let compiled = compile_wgsl_stage(kind, label, source)?;
        let module_label = format!("{label}.{kind}");
        let (module, error) = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(module_label.as_str()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        if let Some(error) = error {
            return Err(ShaderError::Compile {
                stage: kind,
                label: label.to_string(),
                log: error.to_string(),
            });
        }
        Ok(WgpuStage { compiled, module })
    }

    fn link(
        &mut self,
        label: &str,
        vertex: WgpuStage,
        fragment: WgpuStage,
    ) -> Result<wgpu::RenderPipeline, ShaderError> {
        link_interfaces(label, &vertex.compiled, &fragment.compiled)?;

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> =
            self.config.vertex_buffers.iter().map(BufferLayout::as_wgpu).collect();
        let pipeline_label = format!("{label}_pipeline");
        let (pipeline, error) = self.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(pipeline_label.as_str()),
                layout: Some(self.config.layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(vertex.compiled.entry_point.as_str()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(fragment.compiled.entry_point.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: self.config.cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(self.config.depth.state()),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(error) = error {
            return Err(ShaderError::Link {
                label: label.to_string(),
                log: error.to_string(),
            });
        }
        // The stage modules drop here; the pipeline keeps what it needs.
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_depth_never_writes() {
        let state = DepthMode::Background.state();
        assert!(!state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::LessEqual);
        let opaque = DepthMode::Opaque.state();
        assert!(opaque.depth_write_enabled);
        assert_eq!(opaque.format, DEPTH_FORMAT);
    }
}
