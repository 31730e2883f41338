use crate::mesh::{BufferLayout, GpuMesh, InstanceBuffer};
use crate::program::{DEPTH_FORMAT, DepthMode, PipelineConfig, WgpuShaderBackend};
use crate::texture::{self, TexelEncoding, TextureError};
use crate::uniforms::{FrameUniform, LightsUniform, MarkerUniform};
use cubelight_common::Transform;
use cubelight_render::mesh::{self as cube, InstanceTransform};
use cubelight_render::{
    FrameView, LightRig, LitCubes, ProgramKind, SceneDescriptor, SceneError, ShaderError,
    build_program_from_files,
};
use glam::Vec3;
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Shared inputs for building one pass's pipeline.
struct PassBuilder<'a> {
    device: &'a wgpu::Device,
    scene: &'a SceneDescriptor,
    surface_format: wgpu::TextureFormat,
    frame_layout: &'a wgpu::BindGroupLayout,
}

impl PassBuilder<'_> {
    /// Build `program` with the frame group at 0 followed by `groups`.
    fn pipeline(
        &self,
        program: ProgramKind,
        groups: &[&wgpu::BindGroupLayout],
        depth: DepthMode,
        cull_mode: Option<wgpu::Face>,
    ) -> Result<wgpu::RenderPipeline, ShaderError> {
        let mut bind_group_layouts = vec![self.frame_layout];
        bind_group_layouts.extend_from_slice(groups);
        let layout_label = format!("{}_pipeline_layout", program.label());
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(layout_label.as_str()),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });
        let vertex_buffers: Vec<BufferLayout> = program
            .vertex_layouts()
            .iter()
            .map(BufferLayout::from)
            .collect();
        let mut backend = WgpuShaderBackend::new(
            self.device,
            PipelineConfig {
                layout: &layout,
                vertex_buffers: &vertex_buffers,
                color_format: self.surface_format,
                depth,
                cull_mode,
            },
        );
        let (vs, fs) = self.scene.shader_paths(program);
        build_program_from_files(&mut backend, program.label(), &vs, &fs)
    }
}

struct LitPass {
    pipeline: wgpu::RenderPipeline,
    lights_buffer: wgpu::Buffer,
    lights_bind_group: wgpu::BindGroup,
    material_bind_group: wgpu::BindGroup,
    instances: InstanceBuffer,
}

impl LitPass {
    fn new(b: &PassBuilder<'_>, queue: &wgpu::Queue, lit: &LitCubes) -> Result<Self, RenderError> {
        let device = b.device;
        let lights_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lights_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry(2),
            ],
        });
        let pipeline = b.pipeline(
            ProgramKind::Lit,
            &[&lights_layout, &material_layout],
            DepthMode::Opaque,
            Some(wgpu::Face::Back),
        )?;

        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lights_buffer"),
            contents: bytemuck::bytes_of(&LightsUniform::from(&lit.lights)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lights_bind_group"),
            layout: &lights_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: lights_buffer.as_entire_binding(),
            }],
        });

        let diffuse = texture::load_texture_2d(device, queue, &lit.diffuse_map, TexelEncoding::Srgb);
        let specular =
            texture::load_texture_2d(device, queue, &lit.specular_map, TexelEncoding::Linear);
        let sampler = texture::surface_sampler(device);
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let instances = InstanceBuffer::upload(device, "lit", &instance_data(&lit.placements));
        Ok(Self {
            pipeline,
            lights_buffer,
            lights_bind_group,
            material_bind_group,
            instances,
        })
    }
}

struct MarkerPass {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

impl MarkerPass {
    fn new(b: &PassBuilder<'_>, lit: &LitCubes) -> Result<Self, RenderError> {
        let device = b.device;
        let marker_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marker_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let pipeline = b.pipeline(
            ProgramKind::LightMarker,
            &[&marker_layout],
            DepthMode::Opaque,
            Some(wgpu::Face::Back),
        )?;
        // The point light never moves, so neither does its marker.
        let uniform = MarkerUniform::new(lit.marker_transform().model_matrix(), Vec3::ONE);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker_buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("marker_bind_group"),
            layout: &marker_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Ok(Self {
            pipeline,
            bind_group,
        })
    }
}

struct ColoredPass {
    pipeline: wgpu::RenderPipeline,
    mesh: GpuMesh,
    instances: InstanceBuffer,
}

impl ColoredPass {
    fn new(b: &PassBuilder<'_>, placements: &[Transform]) -> Result<Self, RenderError> {
        let pipeline = b.pipeline(
            ProgramKind::Colored,
            &[],
            DepthMode::Opaque,
            Some(wgpu::Face::Back),
        )?;
        Ok(Self {
            pipeline,
            mesh: GpuMesh::upload(b.device, "colored_cube", &cube::colored_cube()),
            instances: InstanceBuffer::upload(b.device, "colored", &instance_data(placements)),
        })
    }
}

struct SkyboxPass {
    pipeline: wgpu::RenderPipeline,
    mesh: GpuMesh,
    bind_group: wgpu::BindGroup,
}

impl SkyboxPass {
    fn new(
        b: &PassBuilder<'_>,
        queue: &wgpu::Queue,
        faces: &cubelight_render::CubemapFaces,
    ) -> Result<Self, RenderError> {
        let device = b.device;
        let sky_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox_bind_group_layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::Cube),
                sampler_entry(1),
            ],
        });
        // Seen from inside, so no culling.
        let pipeline = b.pipeline(ProgramKind::Skybox, &[&sky_layout], DepthMode::Background, None)?;
        let cubemap = texture::load_cubemap(device, queue, faces)?;
        let sampler = texture::cubemap_sampler(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox_bind_group"),
            layout: &sky_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&cubemap.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        Ok(Self {
            pipeline,
            mesh: GpuMesh::upload(device, "skybox_cube", &cube::skybox_cube()),
            bind_group,
        })
    }
}

pub fn instance_data(placements: &[Transform]) -> Vec<InstanceTransform> {
    placements
        .iter()
        .map(|t| InstanceTransform::from(t.model_matrix()))
        .collect()
}

/// Draws one scene descriptor: skybox, lit cubes, light marker and colored
/// cubes, each present only if the descriptor asks for it.
pub struct CubeRenderer {
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    lit_mesh: Option<GpuMesh>,
    lit: Option<LitPass>,
    marker: Option<MarkerPass>,
    colored: Option<ColoredPass>,
    skybox: Option<SkyboxPass>,
    depth_view: wgpu::TextureView,
}

impl CubeRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        scene: &SceneDescriptor,
    ) -> Result<Self, RenderError> {
        scene.validate()?;

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let builder = PassBuilder {
            device,
            scene,
            surface_format,
            frame_layout: &frame_layout,
        };

        let programs = scene.programs();
        let wants = |p: ProgramKind| programs.contains(&p);

        let skybox = match &scene.skybox {
            Some(faces) if wants(ProgramKind::Skybox) => {
                Some(SkyboxPass::new(&builder, queue, faces)?)
            }
            _ => None,
        };
        let (lit, marker) = match &scene.lit {
            Some(lit_cubes) => {
                let lit = if wants(ProgramKind::Lit) {
                    Some(LitPass::new(&builder, queue, lit_cubes)?)
                } else {
                    None
                };
                let marker = if wants(ProgramKind::LightMarker) {
                    Some(MarkerPass::new(&builder, lit_cubes)?)
                } else {
                    None
                };
                (lit, marker)
            }
            None => (None, None),
        };
        let lit_mesh = (lit.is_some() || marker.is_some())
            .then(|| GpuMesh::upload(device, "lit_cube", &cube::lit_cube()));
        let colored = if wants(ProgramKind::Colored) {
            Some(ColoredPass::new(&builder, &scene.colored_cubes)?)
        } else {
            None
        };

        tracing::info!(
            "renderer ready for scene '{}': {}",
            scene.name,
            programs
                .iter()
                .map(|p| p.label())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            frame_buffer,
            frame_bind_group,
            lit_mesh,
            lit,
            marker,
            colored,
            skybox,
            depth_view: Self::create_depth_texture(device, width, height),
        })
    }

    /// Only the depth buffer follows the window; the projection stays fixed.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = Self::create_depth_texture(device, width, height);
    }

    /// Render one frame: skybox, lit cubes, light marker, colored cubes.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        frame: &FrameView,
        lights: Option<&LightRig>,
    ) {
        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniform::from(frame)),
        );
        if let (Some(lit), Some(lights)) = (&self.lit, lights) {
            queue.write_buffer(
                &lit.lights_buffer,
                0,
                bytemuck::bytes_of(&LightsUniform::from(lights)),
            );
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            if let Some(sky) = &self.skybox {
                pass.set_pipeline(&sky.pipeline);
                pass.set_bind_group(1, &sky.bind_group, &[]);
                sky.mesh.bind(&mut pass);
                pass.draw_indexed(0..sky.mesh.index_count, 0, 0..1);
            }

            if let (Some(lit), Some(mesh)) = (&self.lit, &self.lit_mesh) {
                pass.set_pipeline(&lit.pipeline);
                pass.set_bind_group(1, &lit.lights_bind_group, &[]);
                pass.set_bind_group(2, &lit.material_bind_group, &[]);
                mesh.bind(&mut pass);
                pass.set_vertex_buffer(1, lit.instances.buffer.slice(..));
                pass.draw_indexed(0..mesh.index_count, 0, 0..lit.instances.count);
            }

            if let (Some(marker), Some(mesh)) = (&self.marker, &self.lit_mesh) {
                pass.set_pipeline(&marker.pipeline);
                pass.set_bind_group(1, &marker.bind_group, &[]);
                mesh.bind(&mut pass);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            if let Some(colored) = &self.colored {
                pass.set_pipeline(&colored.pipeline);
                colored.mesh.bind(&mut pass);
                pass.set_vertex_buffer(1, colored.instances.buffer.slice(..));
                pass.draw_indexed(0..colored.mesh.index_count, 0, 0..colored.instances.count);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
