use std::borrow::Cow;

use rusty_gpu_shared::{
    AttributeFormat, GraphicsBackend, ProgramId, RenderError, ShaderCompileError, ViewUniforms,
    VERTEX_ATTRIBUTES, VERTEX_STRIDE,
};
use wgpu::util::DeviceExt;

use crate::handle::HandleStore;
use crate::shader::{self, LinkedProgram};

/// A linked program turned into a render pipeline.
pub struct GPUProgram {
    pub pipeline: wgpu::RenderPipeline,
}

/// The vertex buffer the guest's bytes are copied into every frame.
pub struct GPUVertexBuffer {
    pub buffer: wgpu::Buffer,
    pub capacity: u64,
    /// Bytes written by the last upload.
    pub len: u64,
}

/// `GraphicsBackend` on top of wgpu. Owns every GPU resource.
pub struct WgpuBackend {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub width: u32,
    pub height: u32,
    pub clear_color: wgpu::Color,

    pub programs: HandleStore<GPUProgram>,
    pub vertices: Option<GPUVertexBuffer>,

    pub view_buffer: wgpu::Buffer,
    pub view_bind_group_layout: wgpu::BindGroupLayout,
    pub view_bind_group: wgpu::BindGroup,

    pub released: bool,
}

impl WgpuBackend {
    /// Create a new backend state from a raw window handle.
    pub fn new(
        window: impl raw_window_handle::HasWindowHandle + raw_window_handle::HasDisplayHandle + Send + Sync + 'static,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Init(format!("Failed to create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Init("Failed to find suitable GPU adapter".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("rusty Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Init(format!("Failed to create device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::Init("Surface reports no texture formats".into()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Uniforms"),
            contents: bytemuck::bytes_of(&ViewUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let view_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("View Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("View Bind Group"),
            layout: &view_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        log::info!(
            "WebGPU backend initialized: {} ({})",
            adapter.get_info().name,
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            width: width.max(1),
            height: height.max(1),
            clear_color: wgpu::Color::BLACK,
            programs: HandleStore::new(),
            vertices: None,
            view_buffer,
            view_bind_group_layout,
            view_bind_group,
            released: false,
        })
    }

    pub fn with_clear_color(mut self, rgb: [f64; 3]) -> Self {
        self.clear_color = wgpu::Color {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        };
        self
    }

    /// Resize the surface. Zero-sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    /// Build the render pipeline for a linked program inside a validation
    /// error scope, so anything wgpu rejects comes back as a diagnostic.
    fn create_pipeline(&self, program: LinkedProgram) -> Result<wgpu::RenderPipeline, ShaderCompileError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vs_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(program.vertex)),
        });
        let fs_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(program.fragment)),
        });

        let attributes = vertex_attributes();
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Triangle Pipeline Layout"),
            bind_group_layouts: &[&self.view_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Triangle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(&program.vertex_entry),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: VERTEX_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(&program.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(ShaderCompileError::new(format!("Program link failed:\n{err}"))),
            None => Ok(pipeline),
        }
    }

    fn ensure_vertex_capacity(&mut self, size: u64) {
        if self.vertices.as_ref().is_some_and(|v| v.capacity >= size) {
            return;
        }
        let capacity = size.next_power_of_two().max(VERTEX_STRIDE * 64);
        log::debug!("Allocating vertex buffer of {capacity} bytes");
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.vertices = Some(GPUVertexBuffer {
            buffer,
            capacity,
            len: 0,
        });
    }
}

impl GraphicsBackend for WgpuBackend {
    fn make_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ProgramId, ShaderCompileError> {
        let program = shader::make_shader(vertex_src, fragment_src)?;
        let pipeline = self.create_pipeline(program)?;
        Ok(self.programs.insert(GPUProgram { pipeline }))
    }

    fn upload_vertices(&mut self, bytes: &[u8]) -> Result<(), RenderError> {
        if self.released {
            return Err(RenderError::Released);
        }
        // Queue copies must be a multiple of COPY_BUFFER_ALIGNMENT
        let padded;
        let data = if bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            bytes
        } else {
            let mut v = bytes.to_vec();
            v.resize(bytes.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
            padded = v;
            &padded
        };

        self.ensure_vertex_capacity(data.len() as u64);
        if let Some(vertices) = self.vertices.as_mut() {
            if !data.is_empty() {
                self.queue.write_buffer(&vertices.buffer, 0, data);
            }
            vertices.len = bytes.len() as u64;
        }
        Ok(())
    }

    fn upload_view(&mut self, uniforms: &ViewUniforms) {
        if !self.released {
            self.queue.write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(uniforms));
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.resize(width, height);
    }

    fn draw(&mut self, program: ProgramId, vertex_count: u32) -> Result<u32, RenderError> {
        if self.released {
            return Err(RenderError::Released);
        }
        let pipeline = &self
            .programs
            .get(program)
            .ok_or(RenderError::UnknownProgram(program))?
            .pipeline;
        let vertices = self.vertices.as_ref().ok_or(RenderError::NoVertexBuffer)?;

        let count = drawable_vertices(vertex_count, vertices.len);
        if count < vertex_count {
            log::warn!("Draw of {vertex_count} vertices clamped to the {count} uploaded");
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(0);
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(0),
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Triangle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.view_bind_group, &[]);
            pass.set_vertex_buffer(0, vertices.buffer.slice(..));
            pass.draw(0..count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(count)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.programs.clear();
        if let Some(vertices) = self.vertices.take() {
            vertices.buffer.destroy();
        }
        self.view_buffer.destroy();
        self.released = true;
        log::info!("WebGPU backend released");
    }
}

/// Vertices a draw may touch given the bytes of the last upload.
pub fn drawable_vertices(requested: u32, uploaded_bytes: u64) -> u32 {
    let available = u32::try_from(uploaded_bytes / VERTEX_STRIDE).unwrap_or(u32::MAX);
    requested.min(available)
}

/// The shared attribute table in wgpu terms.
pub fn vertex_attributes() -> [wgpu::VertexAttribute; VERTEX_ATTRIBUTES.len()] {
    VERTEX_ATTRIBUTES.map(|a| wgpu::VertexAttribute {
        format: match a.format {
            AttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            AttributeFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
        },
        offset: a.offset,
        shader_location: a.location,
    })
}
