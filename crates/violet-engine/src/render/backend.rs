use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::coords::{ColorRgba, Mat4};
use crate::gpu::GpuBackend;
use crate::graphics::{
    GpuImage, ShaderId, SpriteVertex, Texture, TextureFilter, TextureId, TextureWrap,
    PROJECTION_UNIFORM, TEXTURE_UNITS,
};

use super::texture::upload_rgba;
use super::{RenderCtx, RenderTarget};

const SPRITE_WGSL: &str = include_str!("sprite.wgsl");

const MAT4_SIZE: u64 = size_of::<[[f32; 4]; 4]>() as u64;

/// One recorded draw, replayed in `render`.
struct DrawOp {
    shader: ShaderId,
    texture: Option<(Texture, TextureFilter)>,
    uniform: usize,
    first_vertex: u32,
    vertex_count: u32,
}

/// wgpu implementation of `GpuBackend`.
///
/// Calls made during a frame are recorded (vertices into one staging buffer,
/// draws as ranges into it) and replayed by `render` in a single render pass.
/// Every program shares the `SpriteVertex` layout, a projection uniform in
/// group 0 and the unit-0 texture + sampler in group 1; other units are not
/// sampled.
pub struct WgpuBackend {
    programs: Vec<(ShaderId, String)>,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipelines: HashMap<ShaderId, wgpu::RenderPipeline>,
    uniform_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,
    samplers: HashMap<(TextureFilter, TextureWrap), wgpu::Sampler>,
    fallback: Option<GpuImage>,

    uniform_buf: Option<wgpu::Buffer>,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_capacity: usize,
    uniform_stride: u64,

    vertex_buf: Option<wgpu::Buffer>,
    vertex_capacity: u64,

    // ── recorded frame ──
    current_shader: ShaderId,
    units: [Option<(Texture, TextureFilter)>; TEXTURE_UNITS],
    uniforms: Vec<Mat4>,
    staging: Vec<u8>,
    upload_first: u32,
    ops: Vec<DrawOp>,

    warned_uniform: bool,
    warned_program: bool,
}

impl WgpuBackend {
    pub fn new() -> Self {
        Self {
            programs: vec![(ShaderId::SPRITE, SPRITE_WGSL.to_string())],
            pipeline_format: None,
            pipelines: HashMap::new(),
            uniform_bgl: None,
            texture_bgl: None,
            samplers: HashMap::new(),
            fallback: None,
            uniform_buf: None,
            uniform_bind_group: None,
            uniform_capacity: 0,
            uniform_stride: 256,
            vertex_buf: None,
            vertex_capacity: 0,
            current_shader: ShaderId::SPRITE,
            units: Default::default(),
            uniforms: Vec::new(),
            staging: Vec::new(),
            upload_first: 0,
            ops: Vec::new(),
            warned_uniform: false,
            warned_program: false,
        }
    }

    /// Registers the WGSL program used for `id`.
    ///
    /// The module must provide `vs_main`/`fs_main` and follow the sprite
    /// program's vertex layout and bind groups.
    pub fn register_program(&mut self, id: ShaderId, wgsl: impl Into<String>) {
        self.programs.retain(|(p, _)| *p != id);
        self.programs.push((id, wgsl.into()));
        self.pipelines.remove(&id);
    }

    /// Recorded draws not yet rendered.
    #[inline]
    pub fn pending_draws(&self) -> usize {
        self.ops.len()
    }

    /// Drops recorded draws when no surface texture could be acquired.
    pub fn discard_pending(&mut self) {
        self.ops.clear();
        self.staging.clear();
        self.uniforms.clear();
        self.upload_first = 0;
    }

    /// Clears `target` to `clear` and replays every draw recorded since the
    /// last call.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, clear: ColorRgba) {
        self.ensure_layouts(ctx);
        self.ensure_pipelines(ctx);
        self.ensure_fallback(ctx);
        self.ensure_uniform_capacity(ctx, self.uniforms.len().max(1));
        self.ensure_vertex_capacity(ctx, self.staging.len() as u64);
        self.write_frame_data(ctx);

        let (texture_groups, group_of_op) = self.build_texture_groups(ctx);

        {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("violet sprite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(clear.r),
                            g: f64::from(clear.g),
                            b: f64::from(clear.b),
                            a: f64::from(clear.a),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let (Some(vbo), Some(ubg)) = (self.vertex_buf.as_ref(), self.uniform_bind_group.as_ref()) {
                rpass.set_vertex_buffer(0, vbo.slice(..));

                for (op, &group) in self.ops.iter().zip(&group_of_op) {
                    let (Some(pipeline), Some(group)) =
                        (self.pipelines.get(&op.shader), texture_groups.get(group))
                    else {
                        continue;
                    };
                    let offset = (op.uniform as u64 * self.uniform_stride) as u32;

                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, ubg, &[offset]);
                    rpass.set_bind_group(1, group, &[]);
                    rpass.draw(op.first_vertex..op.first_vertex + op.vertex_count, 0..1);
                }
            }
        }

        self.ops.clear();
        self.staging.clear();
        self.uniforms.clear();
        self.upload_first = 0;
    }

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        if self.uniform_bgl.is_some() && self.texture_bgl.is_some() {
            return;
        }

        self.uniform_bgl = Some(ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("violet sprite uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(MAT4_SIZE),
                },
                count: None,
            }],
        }));

        self.texture_bgl = Some(ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("violet sprite texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        }));

        self.pipelines.clear();
        self.uniform_bind_group = None;
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format != Some(ctx.surface_format) {
            self.pipelines.clear();
            self.pipeline_format = Some(ctx.surface_format);
        }
        let (Some(ubgl), Some(tbgl)) = (self.uniform_bgl.as_ref(), self.texture_bgl.as_ref()) else {
            return;
        };

        for (id, source) in &self.programs {
            if self.pipelines.contains_key(id) {
                continue;
            }
            let pipeline = create_pipeline(ctx, *id, source, ubgl, tbgl);
            self.pipelines.insert(*id, pipeline);
        }
    }

    fn ensure_fallback(&mut self, ctx: &RenderCtx<'_>) {
        if self.fallback.is_some() {
            return;
        }
        self.fallback = Some(upload_rgba(
            ctx.device,
            ctx.queue,
            "violet fallback texture",
            1,
            1,
            &[255, 255, 255, 255],
        ));
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.uniform_capacity && self.uniform_buf.is_some() && self.uniform_bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.uniform_bgl.as_ref() else { return };

        let align = u64::from(ctx.device.limits().min_uniform_buffer_offset_alignment).max(MAT4_SIZE);
        self.uniform_stride = MAT4_SIZE.div_ceil(align) * align;

        let new_cap = required.next_power_of_two().max(16).max(self.uniform_capacity);
        let buf = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("violet sprite uniforms"),
            size: new_cap as u64 * self.uniform_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("violet sprite uniform bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buf,
                    offset: 0,
                    size: NonZeroU64::new(MAT4_SIZE),
                }),
            }],
        });

        self.uniform_buf = Some(buf);
        self.uniform_bind_group = Some(bind_group);
        self.uniform_capacity = new_cap;
    }

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, required_bytes: u64) {
        if required_bytes <= self.vertex_capacity && self.vertex_buf.is_some() {
            return;
        }
        let new_cap = required_bytes
            .max(size_of::<SpriteVertex>() as u64 * 6)
            .next_power_of_two();

        self.vertex_buf = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("violet sprite vbo"),
            size: new_cap,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }

    fn write_frame_data(&mut self, ctx: &RenderCtx<'_>) {
        if let Some(ubo) = self.uniform_buf.as_ref() {
            let stride = self.uniform_stride as usize;
            let mut bytes = vec![0u8; self.uniforms.len() * stride];
            for (i, m) in self.uniforms.iter().enumerate() {
                let dst = &mut bytes[i * stride..i * stride + MAT4_SIZE as usize];
                dst.copy_from_slice(bytemuck::bytes_of(&m.cols));
            }
            if !bytes.is_empty() {
                ctx.queue.write_buffer(ubo, 0, &bytes);
            }
        }

        if let Some(vbo) = self.vertex_buf.as_ref() {
            if !self.staging.is_empty() {
                ctx.queue.write_buffer(vbo, 0, &self.staging);
            }
        }
    }

    /// Texture bind groups for the recorded draws, plus the group index of
    /// each draw. Draws sampling the same texture with the same filter share
    /// a group.
    fn build_texture_groups(&mut self, ctx: &RenderCtx<'_>) -> (Vec<wgpu::BindGroup>, Vec<usize>) {
        // Samplers first; the groups below only borrow them.
        for op in &self.ops {
            let (filter, wrap) = match &op.texture {
                Some((t, f)) => (*f, t.wrap()),
                None => (TextureFilter::Nearest, TextureWrap::Clamp),
            };
            if !self.samplers.contains_key(&(filter, wrap)) {
                let sampler = create_sampler(ctx, filter, wrap);
                self.samplers.insert((filter, wrap), sampler);
            }
        }

        let mut groups = Vec::new();
        let mut indices = Vec::with_capacity(self.ops.len());
        let (Some(bgl), Some(fallback)) = (self.texture_bgl.as_ref(), self.fallback.as_ref()) else {
            return (groups, indices);
        };

        let mut cache: HashMap<(Option<TextureId>, TextureFilter), usize> = HashMap::new();
        for op in &self.ops {
            let (texture, filter) = match &op.texture {
                Some((t, f)) => (Some(t), *f),
                None => (None, TextureFilter::Nearest),
            };
            let key = (texture.map(Texture::id), filter);

            if let Some(&i) = cache.get(&key) {
                indices.push(i);
                continue;
            }

            let wrap = texture.map(Texture::wrap).unwrap_or_default();
            let Some(sampler) = self.samplers.get(&(filter, wrap)) else {
                indices.push(usize::MAX);
                continue;
            };
            let view = texture.and_then(Texture::gpu_view).unwrap_or(&fallback.view);

            groups.push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("violet sprite texture bind group"),
                layout: bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            }));
            cache.insert(key, groups.len() - 1);
            indices.push(groups.len() - 1);
        }

        (groups, indices)
    }
}

fn create_sampler(ctx: &RenderCtx<'_>, filter: TextureFilter, wrap: TextureWrap) -> wgpu::Sampler {
    let mode = match filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    let address = match wrap {
        TextureWrap::Clamp => wgpu::AddressMode::ClampToEdge,
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
    };
    ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("violet sprite sampler"),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: mode,
        min_filter: mode,
        ..Default::default()
    })
}

impl Default for WgpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for WgpuBackend {
    fn activate_shader(&mut self, shader: ShaderId) {
        if !self.programs.iter().any(|(p, _)| *p == shader) && !self.warned_program {
            log::debug!("no WGSL program registered for {shader:?}; its draws are skipped");
            self.warned_program = true;
        }
        self.current_shader = shader;
    }

    fn bind_texture(&mut self, unit: u8, texture: &Texture, filter: TextureFilter) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = Some((texture.clone(), filter));
        }
    }

    fn unbind_texture(&mut self, unit: u8) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = None;
        }
    }

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) {
        if name != PROJECTION_UNIFORM {
            if !self.warned_uniform {
                log::debug!("uniform {name:?} is not supported by the wgpu backend; ignored");
                self.warned_uniform = true;
            }
            return;
        }
        if self.uniforms.last() != Some(value) {
            self.uniforms.push(*value);
        }
    }

    fn upload_vertices(&mut self, bytes: &[u8]) {
        self.upload_first = (self.staging.len() / size_of::<SpriteVertex>()) as u32;
        self.staging.extend_from_slice(bytes);
    }

    fn draw(&mut self, vertex_count: u32) {
        if self.uniforms.is_empty() {
            self.uniforms.push(Mat4::IDENTITY);
        }
        self.ops.push(DrawOp {
            shader: self.current_shader,
            texture: self.units[0].clone(),
            uniform: self.uniforms.len() - 1,
            first_vertex: self.upload_first,
            vertex_count,
        });
    }
}

fn create_pipeline(
    ctx: &RenderCtx<'_>,
    id: ShaderId,
    source: &str,
    uniform_bgl: &wgpu::BindGroupLayout,
    texture_bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let label = format!("violet program {}", id.index());

    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&label),
        bind_group_layouts: &[uniform_bgl, texture_bgl],
        immediate_size: 0,
    });

    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x4, // color
        2 => Float32x2  // uv
    ];

    ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: size_of::<SpriteVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &ATTRS,
            }],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: ctx.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
