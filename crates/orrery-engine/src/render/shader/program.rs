use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Mat4, Vec3};

use crate::device::DepthBuffer;
use crate::geometry::SphereVertex;
use crate::render::{DrawList, RenderCtx, MAX_TEXTURE_UNITS};

use super::{compile_stage, link, LinkedProgram, ShaderError, Stage, UniformBlock};

static NEXT_PROGRAM_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a `ShaderProgram` in recorded draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(u32);

/// Vertex + fragment WGSL source text.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    /// Reads both stages from disk.
    pub fn read(vertex: impl AsRef<Path>, fragment: impl AsRef<Path>) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex: read_source(vertex.as_ref())?,
            fragment: read_source(fragment.as_ref())?,
        })
    }

    /// Compiles the vertex stage, then the fragment stage, then links.
    ///
    /// Stops at the first failure. Compiled stages are dropped on the way out.
    pub fn build(&self) -> Result<LinkedProgram, ShaderError> {
        let vertex = compile_stage(Stage::Vertex, &self.vertex)?;
        let fragment = compile_stage(Stage::Fragment, &self.fragment)?;
        link(vertex, fragment)
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// A linked vertex + fragment program with named uniforms.
///
/// Construction never fails: a program whose sources could not be read,
/// compiled or linked is logged and kept around in an unusable state, and
/// draws issued with it are dropped.
///
/// Uniform setters write into a CPU staging block; each mesh draw snapshots
/// that block. The wgpu pipeline is built lazily the first time the program is
/// prepared against a device.
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    linked: Option<LinkedProgram>,
    uniforms: Option<UniformBlock>,
    texture_unit: u32,

    // gpu
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    ubo_layout: Option<wgpu::BindGroupLayout>,
    ubo: Option<wgpu::Buffer>,
    ubo_bind_group: Option<wgpu::BindGroup>,
    ubo_stride: u64,
    ubo_capacity: usize,
}

impl ShaderProgram {
    /// Reads, compiles and links the two stages at the given paths.
    pub fn from_files(
        label: impl Into<String>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Self {
        let label = label.into();
        match ShaderSources::read(vertex_path, fragment_path) {
            Ok(sources) => Self::from_built(label, sources.build()),
            Err(e) => Self::from_built(label, Err(e)),
        }
    }

    /// Compiles and links the two stages from source text.
    pub fn from_sources(label: impl Into<String>, vertex: &str, fragment: &str) -> Self {
        let sources = ShaderSources {
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
        };
        Self::from_built(label.into(), sources.build())
    }

    fn from_built(label: String, built: Result<LinkedProgram, ShaderError>) -> Self {
        let linked = match built {
            Ok(linked) => {
                log::info!(
                    "shader program '{label}' linked ({} uniform bytes, texture: {})",
                    linked.uniforms().size(),
                    linked.texture().unwrap_or("none")
                );
                Some(linked)
            }
            Err(e) => {
                log::error!("shader program '{label}' unusable: {e}");
                None
            }
        };

        let uniforms = linked
            .as_ref()
            .map(|l| UniformBlock::new(l.uniforms().clone()));

        Self {
            id: ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed)),
            label,
            linked,
            uniforms,
            texture_unit: 0,
            pipeline_format: None,
            pipeline: None,
            ubo_layout: None,
            ubo: None,
            ubo_bind_group: None,
            ubo_stride: 0,
            ubo_capacity: 0,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_usable(&self) -> bool {
        self.linked.is_some()
    }

    pub fn linked(&self) -> Option<&LinkedProgram> {
        self.linked.as_ref()
    }

    /// Current contents of the staging uniform block (empty if unusable).
    pub fn uniform_bytes(&self) -> &[u8] {
        self.uniforms.as_ref().map(UniformBlock::bytes).unwrap_or_default()
    }

    pub fn uniforms(&self) -> Option<&UniformBlock> {
        self.uniforms.as_ref()
    }

    /// Texture unit the program's sampler reads from.
    pub fn texture_unit(&self) -> u32 {
        self.texture_unit
    }

    /// Makes this the program subsequent mesh draws in `list` use.
    pub fn use_program(&self, list: &mut DrawList) {
        list.set_active_program(self.id);
    }

    // ── uniform setters ────────────────────────────────────────────────────

    pub fn set_bool(&mut self, name: &str, value: bool) {
        let written = self.uniforms.as_mut().is_some_and(|u| u.set_bool(name, value));
        self.note_missing(name, written);
    }

    /// Sets an integer uniform. On the sampled texture's name this assigns
    /// the texture unit instead.
    pub fn set_int(&mut self, name: &str, value: i32) {
        let is_texture = self.linked.as_ref().and_then(|l| l.texture()) == Some(name);
        if is_texture {
            match u32::try_from(value) {
                Ok(unit) if unit < MAX_TEXTURE_UNITS => self.texture_unit = unit,
                _ => log::warn!("'{}': texture unit {value} out of range", self.label),
            }
            return;
        }

        let written = self.uniforms.as_mut().is_some_and(|u| u.set_int(name, value));
        self.note_missing(name, written);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        let written = self.uniforms.as_mut().is_some_and(|u| u.set_float(name, value));
        self.note_missing(name, written);
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        let written = self.uniforms.as_mut().is_some_and(|u| u.set_vec3(name, value));
        self.note_missing(name, written);
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        let written = self.uniforms.as_mut().is_some_and(|u| u.set_mat4(name, value));
        self.note_missing(name, written);
    }

    fn note_missing(&self, name: &str, written: bool) {
        if !written {
            log::trace!("'{}': no settable uniform named '{name}'", self.label);
        }
    }

    // ── gpu ────────────────────────────────────────────────────────────────

    /// Builds the pipeline and grows the uniform buffer to hold `draws`
    /// snapshots. No-op for an unusable program.
    pub(crate) fn prepare(
        &mut self,
        ctx: &RenderCtx<'_>,
        texture_layout: &wgpu::BindGroupLayout,
        draws: usize,
    ) {
        if !self.is_usable() {
            return;
        }
        self.ensure_pipeline(ctx, texture_layout);
        self.ensure_uniform_capacity(ctx, draws);
    }

    /// Writes one snapshot per draw at consecutive dynamic offsets.
    pub(crate) fn write_uniforms(&self, ctx: &RenderCtx<'_>, snapshots: &[&[u8]]) {
        let Some(ubo) = self.ubo.as_ref() else { return };
        if snapshots.is_empty() || snapshots.len() > self.ubo_capacity {
            return;
        }

        let stride = self.ubo_stride as usize;
        let mut staging = vec![0u8; stride * snapshots.len()];
        for (i, snap) in snapshots.iter().enumerate() {
            let len = snap.len().min(stride);
            staging[i * stride..i * stride + len].copy_from_slice(&snap[..len]);
        }
        ctx.queue.write_buffer(ubo, 0, &staging);
    }

    pub(crate) fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub(crate) fn uniform_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.ubo_bind_group.as_ref()
    }

    /// Dynamic offset of the `index`-th snapshot written this frame.
    pub(crate) fn uniform_offset(&self, index: usize) -> u32 {
        (index as u64 * self.ubo_stride) as u32
    }

    fn block_size(&self) -> u64 {
        self.linked
            .as_ref()
            .map_or(0, |l| u64::from(l.uniforms().size()))
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, texture_layout: &wgpu::BindGroupLayout) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }
        let Some(linked) = self.linked.as_ref() else { return };
        let Some(min_binding_size) = std::num::NonZeroU64::new(self.block_size()) else {
            return;
        };

        let vs = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orrery program vs"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex().source().into()),
        });
        let fs = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orrery program fs"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment().source().into()),
        });

        let ubo_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("orrery program uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(min_binding_size),
                },
                count: None,
            }],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("orrery program pipeline layout"),
            bind_group_layouts: &[&ubo_layout, texture_layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: Some(linked.vertex().entry_point()),
                compilation_options: Default::default(),
                buffers: &[SphereVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: Some(linked.fragment().entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
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
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: DepthBuffer::COMPARE_FUNCTION,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("'{}': pipeline built for {:?}", self.label, ctx.surface_format);

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.ubo_layout = Some(ubo_layout);
        self.ubo = None;
        self.ubo_bind_group = None;
        self.ubo_capacity = 0;
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.ubo_capacity && self.ubo.is_some() {
            return;
        }
        let Some(layout) = self.ubo_layout.as_ref() else { return };
        let block = self.block_size();
        let Some(min_binding_size) = std::num::NonZeroU64::new(block) else { return };

        let align = u64::from(ctx.device.limits().min_uniform_buffer_offset_alignment);
        let stride = block.div_ceil(align) * align;
        let new_cap = required.next_power_of_two().max(16);

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orrery program ubo"),
            size: stride * new_cap as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orrery program uniforms bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: Some(min_binding_size),
                }),
            }],
        });

        self.ubo = Some(ubo);
        self.ubo_bind_group = Some(bind_group);
        self.ubo_stride = stride;
        self.ubo_capacity = new_cap;
    }
}
