use std::sync::atomic::{AtomicU32, Ordering};

use wgpu::util::DeviceExt;

use crate::geometry::{SphereGeometry, SphereVertex};
use crate::render::{DrawCmd, DrawList, RenderCtx, ShaderProgram};

static NEXT_MESH_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a `MeshBuffer` in recorded draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MeshId(u32);

/// Sphere mesh shared by every body in the scene.
///
/// The vertex/index data is fixed at construction. GPU buffers are created the
/// first time the mesh is prepared and are released when the mesh drops.
pub struct MeshBuffer {
    id: MeshId,
    vertices: Vec<SphereVertex>,
    indices: Vec<u32>,

    vbo: Option<wgpu::Buffer>,
    ibo: Option<wgpu::Buffer>,
}

impl MeshBuffer {
    pub fn new(geometry: &SphereGeometry) -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            vertices: geometry.vertices().to_vec(),
            indices: geometry.indices().to_vec(),
            vbo: None,
            ibo: None,
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn is_uploaded(&self) -> bool {
        self.vbo.is_some() && self.ibo.is_some()
    }

    /// Records an indexed draw of this mesh with `program`.
    ///
    /// The draw takes a snapshot of the program's uniform block and the
    /// texture bound to the program's sampler unit. Nothing is recorded when
    /// the program is unusable or is not the list's active program.
    pub fn draw(&self, program: &ShaderProgram, list: &mut DrawList) {
        if !program.is_usable() {
            return;
        }
        if list.active_program() != Some(program.id()) {
            log::warn!(
                "mesh draw skipped: program '{}' is not the active program",
                program.label()
            );
            return;
        }

        let texture = list.bound_texture(program.texture_unit());
        list.push(DrawCmd {
            program: program.id(),
            mesh: self.id,
            index_count: self.index_count(),
            texture,
            uniforms: program.uniform_bytes().into(),
        });
    }

    /// Uploads vertex and index data on first call.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>) {
        if self.is_uploaded() {
            return;
        }

        self.vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("orrery sphere vbo"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("orrery sphere ibo"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        }));

        log::debug!(
            "mesh {:?} uploaded: {} vertices, {} indices",
            self.id,
            self.vertices.len(),
            self.indices.len()
        );
    }

    /// Binds the buffers and issues the indexed draw inside `rpass`.
    pub fn draw_in(&self, rpass: &mut wgpu::RenderPass<'_>) {
        let Some(vbo) = self.vbo.as_ref() else { return };
        let Some(ibo) = self.ibo.as_ref() else { return };

        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count(), 0, 0..1);
    }
}
