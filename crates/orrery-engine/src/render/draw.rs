//! Per-frame draw recording.
//!
//! Bodies do not talk to the GPU directly. They make a program active, bind a
//! texture to a unit and ask a mesh to draw; each draw captures a snapshot of
//! the active program's uniform block. `SceneRenderer` replays the list later
//! inside a single render pass.

use super::{MeshId, ProgramId, TextureId};

/// Number of texture units a draw list tracks.
pub const MAX_TEXTURE_UNITS: u32 = 16;

/// One recorded indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCmd {
    pub program: ProgramId,
    pub mesh: MeshId,
    pub index_count: u32,
    /// Texture sampled by the program, `None` for a blank body.
    pub texture: Option<TextureId>,
    /// Uniform block contents at the time of the draw.
    pub uniforms: Box<[u8]>,
}

#[derive(Debug, Default)]
pub struct DrawList {
    active_program: Option<ProgramId>,
    units: [Option<TextureId>; MAX_TEXTURE_UNITS as usize],
    cmds: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all recorded draws and bindings.
    pub fn clear(&mut self) {
        self.active_program = None;
        self.units = Default::default();
        self.cmds.clear();
    }

    pub fn set_active_program(&mut self, program: ProgramId) {
        self.active_program = Some(program);
    }

    pub fn active_program(&self) -> Option<ProgramId> {
        self.active_program
    }

    /// Binds (or unbinds, with `None`) a texture to `unit`.
    ///
    /// Units outside `0..MAX_TEXTURE_UNITS` are ignored.
    pub fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = texture,
            None => log::warn!("bind_texture: unit {unit} out of range (max {MAX_TEXTURE_UNITS})"),
        }
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.units.get(unit as usize).copied().flatten()
    }

    pub(crate) fn push(&mut self, cmd: DrawCmd) {
        self.cmds.push(cmd);
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCmd> {
        self.cmds.iter()
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SphereGeometry;
    use crate::render::{MeshBuffer, ShaderProgram};

    const VS: &str = r#"
        struct Uniforms { model: mat4x4<f32>, };
        @group(0) @binding(0) var<uniform> u: Uniforms;
        struct Out {
            @builtin(position) clip: vec4<f32>,
            @location(0) uv: vec2<f32>,
        };
        @vertex
        fn vs_main(@location(0) pos: vec3<f32>, @location(2) uv: vec2<f32>) -> Out {
            var o: Out;
            o.clip = u.model * vec4<f32>(pos, 1.0);
            o.uv = uv;
            return o;
        }
    "#;

    const FS: &str = r#"
        @group(1) @binding(0) var texture1: texture_2d<f32>;
        @group(1) @binding(1) var texture1_sampler: sampler;
        @fragment
        fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
            return textureSample(texture1, texture1_sampler, uv);
        }
    "#;

    fn texture(index: u32) -> TextureId {
        TextureId::new(index, 0)
    }

    #[test]
    fn draw_captures_program_mesh_texture_and_uniforms() {
        let mesh = MeshBuffer::new(&SphereGeometry::new(1.0, 8, 4, Default::default()));
        let mut program = ShaderProgram::from_sources("test", VS, FS);
        let mut list = DrawList::new();

        program.use_program(&mut list);
        program.set_mat4("model", glam::Mat4::from_scale(glam::Vec3::splat(3.0)));
        list.bind_texture(0, Some(texture(4)));
        program.set_int("texture1", 0);
        mesh.draw(&program, &mut list);

        assert_eq!(list.len(), 1);
        let cmd = list.iter().next().unwrap();
        assert_eq!(cmd.program, program.id());
        assert_eq!(cmd.mesh, mesh.id());
        assert_eq!(cmd.index_count, mesh.index_count());
        assert_eq!(cmd.texture, Some(texture(4)));
        assert_eq!(&*cmd.uniforms, program.uniform_bytes());
    }

    #[test]
    fn snapshots_are_independent() {
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let mut program = ShaderProgram::from_sources("test", VS, FS);
        let mut list = DrawList::new();
        program.use_program(&mut list);

        program.set_mat4("model", glam::Mat4::IDENTITY);
        mesh.draw(&program, &mut list);
        program.set_mat4("model", glam::Mat4::ZERO);
        mesh.draw(&program, &mut list);

        let cmds: Vec<_> = list.iter().collect();
        assert_ne!(cmds[0].uniforms, cmds[1].uniforms);
    }

    #[test]
    fn sampler_unit_selects_bound_texture() {
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let mut program = ShaderProgram::from_sources("test", VS, FS);
        let mut list = DrawList::new();
        program.use_program(&mut list);

        list.bind_texture(0, Some(texture(1)));
        list.bind_texture(3, Some(texture(2)));
        program.set_int("texture1", 3);
        mesh.draw(&program, &mut list);

        assert_eq!(list.iter().next().unwrap().texture, Some(texture(2)));
    }

    #[test]
    fn draw_without_active_program_is_skipped() {
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let program = ShaderProgram::from_sources("test", VS, FS);
        let mut list = DrawList::new();

        mesh.draw(&program, &mut list);
        assert!(list.is_empty());

        let other = ShaderProgram::from_sources("other", VS, FS);
        other.use_program(&mut list);
        mesh.draw(&program, &mut list);
        assert!(list.is_empty());
    }

    #[test]
    fn unusable_program_records_nothing() {
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let broken = ShaderProgram::from_sources("broken", VS, "not wgsl at all");
        let mut list = DrawList::new();

        broken.use_program(&mut list);
        mesh.draw(&broken, &mut list);
        assert!(list.is_empty());
    }

    #[test]
    fn out_of_range_unit_is_ignored() {
        let mut list = DrawList::new();
        list.bind_texture(MAX_TEXTURE_UNITS, Some(texture(9)));
        assert_eq!(list.bound_texture(MAX_TEXTURE_UNITS), None);
    }

    #[test]
    fn clear_resets_bindings() {
        let mut list = DrawList::new();
        list.bind_texture(0, Some(texture(1)));
        list.clear();
        assert_eq!(list.bound_texture(0), None);
        assert_eq!(list.active_program(), None);
    }
}
