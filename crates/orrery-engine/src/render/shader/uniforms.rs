use glam::{Mat4, Vec3};

use super::{UniformKind, UniformLayout};

/// CPU staging copy of a program's uniform block.
///
/// Setters address members by name and write straight into the block bytes
/// at the reflected offset. They return `false` when the name is unknown or
/// the member has a different kind; nothing is written in that case.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0u8; layout.size() as usize];
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes 0 or 1 into an `i32`/`u32` member.
    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.set_int(name, value as i32)
    }

    /// Writes an `i32` member, or a `u32` member when `value` is non-negative.
    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        match self.find(name) {
            Some((offset, UniformKind::Int)) => self.write(offset, bytemuck::bytes_of(&value)),
            Some((offset, UniformKind::Uint)) if value >= 0 => {
                self.write(offset, bytemuck::bytes_of(&(value as u32)))
            }
            _ => false,
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        match self.find(name) {
            Some((offset, UniformKind::Float)) => self.write(offset, bytemuck::bytes_of(&value)),
            _ => false,
        }
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) -> bool {
        match self.find(name) {
            Some((offset, UniformKind::Vec3)) => {
                self.write(offset, bytemuck::cast_slice(&value.to_array()))
            }
            _ => false,
        }
    }

    /// Column-major, matching WGSL `mat4x4<f32>`.
    pub fn set_mat4(&mut self, name: &str, value: Mat4) -> bool {
        match self.find(name) {
            Some((offset, UniformKind::Mat4)) => {
                self.write(offset, bytemuck::cast_slice(&value.to_cols_array()))
            }
            _ => false,
        }
    }

    /// Reads back a `mat4x4<f32>` member.
    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        let (offset, kind) = self.find(name)?;
        if kind != UniformKind::Mat4 {
            return None;
        }
        read_mat4(&self.bytes, offset)
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        let (offset, kind) = self.find(name)?;
        if kind != UniformKind::Vec3 {
            return None;
        }
        let raw = self.bytes.get(offset..offset + 12)?;
        let v: [f32; 3] = bytemuck::pod_read_unaligned(raw);
        Some(Vec3::from_array(v))
    }

    fn find(&self, name: &str) -> Option<(usize, UniformKind)> {
        self.layout
            .member(name)
            .map(|m| (m.offset as usize, m.kind))
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> bool {
        match self.bytes.get_mut(offset..offset + data.len()) {
            Some(dst) => {
                dst.copy_from_slice(data);
                true
            }
            None => false,
        }
    }
}

/// Decodes a column-major `mat4x4<f32>` at `offset` in a uniform snapshot.
pub fn read_mat4(bytes: &[u8], offset: usize) -> Option<Mat4> {
    let raw = bytes.get(offset..offset + 64)?;
    let cols: [f32; 16] = bytemuck::pod_read_unaligned(raw);
    Some(Mat4::from_cols_array(&cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::{compile_stage, link, Stage};

    fn block() -> UniformBlock {
        let vs = compile_stage(
            Stage::Vertex,
            r#"
                struct Uniforms {
                    model: mat4x4<f32>,
                    color: vec3<f32>,
                    gain: f32,
                    enabled: i32,
                    count: u32,
                };
                @group(0) @binding(0) var<uniform> u: Uniforms;
                @vertex
                fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
                    return u.model * vec4<f32>(pos * u.color * u.gain, 1.0);
                }
            "#,
        )
        .unwrap();
        let fs = compile_stage(
            Stage::Fragment,
            r#"
                @fragment
                fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
            "#,
        )
        .unwrap();
        UniformBlock::new(link(vs, fs).unwrap().uniforms().clone())
    }

    #[test]
    fn starts_zeroed_at_block_size() {
        let b = block();
        assert_eq!(b.bytes().len(), b.layout().size() as usize);
        assert!(b.bytes().iter().all(|&x| x == 0));
    }

    #[test]
    fn mat4_is_written_column_major() {
        let mut b = block();
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(b.set_mat4("model", m));
        assert_eq!(b.mat4("model"), Some(m));

        // translation lives in the fourth column: floats 12..15
        let cols: [f32; 16] = bytemuck::pod_read_unaligned(&b.bytes()[0..64]);
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn scalar_and_vector_setters() {
        let mut b = block();
        assert!(b.set_vec3("color", Vec3::new(0.5, 0.25, 1.0)));
        assert!(b.set_float("gain", 2.0));
        assert!(b.set_bool("enabled", true));
        assert!(b.set_int("count", 7));

        assert_eq!(b.vec3("color"), Some(Vec3::new(0.5, 0.25, 1.0)));

        let gain = b.layout().member("gain").unwrap().offset as usize;
        let v: f32 = bytemuck::pod_read_unaligned(&b.bytes()[gain..gain + 4]);
        assert_eq!(v, 2.0);

        let enabled = b.layout().member("enabled").unwrap().offset as usize;
        let v: i32 = bytemuck::pod_read_unaligned(&b.bytes()[enabled..enabled + 4]);
        assert_eq!(v, 1);
    }

    #[test]
    fn unknown_name_is_a_no_op() {
        let mut b = block();
        let before = b.bytes().to_vec();
        assert!(!b.set_float("does_not_exist", 1.0));
        assert!(!b.set_mat4("missing", Mat4::IDENTITY));
        assert_eq!(b.bytes(), &before[..]);
    }

    #[test]
    fn kind_mismatch_is_a_no_op() {
        let mut b = block();
        assert!(!b.set_float("model", 1.0));
        assert!(!b.set_vec3("gain", Vec3::ONE));
        assert!(!b.set_int("count", -1));
        assert!(b.bytes().iter().all(|&x| x == 0));
    }
}
