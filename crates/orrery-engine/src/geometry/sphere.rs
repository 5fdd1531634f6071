use bytemuck::{Pod, Zeroable};

/// Interleaved sphere vertex (32 bytes).
///
///  offset  0  position  [f32; 3]   loc 0
///  offset 12  normal    [f32; 3]   loc 1
///  offset 24  uv        [f32; 2]   loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl SphereVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SphereVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Which model-space axis points through the sphere's poles.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum UpAxis {
    X,
    Y,
    #[default]
    Z,
}

impl UpAxis {
    /// Remaps a Z-up vector so the pole lies on this axis.
    ///
    /// The remap is a cyclic permutation, so it is a proper rotation and keeps
    /// triangle winding intact.
    #[inline]
    fn remap(self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        match self {
            UpAxis::Z => [x, y, z],
            UpAxis::Y => [y, z, x],
            UpAxis::X => [z, x, y],
        }
    }
}

/// CPU-side UV sphere: sector (longitude) and stack (latitude) subdivisions.
///
/// Stacks run from the north pole (`i = 0`) to the south pole (`i = stacks`).
/// Each ring repeats its first vertex at `j = sectors` so the texture seam gets
/// its own `u = 1.0` column.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereGeometry {
    radius: f32,
    sectors: u32,
    stacks: u32,
    up: UpAxis,
    vertices: Vec<SphereVertex>,
    indices: Vec<u32>,
}

impl SphereGeometry {
    pub const MIN_SECTORS: u32 = 3;
    pub const MIN_STACKS: u32 = 2;

    pub fn new(radius: f32, sectors: u32, stacks: u32, up: UpAxis) -> Self {
        let sectors = sectors.max(Self::MIN_SECTORS);
        let stacks = stacks.max(Self::MIN_STACKS);

        let vertices = build_vertices(radius, sectors, stacks, up);
        let indices = build_indices(sectors, stacks);

        log::debug!(
            "sphere geometry: r={radius} sectors={sectors} stacks={stacks} -> {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Self {
            radius,
            sectors,
            stacks,
            up,
            vertices,
            indices,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn sectors(&self) -> u32 {
        self.sectors
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    pub fn up_axis(&self) -> UpAxis {
        self.up
    }

    pub fn vertices(&self) -> &[SphereVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Default for SphereGeometry {
    /// Unit sphere with 36 sectors and 18 stacks, Z up.
    fn default() -> Self {
        Self::new(1.0, 36, 18, UpAxis::Z)
    }
}

fn build_vertices(radius: f32, sectors: u32, stacks: u32, up: UpAxis) -> Vec<SphereVertex> {
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    let inv_radius = if radius != 0.0 { 1.0 / radius } else { 0.0 };
    let sector_step = TAU / sectors as f32;
    let stack_step = PI / stacks as f32;

    let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);

    for i in 0..=stacks {
        // +pi/2 at the north pole down to -pi/2 at the south pole.
        let stack_angle = FRAC_PI_2 - i as f32 * stack_step;
        let xy = radius * stack_angle.cos();
        let z = radius * stack_angle.sin();

        for j in 0..=sectors {
            let sector_angle = j as f32 * sector_step;
            let x = xy * sector_angle.cos();
            let y = xy * sector_angle.sin();

            let position = [x, y, z];
            let normal = [x * inv_radius, y * inv_radius, z * inv_radius];

            vertices.push(SphereVertex {
                position: up.remap(position),
                normal: up.remap(normal),
                uv: [j as f32 / sectors as f32, i as f32 / stacks as f32],
            });
        }
    }

    vertices
}

fn build_indices(sectors: u32, stacks: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((sectors * (stacks - 1) * 6) as usize);

    for i in 0..stacks {
        let mut k1 = i * (sectors + 1);
        let mut k2 = k1 + sectors + 1;

        for _ in 0..sectors {
            // The pole rings collapse to a point: one triangle per quad there.
            if i != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if i != stacks - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
            k1 += 1;
            k2 += 1;
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn default_matches_unit_sphere_36_by_18() {
        let s = SphereGeometry::default();
        assert_eq!(s.sectors(), 36);
        assert_eq!(s.stacks(), 18);
        assert_eq!(s.up_axis(), UpAxis::Z);
        assert_eq!(s.vertices().len(), 37 * 19);
        assert_eq!(s.triangle_count(), 36 * 17 * 2);
    }

    #[test]
    fn vertices_lie_on_radius_with_unit_normals() {
        let s = SphereGeometry::new(2.5, 12, 6, UpAxis::Z);
        for v in s.vertices() {
            assert!((len(v.position) - 2.5).abs() < 1e-4);
            assert!((len(v.normal) - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn poles_follow_up_axis() {
        let z = SphereGeometry::new(1.0, 8, 4, UpAxis::Z);
        let north = z.vertices()[0].position;
        assert!((north[2] - 1.0).abs() < 1e-6);

        let y = SphereGeometry::new(1.0, 8, 4, UpAxis::Y);
        let north = y.vertices()[0].position;
        assert!((north[1] - 1.0).abs() < 1e-6);
        assert!(north[0].abs() < 1e-6 && north[2].abs() < 1e-6);

        let x = SphereGeometry::new(1.0, 8, 4, UpAxis::X);
        assert!((x.vertices()[0].position[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn indices_stay_in_range() {
        let s = SphereGeometry::new(1.0, 10, 5, UpAxis::Y);
        let n = s.vertices().len() as u32;
        assert!(s.indices().iter().all(|&i| i < n));
        assert_eq!(s.indices().len() % 3, 0);
    }

    #[test]
    fn uv_spans_unit_square() {
        let s = SphereGeometry::new(1.0, 4, 2, UpAxis::Z);
        let first = s.vertices().first().unwrap().uv;
        let last = s.vertices().last().unwrap().uv;
        assert_eq!(first, [0.0, 0.0]);
        assert_eq!(last, [1.0, 1.0]);
    }

    #[test]
    fn degenerate_subdivisions_are_clamped() {
        let s = SphereGeometry::new(1.0, 0, 0, UpAxis::Z);
        assert_eq!(s.sectors(), SphereGeometry::MIN_SECTORS);
        assert_eq!(s.stacks(), SphereGeometry::MIN_STACKS);
        assert_eq!(s.triangle_count(), 3 * 1 * 2);
    }

    #[test]
    fn vertex_stride_is_32_bytes() {
        assert_eq!(std::mem::size_of::<SphereVertex>(), 32);
    }
}
