use crate::render::shader::{TEXTURE_GROUP, UNIFORM_GROUP};
use crate::render::texture::GpuTexture;
use crate::render::{
    DrawList, MeshBuffer, ProgramId, RenderCtx, RenderTarget, ShaderProgram, TextureStore,
    TexturePixels,
};

/// Replays a recorded `DrawList` in one depth-tested render pass.
///
/// Owns the resources shared by every program: the texture bind group layout,
/// the sampler and a 1×1 black fallback bound for untextured draws.
#[derive(Default)]
pub struct SceneRenderer {
    texture_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
    fallback: Option<GpuTexture>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads whatever the draws need and encodes them into `target`.
    ///
    /// Draws referencing a program or mesh missing from the slices are
    /// skipped. Released textures are collected first, so a draw naming one
    /// falls back to the blank texture.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        list: &DrawList,
        programs: &mut [&mut ShaderProgram],
        meshes: &mut [&mut MeshBuffer],
        textures: &mut TextureStore,
    ) {
        self.ensure_shared(ctx);
        let (Some(layout), Some(sampler)) = (self.texture_layout.as_ref(), self.sampler.as_ref())
        else {
            return;
        };

        let released = textures.collect_released();
        if released > 0 {
            log::debug!("released {released} textures");
        }
        textures.prepare(ctx, layout, sampler);

        for mesh in meshes.iter_mut() {
            mesh.prepare(ctx);
        }

        let ids: Vec<ProgramId> = programs.iter().map(|p| p.id()).collect();
        let slots = assign_uniform_slots(list, &ids);

        for (i, program) in programs.iter_mut().enumerate() {
            let snapshots: Vec<&[u8]> = list
                .iter()
                .zip(&slots)
                .filter(|(_, slot)| matches!(slot, Some((p, _)) if *p == i))
                .map(|(cmd, _)| &*cmd.uniforms)
                .collect();
            if snapshots.is_empty() {
                continue;
            }
            program.prepare(ctx, layout, snapshots.len());
            program.write_uniforms(ctx, &snapshots);
        }

        let Some(fallback) = self.fallback.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("orrery scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let mut drawn = 0usize;
        for (cmd, slot) in list.iter().zip(&slots) {
            let Some((p, index)) = *slot else { continue };
            let program = &programs[p];
            let Some(mesh) = meshes.iter().find(|m| m.id() == cmd.mesh) else {
                continue;
            };
            let (Some(pipeline), Some(ubo)) = (program.pipeline(), program.uniform_bind_group())
            else {
                continue;
            };
            let texture = cmd
                .texture
                .and_then(|id| textures.bind_group(id))
                .unwrap_or(&fallback.bind_group);

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(UNIFORM_GROUP, ubo, &[program.uniform_offset(index)]);
            rpass.set_bind_group(TEXTURE_GROUP, texture, &[]);
            mesh.draw_in(&mut rpass);
            drawn += 1;
        }

        log::trace!("scene pass: {drawn}/{} draws", list.len());
    }

    fn ensure_shared(&mut self, ctx: &RenderCtx<'_>) {
        if self.texture_layout.is_none() {
            self.texture_layout = Some(ctx.device.create_bind_group_layout(
                &wgpu::BindGroupLayoutDescriptor {
                    label: Some("orrery texture bgl"),
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
                },
            ));
        }

        if self.sampler.is_none() {
            self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("orrery texture sampler"),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Linear,
                ..Default::default()
            }));
        }

        if self.fallback.is_none() {
            let (Some(layout), Some(sampler)) =
                (self.texture_layout.as_ref(), self.sampler.as_ref())
            else {
                return;
            };
            self.fallback = Some(TexturePixels::solid([0, 0, 0, 255]).upload(
                ctx,
                "orrery blank texture",
                layout,
                sampler,
            ));
        }
    }
}

/// Pairs each draw with `(program index, uniform slot)`.
///
/// Slots count up per program in draw order, so the `n`-th draw of a program
/// reads the `n`-th snapshot written into its uniform buffer. Draws whose
/// program is not in `programs` get `None`.
fn assign_uniform_slots(list: &DrawList, programs: &[ProgramId]) -> Vec<Option<(usize, usize)>> {
    let mut next = vec![0usize; programs.len()];
    list.iter()
        .map(|cmd| {
            let p = programs.iter().position(|id| *id == cmd.program)?;
            let slot = next[p];
            next[p] += 1;
            Some((p, slot))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SphereGeometry;

    const VS: &str = r#"
        struct Uniforms { model: mat4x4<f32>, };
        @group(0) @binding(0) var<uniform> u: Uniforms;
        @vertex
        fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
            return u.model * vec4<f32>(pos, 1.0);
        }
    "#;

    const FS: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0);
        }
    "#;

    #[test]
    fn slots_count_per_program_in_draw_order() {
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let a = ShaderProgram::from_sources("a", VS, FS);
        let b = ShaderProgram::from_sources("b", VS, FS);
        let mut list = DrawList::new();

        a.use_program(&mut list);
        mesh.draw(&a, &mut list);
        b.use_program(&mut list);
        mesh.draw(&b, &mut list);
        mesh.draw(&b, &mut list);
        a.use_program(&mut list);
        mesh.draw(&a, &mut list);

        let slots = assign_uniform_slots(&list, &[a.id(), b.id()]);
        assert_eq!(
            slots,
            vec![Some((0, 0)), Some((1, 0)), Some((1, 1)), Some((0, 1))]
        );
    }

    #[test]
    fn draws_of_unknown_programs_get_no_slot() {
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let a = ShaderProgram::from_sources("a", VS, FS);
        let mut list = DrawList::new();
        a.use_program(&mut list);
        mesh.draw(&a, &mut list);

        assert_eq!(assign_uniform_slots(&list, &[]), vec![None]);
    }
}
