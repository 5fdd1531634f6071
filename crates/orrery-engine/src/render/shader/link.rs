use std::collections::BTreeMap;

use naga::{AddressSpace, Binding, ImageClass, ImageDimension, Module, ScalarKind, TypeInner, VectorSize};

use crate::geometry::SphereVertex;

use super::{CompiledStage, ShaderError, Stage};

/// Bind group holding the per-draw uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding the texture + sampler pair.
pub const TEXTURE_GROUP: u32 = 1;

const TEXTURE_BINDING: u32 = 0;
const SAMPLER_BINDING: u32 = 1;

/// Host-side shape of a uniform block member.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    Float,
    Int,
    Uint,
    Vec3,
    Vec4,
    Mat4,
    /// Present in the block but not settable through the typed setters.
    Other,
}

impl UniformKind {
    fn classify(inner: &TypeInner) -> Self {
        match *inner {
            TypeInner::Scalar(s) if s.width == 4 => match s.kind {
                ScalarKind::Float => UniformKind::Float,
                ScalarKind::Sint => UniformKind::Int,
                ScalarKind::Uint => UniformKind::Uint,
                _ => UniformKind::Other,
            },
            TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
                match size {
                    VectorSize::Tri => UniformKind::Vec3,
                    VectorSize::Quad => UniformKind::Vec4,
                    VectorSize::Bi => UniformKind::Other,
                }
            }
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar.width == 4 => UniformKind::Mat4,
            _ => UniformKind::Other,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// Reflected layout of the `@group(0) @binding(0)` uniform block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UniformLayout {
    size: u32,
    members: Vec<UniformMember>,
}

impl UniformLayout {
    /// Block size in bytes, including trailing padding.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn members(&self) -> &[UniformMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A program whose two stages compiled and whose interfaces agree.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    uniforms: UniformLayout,
    texture: Option<String>,
}

impl LinkedProgram {
    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    pub fn uniforms(&self) -> &UniformLayout {
        &self.uniforms
    }

    /// Name of the sampled texture variable, if either stage declares one.
    pub fn texture(&self) -> Option<&str> {
        self.texture.as_deref()
    }
}

/// Links a compiled vertex and fragment stage.
///
/// Checks performed:
/// - every vertex input location is provided by [`SphereVertex`] with a matching width
/// - every fragment input location is written by the vertex stage
/// - the fragment stage writes `@location(0)`
/// - resources only use the fixed layout (uniform block at group 0 binding 0,
///   `texture_2d<f32>` at group 1 binding 0, filtering sampler at group 1 binding 1)
/// - a uniform block declared by both stages has the same layout in each
pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    if vertex.stage() != Stage::Vertex || fragment.stage() != Stage::Fragment {
        return Err(ShaderError::Link("stages passed in the wrong order".into()));
    }

    check_vertex_inputs(&vertex)?;

    let written = outputs(vertex.module(), vertex.entry());
    let read = inputs(fragment.module(), fragment.entry());
    for (location, width) in &read {
        match written.get(location) {
            None => {
                return Err(ShaderError::Link(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                )));
            }
            Some(w) if w != width => {
                return Err(ShaderError::Link(format!(
                    "@location({location}) has {w} components in the vertex stage but {width} in the fragment stage"
                )));
            }
            Some(_) => {}
        }
    }

    if !outputs(fragment.module(), fragment.entry()).contains_key(&0) {
        return Err(ShaderError::Link(
            "fragment stage does not write @location(0)".into(),
        ));
    }

    let vs_resources = reflect(&vertex)?;
    let fs_resources = reflect(&fragment)?;

    let uniforms = match (vs_resources.uniforms, fs_resources.uniforms) {
        (Some(a), Some(b)) if a != b => {
            return Err(ShaderError::Link(
                "uniform block layout differs between vertex and fragment stages".into(),
            ));
        }
        (Some(a), _) | (None, Some(a)) => a,
        (None, None) => {
            return Err(ShaderError::Link(format!(
                "no uniform block at @group({UNIFORM_GROUP}) @binding(0)"
            )));
        }
    };

    let texture = fs_resources.texture.or(vs_resources.texture);

    Ok(LinkedProgram {
        vertex,
        fragment,
        uniforms,
        texture,
    })
}

/// Location → component count, for the stage-interface check.
type Interface = BTreeMap<u32, u32>;

fn components(inner: &TypeInner) -> u32 {
    match *inner {
        TypeInner::Vector { size, .. } => size as u32,
        _ => 1,
    }
}

fn collect(module: &Module, ty: naga::Handle<naga::Type>, binding: Option<&Binding>, out: &mut Interface) {
    match (binding, &module.types[ty].inner) {
        (Some(Binding::Location { location, .. }), inner) => {
            out.insert(*location, components(inner));
        }
        (None, TypeInner::Struct { members, .. }) => {
            for m in members {
                collect(module, m.ty, m.binding.as_ref(), out);
            }
        }
        _ => {}
    }
}

fn inputs(module: &Module, ep: &naga::EntryPoint) -> Interface {
    let mut out = Interface::new();
    for arg in &ep.function.arguments {
        collect(module, arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn outputs(module: &Module, ep: &naga::EntryPoint) -> Interface {
    let mut out = Interface::new();
    if let Some(result) = &ep.function.result {
        collect(module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn check_vertex_inputs(vertex: &CompiledStage) -> Result<(), ShaderError> {
    for (location, width) in inputs(vertex.module(), vertex.entry()) {
        let provided = SphereVertex::ATTRS
            .iter()
            .find(|a| a.shader_location == location)
            .map(|a| (a.format.size() / 4) as u32);

        match provided {
            Some(w) if w == width => {}
            Some(w) => {
                return Err(ShaderError::Link(format!(
                    "vertex input @location({location}) expects {width} components, mesh provides {w}"
                )));
            }
            None => {
                return Err(ShaderError::Link(format!(
                    "vertex input @location({location}) is not provided by the mesh"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Default)]
struct Resources {
    uniforms: Option<UniformLayout>,
    texture: Option<String>,
}

/// The only texture shape the renderer's bind group layout accepts.
fn is_filterable_2d(dim: ImageDimension, arrayed: bool, class: ImageClass) -> bool {
    matches!(
        (dim, arrayed, class),
        (
            ImageDimension::D2,
            false,
            ImageClass::Sampled {
                kind: ScalarKind::Float,
                multi: false,
            },
        )
    )
}

fn reflect(stage: &CompiledStage) -> Result<Resources, ShaderError> {
    let module = stage.module();
    let mut res = Resources::default();

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        let name = var.name.clone().unwrap_or_default();
        let inner = &module.types[var.ty].inner;

        match (var.space, binding.group, binding.binding, inner) {
            (AddressSpace::Uniform, UNIFORM_GROUP, 0, TypeInner::Struct { members, span }) => {
                let members = members
                    .iter()
                    .map(|m| UniformMember {
                        name: m.name.clone().unwrap_or_default(),
                        offset: m.offset,
                        kind: UniformKind::classify(&module.types[m.ty].inner),
                    })
                    .collect();
                res.uniforms = Some(UniformLayout {
                    size: *span,
                    members,
                });
            }
            (AddressSpace::Handle, TEXTURE_GROUP, TEXTURE_BINDING, TypeInner::Image { dim, arrayed, class }) => {
                if !is_filterable_2d(*dim, *arrayed, *class) {
                    return Err(ShaderError::Link(format!(
                        "{} stage: `{name}` must be a texture_2d<f32>",
                        stage.stage().name()
                    )));
                }
                res.texture = Some(name);
            }
            (AddressSpace::Handle, TEXTURE_GROUP, SAMPLER_BINDING, TypeInner::Sampler { comparison: false }) => {}
            (_, group, index, _) => {
                return Err(ShaderError::Link(format!(
                    "{} stage: `{name}` at @group({group}) @binding({index}) is not part of the program layout",
                    stage.stage().name()
                )));
            }
        }
    }

    Ok(res)
}
