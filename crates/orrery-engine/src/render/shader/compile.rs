use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::ShaderError;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            Stage::Vertex => naga::ShaderStage::Vertex,
            Stage::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        }
    }
}

/// A single parsed and validated WGSL stage.
///
/// Holds the source (handed to wgpu at pipeline creation) and the naga IR
/// (used by `link` for interface checks and uniform reflection).
#[derive(Debug, Clone)]
pub struct CompiledStage {
    stage: Stage,
    source: String,
    module: naga::Module,
    entry_index: usize,
}

impl CompiledStage {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry().name
    }

    pub(crate) fn module(&self) -> &naga::Module {
        &self.module
    }

    pub(crate) fn entry(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry_index]
    }
}

/// Parses and validates one stage.
///
/// The source must contain exactly one entry point for `stage`; entry points
/// for other stages are ignored.
pub fn compile_stage(stage: Stage, source: &str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| ShaderError::compile(stage, e.emit_to_string(source)))?;

    // Only what every backend wgpu targets can run.
    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| ShaderError::compile(stage, e.emit_to_string(source)))?;

    let mut entries = module
        .entry_points
        .iter()
        .enumerate()
        .filter(|(_, ep)| ep.stage == stage.naga())
        .map(|(i, _)| i);

    let entry_index = match (entries.next(), entries.next()) {
        (Some(i), None) => i,
        (None, _) => {
            return Err(ShaderError::compile(
                stage,
                format!("no @{} entry point", stage.name()),
            ));
        }
        (Some(_), Some(_)) => {
            return Err(ShaderError::compile(
                stage,
                format!("more than one @{} entry point", stage.name()),
            ));
        }
    };

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        module,
        entry_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
        @vertex
        fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(pos, 1.0);
        }
    "#;

    const FS: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    #[test]
    fn compiles_vertex_stage() {
        let stage = compile_stage(Stage::Vertex, VS).unwrap();
        assert_eq!(stage.stage(), Stage::Vertex);
        assert_eq!(stage.entry_point(), "vs_main");
    }

    #[test]
    fn syntax_error_is_reported_for_the_stage() {
        let err = compile_stage(Stage::Fragment, "fn broken( {").unwrap_err();
        assert!(matches!(err, ShaderError::FragmentCompile(_)));
    }

    #[test]
    fn type_error_fails_validation() {
        let src = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return 1.0;
            }
        "#;
        assert!(matches!(
            compile_stage(Stage::Fragment, src),
            Err(ShaderError::FragmentCompile(_))
        ));
    }

    #[test]
    fn optional_capabilities_are_not_assumed() {
        let src = r#"
            var<private> wide: f64;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(f32(wide));
            }
        "#;
        assert!(matches!(
            compile_stage(Stage::Fragment, src),
            Err(ShaderError::FragmentCompile(_))
        ));
    }

    #[test]
    fn wrong_stage_entry_point_is_rejected() {
        let err = compile_stage(Stage::Vertex, FS).unwrap_err();
        match err {
            ShaderError::VertexCompile(msg) => assert!(msg.contains("@vertex")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
