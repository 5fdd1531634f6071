use std::path::PathBuf;

use thiserror::Error;

/// Why a shader program could not be built.
///
/// Compile errors carry the diagnostic already rendered against the stage's
/// source text, so they can be logged verbatim.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("vertex stage failed to compile:\n{0}")]
    VertexCompile(String),

    #[error("fragment stage failed to compile:\n{0}")]
    FragmentCompile(String),

    #[error("program failed to link: {0}")]
    Link(String),
}

impl ShaderError {
    pub(crate) fn compile(stage: super::Stage, message: String) -> Self {
        match stage {
            super::Stage::Vertex => ShaderError::VertexCompile(message),
            super::Stage::Fragment => ShaderError::FragmentCompile(message),
        }
    }
}
