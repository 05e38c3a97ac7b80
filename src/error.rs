//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::mesh::MeshId;

/// Errors produced by the rimrender crate.
#[derive(Debug)]
pub enum RenderError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A WGSL shader failed to compose or validate.
    ShaderBuild {
        /// Shader file the failure originated from.
        shader: &'static str,
        /// Compiler diagnostic text.
        diagnostic: String,
    },
    /// The device ran out of memory while creating a resource.
    Allocation(String),
    /// An instance referenced a mesh id that was never allocated.
    UnknownMesh(MeshId),
    /// Render targets were requested with a zero dimension.
    InvalidTargetSize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The adapter cannot multisample the target formats at this count.
    UnsupportedSampleCount(u32),
    /// The destination texture does not match the allocated targets.
    DestinationMismatch {
        /// Size and format the renderer expects.
        expected: (u32, u32, wgpu::TextureFormat),
        /// Size and format of the texture that was supplied.
        found: (u32, u32, wgpu::TextureFormat),
    },
    /// More instances than 16-bit logical ids can label.
    TooManyInstances(usize),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::ShaderBuild { shader, diagnostic } => {
                write!(f, "failed to build shader '{shader}':\n{diagnostic}")
            }
            Self::Allocation(msg) => {
                write!(f, "GPU resource allocation failed: {msg}")
            }
            Self::UnknownMesh(id) => write!(f, "unknown mesh id {}", id.0),
            Self::InvalidTargetSize { width, height } => {
                write!(f, "invalid render target size {width}x{height}")
            }
            Self::UnsupportedSampleCount(count) => {
                write!(f, "sample count {count} is not supported")
            }
            Self::DestinationMismatch { expected, found } => write!(
                f,
                "destination is {}x{} {:?}, expected {}x{} {:?}",
                found.0, found.1, found.2, expected.0, expected.1, expected.2
            ),
            Self::TooManyInstances(count) => write!(
                f,
                "{count} instances exceed the addressable range"
            ),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for RenderError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_build_display_includes_diagnostic() {
        let err = RenderError::ShaderBuild {
            shader: "screen/rim.wgsl",
            diagnostic: "unknown identifier `foo`".to_owned(),
        };
        let text = err.to_string();
        assert!(text.contains("screen/rim.wgsl"));
        assert!(text.contains("unknown identifier"));
    }

    #[test]
    fn io_error_exposes_source() {
        let err: RenderError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(RenderError::UnknownMesh(MeshId(3)).to_string().contains('3'));
    }
}
