// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Instanced mesh renderer with rim highlighting and GPU hit testing,
//! built on wgpu.
//!
//! Every frame draws a caller-supplied list of mesh instances into two
//! multisampled targets at once: a shaded color image and a *passthrough*
//! image carrying per-instance bytes (a 16-bit logical id and a rim
//! intensity). The passthrough image drives an edge-detected rim overlay and
//! lets the caller ask which instance sits under the pointer without a CPU
//! ray cast.
//!
//! # Key entry points
//!
//! - [`renderer::SceneRenderer`] - owns meshes, render targets, and passes
//! - [`scene::MeshInstance`] - one placed, colored copy of a mesh
//! - [`renderer::FrameParams`] - per-frame camera, lighting, and flags
//! - [`options::RenderOptions`] - TOML-backed defaults for frame parameters
//!
//! # Frame pipeline
//!
//! Instances are sorted so each mesh becomes one instanced draw, then:
//! scene (color + passthrough, MSAA) → resolve → hit-test sample select and
//! transfer → present → rim overlay → diagnostic quads.
//!
//! ```no_run
//! # use rimrender::gpu::render_context::RenderContext;
//! # use rimrender::renderer::SceneRenderer;
//! # fn demo() -> Result<(), rimrender::error::RenderError> {
//! let context = pollster::block_on(RenderContext::headless())?;
//! let renderer = SceneRenderer::new(
//!     &context,
//!     wgpu::TextureFormat::Rgba8Unorm,
//!     (640, 480),
//!     4,
//! )?;
//! # let _ = renderer;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gpu;
pub mod mesh;
pub mod options;
pub mod renderer;
pub mod scene;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use error::RenderError;
pub use gpu::render_context::RenderContext;
pub use mesh::{MeshId, MeshVertex};
pub use options::RenderOptions;
pub use renderer::{FrameParams, FrameStats, HitTestResult, SceneRenderer};
pub use scene::MeshInstance;
#[cfg(feature = "viewer")]
pub use viewer::Viewer;
