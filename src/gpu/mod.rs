//! GPU resource management utilities.
//!
//! Provides wgpu device/surface initialization, growable buffers, render
//! textures, pipeline boilerplate, and shader composition.

/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// Shared wgpu boilerplate helpers for screen-space and scene pipelines.
pub mod pipeline_helpers;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render-target texture abstraction.
pub mod texture;
