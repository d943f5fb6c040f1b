//! Shared GPU types for the rusty host.
//!
//! Everything here is plain data or a trait: the vertex layout the guest
//! writes into linear memory, the uniform block uploaded every frame, the
//! WGSL sources, and the `GraphicsBackend` seam the driver renders through.
//! This crate never depends on `wgpu`.

pub mod backend;
pub mod shaders;
pub mod uniforms;
pub mod vertex;

pub use backend::{GraphicsBackend, ProgramId, RenderError, ShaderCompileError};
pub use shaders::ShaderSources;
pub use uniforms::ViewUniforms;
pub use vertex::{AttributeFormat, Vertex, VertexAttribute, VERTEX_ATTRIBUTES, VERTEX_STRIDE};
