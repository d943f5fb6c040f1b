//! wgpu rendering backend for the rusty host.
//!
//! Shaders are WGSL. They are compiled and linked with naga up front so a bad
//! program is reported as text before any pipeline exists.

mod backend;
mod handle;
mod shader;

pub use backend::{vertex_attributes, GPUProgram, GPUVertexBuffer, WgpuBackend};
pub use handle::HandleStore;
pub use shader::{compile, make_shader, LinkedProgram};
