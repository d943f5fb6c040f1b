use thiserror::Error;

use crate::uniforms::ViewUniforms;

/// Opaque handle to a linked shader program owned by a backend.
pub type ProgramId = u64;

/// A shader failed to compile or the two stages failed to link.
///
/// The message carries the concatenated compiler diagnostics verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ShaderCompileError {
    pub message: String,
}

impl ShaderCompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while presenting a frame or managing GPU resources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Adapter, device, or surface could not be created.
    #[error("backend initialization failed: {0}")]
    Init(String),

    /// The surface could not hand out a texture for this frame.
    #[error("surface texture error: {0}")]
    Surface(String),

    /// A program handle that the backend never issued, or already released.
    #[error("unknown shader program {0}")]
    UnknownProgram(ProgramId),

    /// Draw requested before any vertex data was uploaded.
    #[error("no vertex buffer has been uploaded")]
    NoVertexBuffer,

    /// The backend was released and can no longer render.
    #[error("backend has been released")]
    Released,
}

/// The graphics surface the driver renders through.
///
/// Every method is called from the single frame thread, strictly in the
/// order advance, upload, draw. Implementations own all GPU resources and
/// free them in `release`.
pub trait GraphicsBackend {
    /// Compile and link a vertex/fragment source pair into a program.
    fn make_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, ShaderCompileError>;

    /// Copy raw interleaved vertex bytes into the GPU vertex buffer,
    /// growing it if needed. Bytes are uploaded unmodified.
    fn upload_vertices(&mut self, bytes: &[u8]) -> Result<(), RenderError>;

    /// Replace the per-frame uniform block.
    fn upload_view(&mut self, uniforms: &ViewUniforms);

    /// Set the viewport and any resolution-dependent surface state.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Issue one draw of up to `vertex_count` vertices with `program`.
    ///
    /// Returns the number actually drawn: never more than the last upload
    /// holds, and zero when the frame was skipped.
    fn draw(&mut self, program: ProgramId, vertex_count: u32) -> Result<u32, RenderError>;

    /// Free every GPU resource. Subsequent draws fail with `Released`.
    fn release(&mut self);
}
