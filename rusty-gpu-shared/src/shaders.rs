/// Embedded WGSL shader sources for the triangle pipeline.
/// The vertex and fragment stages live in separate sources and are linked
/// by the backend when the program is created.

pub const TRIANGLE_VERT: &str = include_str!("../shaders/triangle_vert.wgsl");
pub const TRIANGLE_FRAG: &str = include_str!("../shaders/triangle_frag.wgsl");

/// Entry point names the backend looks for in each stage.
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// A vertex/fragment source pair handed to `GraphicsBackend::make_shader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::new(TRIANGLE_VERT, TRIANGLE_FRAG)
    }
}
