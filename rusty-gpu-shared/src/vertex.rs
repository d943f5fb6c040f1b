use bytemuck::{Pod, Zeroable};

/// One interleaved vertex exactly as the guest lays it out in linear memory:
/// three `f32` position components followed by four packed RGBA bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

/// Byte distance between consecutive vertices.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

/// Component format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// Three 32-bit floats.
    Float32x3,
    /// Four unsigned bytes normalized to `[0, 1]` in the shader.
    Unorm8x4,
}

impl AttributeFormat {
    pub fn size(&self) -> u64 {
        match self {
            Self::Float32x3 => 12,
            Self::Unorm8x4 => 4,
        }
    }
}

/// A single attribute slot within the interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u64,
    pub format: AttributeFormat,
}

/// Fixed attribute layout bound once at pipeline setup.
pub const VERTEX_ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute {
        location: 0,
        offset: 0,
        format: AttributeFormat::Float32x3,
    },
    VertexAttribute {
        location: 1,
        offset: 12,
        format: AttributeFormat::Unorm8x4,
    },
];

impl Vertex {
    pub const fn new(position: [f32; 3], color: [u8; 4]) -> Self {
        Self { position, color }
    }
}
