use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-frame uniform block. Mirrors `ViewUniforms` in `triangle_vert.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    /// Column-major view/projection matrix as written by the guest.
    pub view: [[f32; 4]; 4],
    /// Screen width and height in pixels.
    pub screen: [f32; 2],
    pub _pad: [f32; 2],
}

impl ViewUniforms {
    /// Build the block from the 16 packed floats read out of guest memory.
    pub fn new(view: &[f32; 16], width: u32, height: u32) -> Self {
        Self {
            view: Mat4::from_cols_array(view).to_cols_array_2d(),
            screen: [width as f32, height as f32],
            _pad: [0.0; 2],
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }
}

impl Default for ViewUniforms {
    fn default() -> Self {
        Self::new(&Mat4::IDENTITY.to_cols_array(), 1, 1)
    }
}
