//! Test guests and a recording backend shared by the unit tests.

use rusty_gpu_shared::{GraphicsBackend, ProgramId, RenderError, ShaderCompileError, ViewUniforms};

use crate::exports::ExportNames;
use crate::module::ModuleHandle;

pub const SCREEN_OFFSET: u32 = 256;
pub const MATRIX_OFFSET: u32 = 512;
pub const VERTEX_OFFSET: u32 = 1024;

/// One red/green/blue triangle and an identity view matrix. `gen` declares
/// the three vertices; before that `state_len` reports zero.
pub const TRIANGLE_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (global $len (mut i32) (i32.const 0))
  (global $angle (mut f32) (f32.const 0))
  (global $frames (mut i32) (i32.const 0))

  (data (i32.const 512)
    "\00\00\80\3f\00\00\00\00\00\00\00\00\00\00\00\00"
    "\00\00\00\00\00\00\80\3f\00\00\00\00\00\00\00\00"
    "\00\00\00\00\00\00\00\00\00\00\80\3f\00\00\00\00"
    "\00\00\00\00\00\00\00\00\00\00\00\00\00\00\80\3f")
  (data (i32.const 1024)
    "\00\00\00\bf\00\00\00\bf\00\00\00\00\ff\00\00\ff"
    "\00\00\00\3f\00\00\00\bf\00\00\00\00\00\ff\00\ff"
    "\00\00\00\00\00\00\00\3f\00\00\00\00\00\00\ff\ff")
  (data (i32.const 2048) "\08\08\00\00\0f\00\00\00" "Hello, World!!!")

  (func (export "gen") (global.set $len (i32.const 3)))
  (func (export "update")
    (global.set $frames (i32.add (global.get $frames) (i32.const 1))))
  (func (export "state_data") (result i32) (i32.const 1024))
  (func (export "state_len") (result i32) (global.get $len))
  (func (export "state_view_matrix") (result i32) (i32.const 512))
  (func (export "set_screen_width") (param i32)
    (i32.store (i32.const 256) (local.get 0)))
  (func (export "set_screen_height") (param i32)
    (i32.store (i32.const 260) (local.get 0)))
  (func (export "rotate_camera") (param $px f32) (result f32)
    (global.set $angle (f32.add (global.get $angle) (local.get $px)))
    (global.get $angle))
  (func (export "greet") (result i32) (i32.const 2048))
  (func (export "vec_data") (param i32) (result i32) (i32.load (local.get 0)))
  (func (export "vec_len") (param i32) (result i32) (i32.load offset=4 (local.get 0)))
)
"#;

/// Same triangle, but every `update` grows memory by a page, moves the
/// vertices into the new page, and zeroes the old copy.
pub const RELOCATING_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (global $data (mut i32) (i32.const 1024))
  (global $len (mut i32) (i32.const 0))

  (data (i32.const 512)
    "\00\00\80\3f\00\00\00\00\00\00\00\00\00\00\00\00"
    "\00\00\00\00\00\00\80\3f\00\00\00\00\00\00\00\00"
    "\00\00\00\00\00\00\00\00\00\00\80\3f\00\00\00\00"
    "\00\00\00\00\00\00\00\00\00\00\00\00\00\00\80\3f")
  (data (i32.const 1024)
    "\00\00\00\bf\00\00\00\bf\00\00\00\00\ff\00\00\ff"
    "\00\00\00\3f\00\00\00\bf\00\00\00\00\00\ff\00\ff"
    "\00\00\00\00\00\00\00\3f\00\00\00\00\00\00\ff\ff")

  (func (export "gen") (global.set $len (i32.const 3)))
  (func (export "update") (local $new i32)
    (local.set $new (i32.mul (memory.grow (i32.const 1)) (i32.const 65536)))
    (memory.copy
      (local.get $new)
      (global.get $data)
      (i32.mul (global.get $len) (i32.const 16)))
    (memory.fill
      (global.get $data)
      (i32.const 0)
      (i32.mul (global.get $len) (i32.const 16)))
    (global.set $data (local.get $new)))
  (func (export "state_data") (result i32) (global.get $data))
  (func (export "state_len") (result i32) (global.get $len))
  (func (export "state_view_matrix") (result i32) (i32.const 512))
  (func (export "set_screen_width") (param i32))
  (func (export "set_screen_height") (param i32))
  (func (export "rotate_camera") (param f32) (result f32) (local.get 0))
)
"#;

pub fn compile(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).expect("test guest must assemble")
}

pub fn load(wat: &str) -> ModuleHandle {
    ModuleHandle::from_bytes(&compile(wat), &ExportNames::default()).expect("test guest must load")
}

pub fn triangle() -> ModuleHandle {
    load(TRIANGLE_GUEST)
}

/// Every call a driver makes on the backend, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MakeShader,
    UploadVertices(Vec<u8>),
    UploadView(ViewUniforms),
    SetViewport(u32, u32),
    Draw { program: ProgramId, vertex_count: u32 },
    Release,
}

/// A `GraphicsBackend` that records calls instead of touching a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    /// When set, `make_shader` fails with this diagnostic.
    pub shader_error: Option<String>,
    next_program: ProgramId,
    uploaded_bytes: usize,
    released: bool,
}

impl RecordingBackend {
    pub fn failing_shader(diagnostic: &str) -> Self {
        Self {
            shader_error: Some(diagnostic.to_string()),
            ..Self::default()
        }
    }

    pub fn draws(&self) -> Vec<(ProgramId, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw {
                    program,
                    vertex_count,
                } => Some((*program, *vertex_count)),
                _ => None,
            })
            .collect()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn make_shader(&mut self, _vertex_src: &str, _fragment_src: &str) -> Result<ProgramId, ShaderCompileError> {
        self.calls.push(Call::MakeShader);
        if let Some(msg) = &self.shader_error {
            return Err(ShaderCompileError::new(msg.clone()));
        }
        self.next_program += 1;
        Ok(self.next_program)
    }

    fn upload_vertices(&mut self, bytes: &[u8]) -> Result<(), RenderError> {
        self.uploaded_bytes = bytes.len();
        self.calls.push(Call::UploadVertices(bytes.to_vec()));
        Ok(())
    }

    fn upload_view(&mut self, uniforms: &ViewUniforms) {
        self.calls.push(Call::UploadView(*uniforms));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::SetViewport(width, height));
    }

    /// Clamps to the last upload the way a GPU backend must.
    fn draw(&mut self, program: ProgramId, vertex_count: u32) -> Result<u32, RenderError> {
        if self.released {
            return Err(RenderError::Released);
        }
        self.calls.push(Call::Draw {
            program,
            vertex_count,
        });
        let uploaded = u32::try_from(self.uploaded_bytes / 16).unwrap_or(u32::MAX);
        Ok(vertex_count.min(uploaded))
    }

    fn release(&mut self) {
        self.released = true;
        self.calls.push(Call::Release);
    }
}
