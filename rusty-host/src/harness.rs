use rusty_gpu_shared::{GraphicsBackend, ProgramId, ShaderSources, ViewUniforms};

use crate::error::HarnessError;
use crate::module::ModuleHandle;

/// Lifecycle of the harness. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loaded,
    Initialized,
    Rendering,
    Stopped,
    Failed,
}

/// What one frame did, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub uploaded_bytes: usize,
    /// As reported by the backend, after clamping to the upload.
    pub drawn_vertices: u32,
}

/// Drives a guest module through a graphics backend.
pub struct Harness<B: GraphicsBackend> {
    module: Option<ModuleHandle>,
    backend: B,
    phase: Phase,
    program: Option<ProgramId>,
    vertex_count: u32,
    screen: (u32, u32),
    frames: u64,
}

impl<B: GraphicsBackend> Harness<B> {
    pub fn new(module: ModuleHandle, backend: B) -> Self {
        Self {
            module: Some(module),
            backend,
            phase: Phase::Loaded,
            program: None,
            vertex_count: 0,
            screen: (1, 1),
            frames: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn module_mut(&mut self) -> Option<&mut ModuleHandle> {
        self.module.as_mut()
    }

    /// Vertex count fixed when the guest was initialized.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn screen(&self) -> (u32, u32) {
        self.screen
    }

    /// Run the guest's one-time initialization and fix the vertex count.
    pub fn init(&mut self) -> Result<(), HarnessError> {
        self.expect("init", Phase::Loaded)?;
        let result = self.with_module(|m| {
            m.init()?;
            Ok(m.vertex_count()?)
        });
        self.vertex_count = self.guard(result)?;
        self.phase = Phase::Initialized;
        log::info!("Guest initialized with {} vertices", self.vertex_count);
        Ok(())
    }

    /// Compile the shader program and enter the render loop.
    pub fn start(&mut self, shaders: &ShaderSources) -> Result<(), HarnessError> {
        self.expect("start", Phase::Initialized)?;
        let result = self
            .backend
            .make_shader(&shaders.vertex, &shaders.fragment)
            .map_err(HarnessError::from);
        self.program = Some(self.guard(result)?);
        self.phase = Phase::Rendering;
        log::info!("Rendering started");
        Ok(())
    }

    /// Advance the guest, re-derive its memory views, upload, and draw.
    pub fn frame(&mut self) -> Result<FrameStats, HarnessError> {
        self.expect("render a frame", Phase::Rendering)?;
        let result = self.render_frame();
        let stats = self.guard(result)?;
        log::trace!(
            "frame {}: uploaded {} bytes, drew {} vertices",
            stats.frame,
            stats.uploaded_bytes,
            stats.drawn_vertices
        );
        Ok(stats)
    }

    fn render_frame(&mut self) -> Result<FrameStats, HarnessError> {
        let program = self.program.ok_or(HarnessError::InvalidPhase {
            action: "draw",
            expected: Phase::Rendering,
            actual: self.phase,
        })?;
        let (width, height) = self.screen;
        let vertex_count = self.vertex_count;
        let module = self.module.as_mut().ok_or(HarnessError::InvalidPhase {
            action: "render a frame",
            expected: Phase::Rendering,
            actual: Phase::Stopped,
        })?;
        let backend = &mut self.backend;

        module.advance()?;
        let uploaded_bytes = {
            // Views must not outlive this block: the next guest call may move memory
            let state = module.frame_state()?;
            let bytes = state.vertex_bytes();
            backend.upload_vertices(bytes)?;
            backend.upload_view(&ViewUniforms::new(state.view_matrix, width, height));
            bytes.len()
        };
        let drawn_vertices = backend.draw(program, vertex_count)?;

        self.frames += 1;
        Ok(FrameStats {
            frame: self.frames,
            uploaded_bytes,
            drawn_vertices,
        })
    }

    /// Propagate a new window size to the viewport and the guest.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), HarnessError> {
        self.expect_live("resize")?;
        self.backend.set_viewport(width, height);
        let result = self.with_module(|m| Ok(m.set_screen(width, height)?));
        self.guard(result)?;
        self.screen = (width, height);
        log::debug!("Resized to {width}x{height}");
        Ok(())
    }

    /// Forward a horizontal drag to the guest camera.
    pub fn drag(&mut self, dx: f32) -> Result<f32, HarnessError> {
        self.expect_live("drag")?;
        let result = self.with_module(|m| Ok(m.rotate_camera(dx)?));
        let angle = self.guard(result)?;
        log::debug!("Camera rotated by {dx}px, guest reports {angle}");
        Ok(angle)
    }

    /// Release GPU resources and drop the guest. Terminal.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.backend.release();
        self.module = None;
        self.program = None;
        self.phase = Phase::Stopped;
        log::info!("Harness stopped after {} frames", self.frames);
    }

    fn with_module<T>(
        &mut self,
        f: impl FnOnce(&mut ModuleHandle) -> Result<T, HarnessError>,
    ) -> Result<T, HarnessError> {
        match self.module.as_mut() {
            Some(m) => f(m),
            None => Err(HarnessError::InvalidPhase {
                action: "call the guest",
                expected: Phase::Loaded,
                actual: self.phase,
            }),
        }
    }

    /// Any failure aborts the whole flow.
    fn guard<T>(&mut self, result: Result<T, HarnessError>) -> Result<T, HarnessError> {
        if result.is_err() {
            self.phase = Phase::Failed;
        }
        result
    }

    fn expect(&self, action: &'static str, expected: Phase) -> Result<(), HarnessError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(HarnessError::InvalidPhase {
                action,
                expected,
                actual: self.phase,
            })
        }
    }

    fn expect_live(&self, action: &'static str) -> Result<(), HarnessError> {
        match self.phase {
            Phase::Loaded | Phase::Initialized | Phase::Rendering => Ok(()),
            actual => Err(HarnessError::InvalidPhase {
                action,
                expected: Phase::Rendering,
                actual,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Call, RecordingBackend};

    fn rendering() -> Harness<RecordingBackend> {
        let mut harness = Harness::new(testing::triangle(), RecordingBackend::default());
        harness.init().unwrap();
        harness.start(&ShaderSources::default()).unwrap();
        harness
    }

    #[test]
    fn test_phases_move_forward() {
        let mut harness = Harness::new(testing::triangle(), RecordingBackend::default());
        assert_eq!(harness.phase(), Phase::Loaded);
        harness.init().unwrap();
        assert_eq!(harness.phase(), Phase::Initialized);
        harness.start(&ShaderSources::default()).unwrap();
        assert_eq!(harness.phase(), Phase::Rendering);
        assert!(matches!(
            harness.init(),
            Err(HarnessError::InvalidPhase { actual: Phase::Rendering, .. })
        ));
    }

    #[test]
    fn test_frame_before_start_rejected() {
        let mut harness = Harness::new(testing::triangle(), RecordingBackend::default());
        assert!(matches!(
            harness.frame(),
            Err(HarnessError::InvalidPhase { expected: Phase::Rendering, actual: Phase::Loaded, .. })
        ));
        harness.init().unwrap();
        assert!(harness.frame().is_err());
        assert!(harness.backend().draws().is_empty());
    }

    #[test]
    fn test_triangle_uploads_and_draws_three_vertices() {
        let mut harness = rendering();
        assert_eq!(harness.vertex_count(), 3);

        let stats = harness.frame().unwrap();
        assert_eq!(stats.uploaded_bytes, 48);
        assert_eq!(stats.drawn_vertices, 3);

        let uploads: Vec<_> = harness
            .backend()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::UploadVertices(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].len(), 48);
        // Uploaded unmodified: first vertex x = -0.5, color red
        assert_eq!(&uploads[0][0..4], &(-0.5f32).to_le_bytes());
        assert_eq!(&uploads[0][12..16], &[255, 0, 0, 255]);

        assert_eq!(harness.backend().draws(), vec![(1, 3)]);
    }

    #[test]
    fn test_stats_report_vertices_actually_drawn() {
        // Declares three vertices at init, then only two from the first update
        let wat = testing::TRIANGLE_GUEST.replace(
            r#"(global.set $frames (i32.add (global.get $frames) (i32.const 1))))"#,
            r#"(global.set $frames (i32.add (global.get $frames) (i32.const 1)))
    (global.set $len (i32.const 2)))"#,
        );
        let mut harness = Harness::new(testing::load(&wat), RecordingBackend::default());
        harness.init().unwrap();
        harness.start(&ShaderSources::default()).unwrap();
        assert_eq!(harness.vertex_count(), 3);

        let stats = harness.frame().unwrap();
        assert_eq!(stats.uploaded_bytes, 32);
        assert_eq!(stats.drawn_vertices, 2);
        // The request still carries the count fixed at init
        assert_eq!(harness.backend().draws(), vec![(1, 3)]);
    }

    #[test]
    fn test_frame_order_is_upload_then_draw() {
        let mut harness = rendering();
        harness.frame().unwrap();
        harness.frame().unwrap();
        let kinds: Vec<&str> = harness
            .backend()
            .calls
            .iter()
            .map(|c| match c {
                Call::MakeShader => "shader",
                Call::UploadVertices(_) => "vertices",
                Call::UploadView(_) => "view",
                Call::SetViewport(..) => "viewport",
                Call::Draw { .. } => "draw",
                Call::Release => "release",
            })
            .collect();
        assert_eq!(
            kinds,
            ["shader", "vertices", "view", "draw", "vertices", "view", "draw"]
        );
    }

    #[test]
    fn test_resize_applies_before_next_draw() {
        let mut harness = rendering();
        harness.resize(800, 600).unwrap();
        harness.frame().unwrap();

        let calls = &harness.backend().calls;
        let viewport = calls.iter().position(|c| *c == Call::SetViewport(800, 600)).unwrap();
        let draw = calls.iter().position(|c| matches!(c, Call::Draw { .. })).unwrap();
        assert!(viewport < draw);

        let uniforms = calls
            .iter()
            .find_map(|c| match c {
                Call::UploadView(u) => Some(*u),
                _ => None,
            })
            .unwrap();
        assert_eq!(uniforms.screen, [800.0, 600.0]);
        assert_eq!(uniforms.view[0], [1.0, 0.0, 0.0, 0.0]);

        let module = harness.module_mut().unwrap();
        assert_eq!(
            module.view_at::<i32>(testing::SCREEN_OFFSET, 2).unwrap(),
            &[800, 600]
        );
    }

    #[test]
    fn test_drag_forwards_to_camera() {
        let mut harness = rendering();
        assert_eq!(harness.drag(4.0).unwrap(), 4.0);
        assert_eq!(harness.drag(-1.0).unwrap(), 3.0);
    }

    #[test]
    fn test_shader_failure_is_fatal() {
        let backend = RecordingBackend::failing_shader("error: expected ';'");
        let mut harness = Harness::new(testing::triangle(), backend);
        harness.init().unwrap();
        let err = harness.start(&ShaderSources::default()).unwrap_err();
        assert!(err.to_string().contains("expected ';'"));
        assert_eq!(harness.phase(), Phase::Failed);
        assert!(harness.frame().is_err());
        assert!(harness.resize(10, 10).is_err());
    }

    #[test]
    fn test_guest_trap_fails_harness() {
        let wat = testing::TRIANGLE_GUEST.replace(
            r#"(func (export "update")"#,
            r#"(func (export "update") unreachable"#,
        );
        let mut harness = Harness::new(testing::load(&wat), RecordingBackend::default());
        harness.init().unwrap();
        harness.start(&ShaderSources::default()).unwrap();
        assert!(matches!(harness.frame(), Err(HarnessError::Guest(_))));
        assert_eq!(harness.phase(), Phase::Failed);
        assert!(harness.backend().draws().is_empty());
    }

    #[test]
    fn test_relocating_guest_keeps_rendering() {
        let mut harness = Harness::new(testing::load(testing::RELOCATING_GUEST), RecordingBackend::default());
        harness.init().unwrap();
        harness.start(&ShaderSources::default()).unwrap();
        for _ in 0..3 {
            assert_eq!(harness.frame().unwrap().uploaded_bytes, 48);
        }
        let uploads: Vec<&Vec<u8>> = harness
            .backend()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::UploadVertices(bytes) => Some(bytes),
                _ => None,
            })
            .collect();
        assert!(uploads.windows(2).all(|w| w[0] == w[1]));
        assert!(uploads[0].iter().any(|&b| b != 0));
    }

    #[test]
    fn test_shutdown_releases_backend() {
        let mut harness = rendering();
        harness.frame().unwrap();
        harness.shutdown();
        assert_eq!(harness.phase(), Phase::Stopped);
        assert!(harness.module_mut().is_none());
        assert_eq!(harness.backend().calls.last(), Some(&Call::Release));
        assert!(harness.frame().is_err());
        // Idempotent
        harness.shutdown();
        assert_eq!(
            harness.backend().calls.iter().filter(|c| **c == Call::Release).count(),
            1
        );
    }
}
