use std::process::ExitCode;
use std::sync::Arc;

use rusty_gpu_shared::{GraphicsBackend, ShaderSources};
use rusty_host::{load_module, load_text, Harness, HarnessError, InputState, ModuleHandle};
use rusty_wgpu::WgpuBackend;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::config::ConfigContext;

pub struct RunOptions {
    pub module: String,
    pub width: u32,
    pub height: u32,
}

pub async fn run(opts: RunOptions, ctx: ConfigContext) -> anyhow::Result<ExitCode> {
    let module = load_module(&opts.module, &ctx.config.exports).await?;
    let shaders = load_shaders(&ctx).await?;

    let mut app = App {
        title: ctx.config.window.title.clone(),
        size: PhysicalSize::new(opts.width.max(1), opts.height.max(1)),
        clear_color: ctx.config.render.clear_color,
        shaders,
        module: Some(module),
        window: None,
        session: Session::new(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    // Failures inside the loop were already logged
    Ok(if app.session.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Builtin WGSL unless the config names replacement files.
async fn load_shaders(ctx: &ConfigContext) -> anyhow::Result<ShaderSources> {
    let mut shaders = ShaderSources::default();
    if let Some(path) = &ctx.config.render.vertex_shader {
        shaders.vertex = load_text(&ctx.resolve(path)).await?;
    }
    if let Some(path) = &ctx.config.render.fragment_shader {
        shaders.fragment = load_text(&ctx.resolve(path)).await?;
    }
    Ok(shaders)
}

/// The harness and pointer state behind one window, apart from winit.
struct Session<B: GraphicsBackend> {
    /// `None` before the window exists and after close or failure.
    harness: Option<Harness<B>>,
    input: InputState,
    failed: bool,
}

impl<B: GraphicsBackend> Session<B> {
    fn new() -> Self {
        Self {
            harness: None,
            input: InputState::new(),
            failed: false,
        }
    }

    fn begin(&mut self, harness: Harness<B>, shaders: &ShaderSources, size: PhysicalSize<u32>) -> Result<(), HarnessError> {
        // Stored before init so a failure below still reaches shutdown
        let harness = self.harness.insert(harness);
        harness.init()?;
        harness.start(shaders)?;
        harness.resize(size.width.max(1), size.height.max(1))
    }

    /// Shut down and drop the harness. Events still queued behind the
    /// close find no harness and are ignored.
    fn close(&mut self) {
        if let Some(mut harness) = self.harness.take() {
            harness.shutdown();
        }
    }

    fn fail(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.close();
        self.failed = true;
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<(), HarnessError> {
        match self.harness.as_mut() {
            // Minimized windows report 0x0; keep the last real size
            Some(harness) if size.width > 0 && size.height > 0 => harness.resize(size.width, size.height),
            _ => Ok(()),
        }
    }

    fn pointer_moved(&mut self, x: f64) -> Result<(), HarnessError> {
        match (self.input.moved(x), self.harness.as_mut()) {
            (Some(dx), Some(harness)) => harness.drag(dx).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Render one frame. Returns whether another should be requested.
    fn redraw(&mut self) -> Result<bool, HarnessError> {
        match self.harness.as_mut() {
            Some(harness) => harness.frame().map(|_| true),
            None => Ok(false),
        }
    }
}

struct App {
    title: String,
    size: PhysicalSize<u32>,
    clear_color: [f64; 3],
    shaders: ShaderSources,
    /// Moved into the harness once the window exists.
    module: Option<ModuleHandle>,
    window: Option<Arc<Window>>,
    session: Session<WgpuBackend>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(self.size);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let module = self
            .module
            .take()
            .ok_or_else(|| anyhow::anyhow!("module was already handed to a harness"))?;
        let size = window.inner_size();
        let backend = WgpuBackend::new(window.clone(), size.width, size.height)?
            .with_clear_color(self.clear_color);

        self.session.begin(Harness::new(module, backend), &self.shaders, size)?;
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.session.fail(err);
        event_loop.exit();
    }

    fn handle(&mut self, event_loop: &ActiveEventLoop, event: WindowEvent) -> Result<(), HarnessError> {
        match event {
            WindowEvent::CloseRequested => {
                self.session.close();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.session.resize(size)?,
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.session.input.press(),
                ElementState::Released => self.session.input.release(),
            },
            WindowEvent::CursorLeft { .. } => self.session.input.leave(),
            WindowEvent::CursorMoved { position, .. } => self.session.pointer_moved(position.x)?,
            WindowEvent::RedrawRequested => {
                if self.session.redraw()? {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.session.failed {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(err) = self.handle(event_loop, event) {
            self.fail(event_loop, err.into());
        }
    }
}
