use bytemuck::Pod;
use rusty_gpu_shared::Vertex;
use wasmtime::{Engine, Instance, Memory, Module, Store, WasmParams, WasmResults};

use crate::asset::load_binary;
use crate::error::{GuestError, LoadError, ViewError};
use crate::exports::{self, Export, ExportNames, GuestExports};
use crate::view::{self, FrameState, ViewDescriptor};

/// Asynchronously fetch and instantiate a guest module.
///
/// Only instantiates: the caller must invoke [`ModuleHandle::init`] before
/// reading any state.
pub async fn load_module(src: &str, names: &ExportNames) -> Result<ModuleHandle, LoadError> {
    let bytes = load_binary(src).await?;
    let handle = ModuleHandle::from_bytes(&bytes, names)?;
    log::info!(
        "Loaded module {src}: {} bytes, {} pages of linear memory",
        bytes.len(),
        handle.memory_pages()
    );
    Ok(handle)
}

/// An `(offset export, count export)` pair locating one buffer in guest memory.
#[derive(Clone)]
pub struct Region {
    offset: Export<(), i32>,
    count: Export<(), i32>,
}

impl Region {
    /// Bind a region by export names. Missing or mistyped exports fail here.
    pub fn resolve(
        handle: &mut ModuleHandle,
        offset_export: &str,
        count_export: &str,
    ) -> Result<Self, LoadError> {
        Ok(Self {
            offset: exports::required(&mut handle.store, &handle.instance, offset_export, "() -> i32")?,
            count: exports::required(&mut handle.store, &handle.instance, count_export, "() -> i32")?,
        })
    }
}

/// Owns the instantiated guest: its store, its linear memory, and the typed
/// export table.
pub struct ModuleHandle {
    store: Store<()>,
    instance: Instance,
    memory: Memory,
    exports: GuestExports,
}

impl ModuleHandle {
    /// Compile and instantiate `bytes` (binary or text format) with no imports.
    pub fn from_bytes(bytes: &[u8], names: &ExportNames) -> Result<Self, LoadError> {
        let engine = Engine::default();
        let module = Module::new(&engine, bytes).map_err(LoadError::Compile)?;
        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[]).map_err(LoadError::Instantiate)?;
        let memory = instance
            .get_memory(&mut store, &names.memory)
            .ok_or_else(|| LoadError::MissingMemory(names.memory.clone()))?;
        let exports = GuestExports::resolve(&mut store, &instance, names)?;

        Ok(Self {
            store,
            instance,
            memory,
            exports,
        })
    }

    pub fn exports(&self) -> &GuestExports {
        &self.exports
    }

    /// Current size of linear memory in 64 KiB pages.
    pub fn memory_pages(&self) -> u64 {
        self.memory.size(&self.store)
    }

    /// Current size of linear memory in bytes.
    pub fn memory_len(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    // ── Guest calls ──

    /// One-time guest state initialization.
    pub fn init(&mut self) -> Result<(), GuestError> {
        let export = self.exports.init.clone();
        self.call(&export, ())
    }

    /// Step the guest simulation by one frame.
    pub fn advance(&mut self) -> Result<(), GuestError> {
        let export = self.exports.advance.clone();
        self.call(&export, ())
    }

    pub fn set_screen(&mut self, width: u32, height: u32) -> Result<(), GuestError> {
        let w = self.exports.set_screen_width.clone();
        let h = self.exports.set_screen_height.clone();
        self.call(&w, clamp_i32(width))?;
        self.call(&h, clamp_i32(height))
    }

    /// Forward a horizontal drag in pixels; returns whatever the guest reports.
    pub fn rotate_camera(&mut self, pixels: f32) -> Result<f32, GuestError> {
        let export = self.exports.rotate_camera.clone();
        self.call(&export, pixels)
    }

    /// Number of vertices the guest currently declares.
    pub fn vertex_count(&mut self) -> Result<u32, GuestError> {
        let export = self.exports.data_length.clone();
        let count = self.call(&export, ())?;
        u32::try_from(count).map_err(|_| {
            GuestError::View(ViewError::Negative {
                what: "count",
                value: count,
            })
        })
    }

    fn call<P, R>(&mut self, export: &Export<P, R>, params: P) -> Result<R, GuestError>
    where
        P: WasmParams,
        R: WasmResults,
    {
        export
            .func
            .call(&mut self.store, params)
            .map_err(|error| GuestError::Trap {
                export: export.name.clone(),
                error,
            })
    }

    // ── Memory views ──

    /// Linear memory as it is right now. Never cache the result: any guest
    /// call may grow the memory and move it.
    pub fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    /// Typed view at a fixed location, read from the current memory.
    pub fn view_at<T: Pod>(&self, byte_offset: u32, count: u32) -> Result<&[T], ViewError> {
        view::view_of(self.memory(), byte_offset, count)
    }

    /// Ask the guest where `region` lives right now.
    pub fn describe<T: Pod>(&mut self, region: &Region) -> Result<ViewDescriptor, GuestError> {
        let offset = self.call(&region.offset, ())?;
        let count = self.call(&region.count, ())?;
        Ok(ViewDescriptor::from_guest::<T>(offset, count)?)
    }

    /// Call the region's accessor exports, then view the memory they point at.
    pub fn view_of<T: Pod>(&mut self, region: &Region) -> Result<&[T], GuestError> {
        let d = self.describe::<T>(region)?;
        Ok(self.view_at(d.byte_offset, d.count)?)
    }

    /// Re-derive vertex data and the view matrix for this frame.
    pub fn frame_state(&mut self) -> Result<FrameState<'_>, GuestError> {
        let offset = self.exports.data_offset.clone();
        let length = self.exports.data_length.clone();
        let matrix = self.exports.view_matrix_offset.clone();

        let data = self.call(&offset, ())?;
        let len = self.call(&length, ())?;
        let matrix_at = self.call(&matrix, ())?;

        let vertices = ViewDescriptor::from_guest::<Vertex>(data, len)?;
        let matrix = ViewDescriptor::from_guest::<f32>(matrix_at, 16)?;
        log::trace!(
            "frame state: vertices {:?}, view matrix at {}",
            vertices.byte_range(),
            matrix.byte_offset
        );

        let memory = self.memory.data(&self.store);
        Ok(FrameState {
            view_matrix: view::array_at(memory, matrix.byte_offset)?,
            vertices: view::view_of(memory, vertices.byte_offset, vertices.count)?,
        })
    }

    // ── Boxed guest vectors ──

    /// View the bytes of a guest-owned vector through `vec_data`/`vec_len`.
    pub fn vec_bytes(&mut self, ptr: i32) -> Result<&[u8], GuestError> {
        let data = self.exports.vec_data.clone().ok_or(GuestError::Unsupported("vec_data"))?;
        let len = self.exports.vec_len.clone().ok_or(GuestError::Unsupported("vec_len"))?;
        let offset = self.call(&data, ptr)?;
        let count = self.call(&len, ptr)?;
        let d = ViewDescriptor::from_guest::<u8>(offset, count)?;
        Ok(self.view_at(d.byte_offset, d.count)?)
    }

    /// Release a guest-owned vector. A module without `destroy` leaks it.
    pub fn destroy(&mut self, ptr: i32) -> Result<(), GuestError> {
        match self.exports.destroy.clone() {
            Some(export) => self.call(&export, ptr),
            None => Ok(()),
        }
    }

    pub fn greet(&mut self) -> Result<String, GuestError> {
        let export = self.exports.greet.clone().ok_or(GuestError::Unsupported("greet"))?;
        self.take_string(&export)
    }

    pub fn motd(&mut self) -> Result<String, GuestError> {
        let export = self.exports.motd.clone().ok_or(GuestError::Unsupported("motd"))?;
        self.take_string(&export)
    }

    fn take_string(&mut self, export: &Export<(), i32>) -> Result<String, GuestError> {
        let ptr = self.call(export, ())?;
        let text = std::str::from_utf8(self.vec_bytes(ptr)?)
            .map(str::to_owned)
            .map_err(|_| GuestError::InvalidUtf8 { ptr });
        self.destroy(ptr)?;
        text
    }
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}
