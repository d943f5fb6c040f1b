//! rusty host runtime
//!
//! Loads a compiled WebAssembly module, reads the simulation state it keeps
//! in linear memory through zero-copy typed views, and drives a
//! [`GraphicsBackend`](rusty_gpu_shared::GraphicsBackend) once per frame.
//! Resize and drag input are written back through the module's setter
//! exports.

mod asset;
mod error;
mod exports;
mod harness;
mod input;
mod module;
mod view;

#[cfg(test)]
mod testing;

pub use asset::{load_binary, load_text};
pub use error::{AssetFetchError, GuestError, HarnessError, LoadError, ViewError};
pub use exports::{Export, ExportNames, GuestExports};
pub use harness::{FrameStats, Harness, Phase};
pub use input::InputState;
pub use module::{load_module, ModuleHandle, Region};
pub use view::{array_at, view_of, FrameState, ViewDescriptor};
