use thiserror::Error;

use rusty_gpu_shared::{RenderError, ShaderCompileError};

use crate::harness::Phase;

/// A binary asset (module or shader file) could not be fetched.
#[derive(Error, Debug)]
pub enum AssetFetchError {
    /// The read itself failed; `kind` plays the role of a status code.
    #[error("fetch failed {src}: {kind}")]
    Io {
        src: String,
        kind: std::io::ErrorKind,
        #[source]
        source: std::io::Error,
    },

    /// Only local paths and `file://` URLs can be fetched.
    #[error("fetch failed {0}: unsupported URL scheme")]
    UnsupportedScheme(String),
}

/// The guest module could not be turned into a `ModuleHandle`.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] AssetFetchError),

    /// The bytes are not a valid WebAssembly module.
    #[error("module compilation failed: {0:#}")]
    Compile(wasmtime::Error),

    /// Instantiation failed, including modules that require imports.
    #[error("module instantiation failed: {0:#}")]
    Instantiate(wasmtime::Error),

    #[error("module does not export a memory named `{0}`")]
    MissingMemory(String),

    #[error("module does not export required function `{name}`")]
    MissingExport { name: String },

    /// The export exists but its signature differs from the declared one.
    #[error("export `{name}` has the wrong signature, expected {expected}: {reason}")]
    ExportSignature {
        name: String,
        expected: &'static str,
        reason: String,
    },
}

/// A typed view could not be carved out of linear memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("view [{offset}, {offset}+{len}) exceeds linear memory of {memory_len} bytes")]
    OutOfBounds {
        offset: u64,
        len: u64,
        memory_len: usize,
    },

    #[error("view at byte {offset} is not aligned to {align} bytes")]
    Misaligned { offset: u64, align: usize },

    /// The guest handed back a negative offset or count.
    #[error("guest returned negative {what}: {value}")]
    Negative { what: &'static str, value: i32 },
}

/// A call into the guest failed.
#[derive(Error, Debug)]
pub enum GuestError {
    #[error("guest export `{export}` trapped: {error:#}")]
    Trap {
        export: String,
        error: wasmtime::Error,
    },

    /// An optional export was called but the module does not provide it.
    #[error("module does not export optional function `{0}`")]
    Unsupported(&'static str),

    #[error("guest string at {ptr} is not valid UTF-8")]
    InvalidUtf8 { ptr: i32 },

    #[error(transparent)]
    View(#[from] ViewError),
}

/// Everything that can abort the harness.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Guest(#[from] GuestError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error("shader setup failed:\n{0}")]
    Shader(#[from] ShaderCompileError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Asset(#[from] AssetFetchError),

    #[error("cannot {action} while {actual:?}, expected {expected:?}")]
    InvalidPhase {
        action: &'static str,
        expected: Phase,
        actual: Phase,
    },
}
