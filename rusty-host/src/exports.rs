use serde::{Deserialize, Serialize};
use wasmtime::{Instance, Store, TypedFunc, WasmParams, WasmResults};

use crate::error::LoadError;

/// Names of the exports the host binds to. Defaults match the guest ABI
/// the rusty client modules are built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportNames {
    pub memory: String,
    pub init: String,
    pub advance: String,
    pub data_offset: String,
    pub data_length: String,
    pub view_matrix_offset: String,
    pub set_screen_width: String,
    pub set_screen_height: String,
    pub rotate_camera: String,
    pub vec_data: String,
    pub vec_len: String,
    pub destroy: String,
    pub greet: String,
    pub motd: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        Self {
            memory: "memory".into(),
            init: "gen".into(),
            advance: "update".into(),
            data_offset: "state_data".into(),
            data_length: "state_len".into(),
            view_matrix_offset: "state_view_matrix".into(),
            set_screen_width: "set_screen_width".into(),
            set_screen_height: "set_screen_height".into(),
            rotate_camera: "rotate_camera".into(),
            vec_data: "vec_data".into(),
            vec_len: "vec_len".into(),
            destroy: "destroy".into(),
            greet: "greet".into(),
            motd: "motd".into(),
        }
    }
}

/// A typed export together with the name it was resolved from.
pub struct Export<P, R> {
    pub name: String,
    pub func: TypedFunc<P, R>,
}

impl<P, R> Clone for Export<P, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

/// Every export the host calls, resolved and signature-checked at load time.
pub struct GuestExports {
    pub init: Export<(), ()>,
    pub advance: Export<(), ()>,
    pub data_offset: Export<(), i32>,
    pub data_length: Export<(), i32>,
    pub view_matrix_offset: Export<(), i32>,
    pub set_screen_width: Export<i32, ()>,
    pub set_screen_height: Export<i32, ()>,
    pub rotate_camera: Export<f32, f32>,
    pub vec_data: Option<Export<i32, i32>>,
    pub vec_len: Option<Export<i32, i32>>,
    pub destroy: Option<Export<i32, ()>>,
    pub greet: Option<Export<(), i32>>,
    pub motd: Option<Export<(), i32>>,
}

impl GuestExports {
    /// Resolve every export named in `names`. Required exports that are
    /// missing or mistyped fail here, not at first use.
    pub fn resolve(
        store: &mut Store<()>,
        instance: &Instance,
        names: &ExportNames,
    ) -> Result<Self, LoadError> {
        Ok(Self {
            init: required(store, instance, &names.init, "() -> ()")?,
            advance: required(store, instance, &names.advance, "() -> ()")?,
            data_offset: required(store, instance, &names.data_offset, "() -> i32")?,
            data_length: required(store, instance, &names.data_length, "() -> i32")?,
            view_matrix_offset: required(store, instance, &names.view_matrix_offset, "() -> i32")?,
            set_screen_width: required(store, instance, &names.set_screen_width, "(i32) -> ()")?,
            set_screen_height: required(store, instance, &names.set_screen_height, "(i32) -> ()")?,
            rotate_camera: required(store, instance, &names.rotate_camera, "(f32) -> f32")?,
            vec_data: optional(store, instance, &names.vec_data, "(i32) -> i32")?,
            vec_len: optional(store, instance, &names.vec_len, "(i32) -> i32")?,
            destroy: optional(store, instance, &names.destroy, "(i32) -> ()")?,
            greet: optional(store, instance, &names.greet, "() -> i32")?,
            motd: optional(store, instance, &names.motd, "() -> i32")?,
        })
    }

    /// Names of the optional exports this module actually provides.
    pub fn optional_present(&self) -> Vec<&str> {
        [
            self.vec_data.as_ref().map(|e| e.name.as_str()),
            self.vec_len.as_ref().map(|e| e.name.as_str()),
            self.destroy.as_ref().map(|e| e.name.as_str()),
            self.greet.as_ref().map(|e| e.name.as_str()),
            self.motd.as_ref().map(|e| e.name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Look up `name` and check it against the Rust-side signature `P -> R`.
pub fn required<P, R>(
    store: &mut Store<()>,
    instance: &Instance,
    name: &str,
    expected: &'static str,
) -> Result<Export<P, R>, LoadError>
where
    P: WasmParams,
    R: WasmResults,
{
    optional(store, instance, name, expected)?.ok_or_else(|| LoadError::MissingExport {
        name: name.to_string(),
    })
}

/// Like [`required`] but an absent export is `None`. A present export with
/// the wrong signature is still an error.
pub fn optional<P, R>(
    store: &mut Store<()>,
    instance: &Instance,
    name: &str,
    expected: &'static str,
) -> Result<Option<Export<P, R>>, LoadError>
where
    P: WasmParams,
    R: WasmResults,
{
    let Some(func) = instance.get_func(&mut *store, name) else {
        return Ok(None);
    };
    let func = func
        .typed::<P, R>(&*store)
        .map_err(|e| LoadError::ExportSignature {
            name: name.to_string(),
            expected,
            reason: format!("{e:#}"),
        })?;
    Ok(Some(Export {
        name: name.to_string(),
        func,
    }))
}
