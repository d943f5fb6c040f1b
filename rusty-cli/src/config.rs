use std::path::{Path, PathBuf};

use rusty_host::ExportNames;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "rusty.toml";

/// Settings read from rusty.toml. Every field has a default, so an empty
/// file (or no file at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Module to run when none is given on the command line.
    pub module: Option<String>,
    /// `env_logger` filter, used when RUST_LOG is unset.
    pub log_level: String,
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub exports: ExportNames,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub clear_color: [f64; 3],
    /// WGSL file replacing the builtin vertex shader.
    pub vertex_shader: Option<String>,
    /// WGSL file replacing the builtin fragment shader.
    pub fragment_shader: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            module: None,
            log_level: "info".into(),
            window: WindowConfig::default(),
            render: RenderConfig::default(),
            exports: ExportNames::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "rusty".into(),
            width: 1024,
            height: 768,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0],
            vertex_shader: None,
            fragment_shader: None,
        }
    }
}

/// A loaded config and the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct ConfigContext {
    pub root: PathBuf,
    /// The file the config came from, if one was found.
    pub path: Option<PathBuf>,
    pub config: HarnessConfig,
}

impl ConfigContext {
    /// Resolve a path from the config relative to the config's directory.
    pub fn resolve(&self, path: &str) -> String {
        if path.contains("://") || Path::new(path).is_absolute() {
            path.to_string()
        } else {
            self.root.join(path).to_string_lossy().into_owned()
        }
    }
}

/// Load an explicit config file, or search upward from the current
/// directory. With neither, defaults are used.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ConfigContext> {
    match explicit {
        Some(path) => read_config(Path::new(path)),
        None => detect_config_from(&std::env::current_dir()?),
    }
}

/// Find rusty.toml starting from a specific directory, walking up.
pub fn detect_config_from(start: &Path) -> anyhow::Result<ConfigContext> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return read_config(&candidate);
        }
        if !dir.pop() {
            return Ok(ConfigContext {
                root: start.to_path_buf(),
                path: None,
                config: HarnessConfig::default(),
            });
        }
    }
}

fn read_config(path: &Path) -> anyhow::Result<ConfigContext> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read config {}: {e}", path.display()))?;
    let config: HarnessConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(ConfigContext {
        root,
        path: Some(path.to_path_buf()),
        config,
    })
}
