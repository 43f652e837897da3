//! TOML-based configuration for the mesh runtime.
//!
//! The demo binary reads a `MeshConfig` from a caller-supplied path. A
//! missing file is not an error (the defaults describe a small working
//! mesh), and fields absent from the file fall back to their defaults, so
//! a config written for an older schema keeps loading after upgrades.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use berth_core::Rect;

use crate::negotiation::{NegotiationPolicy, TargetSide, DEFAULT_MAX_ITERATIONS};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MeshConfig {
    #[serde(default)]
    pub mesh: MeshSection,
    #[serde(default)]
    pub negotiation: NegotiationSection,
    /// Entities to create at startup, bound in file order.
    #[serde(default)]
    pub entities: Vec<EntityEntry>,
}

/// General runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Negotiation policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiationSection {
    /// Convergence-loop iterations allowed per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Side entities settle toward; omitted means a random choice per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_side: Option<TargetSide>,
}

impl NegotiationSection {
    /// The policy this section describes.
    pub fn policy(&self) -> NegotiationPolicy {
        NegotiationPolicy {
            max_iterations: self.max_iterations,
        }
    }
}

/// One entity to create at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityEntry {
    /// Transport address, unique within the file.
    pub address: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl EntityEntry {
    /// The rectangle this entry positions its entity at.
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Default for MeshSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NegotiationSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            target_side: None,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads a `MeshConfig` from `path`, returning `MeshConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<MeshConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: MeshConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MeshConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &MeshConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
