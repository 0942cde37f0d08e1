use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub renderer: RendererConfig,
}

/// Sizing rules applied to every image placed in the document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub max_image_width: u32,
    /// Used when an image file is readable but its format is not recognized.
    pub default_image_width: u32,
    pub default_image_height: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_image_width: 600,
            default_image_width: 400,
            default_image_height: 300,
        }
    }
}

impl LayoutConfig {
    /// Shrink `(width, height)` to fit `max_image_width`, keeping the aspect
    /// ratio. Images that already fit are returned unchanged.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        if width <= self.max_image_width || width == 0 {
            return (width, height);
        }
        let scale = f64::from(self.max_image_width) / f64::from(width);
        let scaled_height = (f64::from(height) * scale).round().max(1.0) as u32;
        (self.max_image_width, scaled_height)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Pixels kept around the diagram's bounding box in the screenshot.
    pub padding: u32,
    pub timeout_ms: u64,
    pub mermaid_script: String,
    pub plantuml_server: String,
    pub plantuml_format: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1600,
            viewport_height: 1200,
            padding: 8,
            timeout_ms: 10_000,
            mermaid_script: "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"
                .to_string(),
            plantuml_server: "https://www.plantuml.com/plantuml".to_string(),
            plantuml_format: "png".to_string(),
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// The configuration bundled into the binary.
    pub fn compiled_default() -> Self {
        // build.rs guarantees the bundled file parses as TOML
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Find and load configuration.
    ///
    /// Search order:
    /// 1. Explicit path if provided (must exist)
    /// 2. `mdocx.toml` in the working directory
    /// 3. Platform-specific config directory
    /// 4. The compiled default
    pub fn discover(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            info!(path = path.display().to_string(); "Loading configuration from explicit path");
            return Self::load(path);
        }

        let local_config = Path::new("mdocx.toml");
        if local_config.exists() {
            info!(path = local_config.display().to_string(); "Loading configuration from local path");
            return Self::load(local_config);
        }

        if let Some(proj_dirs) = ProjectDirs::from("com", "mdocx", "mdocx") {
            let system_config = proj_dirs.config_dir().join("config.toml");
            if system_config.exists() {
                info!(path = system_config.display().to_string(); "Loading configuration from system path");
                return Self::load(&system_config);
            }
            debug!(path = system_config.display().to_string(); "System configuration file not found");
        } else {
            debug!("Could not determine platform-specific config directory");
        }

        debug!("No configuration file found, using compiled default");
        Ok(Self::compiled_default())
    }
}
