use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub attributes_csv: PathBuf,
    pub national: PathBuf,
    pub municipalities: PathBuf,
    #[serde(default = "default_national_object")]
    pub national_object: String,
    #[serde(default = "default_municipality_object")]
    pub municipality_object: String,
}

/// Albers equal-area conic parameters, in degrees.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProjectionConfig {
    pub center: [f64; 2],
    pub rotate: [f64; 2],
    pub parallels: [f64; 2],
    pub scale: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 37.6],
            rotate: [79.6, 0.0],
            parallels: [36.0, 39.0],
            scale: 7500.0,
        }
    }
}

/// Window size used before a browser reports its own, and by `render`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 1280.0, height: 800.0 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

fn default_national_object() -> String {
    "UnitedStates".to_string()
}

fn default_municipality_object() -> String {
    "VirginiaMunicipalities".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
