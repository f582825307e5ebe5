use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::adapters::cipher::gpg_backend::GpgBackend;
use crate::core::errors::{PgpError, Result};

/// pgpmate configuration read from `config.toml`.
///
/// Every section is optional; a missing file means all defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub gpg: GpgSection,
    #[serde(default)]
    pub defaults: DefaultsSection,
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the platform config
    /// directory is tried (`~/.config/pgpmate/config.toml` on Linux) and a
    /// missing file there yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(PgpError::InvalidConfig {
                        detail: format!("config file not found: {}", path.display()),
                    });
                }
                Self::from_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Default config file location for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pgpmate").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            PgpError::InvalidConfig { detail } => PgpError::InvalidConfig {
                detail: format!("{}: {detail}", path.display()),
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PgpError::InvalidConfig {
            detail: format!("Failed to parse config: {e}"),
        })
    }

    /// Build the gpg backend described by the `[gpg]` section.
    pub fn gpg_backend(&self) -> GpgBackend {
        let backend = GpgBackend::with_path(self.gpg.binary.clone());
        match &self.gpg.homedir {
            Some(homedir) => backend.with_homedir(homedir.clone()),
            None => backend,
        }
    }
}

/// The `[gpg]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpgSection {
    /// Path or name of the gpg binary.
    #[serde(default = "default_gpg_binary")]
    pub binary: PathBuf,
    /// Keyring directory passed as `--homedir`.
    pub homedir: Option<PathBuf>,
}

impl Default for GpgSection {
    fn default() -> Self {
        Self {
            binary: default_gpg_binary(),
            homedir: None,
        }
    }
}

fn default_gpg_binary() -> PathBuf {
    PathBuf::from("gpg")
}

/// The `[defaults]` section: values used when a flag is not given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    pub fingerprint: Option<String>,
    pub recipient: Option<String>,
    #[serde(default)]
    pub symmetric: bool,
}
