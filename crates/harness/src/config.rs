//! Harness configuration.
//!
//! Read once per process from the TOML file named by `STUBGEN_CONFIG`, if
//! set. `STUBGEN_BACKEND` overrides the backend selection.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::{env, fs};

use serde::{Deserialize, Serialize};
use stubgen_engine::{BackendKind, UnknownBackend};
use thiserror::Error;

/// Environment variable naming a TOML configuration file.
pub const CONFIG_ENV: &str = "STUBGEN_CONFIG";
/// Environment variable overriding [`HarnessConfig::backend`].
pub const BACKEND_ENV: &str = "STUBGEN_BACKEND";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },
	#[error("invalid configuration in {path}: {error}")]
	Parse { path: PathBuf, error: toml::de::Error },
	#[error("invalid STUBGEN_BACKEND: {0}")]
	Backend(#[from] UnknownBackend),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
	/// Generation backend used by the implementation loader.
	pub backend: BackendKind,
	/// `tracing` filter used when `STUBGEN_LOG` is unset.
	pub log_filter: String,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			backend: BackendKind::default(),
			log_filter: "warn".to_owned(),
		}
	}
}

impl HarnessConfig {
	pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
		toml::from_str(text).map_err(|error| ConfigError::Parse {
			path: path.to_owned(),
			error,
		})
	}

	pub fn load(path: &Path) -> Result<Self> {
		let text = fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_owned(),
			error,
		})?;
		Self::from_toml(&text, path)
	}

	/// Applies a `STUBGEN_BACKEND`-style override.
	pub fn with_backend_override(mut self, value: Option<&str>) -> Result<Self> {
		if let Some(value) = value {
			self.backend = value.parse()?;
		}
		Ok(self)
	}

	/// Configuration from the process environment.
	pub fn from_env() -> Result<Self> {
		let base = match env::var_os(CONFIG_ENV) {
			Some(path) => Self::load(Path::new(&path))?,
			None => Self::default(),
		};
		base.with_backend_override(env::var(BACKEND_ENV).ok().as_deref())
	}
}

static GLOBAL: LazyLock<HarnessConfig> =
	LazyLock::new(|| HarnessConfig::from_env().unwrap_or_else(|e| panic!("invalid harness configuration: {e}")));

/// Process-wide configuration, read on first use.
pub fn global() -> &'static HarnessConfig {
	&GLOBAL
}
