use crate::{image::AssemblyPolicy, scanner::DEFAULT_READ_WINDOW};
use bstr::BString;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Reading settings and option presets for one scanner.
///
/// ```toml
/// read_window = 65536
/// assembly = "until-last-frame"
/// auto_defaults = true
///
/// [options]
/// mode = "Color"
/// resolution = "300"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    /// Bytes requested from the device per read.
    pub read_window: usize,

    pub assembly: AssemblyPolicy,

    /// Set every option that has no preset but supports it to its automatic
    /// value.
    pub auto_defaults: bool,

    /// Option name to textual value.
    pub options: HashMap<BString, BString>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing config")]
    Parse(#[from] toml::de::Error),
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            read_window: DEFAULT_READ_WINDOW,
            assembly: AssemblyPolicy::default(),
            auto_defaults: false,
            options: HashMap::default(),
        }
    }
}

impl ScannerConfig {
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}
