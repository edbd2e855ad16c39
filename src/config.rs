//! Where to find the engine library and how to talk to it.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::engine::{EngineError, Platform};

/// Explicit path to `nl5_dll.dll`.
pub const ENV_LIBRARY: &str = "NL5_LIBRARY";
/// Install root holding the per-platform library directories.
pub const ENV_HOME: &str = "NL5_HOME";
/// License file applied after loading.
pub const ENV_LICENSE: &str = "NL5_LICENSE";
/// Buffer size for text reads.
pub const ENV_TEXT_BUFFER: &str = "NL5_TEXT_BUFFER";

/// Library location and call settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Library file; takes precedence over `home`.
    pub library: Option<PathBuf>,
    /// Install root, resolved through [`Platform::library_path`].
    pub home: Option<PathBuf>,
    /// License file, if any.
    pub license: Option<PathBuf>,
    /// Bytes reserved when reading text fields and trace names; at least 1.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "positive_capacity"))]
    pub text_capacity: usize,
    /// Transient timeout in seconds applied to opened circuits.
    pub timeout: Option<i32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library: None,
            home: None,
            license: None,
            text_capacity: 100,
            timeout: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by the `NL5_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Overrides fields from the `NL5_*` environment variables.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var_os(key))
    }

    /// Overrides fields from `lookup`, which maps variable names to values.
    ///
    /// Empty values are ignored, as is an unparsable `NL5_TEXT_BUFFER`.
    #[must_use]
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(library) = var(ENV_LIBRARY) {
            self.library = Some(library.into());
        }
        if let Some(home) = var(ENV_HOME) {
            self.home = Some(home.into());
        }
        if let Some(license) = var(ENV_LICENSE) {
            self.license = Some(license.into());
        }
        match var(ENV_TEXT_BUFFER).map(|v| v.to_string_lossy().trim().parse::<usize>()) {
            Some(Ok(capacity)) if capacity > 0 => self.text_capacity = capacity,
            Some(_) => tracing::warn!("ignoring invalid {ENV_TEXT_BUFFER}"),
            None => {}
        }
        self
    }

    /// Resolves the library file to load.
    pub fn library_path(&self) -> Result<PathBuf, EngineError> {
        if let Some(library) = &self.library {
            return Ok(library.clone());
        }
        match &self.home {
            Some(home) => Ok(Platform::detect()?.library_path(home)),
            None => Err(EngineError::LibraryNotConfigured),
        }
    }
}

#[cfg(feature = "serde")]
fn positive_capacity<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match usize::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("text_capacity must be at least 1")),
        capacity => Ok(capacity),
    }
}
