//! Shared config-loading plumbing: environment variables override a TOML
//! file, which overrides hard-coded defaults, generalized over the
//! caller's own config struct instead of being written out by hand twice.

use std::path::Path;

use serde::de::DeserializeOwned;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("could not parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
}

/// Parses `path` as TOML into `T`, or returns `T::default()` if no path was
/// given. Callers layer environment-variable overrides on top of the
/// result themselves, since which fields are overridable is caller-specific.
pub fn load_toml_file<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, ConfigError> {
    let Some(path) = path else {
        return Ok(T::default());
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
}

/// Reads an environment variable, treating an unset or empty value as
/// absent.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
