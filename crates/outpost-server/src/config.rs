//! Server configuration: environment variables override a TOML file, which
//! overrides the defaults below, the same resolution order as the
//! client's config, shared through `outpost_core::config`.
//!
//! The PSK path is conventionally supplied via environment on a deployed
//! profile; the file still accepts it so the binary is usable without an
//! init system wiring up env vars.

use std::path::{Path, PathBuf};

use outpost_core::config::{self, ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub psk_path: PathBuf,
    /// Connection string for the storage sink. The bundled `LoggingSink`
    /// treats this as a filesystem path for its NDJSON output; a real
    /// geospatial-database sink would parse it as a DSN instead.
    pub sink_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 5683,
            psk_path: PathBuf::from("/etc/outpost/psk.key"),
            sink_path: PathBuf::from("/var/lib/outpost/fixes.ndjson"),
        }
    }
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg: ServerConfig = config::load_toml_file(path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = config::env_var("OUTPOST_SERVER_BIND_HOST") {
            self.bind_host = v;
        }
        if let Some(v) = config::env_var("OUTPOST_SERVER_BIND_PORT") {
            if let Ok(n) = v.parse() {
                self.bind_port = n;
            }
        }
        if let Some(v) = config::env_var("OUTPOST_SERVER_PSK_PATH") {
            self.psk_path = PathBuf::from(v);
        }
        if let Some(v) = config::env_var("OUTPOST_SERVER_SINK_PATH") {
            self.sink_path = PathBuf::from(v);
        }
    }
}
