//! Client configuration: environment variables override a TOML file, which
//! overrides the defaults below. Unknown keys are rejected at load time,
//! since the recognised options are a fixed enumerated set rather than a
//! free-form mapping.

use std::path::{Path, PathBuf};

use outpost_core::config::{self, ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    pub device: String,
    pub baud: u32,
    pub outpost_host: String,
    pub psk_path: PathBuf,
    pub similarity_threshold: f64,
    pub flush_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud: 4_800,
            outpost_host: "127.0.0.1:5683".to_string(),
            psk_path: PathBuf::from("/etc/outpost/psk.key"),
            similarity_threshold: 0.0001,
            flush_interval_secs: 30,
        }
    }
}

impl ClientConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg: ClientConfig = config::load_toml_file(path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = config::env_var("OUTPOST_CLIENT_DEVICE") {
            self.device = v;
        }
        if let Some(v) = config::env_var("OUTPOST_CLIENT_BAUD") {
            if let Ok(n) = v.parse() {
                self.baud = n;
            }
        }
        if let Some(v) = config::env_var("OUTPOST_CLIENT_HOST") {
            self.outpost_host = v;
        }
        if let Some(v) = config::env_var("OUTPOST_CLIENT_PSK_PATH") {
            self.psk_path = PathBuf::from(v);
        }
        if let Some(v) = config::env_var("OUTPOST_CLIENT_SIMILARITY_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.similarity_threshold = n;
            }
        }
        if let Some(v) = config::env_var("OUTPOST_CLIENT_FLUSH_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.flush_interval_secs = n;
            }
        }
    }
}
