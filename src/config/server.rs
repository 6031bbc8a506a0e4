use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::progress::{FixedPause, NoPause, Pacer};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Delay between items of a bulk approval. Zero disables pacing.
    pub bulk_pause_ms: u64,
}

/// On-disk form of [`ServerConfig`]. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub bulk_pause_ms: Option<u64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e.message())))
    }
}

impl ServerConfig {
    /// Defaults overlaid with whatever the file sets.
    #[must_use]
    pub fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            bulk_pause_ms: file.bulk_pause_ms.unwrap_or(defaults.bulk_pause_ms),
        }
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("coursetrack.db")
    }

    #[must_use]
    pub fn bulk_pacer(&self) -> Arc<dyn Pacer> {
        if self.bulk_pause_ms == 0 {
            Arc::new(NoPause)
        } else {
            Arc::new(FixedPause(Duration::from_millis(self.bulk_pause_ms)))
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            bulk_pause_ms: 0,
        }
    }
}
