//! Server configuration.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sharedraw_core::{CanvasLimits, CanvasOptions, default_snapshot_path};
use thiserror::Error;

/// Everything the server needs at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address both listeners bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Line protocol port
    #[serde(default = "default_push_port")]
    pub push_port: u16,

    /// Framed request/response port
    #[serde(default = "default_poll_port")]
    pub poll_port: u16,

    #[serde(default = "default_true")]
    pub push_enabled: bool,

    #[serde(default = "default_true")]
    pub poll_enabled: bool,

    /// Snapshot file, loaded at startup and rewritten at shutdown
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Where `dump` writes when no path is given
    #[serde(default = "default_dump_path")]
    pub dump_path: PathBuf,

    /// Marker highlight lifetime in milliseconds
    #[serde(default = "default_marker_duration")]
    pub marker_duration_ms: u64,

    #[serde(default = "default_min_dimension")]
    pub min_dimension: i32,

    #[serde(default = "default_max_dimension")]
    pub max_dimension: i32,

    #[serde(default = "default_canvas_size")]
    pub canvas_width: i32,

    #[serde(default = "default_canvas_size")]
    pub canvas_height: i32,

    /// Largest client request accepted (bytes): a poll frame or a push line
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Number of simulated clients
    #[serde(default)]
    pub ghost_clients: usize,

    /// Ghost activity in percent (above 50 is "busy")
    #[serde(default = "default_ghost_activity")]
    pub ghost_activity: u8,
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_push_port() -> u16 {
    1100
}

fn default_poll_port() -> u16 {
    1099
}

fn default_true() -> bool {
    true
}

fn default_dump_path() -> PathBuf {
    PathBuf::from("sharedraw-dump.txt")
}

fn default_marker_duration() -> u64 {
    3000
}

fn default_min_dimension() -> i32 {
    10
}

fn default_max_dimension() -> i32 {
    100
}

fn default_canvas_size() -> i32 {
    400
}

fn default_max_message_size() -> usize {
    1024 * 1024
}

fn default_ghost_activity() -> u8 {
    75
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            push_port: default_push_port(),
            poll_port: default_poll_port(),
            push_enabled: true,
            poll_enabled: true,
            snapshot_path: default_snapshot_path(),
            dump_path: default_dump_path(),
            marker_duration_ms: default_marker_duration(),
            min_dimension: default_min_dimension(),
            max_dimension: default_max_dimension(),
            canvas_width: default_canvas_size(),
            canvas_height: default_canvas_size(),
            max_message_size: default_max_message_size(),
            ghost_clients: 0,
            ghost_activity: default_ghost_activity(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn marker_duration(&self) -> Duration {
        Duration::from_millis(self.marker_duration_ms)
    }

    pub fn canvas_options(&self) -> CanvasOptions {
        CanvasOptions {
            marker_duration: self.marker_duration(),
            limits: CanvasLimits {
                dimensions: self.min_dimension..=self.max_dimension,
                width: self.canvas_width,
                height: self.canvas_height,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.push_enabled && !self.poll_enabled {
            return Err(ConfigError::Invalid("at least one transport must be enabled".into()));
        }
        if self.push_enabled && self.push_port == 0 {
            return Err(ConfigError::Invalid("push_port cannot be 0".into()));
        }
        if self.poll_enabled && self.poll_port == 0 {
            return Err(ConfigError::Invalid("poll_port cannot be 0".into()));
        }
        if self.push_enabled && self.poll_enabled && self.push_port == self.poll_port {
            return Err(ConfigError::Invalid("push_port and poll_port must differ".into()));
        }
        if self.min_dimension < 0 || self.min_dimension > self.max_dimension {
            return Err(ConfigError::Invalid(format!(
                "dimension range {}..={} is empty",
                self.min_dimension, self.max_dimension
            )));
        }
        if self.canvas_width <= 0 || self.canvas_height <= 0 {
            return Err(ConfigError::Invalid("canvas size must be positive".into()));
        }
        if self.marker_duration_ms == 0 {
            return Err(ConfigError::Invalid("marker_duration_ms cannot be 0".into()));
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid("max_message_size cannot be 0".into()));
        }
        if self.ghost_activity > 100 {
            return Err(ConfigError::Invalid(format!(
                "ghost_activity {} is above 100",
                self.ghost_activity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
