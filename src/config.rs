//! Sender configuration
//!
//! Values come from an optional TOML file and are then overridden by
//! command-line flags. Everything the stream loop needs is passed in
//! explicitly through these structs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};

/// How the packet clock converts consumed samples into timestamp ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    /// Floor every packet's increment independently; rounding error accumulates
    #[default]
    Truncate,
    /// Carry the division remainder into the next packet
    Carry,
}

impl std::str::FromStr for TimestampMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "carry" => Ok(Self::Carry),
            other => Err(Error::Config(format!("unknown timestamp mode: {}", other))),
        }
    }
}

/// Transport session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Remote (usually multicast) address
    pub address: String,
    /// Remote RTP port, forced even
    pub port: u16,
    /// Multicast time-to-live
    pub ttl: Option<u32>,
    /// DSCP quality of service value (0-63)
    pub dscp: Option<u8>,
    /// Fixed SSRC; random when unset
    pub ssrc: Option<u32>,
    /// Overrides the codec's RTP payload type
    pub payload_type: Option<u8>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_RTP_PORT,
            ttl: None,
            dscp: None,
            ssrc: None,
            payload_type: None,
        }
    }
}

impl NetworkConfig {
    /// RTP data goes to even ports; odd ones are rounded down
    pub fn even_port(&self) -> u16 {
        self.port - (self.port % 2)
    }

    /// Parse `<address>[/<port>]`
    pub fn set_destination(&mut self, dest: &str) -> Result<()> {
        match dest.split_once('/') {
            Some((addr, port)) if !port.is_empty() => {
                self.port = port
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid port: {}", port)))?;
                self.address = addr.to_string();
            }
            Some((addr, _)) => self.address = addr.to_string(),
            None => self.address = dest.to_string(),
        }
        if self.address.is_empty() {
            return Err(Error::Config("missing address to send to".into()));
        }
        Ok(())
    }
}

/// Top-level sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CastConfig {
    /// Maximum payload bytes per packet
    pub payload_size_limit: usize,
    /// Channel count for live capture
    pub channels: u16,
    /// Live ring-buffer duration in milliseconds
    pub ring_duration_ms: u32,
    /// Restart the file when it ends
    pub loop_file: bool,
    /// Payload codec name
    pub payload: String,
    /// Codec parameters as `name=value`
    pub codec_options: Vec<String>,
    pub timestamp_mode: TimestampMode,
    /// How often a blocked consumer re-checks the stop flag
    pub stop_check_interval_ms: u64,
    pub network: NetworkConfig,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            payload_size_limit: DEFAULT_PAYLOAD_LIMIT,
            channels: DEFAULT_CHANNELS,
            ring_duration_ms: DEFAULT_RING_DURATION_MS,
            loop_file: false,
            payload: DEFAULT_PAYLOAD.to_string(),
            codec_options: Vec::new(),
            timestamp_mode: TimestampMode::default(),
            stop_check_interval_ms: DEFAULT_STOP_CHECK_MS,
            network: NetworkConfig::default(),
        }
    }
}

impl CastConfig {
    /// Default config file location for this user
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "rtp-audio-cast", "rtp-audio-cast")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path`, or the default location if it exists,
    /// falling back to built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.payload_size_limit == 0 {
            return Err(Error::Config("payload size limit must be positive".into()));
        }
        if self.payload_size_limit > MAX_PACKET_SIZE - RTP_HEADER_SIZE {
            return Err(Error::Config(format!(
                "payload size limit {} exceeds {} bytes",
                self.payload_size_limit,
                MAX_PACKET_SIZE - RTP_HEADER_SIZE
            )));
        }
        if self.channels == 0 {
            return Err(Error::Config("channel count must be positive".into()));
        }
        if self.ring_duration_ms == 0 {
            return Err(Error::Config("ring-buffer duration must be positive".into()));
        }
        if self.stop_check_interval_ms == 0 {
            return Err(Error::Config("stop check interval must be positive".into()));
        }
        if let Some(dscp) = self.network.dscp {
            if dscp > 63 {
                return Err(Error::Config(format!("DSCP value out of range: {}", dscp)));
            }
        }
        Ok(())
    }

    /// Codec options split into `(name, value)` pairs
    pub fn codec_params(&self) -> Result<Vec<(String, String)>> {
        self.codec_options
            .iter()
            .map(|pair| {
                pair.split_once('=')
                    .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
                    .ok_or_else(|| Error::Config(format!("expected name=value, got {}", pair)))
            })
            .collect()
    }

    /// Ring capacity in bytes for the given capture rate, never smaller
    /// than one packet of audio
    pub fn ring_capacity_bytes(&self, sample_rate: u32, frames_per_packet: usize) -> usize {
        let frame_bytes = self.channels as usize * std::mem::size_of::<f32>();
        let frames = sample_rate as usize * self.ring_duration_ms as usize / 1000;
        frames.max(frames_per_packet) * frame_bytes
    }

    pub fn stop_check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stop_check_interval_ms)
    }
}
