//! Command-line options shared by the sender binaries

use clap::Args;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{CastConfig, TimestampMode};
use crate::error::{Error, Result};

/// Transport and codec options common to every sender
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Source identifier in hex (default is random)
    #[arg(short = 's', long, value_parser = parse_hex)]
    pub ssrc: Option<u32>,

    /// Multicast time to live
    #[arg(short = 't', long)]
    pub ttl: Option<u32>,

    /// The payload type to send (L16, opus)
    #[arg(short = 'p', long)]
    pub payload: Option<String>,

    /// Set codec parameter / option as name=value
    #[arg(short = 'o', long = "option")]
    pub options: Vec<String>,

    /// Set the per-packet payload size in bytes
    #[arg(short = 'z', long)]
    pub size: Option<usize>,

    /// DSCP quality of service value
    #[arg(short = 'd', long)]
    pub dscp: Option<u8>,

    /// Timestamp rounding: truncate or carry
    #[arg(long)]
    pub timestamp_mode: Option<TimestampMode>,

    /// Configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load the config file (or defaults) and apply these overrides
    pub fn load_config(&self, destination: &str) -> Result<CastConfig> {
        let mut config = CastConfig::load_or_default(self.config.as_deref())?;
        self.apply(&mut config, destination)?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut CastConfig, destination: &str) -> Result<()> {
        config.network.set_destination(destination)?;
        if let Some(ssrc) = self.ssrc {
            config.network.ssrc = Some(ssrc);
        }
        if let Some(ttl) = self.ttl {
            config.network.ttl = Some(ttl);
        }
        if let Some(dscp) = self.dscp {
            config.network.dscp = Some(dscp);
        }
        if let Some(payload) = &self.payload {
            config.payload = payload.clone();
        }
        if let Some(size) = self.size {
            config.payload_size_limit = size;
        }
        if let Some(mode) = self.timestamp_mode {
            config.timestamp_mode = mode;
        }
        config.codec_options.extend(self.options.iter().cloned());
        Ok(())
    }
}

/// Parse a hex value with or without a `0x` prefix
pub fn parse_hex(s: &str) -> Result<u32> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|_| Error::Config(format!("invalid hex value: {}", s)))
}

/// Install the tracing subscriber; `RUST_LOG` wins over `verbose`
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
