//! # RTP Audio Cast
//!
//! Real-time audio sender: takes audio from a live input device or a
//! decoded file, encodes fixed-size batches with a pluggable codec and
//! emits them as timestamped RTP packets.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         LIVE SOURCE (rtp-cast)                        │
//! │  ┌──────────────┐   callback    ┌──────────────────────────────────┐  │
//! │  │ cpal input   │ ────────────▶ │ AudioRing (audio::buffer)        │  │
//! │  │ stream       │  write+notify │ fixed array, two cursors, SPSC   │  │
//! │  └──────────────┘               └────────────────┬─────────────────┘  │
//! │                                                  │ wait / read        │
//! └──────────────────────────────────────────────────┼────────────────────┘
//!                                                    ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  AudioSource::pull(batch)  (audio::source)                           │
//! │    LiveSource  ── blocks on the ring until a packet's worth exists   │
//! │    FileSource  ── synchronous decoder read, short read = end of file │
//! └──────────────────────────────────┬───────────────────────────────────┘
//!                                    ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Packetizer (packetizer)  frames_per_packet from the codec budget    │
//! │         │                                                            │
//! │         ▼                                                            │
//! │  Codec::encode (codec: L16, Opus)                                    │
//! │         │                                                            │
//! │         ▼                                                            │
//! │  StreamLoop (stream) ── Transport::send(payload, PacketClock ts)     │
//! │                         RtpSender (network::rtp) over UDP            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod cli;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod packetizer;
pub mod stream;

pub use clock::PacketClock;
pub use config::{CastConfig, TimestampMode};
pub use error::{Error, Result};
pub use packetizer::Packetizer;
pub use stream::{StopFlag, StreamLoop, StreamState, StreamStats};

/// Application-wide constants
pub mod constants {
    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Default maximum payload bytes per packet
    pub const DEFAULT_PAYLOAD_LIMIT: usize = 1460;

    /// Default payload codec
    pub const DEFAULT_PAYLOAD: &str = "L16";

    /// Default RTP port
    pub const DEFAULT_RTP_PORT: u16 = 5004;

    /// Default live ring-buffer duration
    pub const DEFAULT_RING_DURATION_MS: u32 = 500;

    /// Default interval at which blocked waits re-check the stop flag
    pub const DEFAULT_STOP_CHECK_MS: u64 = 10;

    /// Maximum packet size for UDP
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers

    /// Fixed RTP header size (no CSRCs, no extension)
    pub const RTP_HEADER_SIZE: usize = 12;

    /// First dynamic RTP payload type
    pub const DYNAMIC_PAYLOAD_TYPE: u8 = 96;
}
