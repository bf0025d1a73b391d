//! Error types for the RTP audio sender

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio source errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open input file: {0}")]
    OpenFailed(String),

    #[error("Failed to read from file: {0}")]
    Decode(String),

    #[error("Failed to seek to start of file: {0}")]
    SeekFailed(String),

    #[error("Channel mismatch: source has {source_channels}, batch expects {batch_channels}")]
    ChannelMismatch {
        source_channels: u16,
        batch_channels: u16,
    },

    #[error("cpal error: {0}")]
    CpalError(String),
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Unknown payload type: {0}")]
    UnknownPayload(String),

    #[error("Invalid codec parameter {name}={value}")]
    InvalidParam { name: String, value: String },

    #[error("Invalid number of frames per packet for a {0} byte payload")]
    InvalidFramesPerPacket(usize),

    #[error("Payload of {written} bytes exceeds budget of {budget} bytes")]
    PayloadOverflow { written: usize, budget: usize },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket setup failed: {0}")]
    SocketSetup(String),

    #[error("Invalid remote address: {0}")]
    InvalidAddress(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// Stream loop errors
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to allocate {0} byte buffer")]
    Allocation(usize),

    #[error("Source sample rate must be non-zero")]
    ZeroSampleRate,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
