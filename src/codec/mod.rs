//! Payload codecs
//!
//! A codec turns a batch of interleaved f32 frames into one RTP payload
//! no larger than the configured budget.

pub mod l16;
#[cfg(feature = "opus-codec")]
pub mod opus;

pub use l16::L16Codec;
#[cfg(feature = "opus-codec")]
pub use self::opus::OpusCodec;

use crate::error::CodecError;

pub trait Codec: Send {
    /// Payload name, e.g. "L16"
    fn name(&self) -> &str;

    /// Input sample rate
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// RTP payload type number
    fn payload_type(&self) -> u8;

    /// RTP timestamp clock rate
    fn clock_rate(&self) -> u32;

    /// Frames that fit in one payload of `payload_budget` bytes; zero if
    /// none do
    fn frames_per_packet(&self, payload_budget: usize) -> usize;

    /// Encode interleaved `input` into `out`, returning the bytes written.
    ///
    /// Zero means the codec produced nothing this cycle and no packet
    /// should be sent.
    fn encode(&mut self, input: &[f32], out: &mut [u8]) -> Result<usize, CodecError>;

    fn set_param(&mut self, name: &str, value: &str) -> Result<(), CodecError> {
        Err(CodecError::InvalidParam {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Codec names accepted by `create`
pub fn available() -> &'static [&'static str] {
    #[cfg(feature = "opus-codec")]
    {
        &["L16", "opus"]
    }
    #[cfg(not(feature = "opus-codec"))]
    {
        &["L16"]
    }
}

/// Create a codec by payload name (case-insensitive)
pub fn create(name: &str, sample_rate: u32, channels: u16) -> Result<Box<dyn Codec>, CodecError> {
    match name.to_ascii_lowercase().as_str() {
        "l16" => Ok(Box::new(L16Codec::new(sample_rate, channels)?)),
        #[cfg(feature = "opus-codec")]
        "opus" => Ok(Box::new(OpusCodec::new(sample_rate, channels)?)),
        _ => Err(CodecError::UnknownPayload(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_by_name() {
        let codec = create("l16", 44100, 2).unwrap();
        assert_eq!(codec.name(), "L16");
        assert_eq!(codec.payload_type(), 10);

        assert!(matches!(
            create("vorbis", 44100, 2).err().unwrap(),
            CodecError::UnknownPayload(_)
        ));
    }

    #[test]
    fn test_available_lists_l16() {
        assert!(available().contains(&"L16"));
    }
}
