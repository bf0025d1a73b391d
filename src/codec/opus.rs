//! Opus payload (RFC 7587)
//!
//! Always 20 ms frames with a 48 kHz RTP clock. Short batches at end of
//! file are zero padded up to a full Opus frame.

use opus::{Application, Bitrate, Channels, Encoder};

use super::Codec;
use crate::constants::DYNAMIC_PAYLOAD_TYPE;
use crate::error::CodecError;

/// Opus RTP clock rate, independent of the input rate
const OPUS_CLOCK_RATE: u32 = 48000;

/// Frame duration in milliseconds
const FRAME_MS: u32 = 20;

/// Smallest budget that still leaves room for a usable frame
const MIN_PAYLOAD: usize = 64;

const DEFAULT_BITRATE: i32 = 128_000;

/// Opus encoder wrapper
pub struct OpusCodec {
    encoder: Encoder,
    sample_rate: u32,
    channels: u16,
    frame_size: usize,
    /// Padding buffer for partial batches (reused to avoid allocations)
    pad_buffer: Vec<f32>,
}

impl OpusCodec {
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, CodecError> {
        let opus_channels = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => {
                return Err(CodecError::EncoderInit(format!(
                    "Unsupported channel count: {}",
                    channels
                )))
            }
        };

        if ![8000, 12000, 16000, 24000, 48000].contains(&sample_rate) {
            return Err(CodecError::EncoderInit(format!(
                "Unsupported sample rate: {} Hz",
                sample_rate
            )));
        }

        let mut encoder = Encoder::new(sample_rate, opus_channels, Application::Audio)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;
        encoder
            .set_bitrate(Bitrate::Bits(DEFAULT_BITRATE))
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set bitrate: {}", e)))?;

        let frame_size = (sample_rate * FRAME_MS / 1000) as usize;

        Ok(Self {
            encoder,
            sample_rate,
            channels,
            frame_size,
            pad_buffer: vec![0.0; frame_size * channels as usize],
        })
    }

    /// Frames per Opus packet
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

impl Codec for OpusCodec {
    fn name(&self) -> &str {
        "opus"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn payload_type(&self) -> u8 {
        DYNAMIC_PAYLOAD_TYPE
    }

    fn clock_rate(&self) -> u32 {
        OPUS_CLOCK_RATE
    }

    fn frames_per_packet(&self, payload_budget: usize) -> usize {
        if payload_budget < MIN_PAYLOAD {
            0
        } else {
            self.frame_size
        }
    }

    fn encode(&mut self, input: &[f32], out: &mut [u8]) -> Result<usize, CodecError> {
        let full = self.frame_size * self.channels as usize;
        if input.len() > full {
            return Err(CodecError::EncodingFailed(format!(
                "{} samples exceed one {} ms frame",
                input.len(),
                FRAME_MS
            )));
        }
        if input.is_empty() {
            return Ok(0);
        }

        let samples = if input.len() == full {
            input
        } else {
            self.pad_buffer[..input.len()].copy_from_slice(input);
            self.pad_buffer[input.len()..].fill(0.0);
            &self.pad_buffer[..]
        };

        self.encoder
            .encode_float(samples, out)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))
    }

    fn set_param(&mut self, name: &str, value: &str) -> Result<(), CodecError> {
        let invalid = || CodecError::InvalidParam {
            name: name.to_string(),
            value: value.to_string(),
        };

        match name {
            "bitrate" => {
                let bits: i32 = value.parse().map_err(|_| invalid())?;
                self.encoder
                    .set_bitrate(Bitrate::Bits(bits))
                    .map_err(|_| invalid())
            }
            "complexity" => {
                let complexity: i32 = value.parse().map_err(|_| invalid())?;
                if !(0..=10).contains(&complexity) {
                    return Err(invalid());
                }
                self.encoder.set_complexity(complexity).map_err(|_| invalid())
            }
            "vbr" => self.encoder.set_vbr(parse_flag(value)).map_err(|_| invalid()),
            "fec" => self
                .encoder
                .set_inband_fec(parse_flag(value))
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_creation() {
        let codec = OpusCodec::new(48000, 2).unwrap();
        assert_eq!(codec.frame_size(), 960);
        assert_eq!(codec.clock_rate(), 48000);
        assert_eq!(codec.frames_per_packet(1460), 960);
        assert_eq!(codec.frames_per_packet(32), 0);
    }

    #[test]
    fn test_unsupported_formats() {
        assert!(OpusCodec::new(44100, 2).is_err());
        assert!(OpusCodec::new(48000, 3).is_err());
    }

    #[test]
    fn test_encoding_full_and_partial() {
        let mut codec = OpusCodec::new(48000, 2).unwrap();
        let mut out = vec![0u8; 1460];

        let n = codec.encode(&vec![0.0f32; 960 * 2], &mut out).unwrap();
        assert!(n > 0 && n <= 1460);

        let n = codec.encode(&vec![0.0f32; 100 * 2], &mut out).unwrap();
        assert!(n > 0);

        assert!(codec.encode(&vec![0.0f32; 961 * 2], &mut out).is_err());
    }

    #[test]
    fn test_params() {
        let mut codec = OpusCodec::new(16000, 1).unwrap();
        assert!(codec.set_param("bitrate", "32000").is_ok());
        assert!(codec.set_param("fec", "1").is_ok());
        assert!(codec.set_param("complexity", "5").is_ok());
        assert!(codec.set_param("complexity", "11").is_err());
        assert!(codec.set_param("vbr", "off").is_ok());
        assert!(codec.set_param("bitrate", "fast").is_err());
        assert!(codec.set_param("color", "red").is_err());
    }
}
