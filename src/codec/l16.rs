//! Linear 16-bit PCM payload (RFC 3551 L16)

use super::Codec;
use crate::constants::DYNAMIC_PAYLOAD_TYPE;
use crate::error::CodecError;

const BYTES_PER_SAMPLE: usize = 2;

/// Big-endian signed 16-bit PCM
pub struct L16Codec {
    sample_rate: u32,
    channels: u16,
}

impl L16Codec {
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, CodecError> {
        if sample_rate == 0 || channels == 0 {
            return Err(CodecError::EncoderInit(format!(
                "L16 needs a sample rate and channels, got {} Hz / {}",
                sample_rate, channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }
}

impl Codec for L16Codec {
    fn name(&self) -> &str {
        "L16"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn payload_type(&self) -> u8 {
        // Static assignments only exist for 44.1 kHz
        match (self.sample_rate, self.channels) {
            (44100, 2) => 10,
            (44100, 1) => 11,
            _ => DYNAMIC_PAYLOAD_TYPE,
        }
    }

    fn clock_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frames_per_packet(&self, payload_budget: usize) -> usize {
        payload_budget / (BYTES_PER_SAMPLE * self.channels as usize)
    }

    fn encode(&mut self, input: &[f32], out: &mut [u8]) -> Result<usize, CodecError> {
        let needed = input.len() * BYTES_PER_SAMPLE;
        if needed > out.len() {
            return Err(CodecError::PayloadOverflow {
                written: needed,
                budget: out.len(),
            });
        }

        for (sample, chunk) in input.iter().zip(out.chunks_exact_mut(BYTES_PER_SAMPLE)) {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        Ok(needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_per_packet() {
        let codec = L16Codec::new(48000, 2).unwrap();
        assert_eq!(codec.frames_per_packet(1460), 365);
        assert_eq!(codec.frames_per_packet(3), 0);

        let mono = L16Codec::new(8000, 1).unwrap();
        assert_eq!(mono.frames_per_packet(1460), 730);
    }

    #[test]
    fn test_encode_big_endian_and_clamped() {
        let mut codec = L16Codec::new(8000, 1).unwrap();
        let mut out = [0u8; 8];
        let n = codec.encode(&[0.0, 1.0, -1.0, 2.0], &mut out).unwrap();
        assert_eq!(n, 8);
        assert_eq!(&out[0..2], &[0x00, 0x00]);
        assert_eq!(&out[2..4], &[0x7F, 0xFF]);
        assert_eq!(&out[4..6], &(-32767i16).to_be_bytes());
        assert_eq!(&out[6..8], &[0x7F, 0xFF]);
    }

    #[test]
    fn test_encode_respects_budget() {
        let mut codec = L16Codec::new(8000, 1).unwrap();
        let mut out = [0u8; 4];
        assert!(codec.encode(&[0.0; 3], &mut out).is_err());
    }

    #[test]
    fn test_payload_types() {
        assert_eq!(L16Codec::new(44100, 1).unwrap().payload_type(), 11);
        assert_eq!(L16Codec::new(48000, 2).unwrap().payload_type(), 96);
        assert!(L16Codec::new(0, 2).is_err());
    }

    #[test]
    fn test_unknown_param_rejected() {
        let mut codec = L16Codec::new(8000, 1).unwrap();
        assert!(codec.set_param("bitrate", "1").is_err());
    }
}
