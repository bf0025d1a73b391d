//! Packetizer: pulls one codec-sized batch and encodes it

use crate::audio::buffer::FrameBatch;
use crate::audio::source::{AudioSource, Pull};
use crate::codec::Codec;
use crate::error::{CodecError, Result, StreamError};

/// Outcome of one `encode_one` cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    /// What the source reported
    pub pull: Pull,
    /// Frames consumed from the source
    pub frames: usize,
    /// Payload bytes produced; zero means nothing to send
    pub bytes: usize,
}

pub struct Packetizer {
    codec: Box<dyn Codec>,
    payload_budget: usize,
    frames_per_packet: usize,
    batch: FrameBatch,
    payload: Vec<u8>,
    payload_len: usize,
}

impl Packetizer {
    /// Fails if the codec cannot fit a single frame in `payload_budget`
    pub fn new(codec: Box<dyn Codec>, payload_budget: usize) -> Result<Self> {
        let frames_per_packet = codec.frames_per_packet(payload_budget);
        if frames_per_packet == 0 {
            return Err(CodecError::InvalidFramesPerPacket(payload_budget).into());
        }

        let batch = FrameBatch::new(frames_per_packet, codec.channels())?;

        let mut payload = Vec::new();
        payload
            .try_reserve_exact(payload_budget)
            .map_err(|_| StreamError::Allocation(payload_budget))?;
        payload.resize(payload_budget, 0);

        tracing::debug!(
            "{} packetizer: {} frames per packet, {} byte budget",
            codec.name(),
            frames_per_packet,
            payload_budget
        );

        Ok(Self {
            codec,
            payload_budget,
            frames_per_packet,
            batch,
            payload,
            payload_len: 0,
        })
    }

    pub fn frames_per_packet(&self) -> usize {
        self.frames_per_packet
    }

    pub fn payload_budget(&self) -> usize {
        self.payload_budget
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Payload produced by the last cycle
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// Pull `frames_per_packet` frames from `source` and encode them.
    ///
    /// Underruns and stops are not encoded. Encoder failures are returned
    /// as errors and end the stream.
    pub fn encode_one(&mut self, source: &mut dyn AudioSource) -> Result<Cycle> {
        self.payload_len = 0;
        let pull = source.pull(&mut self.batch)?;
        let frames = self.batch.frames();

        let bytes = match pull {
            Pull::Full | Pull::EndOfInput if frames > 0 => {
                self.codec.encode(self.batch.samples(), &mut self.payload)?
            }
            _ => 0,
        };

        if bytes > self.payload_budget {
            return Err(CodecError::PayloadOverflow {
                written: bytes,
                budget: self.payload_budget,
            }
            .into());
        }
        self.payload_len = bytes;

        Ok(Cycle {
            pull,
            frames,
            bytes,
        })
    }
}
