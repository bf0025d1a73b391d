//! RTP timestamp tracking
//!
//! The timestamp advances by the samples actually consumed, scaled from
//! the source sample rate to the transport clock rate. It is a 32-bit
//! value that wraps.

use crate::config::TimestampMode;
use crate::error::StreamError;

#[derive(Debug, Clone)]
pub struct PacketClock {
    timestamp: u32,
    source_rate: u32,
    clock_rate: u32,
    mode: TimestampMode,
    /// Carried `samples * clock_rate mod source_rate`, only in carry mode
    remainder: u64,
}

impl PacketClock {
    pub fn new(
        initial: u32,
        source_rate: u32,
        clock_rate: u32,
        mode: TimestampMode,
    ) -> Result<Self, StreamError> {
        if source_rate == 0 {
            return Err(StreamError::ZeroSampleRate);
        }
        Ok(Self {
            timestamp: initial,
            source_rate,
            clock_rate,
            mode,
            remainder: 0,
        })
    }

    /// Timestamp for the next packet
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Account for a sent packet carrying `samples` frames.
    ///
    /// Truncate mode: `floor(samples * clock_rate / source_rate)` per call.
    /// Carry mode: the division remainder is kept for the next call so
    /// the long-run rate is exact.
    pub fn advance(&mut self, samples: usize) -> u32 {
        let scaled = samples as u64 * self.clock_rate as u64;
        let increment = match self.mode {
            TimestampMode::Truncate => scaled / self.source_rate as u64,
            TimestampMode::Carry => {
                let total = scaled + self.remainder;
                self.remainder = total % self.source_rate as u64;
                total / self.source_rate as u64
            }
        };

        // Wrapping is part of RTP timestamp semantics
        self.timestamp = self.timestamp.wrapping_add(increment as u32);
        increment as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_advances_by_samples() {
        let mut clock = PacketClock::new(0, 48000, 48000, TimestampMode::Truncate).unwrap();
        assert_eq!(clock.advance(960), 960);
        assert_eq!(clock.timestamp(), 960);
    }

    #[test]
    fn test_truncating_rate_conversion() {
        let mut clock = PacketClock::new(0, 44100, 8000, TimestampMode::Truncate).unwrap();
        assert_eq!(clock.advance(220), 39);

        // 220 * 8000 / 44100 = 39.909...; the fraction is lost every packet
        for _ in 0..99 {
            clock.advance(220);
        }
        assert_eq!(clock.timestamp(), 3900);
    }

    #[test]
    fn test_carry_mode_keeps_remainder() {
        let mut clock = PacketClock::new(0, 44100, 8000, TimestampMode::Carry).unwrap();
        assert_eq!(clock.advance(220), 39);
        // Remainder 40100 from the first packet pushes the second over
        assert_eq!(clock.advance(220), 40);
        assert_eq!(clock.advance(220), 40);

        let mut clock = PacketClock::new(0, 44100, 8000, TimestampMode::Carry).unwrap();
        for _ in 0..100 {
            clock.advance(220);
        }
        // floor(22000 * 8000 / 44100) = 3990
        assert_eq!(clock.timestamp(), 3990);
    }

    #[test]
    fn test_initial_value_and_wrap() {
        let mut clock = PacketClock::new(u32::MAX - 100, 48000, 48000, TimestampMode::Truncate).unwrap();
        clock.advance(960);
        assert_eq!(clock.timestamp(), 859);
    }

    #[test]
    fn test_zero_source_rate_rejected() {
        assert!(PacketClock::new(0, 0, 8000, TimestampMode::Carry).is_err());
    }
}
