//! Stream loop: pull, encode, send, advance the clock
//!
//! ```text
//!            ┌────────── stop flag / Pull::Stopped ──────────┐
//!            │                                               ▼
//!        RUNNING ── end of input ──▶ DRAINING ── no loop ──▶ STOPPED
//!            ▲                          │
//!            └──── rewound (looping) ───┘
//! ```
//!
//! The stop flag is checked once per iteration before pulling. An
//! iteration that has started always finishes its encode and send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::source::{AudioSource, Pull};
use crate::clock::PacketClock;
use crate::config::TimestampMode;
use crate::error::{AudioError, Error, Result};
use crate::network::Transport;
use crate::packetizer::Packetizer;

/// Cooperative cancellation shared between the signal handler, the
/// stream loop and blocking waits
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Running,
    /// End of input reached; deciding between rewinding and stopping
    Draining,
    Stopped,
}

/// Counters reported when the loop finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub frames_sent: u64,
    /// Cycles where the codec produced no output
    pub empty_cycles: u64,
    pub underruns: u64,
    /// Times the source was rewound
    pub restarts: u64,
    pub final_timestamp: u32,
}

/// Loop settings not owned by the source, codec or transport
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    pub initial_timestamp: u32,
    pub timestamp_mode: TimestampMode,
}

pub struct StreamLoop<S, T> {
    source: S,
    packetizer: Packetizer,
    transport: T,
    clock: PacketClock,
    stop: StopFlag,
    state: StreamState,
    stats: StreamStats,
    /// No frames have been read since the last rewind
    rewound: bool,
    warned_empty: bool,
}

impl<S: AudioSource, T: Transport> StreamLoop<S, T> {
    pub fn new(
        source: S,
        packetizer: Packetizer,
        transport: T,
        stop: StopFlag,
        options: LoopOptions,
    ) -> Result<Self> {
        let codec = packetizer.codec();
        if source.channels() != codec.channels() {
            return Err(AudioError::ChannelMismatch {
                source_channels: source.channels(),
                batch_channels: codec.channels(),
            }
            .into());
        }
        if source.sample_rate() != codec.sample_rate() {
            return Err(Error::Config(format!(
                "source runs at {} Hz but {} codec expects {} Hz",
                source.sample_rate(),
                codec.name(),
                codec.sample_rate()
            )));
        }

        let clock = PacketClock::new(
            options.initial_timestamp,
            source.sample_rate(),
            codec.clock_rate(),
            options.timestamp_mode,
        )?;

        Ok(Self {
            source,
            packetizer,
            transport,
            clock,
            stop,
            state: StreamState::Running,
            stats: StreamStats {
                final_timestamp: options.initial_timestamp,
                ..Default::default()
            },
            rewound: false,
            warned_empty: false,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn timestamp(&self) -> u32 {
        self.clock.timestamp()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_parts(self) -> (S, Packetizer, T) {
        (self.source, self.packetizer, self.transport)
    }

    /// Run until stopped, end of input without looping, or a fatal error
    pub fn run(&mut self) -> Result<StreamStats> {
        tracing::info!(
            "Streaming {} at {} Hz, {} frames per packet",
            self.packetizer.codec().name(),
            self.source.sample_rate(),
            self.packetizer.frames_per_packet()
        );

        while self.state != StreamState::Stopped {
            if self.stop.is_stopped() {
                tracing::info!("Stop requested");
                self.state = StreamState::Stopped;
                break;
            }
            if let Err(e) = self.step() {
                self.state = StreamState::Stopped;
                return Err(e);
            }
        }

        tracing::info!(
            "Stream stopped: {} packets, {} bytes, {} restarts, {} underruns",
            self.stats.packets_sent,
            self.stats.bytes_sent,
            self.stats.restarts,
            self.stats.underruns
        );
        Ok(self.stats)
    }

    /// One iteration of the loop
    pub fn step(&mut self) -> Result<StreamState> {
        let cycle = self
            .packetizer
            .encode_one(&mut self.source)
            .inspect_err(|e| tracing::error!("{}", cycle_failure(e)))?;

        match cycle.pull {
            Pull::Stopped => {
                self.state = StreamState::Stopped;
                return Ok(self.state);
            }
            Pull::Underrun => {
                self.stats.underruns += 1;
                tracing::warn!(
                    "Failed to read enough audio for a full packet ({} of {} frames)",
                    cycle.frames,
                    self.packetizer.frames_per_packet()
                );
                return Ok(self.state);
            }
            Pull::Full | Pull::EndOfInput => {}
        }

        if cycle.frames > 0 {
            self.rewound = false;
        }

        if cycle.bytes > 0 {
            self.transport
                .send(self.packetizer.payload(), self.clock.timestamp())
                .inspect_err(|e| tracing::error!("Failed to send packet: {}", e))?;
            self.clock.advance(cycle.frames);

            self.stats.packets_sent += 1;
            self.stats.bytes_sent += cycle.bytes as u64;
            self.stats.frames_sent += cycle.frames as u64;
            self.stats.final_timestamp = self.clock.timestamp();

            if self.stats.packets_sent % 1000 == 0 {
                tracing::debug!(
                    "{} packets sent, timestamp {}",
                    self.stats.packets_sent,
                    self.clock.timestamp()
                );
            }
        } else {
            self.stats.empty_cycles += 1;
        }

        if cycle.pull == Pull::EndOfInput {
            if cycle.frames == 0 && self.rewound && !self.warned_empty {
                tracing::warn!("Input is empty after rewinding, nothing to send");
                self.warned_empty = true;
            }
            tracing::debug!(
                "Reached end of input (wanted={}, read={})",
                self.packetizer.frames_per_packet(),
                cycle.frames
            );
            self.state = StreamState::Draining;

            if self
                .source
                .restart()
                .inspect_err(|e| tracing::error!("{}", e))?
            {
                self.stats.restarts += 1;
                self.rewound = true;
                self.state = StreamState::Running;
            } else {
                self.state = StreamState::Stopped;
            }
        }

        Ok(self.state)
    }
}

/// Fatal diagnostic for a failed pull or encode
fn cycle_failure(err: &Error) -> String {
    match err {
        Error::Codec(e) => format!("Codec encode failed: {}", e),
        Error::Audio(AudioError::Decode(e)) => format!("Failed to read from file: {}", e),
        Error::Audio(e) => format!("Failed to read audio: {}", e),
        e => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::FrameBatch;
    use crate::codec::L16Codec;
    use crate::error::{CodecError, NetworkError};

    struct Silence {
        pulls: usize,
    }

    impl AudioSource for Silence {
        fn sample_rate(&self) -> u32 {
            8000
        }
        fn channels(&self) -> u16 {
            1
        }
        fn pull(&mut self, batch: &mut FrameBatch) -> Result<Pull> {
            self.pulls += 1;
            batch.set_frames(batch.capacity_frames());
            Ok(Pull::Full)
        }
    }

    #[derive(Default)]
    struct Recorder {
        timestamps: Vec<u32>,
        fail_after: Option<usize>,
        stop_after: Option<(usize, StopFlag)>,
    }

    impl Transport for Recorder {
        fn send(&mut self, _payload: &[u8], timestamp: u32) -> std::result::Result<(), NetworkError> {
            if self.fail_after == Some(self.timestamps.len()) {
                return Err(NetworkError::SendFailed("unreachable".into()));
            }
            self.timestamps.push(timestamp);
            if let Some((n, stop)) = &self.stop_after {
                if self.timestamps.len() == *n {
                    stop.stop();
                }
            }
            Ok(())
        }
    }

    fn packetizer(budget: usize) -> Packetizer {
        Packetizer::new(Box::new(L16Codec::new(8000, 1).unwrap()), budget).unwrap()
    }

    #[test]
    fn test_stop_flag_checked_each_iteration() {
        let stop = StopFlag::new();
        let transport = Recorder {
            stop_after: Some((3, stop.clone())),
            ..Default::default()
        };
        let mut stream = StreamLoop::new(
            Silence { pulls: 0 },
            packetizer(320),
            transport,
            stop,
            LoopOptions::default(),
        )
        .unwrap();

        let stats = stream.run().unwrap();
        assert_eq!(stream.state(), StreamState::Stopped);
        assert_eq!(stats.packets_sent, 3);
        // The iteration that raised the flag still completed
        assert_eq!(stream.transport().timestamps, vec![0, 160, 320]);
        assert_eq!(stream.source().pulls, 3);
        assert_eq!(stats.final_timestamp, 480);
    }

    #[test]
    fn test_initial_timestamp() {
        let stop = StopFlag::new();
        let transport = Recorder {
            stop_after: Some((2, stop.clone())),
            ..Default::default()
        };
        let options = LoopOptions {
            initial_timestamp: 1000,
            timestamp_mode: TimestampMode::Truncate,
        };
        let mut stream =
            StreamLoop::new(Silence { pulls: 0 }, packetizer(320), transport, stop, options).unwrap();
        stream.run().unwrap();
        assert_eq!(stream.transport().timestamps, vec![1000, 1160]);
    }

    #[test]
    fn test_send_failure_is_terminal() {
        let transport = Recorder {
            fail_after: Some(2),
            ..Default::default()
        };
        let mut stream = StreamLoop::new(
            Silence { pulls: 0 },
            packetizer(320),
            transport,
            StopFlag::new(),
            LoopOptions::default(),
        )
        .unwrap();

        let err = stream.run().unwrap_err();
        assert!(matches!(err, Error::Network(NetworkError::SendFailed(_))));
        assert_eq!(stream.state(), StreamState::Stopped);
        assert_eq!(stream.stats().packets_sent, 2);
        // No retry of the failed packet
        assert_eq!(stream.source().pulls, 3);
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let codec = Box::new(L16Codec::new(8000, 2).unwrap());
        let result = StreamLoop::new(
            Silence { pulls: 0 },
            Packetizer::new(codec, 320).unwrap(),
            Recorder::default(),
            StopFlag::new(),
            LoopOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rate_mismatch_rejected() {
        let codec = Box::new(L16Codec::new(48000, 1).unwrap());
        let result = StreamLoop::new(
            Silence { pulls: 0 },
            Packetizer::new(codec, 320).unwrap(),
            Recorder::default(),
            StopFlag::new(),
            LoopOptions::default(),
        );
        assert!(matches!(result.err().unwrap(), Error::Config(_)));
    }

    #[test]
    fn test_failure_message_names_the_failing_stage() {
        let decode = Error::Audio(AudioError::Decode("truncated chunk".into()));
        assert_eq!(cycle_failure(&decode), "Failed to read from file: truncated chunk");

        let encode = Error::Codec(CodecError::EncodingFailed("bad frame".into()));
        assert_eq!(cycle_failure(&encode), "Codec encode failed: Encoding failed: bad frame");

        let mismatch = Error::Audio(AudioError::ChannelMismatch {
            source_channels: 2,
            batch_channels: 1,
        });
        assert!(cycle_failure(&mismatch).starts_with("Failed to read audio: "));
    }
}
