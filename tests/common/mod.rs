//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rtp_audio_cast::audio::{AudioSource, FileDecoder, FileInfo, FrameBatch, Pull};
use rtp_audio_cast::codec::Codec;
use rtp_audio_cast::error::{AudioError, CodecError, NetworkError};
use rtp_audio_cast::network::Transport;
use rtp_audio_cast::StopFlag;

/// Mono decoder over `total` frames where frame `i` holds `i / total`.
/// Every read's returned frame count is logged.
pub struct CountingDecoder {
    pub total: usize,
    pub pos: usize,
    pub sample_rate: u32,
    pub reads: Arc<Mutex<Vec<usize>>>,
    /// Zero-based read call that returns a decode error
    pub fail_read_at: Option<usize>,
    pub fail_seek: bool,
}

impl CountingDecoder {
    pub fn new(total: usize, sample_rate: u32) -> Self {
        Self {
            total,
            pos: 0,
            sample_rate,
            reads: Arc::new(Mutex::new(Vec::new())),
            fail_read_at: None,
            fail_seek: false,
        }
    }
}

impl FileDecoder for CountingDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }

    fn info(&self) -> FileInfo {
        FileInfo {
            sample_rate: self.sample_rate,
            channels: 1,
            frames: Some(self.total as u64),
            format: "counter".to_string(),
        }
    }

    fn read_frames(&mut self, out: &mut [f32]) -> Result<usize, AudioError> {
        if self.fail_read_at == Some(self.reads.lock().unwrap().len()) {
            return Err(AudioError::Decode("corrupt data chunk".into()));
        }
        let n = out.len().min(self.total - self.pos);
        for (i, sample) in out[..n].iter_mut().enumerate() {
            *sample = (self.pos + i) as f32 / self.total as f32;
        }
        self.pos += n;
        self.reads.lock().unwrap().push(n);
        Ok(n)
    }

    fn seek_to_start(&mut self) -> Result<(), AudioError> {
        if self.fail_seek {
            return Err(AudioError::SeekFailed("stream is not seekable".into()));
        }
        self.pos = 0;
        Ok(())
    }
}

/// Records every packet; optionally raises a stop flag after `stop_after`
/// packets
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub packets: Arc<Mutex<Vec<(u32, Vec<u8>)>>>,
    pub stop_after: Option<(usize, StopFlag)>,
}

impl RecordingTransport {
    pub fn stopping_after(n: usize, stop: &StopFlag) -> Self {
        Self {
            packets: Default::default(),
            stop_after: Some((n, stop.clone())),
        }
    }

    pub fn timestamps(&self) -> Vec<u32> {
        self.packets.lock().unwrap().iter().map(|(ts, _)| *ts).collect()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.packets.lock().unwrap().iter().map(|(_, p)| p.len()).collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, payload: &[u8], timestamp: u32) -> Result<(), NetworkError> {
        let mut packets = self.packets.lock().unwrap();
        packets.push((timestamp, payload.to_vec()));
        if let Some((n, stop)) = &self.stop_after {
            if packets.len() >= *n {
                stop.stop();
            }
        }
        Ok(())
    }
}

/// Two bytes per frame, but output only on every second call
pub struct AlternatingCodec {
    pub sample_rate: u32,
    pub calls: usize,
}

impl Codec for AlternatingCodec {
    fn name(&self) -> &str {
        "alternating"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }

    fn payload_type(&self) -> u8 {
        96
    }

    fn clock_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frames_per_packet(&self, payload_budget: usize) -> usize {
        payload_budget / 2
    }

    fn encode(&mut self, input: &[f32], out: &mut [u8]) -> Result<usize, CodecError> {
        self.calls += 1;
        if self.calls % 2 == 1 {
            return Ok(0);
        }
        let n = input.len() * 2;
        out[..n].fill(0xAB);
        Ok(n)
    }
}

/// Mono 8 kHz source replaying a fixed sequence of pull outcomes.
///
/// `Full` fills the batch, `Underrun` half of it. Once the script runs
/// out every pull reports `Stopped`.
pub struct ScriptedSource {
    pub script: VecDeque<Pull>,
    pub pulls: usize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Pull>) -> Self {
        Self {
            script: script.into_iter().collect(),
            pulls: 0,
        }
    }
}

impl AudioSource for ScriptedSource {
    fn sample_rate(&self) -> u32 {
        8000
    }

    fn channels(&self) -> u16 {
        1
    }

    fn pull(&mut self, batch: &mut FrameBatch) -> rtp_audio_cast::Result<Pull> {
        self.pulls += 1;
        let pull = self.script.pop_front().unwrap_or(Pull::Stopped);
        batch.buffer_mut().fill(0.5);
        let frames = match pull {
            Pull::Full => batch.capacity_frames(),
            Pull::Underrun => batch.capacity_frames() / 2,
            Pull::EndOfInput | Pull::Stopped => 0,
        };
        batch.set_frames(frames);
        Ok(pull)
    }
}
