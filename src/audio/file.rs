//! File decoding for the file source
//!
//! WAV files are decoded with `hound`. Integer PCM is scaled to
//! `[-1.0, 1.0)` f32; float files pass through unchanged.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::AudioError;

/// Decoder interface used by `FileSource`
pub trait FileDecoder: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    fn info(&self) -> FileInfo;

    /// Decode up to `out.len() / channels` interleaved frames.
    ///
    /// Returns the number of frames written; fewer than requested only at
    /// end of stream.
    fn read_frames(&mut self, out: &mut [f32]) -> Result<usize, AudioError>;

    fn seek_to_start(&mut self) -> Result<(), AudioError>;
}

/// Description of an opened input file
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Total frames, if the container reports them
    pub frames: Option<u64>,
    /// Human readable format, e.g. "WAV, 16-bit PCM"
    pub format: String,
}

impl FileInfo {
    /// Duration as "Xmin Y.Ysec", or "Unknown"
    pub fn duration_string(&self) -> String {
        match self.frames {
            Some(frames) if frames > 0 && self.sample_rate > 0 => {
                let total = frames as f64 / self.sample_rate as f64;
                let minutes = (total / 60.0).floor();
                format!("{}min {:.1}sec", minutes as u64, total - minutes * 60.0)
            }
            _ => "Unknown".to_string(),
        }
    }

    pub fn channels_name(&self) -> String {
        match self.channels {
            1 => "Mono".to_string(),
            2 => "Stereo".to_string(),
            n => n.to_string(),
        }
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input Format: {}", self.format)?;
        writeln!(f, "Input Sample Rate: {} Hz", self.sample_rate)?;
        writeln!(f, "Input Channels: {}", self.channels_name())?;
        write!(f, "Input Duration: {}", self.duration_string())
    }
}

/// WAV decoder backed by `hound`
pub struct WavDecoder {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    frames: u32,
}

impl WavDecoder {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)
            .map_err(|e| AudioError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();

        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} Hz, {} channels",
                spec.sample_rate, spec.channels
            )));
        }
        if spec.sample_format == hound::SampleFormat::Int
            && (spec.bits_per_sample == 0 || spec.bits_per_sample > 32)
        {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit PCM",
                spec.bits_per_sample
            )));
        }

        let frames = reader.duration();
        tracing::debug!("Opened {} ({} frames)", path.display(), frames);

        Ok(Self {
            reader,
            spec,
            frames,
        })
    }
}

impl FileDecoder for WavDecoder {
    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn channels(&self) -> u16 {
        self.spec.channels
    }

    fn info(&self) -> FileInfo {
        let encoding = match self.spec.sample_format {
            hound::SampleFormat::Float => format!("{}-bit float", self.spec.bits_per_sample),
            hound::SampleFormat::Int => format!("{}-bit PCM", self.spec.bits_per_sample),
        };
        FileInfo {
            sample_rate: self.spec.sample_rate,
            channels: self.spec.channels,
            frames: Some(self.frames as u64),
            format: format!("WAV, {}", encoding),
        }
    }

    fn read_frames(&mut self, out: &mut [f32]) -> Result<usize, AudioError> {
        let channels = self.spec.channels as usize;
        let wanted = (out.len() / channels) * channels;
        let mut filled = 0;

        match self.spec.sample_format {
            hound::SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(wanted) {
                    out[filled] = sample.map_err(|e| AudioError::Decode(e.to_string()))?;
                    filled += 1;
                }
            }
            hound::SampleFormat::Int => {
                let scale = (1u64 << (self.spec.bits_per_sample - 1)) as f32;
                for sample in self.reader.samples::<i32>().take(wanted) {
                    let value = sample.map_err(|e| AudioError::Decode(e.to_string()))?;
                    out[filled] = value as f32 / scale;
                    filled += 1;
                }
            }
        }

        // A trailing partial frame is dropped
        Ok(filled / channels)
    }

    fn seek_to_start(&mut self) -> Result<(), AudioError> {
        self.reader
            .seek(0)
            .map_err(|e| AudioError::SeekFailed(e.to_string()))
    }
}
