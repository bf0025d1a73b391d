//! Audio sources feeding the packetizer
//!
//! Both source shapes sit behind `AudioSource::pull`, which fills a
//! `FrameBatch` from the caller's point of view synchronously: the live
//! source blocks on its ring, the file source decodes directly.

use std::time::Duration;

use crate::audio::buffer::{FrameBatch, RingConsumer, SAMPLE_BYTES};
use crate::audio::file::FileDecoder;
use crate::error::{AudioError, Error, Result};
use crate::stream::StopFlag;

/// Result of one `pull`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// The batch is full
    Full,
    /// Input ended; the batch holds the remaining frames, possibly none
    EndOfInput,
    /// Fewer frames than requested arrived; the batch must not be sent
    Underrun,
    /// A stop was requested while waiting for audio
    Stopped,
}

/// A producer of interleaved f32 audio frames
pub trait AudioSource: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Fill `batch` with up to its capacity in frames
    fn pull(&mut self, batch: &mut FrameBatch) -> Result<Pull>;

    /// Called after `Pull::EndOfInput`. Returns `true` if the source
    /// rewound and can be pulled again.
    fn restart(&mut self) -> Result<bool> {
        Ok(false)
    }
}

impl<A: AudioSource + ?Sized> AudioSource for Box<A> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn channels(&self) -> u16 {
        (**self).channels()
    }

    fn pull(&mut self, batch: &mut FrameBatch) -> Result<Pull> {
        (**self).pull(batch)
    }

    fn restart(&mut self) -> Result<bool> {
        (**self).restart()
    }
}

fn check_channels(source_channels: u16, batch: &FrameBatch) -> Result<()> {
    if source_channels != batch.channels() {
        return Err(AudioError::ChannelMismatch {
            source_channels,
            batch_channels: batch.channels(),
        }
        .into());
    }
    Ok(())
}

/// Audio pushed asynchronously by a capture callback into an `AudioRing`
pub struct LiveSource {
    consumer: RingConsumer,
    sample_rate: u32,
    channels: u16,
    stop: StopFlag,
    check_interval: Duration,
}

impl LiveSource {
    pub fn new(
        consumer: RingConsumer,
        sample_rate: u32,
        channels: u16,
        stop: StopFlag,
        check_interval: Duration,
    ) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            stop,
            check_interval,
        }
    }

    pub fn consumer(&self) -> &RingConsumer {
        &self.consumer
    }
}

impl AudioSource for LiveSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn pull(&mut self, batch: &mut FrameBatch) -> Result<Pull> {
        check_channels(self.channels, batch)?;
        let wanted = batch.capacity_bytes();
        let capacity = self.consumer.ring().capacity();
        if wanted > capacity {
            return Err(Error::Config(format!(
                "ring buffer of {} bytes cannot hold a {} byte packet",
                capacity, wanted
            )));
        }

        if !self.consumer.wait_for_readable(wanted, &self.stop, self.check_interval) {
            batch.clear();
            return Ok(Pull::Stopped);
        }

        let bytes = self.consumer.read(batch.buffer_mut());
        batch.set_frames(bytes / (SAMPLE_BYTES * self.channels as usize));

        if bytes < wanted {
            Ok(Pull::Underrun)
        } else {
            Ok(Pull::Full)
        }
    }
}

/// Audio pulled synchronously from a file decoder
pub struct FileSource<D> {
    decoder: D,
    looping: bool,
}

impl<D: FileDecoder> FileSource<D> {
    pub fn new(decoder: D, looping: bool) -> Self {
        Self { decoder, looping }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn into_decoder(self) -> D {
        self.decoder
    }
}

impl<D: FileDecoder> AudioSource for FileSource<D> {
    fn sample_rate(&self) -> u32 {
        self.decoder.sample_rate()
    }

    fn channels(&self) -> u16 {
        self.decoder.channels()
    }

    fn pull(&mut self, batch: &mut FrameBatch) -> Result<Pull> {
        check_channels(self.decoder.channels(), batch)?;
        let wanted = batch.capacity_frames();

        let frames = self.decoder.read_frames(batch.buffer_mut())?;
        batch.set_frames(frames);

        if frames < wanted {
            Ok(Pull::EndOfInput)
        } else {
            Ok(Pull::Full)
        }
    }

    fn restart(&mut self) -> Result<bool> {
        if !self.looping {
            return Ok(false);
        }
        self.decoder.seek_to_start()?;
        Ok(true)
    }
}
