//! Live audio capture into the ring buffer
//!
//! The cpal stream lives on a dedicated thread. Its data callback only
//! copies samples into the `RingProducer` (which wakes the consumer) and
//! never blocks or logs.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::RingProducer;
use crate::audio::device::AudioDevice;
use crate::error::AudioError;

/// Captures one input device into an `AudioRing`
pub struct LiveCapture {
    device: Option<AudioDevice>,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Total samples delivered by the device
    samples_captured: Arc<AtomicU64>,

    config: StreamConfig,
}

impl LiveCapture {
    pub fn new(device: AudioDevice, sample_rate: u32, channels: u16) -> Self {
        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Self {
            device: Some(device),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            error_rx: None,
            samples_captured: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Start delivering audio into `producer`
    pub fn start(&mut self, mut producer: RingProducer) -> Result<(), AudioError> {
        let device = self
            .device
            .take()
            .ok_or_else(|| AudioError::StreamError("capture already started".to_string()))?;
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let samples_captured = self.samples_captured.clone();
        let config = self.config.clone();
        let stream_error_tx = error_tx.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name(format!("capture-{}", device.name))
            .spawn(move || {
                let cpal_device = device.into_inner();

                let stream = cpal_device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        samples_captured.fetch_add(data.len() as u64, Ordering::Relaxed);
                        producer.write(data);
                    },
                    move |err| {
                        let _ = stream_error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = error_tx.try_send(AudioError::CpalError(e.to_string()));
                            return;
                        }

                        while running.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        let _ = error_tx.try_send(AudioError::CpalError(e.to_string()));
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        tracing::info!(
            "Capture started: {} Hz, {} channels",
            self.config.sample_rate.0,
            self.config.channels
        );
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Get total samples captured
    pub fn samples_captured(&self) -> u64 {
        self.samples_captured.load(Ordering::Relaxed)
    }

    /// Take the error channel, for a watcher that turns stream errors
    /// into a stop request
    pub fn take_errors(&mut self) -> Option<Receiver<AudioError>> {
        self.error_rx.take()
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
