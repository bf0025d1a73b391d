//! Audio ring buffer and frame batches
//!
//! `AudioRing` is a single-producer single-consumer (SPSC) ring of
//! interleaved f32 samples that decouples the real-time capture callback
//! from the encoder loop. Space is reported in bytes.
//!
//! The store is a fixed array of atomic slots with two cursors. The
//! producer only moves the write cursor and the consumer only moves the
//! read cursor, so the data copy needs no lock. A condition variable is
//! used purely to wake a blocked consumer after each write.
//!
//! Overflow policy: `write` copies as many samples as fit, returns the
//! number of bytes accepted and counts the dropped remainder.

use crossbeam::utils::CachePadded;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StreamError;
use crate::stream::StopFlag;

/// Bytes per stored sample
pub const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Shared ring state. Only reachable through the producer/consumer halves.
pub struct AudioRing {
    slots: Box<[AtomicU32]>,
    /// Capacity in samples
    capacity: usize,
    /// Cursors run over `0..2*capacity` so full and empty are distinct
    write_pos: CachePadded<AtomicUsize>,
    read_pos: CachePadded<AtomicUsize>,
    wait_lock: Mutex<()>,
    data_ready: Condvar,
    overflow_count: AtomicUsize,
}

impl AudioRing {
    /// Create a ring holding `capacity_bytes` of audio, split into its
    /// producer and consumer halves
    pub fn with_capacity_bytes(
        capacity_bytes: usize,
    ) -> Result<(RingProducer, RingConsumer), StreamError> {
        let capacity = capacity_bytes / SAMPLE_BYTES;
        if capacity == 0 {
            return Err(StreamError::Allocation(capacity_bytes));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| StreamError::Allocation(capacity_bytes))?;
        slots.resize_with(capacity, || AtomicU32::new(0));

        let ring = Arc::new(Self {
            slots: slots.into_boxed_slice(),
            capacity,
            write_pos: CachePadded::new(AtomicUsize::new(0)),
            read_pos: CachePadded::new(AtomicUsize::new(0)),
            wait_lock: Mutex::new(()),
            data_ready: Condvar::new(),
            overflow_count: AtomicUsize::new(0),
        });

        Ok((
            RingProducer { ring: ring.clone() },
            RingConsumer { ring },
        ))
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity * SAMPLE_BYTES
    }

    /// Bytes available to the consumer
    pub fn readable_space(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        self.used(write, read) * SAMPLE_BYTES
    }

    /// Bytes available to the producer
    pub fn writable_space(&self) -> usize {
        self.capacity() - self.readable_space()
    }

    /// Samples dropped because the ring was full
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    fn used(&self, write: usize, read: usize) -> usize {
        (write + 2 * self.capacity - read) % (2 * self.capacity)
    }

    fn advance(&self, pos: usize, by: usize) -> usize {
        (pos + by) % (2 * self.capacity)
    }
}

/// Writing half, owned by the capture callback
pub struct RingProducer {
    ring: Arc<AudioRing>,
}

impl RingProducer {
    /// Append samples and wake the consumer. Never blocks.
    ///
    /// Returns the number of bytes accepted; anything beyond the writable
    /// space is dropped and counted as overflow.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let ring = &*self.ring;
        let write = ring.write_pos.load(Ordering::Relaxed);
        let read = ring.read_pos.load(Ordering::Acquire);
        let free = ring.capacity - ring.used(write, read);
        let n = samples.len().min(free);

        for (i, sample) in samples[..n].iter().enumerate() {
            let index = ring.advance(write, i) % ring.capacity;
            ring.slots[index].store(sample.to_bits(), Ordering::Relaxed);
        }
        ring.write_pos.store(ring.advance(write, n), Ordering::Release);

        if n < samples.len() {
            ring.overflow_count.fetch_add(samples.len() - n, Ordering::Relaxed);
        }

        ring.data_ready.notify_one();
        n * SAMPLE_BYTES
    }
}

/// Reading half, owned by the stream loop
pub struct RingConsumer {
    ring: Arc<AudioRing>,
}

impl RingConsumer {
    /// Move up to `out.len()` samples out of the ring.
    ///
    /// Returns the number of bytes read, which is less than requested
    /// when the ring holds less. Nothing is padded.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let ring = &*self.ring;
        let read = ring.read_pos.load(Ordering::Relaxed);
        let write = ring.write_pos.load(Ordering::Acquire);
        let n = out.len().min(ring.used(write, read));

        for (i, sample) in out[..n].iter_mut().enumerate() {
            let index = ring.advance(read, i) % ring.capacity;
            *sample = f32::from_bits(ring.slots[index].load(Ordering::Relaxed));
        }
        ring.read_pos.store(ring.advance(read, n), Ordering::Release);

        n * SAMPLE_BYTES
    }

    /// Block until at least `min_bytes` are readable or `stop` is raised.
    ///
    /// The producer does not take the wait lock, so a wake-up can be
    /// missed; every wait is bounded by `interval` and the space is
    /// re-checked after each wake. Returns `false` when stopped.
    pub fn wait_for_readable(&self, min_bytes: usize, stop: &StopFlag, interval: Duration) -> bool {
        if self.ring.readable_space() >= min_bytes {
            return true;
        }

        let mut guard = self.ring.wait_lock.lock();
        loop {
            if self.ring.readable_space() >= min_bytes {
                return true;
            }
            if stop.is_stopped() {
                return false;
            }
            self.ring.data_ready.wait_for(&mut guard, interval);
        }
    }

    pub fn ring(&self) -> &AudioRing {
        &self.ring
    }
}

/// One packetization cycle's worth of interleaved frames
#[derive(Debug, Clone)]
pub struct FrameBatch {
    samples: Vec<f32>,
    channels: u16,
    frames: usize,
}

impl FrameBatch {
    /// Allocate room for `capacity_frames` frames of `channels` samples
    pub fn new(capacity_frames: usize, channels: u16) -> Result<Self, StreamError> {
        let len = capacity_frames * channels as usize;
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(len)
            .map_err(|_| StreamError::Allocation(len * SAMPLE_BYTES))?;
        samples.resize(len, 0.0);
        Ok(Self {
            samples,
            channels,
            frames: 0,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames the batch can hold
    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Frames currently filled
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Size of a full batch in bytes
    pub fn capacity_bytes(&self) -> usize {
        self.samples.len() * SAMPLE_BYTES
    }

    /// Filled samples
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.frames * self.channels as usize]
    }

    /// The whole backing store, for sources to fill
    pub fn buffer_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity_frames());
    }

    pub fn clear(&mut self) {
        self.frames = 0;
    }
}
