//! Real-time pacing for sources that are not clocked by a device
//!
//! A file decodes far faster than real time. `PacedTransport` holds each
//! packet until its timestamp is due, measured against an absolute
//! deadline from the first packet so processing time does not drift.

use std::time::{Duration, Instant};

use super::Transport;
use crate::error::NetworkError;

pub struct PacedTransport<T> {
    inner: T,
    clock_rate: u32,
    start: Option<Instant>,
    last_timestamp: u32,
    /// Ticks elapsed since the first packet, unwrapped
    elapsed_ticks: u64,
}

impl<T: Transport> PacedTransport<T> {
    pub fn new(inner: T, clock_rate: u32) -> Self {
        Self {
            inner,
            clock_rate: clock_rate.max(1),
            start: None,
            last_timestamp: 0,
            elapsed_ticks: 0,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// When a packet with `timestamp` should leave
    fn deadline(&mut self, timestamp: u32) -> Instant {
        let Some(start) = self.start else {
            let now = Instant::now();
            self.start = Some(now);
            self.last_timestamp = timestamp;
            return now;
        };

        self.elapsed_ticks += timestamp.wrapping_sub(self.last_timestamp) as u64;
        self.last_timestamp = timestamp;
        start + ticks_to_duration(self.elapsed_ticks, self.clock_rate)
    }
}

/// `ticks / rate` seconds without overflowing on long streams
fn ticks_to_duration(ticks: u64, rate: u32) -> Duration {
    let rate = rate as u64;
    Duration::from_secs(ticks / rate) + Duration::from_nanos((ticks % rate) * 1_000_000_000 / rate)
}

impl<T: Transport> Transport for PacedTransport<T> {
    fn send(&mut self, payload: &[u8], timestamp: u32) -> Result<(), NetworkError> {
        let deadline = self.deadline(timestamp);
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.inner.send(payload, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Times(Vec<Instant>);

    impl Transport for Times {
        fn send(&mut self, _payload: &[u8], _timestamp: u32) -> Result<(), NetworkError> {
            self.0.push(Instant::now());
            Ok(())
        }
    }

    #[test]
    fn test_packets_spaced_by_timestamp() {
        // 1000 Hz clock: 20 ticks = 20 ms
        let mut paced = PacedTransport::new(Times::default(), 1000);
        for i in 0..4 {
            paced.send(&[], i * 20).unwrap();
        }

        let times = &paced.inner().0;
        let total = times[3] - times[0];
        assert!(total >= Duration::from_millis(60), "{:?}", total);
        assert!(total < Duration::from_millis(500), "{:?}", total);
    }

    #[test]
    fn test_non_zero_start_and_wrap() {
        let mut paced = PacedTransport::new(Times::default(), 1000);
        let start = u32::MAX - 5;
        paced.send(&[], start).unwrap();
        paced.send(&[], start.wrapping_add(10)).unwrap();

        let times = &paced.inner().0;
        assert!(times[1] - times[0] >= Duration::from_millis(10));
        assert!(times[1] - times[0] < Duration::from_millis(500));
    }

    #[test]
    fn test_deadline_after_days_of_streaming() {
        let mut paced = PacedTransport::new(Times::default(), 48000);
        let start = Instant::now();
        paced.start = Some(start);
        paced.last_timestamp = 0;
        // About 4.45 days of 48 kHz ticks
        paced.elapsed_ticks = u64::MAX / 1_000_000_000;

        let ahead = paced.deadline(960) - start;
        // 18_446_745_033 ticks / 48000 = 384307.188 s
        assert!(ahead > Duration::from_millis(384_307_187), "{:?}", ahead);
        assert!(ahead < Duration::from_millis(384_307_189), "{:?}", ahead);
    }

    #[test]
    fn test_ticks_to_duration() {
        assert_eq!(ticks_to_duration(48000, 48000), Duration::from_secs(1));
        assert_eq!(ticks_to_duration(480, 48000), Duration::from_millis(10));
        assert_eq!(ticks_to_duration(u64::MAX, 1), Duration::from_secs(u64::MAX));
    }
}
