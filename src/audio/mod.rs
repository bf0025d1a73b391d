//! Audio subsystem module

pub mod buffer;
#[cfg(feature = "live")]
pub mod capture;
#[cfg(feature = "live")]
pub mod device;
pub mod file;
pub mod source;

pub use buffer::{AudioRing, FrameBatch, RingConsumer, RingProducer};
#[cfg(feature = "live")]
pub use capture::LiveCapture;
#[cfg(feature = "live")]
pub use device::{find_input_device, list_input_devices, AudioDevice};
pub use file::{FileDecoder, FileInfo, WavDecoder};
pub use source::{AudioSource, FileSource, LiveSource, Pull};
