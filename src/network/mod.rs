//! Network subsystem for RTP audio transport

pub mod pacing;
pub mod rtp;

pub use pacing::PacedTransport;
pub use rtp::{resolve_destination, RtpHeader, RtpSender, SenderStats};

use crate::error::NetworkError;

/// Sends one encoded payload stamped with an RTP timestamp
pub trait Transport: Send {
    fn send(&mut self, payload: &[u8], timestamp: u32) -> Result<(), NetworkError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, payload: &[u8], timestamp: u32) -> Result<(), NetworkError> {
        (**self).send(payload, timestamp)
    }
}
