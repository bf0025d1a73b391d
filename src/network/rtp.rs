//! RTP packet formatting and UDP transmission

use bytes::{BufMut, BytesMut};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use super::Transport;
use crate::config::NetworkConfig;
use crate::constants::{MAX_PACKET_SIZE, RTP_HEADER_SIZE};
use crate::error::NetworkError;

/// RTP header (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Marker bit, set on the first packet of a talkspurt
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    pub const VERSION: u8 = 2;

    /// Serialize to 12 bytes.
    pub fn serialize(&self) -> [u8; RTP_HEADER_SIZE] {
        let mut buf = [0u8; RTP_HEADER_SIZE];

        // Byte 0: V(2) P(1) X(1) CC(4)
        buf[0] = Self::VERSION << 6;

        // Byte 1: M(1) PT(7)
        buf[1] = ((self.marker as u8) << 7) | (self.payload_type & 0x7F);

        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        buf
    }

    /// Parse from bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < RTP_HEADER_SIZE || data[0] >> 6 != Self::VERSION {
            return None;
        }

        Some(Self {
            marker: data[1] >> 7 != 0,
            payload_type: data[1] & 0x7F,
            sequence: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }
}

/// Sender statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
}

/// Send-only RTP session over UDP
pub struct RtpSender {
    socket: UdpSocket,
    remote: SocketAddr,
    payload_type: u8,
    ssrc: u32,
    sequence: u16,
    first_packet: bool,
    packet: BytesMut,
    stats: SenderStats,
}

/// Resolve the configured address and even port
pub fn resolve_destination(config: &NetworkConfig) -> Result<SocketAddr, NetworkError> {
    (config.address.as_str(), config.even_port())
        .to_socket_addrs()
        .map_err(|e| NetworkError::InvalidAddress(format!("{}: {}", config.address, e)))?
        .next()
        .ok_or_else(|| NetworkError::InvalidAddress(config.address.clone()))
}

impl RtpSender {
    /// Open a session to the destination named in `config`
    pub fn from_config(config: &NetworkConfig, payload_type: u8) -> Result<Self, NetworkError> {
        let remote = resolve_destination(config)?;
        let payload_type = config.payload_type.unwrap_or(payload_type);
        Self::connect(remote, payload_type, config.ssrc, config.ttl, config.dscp)
    }

    pub fn connect(
        remote: SocketAddr,
        payload_type: u8,
        ssrc: Option<u32>,
        ttl: Option<u32>,
        dscp: Option<u8>,
    ) -> Result<Self, NetworkError> {
        let setup = |what: &str, e: std::io::Error| NetworkError::SocketSetup(format!("{}: {}", what, e));

        let socket = Socket::new(Domain::for_address(remote), Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| setup("socket", e))?;

        let local: SocketAddr = match remote.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        socket.bind(&SockAddr::from(local)).map_err(|e| setup("bind", e))?;

        if let Some(ttl) = ttl {
            let result = match remote.ip() {
                IpAddr::V4(ip) if ip.is_multicast() => socket.set_multicast_ttl_v4(ttl),
                IpAddr::V6(ip) if ip.is_multicast() => socket.set_multicast_hops_v6(ttl),
                _ => socket.set_ttl(ttl),
            };
            result.map_err(|e| setup("ttl", e))?;
        }

        if let Some(dscp) = dscp {
            // TOS byte is DSCP (6 bits) + ECN (2 bits)
            if remote.is_ipv4() {
                socket
                    .set_tos((dscp as u32) << 2)
                    .map_err(|e| setup("dscp", e))?;
            } else {
                tracing::warn!("DSCP is only applied to IPv4 destinations");
            }
        }

        socket.connect(&SockAddr::from(remote)).map_err(|e| setup("connect", e))?;

        let random = uuid::Uuid::new_v4();
        let (rand_ssrc, rand_seq, _, _) = random.as_fields();
        let ssrc = ssrc.unwrap_or(rand_ssrc);

        tracing::info!("Remote address: {}", remote);
        tracing::info!("Sending SSRC: 0x{:08x}, payload type {}", ssrc, payload_type);

        Ok(Self {
            socket: socket.into(),
            remote,
            payload_type,
            ssrc,
            sequence: rand_seq,
            first_packet: true,
            packet: BytesMut::with_capacity(MAX_PACKET_SIZE),
            stats: SenderStats::default(),
        })
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }
}

impl Transport for RtpSender {
    fn send(&mut self, payload: &[u8], timestamp: u32) -> Result<(), NetworkError> {
        let size = RTP_HEADER_SIZE + payload.len();
        if size > MAX_PACKET_SIZE {
            return Err(NetworkError::PacketTooLarge(size));
        }

        let header = RtpHeader {
            marker: self.first_packet,
            payload_type: self.payload_type,
            sequence: self.sequence,
            timestamp,
            ssrc: self.ssrc,
        };

        self.packet.clear();
        self.packet.put_slice(&header.serialize());
        self.packet.put_slice(payload);

        self.socket
            .send(&self.packet)
            .map_err(|e| NetworkError::SendFailed(e.to_string()))?;

        self.first_packet = false;
        self.sequence = self.sequence.wrapping_add(1);
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;
        Ok(())
    }
}
