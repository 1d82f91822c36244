//! Transport-layer tags carried by packets.

use super::id::ConnId;

/// Packet transport metadata.
///
/// `Packet` is a network-layer carrier; transport tags let the TCP stack react to
/// deliveries and drops without the network knowing protocol internals.
#[derive(Debug, Clone)]
pub enum Transport {
    /// UDP datagram; `seq` is the sender's datagram counter.
    Udp { seq: u64 },
    /// TCP segment belonging to connection `conn`.
    Tcp { conn: ConnId, seg: TcpSegment },
}

/// TCP segment (minimal fields for simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSegment {
    /// Data segment: `seq` is byte sequence number, `len` is payload bytes.
    Data { seq: u64, len: u32 },
    /// ACK segment: `ack` is next expected byte (cumulative).
    Ack { ack: u64 },
}
