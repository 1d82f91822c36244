//! 传输层 endpoint
//!
//! `Endpoint` 是流量源使用的最小 socket 接口：bind / connect / send / close，
//! 以及按名称订阅状态变化。UDP 与简化 TCP 各实现一份。

use std::net::SocketAddr;

use thiserror::Error;

use crate::net::{AddrFamily, Network, NodeId, Protocol};
use crate::sim::Simulator;
use crate::trace::{EventListener, ValueListener};

pub mod tcp;
pub mod udp;

pub use tcp::{CongestionOps, NewReno, TcpConfig, TcpSocket};
pub use udp::UdpSocket;

/// IPv4 + UDP 头部字节数
pub const UDP_HEADER_BYTES: u32 = 28;
/// IPv4 + TCP 头部字节数
pub const TCP_HEADER_BYTES: u32 = 40;

/// 可订阅的 trace 源名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceSource {
    /// 拥塞窗口（字节）
    CongestionWindow,
    /// 慢启动阈值（字节）
    SlowStartThreshold,
    /// 属于该 endpoint 的数据包在网络中被丢弃
    Drop,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("node {node:?} has no {family:?} address")]
    AddressUnavailable { node: NodeId, family: AddrFamily },
    #[error("endpoint not bound")]
    NotBound,
    #[error("endpoint already connected")]
    AlreadyConnected,
    #[error("peer unreachable: {0}")]
    Unreachable(SocketAddr),
    #[error("endpoint not connected")]
    NotConnected,
    #[error("endpoint closed")]
    Closed,
    #[error("send buffer full")]
    BufferFull,
    #[error("unknown trace source: {0:?}")]
    UnknownTraceSource(TraceSource),
}

impl EndpointError {
    /// 瞬时错误：稍后重试可能成功（例如发送缓冲区满）。
    pub fn is_transient(&self) -> bool {
        matches!(self, EndpointError::BufferFull)
    }
}

/// 传输层 endpoint
pub trait Endpoint: Send + std::fmt::Debug {
    fn protocol(&self) -> Protocol;

    /// 绑定到本节点 `family` 地址族的地址和一个临时端口。
    fn bind(&mut self, family: AddrFamily, net: &mut Network) -> Result<(), EndpointError>;

    fn connect(
        &mut self,
        peer: SocketAddr,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), EndpointError>;

    /// 提交 `bytes` 字节应用数据。
    fn send(&mut self, bytes: u32, sim: &mut Simulator, net: &mut Network) -> Result<(), EndpointError>;

    /// 关闭；重复关闭无副作用。
    fn close(&mut self, sim: &mut Simulator, net: &mut Network);

    fn is_closed(&self) -> bool;

    fn local_addr(&self) -> Option<SocketAddr>;

    fn subscribe_value(
        &mut self,
        source: TraceSource,
        listener: Box<dyn ValueListener>,
        net: &mut Network,
    ) -> Result<(), EndpointError>;

    fn subscribe_event(
        &mut self,
        source: TraceSource,
        listener: Box<dyn EventListener>,
        net: &mut Network,
    ) -> Result<(), EndpointError>;
}
