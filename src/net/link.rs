//! 链路类型
//!
//! 定义单向网络链路及其发送时延计算。

use super::id::NodeId;
use crate::queue::{DropTailQueue, PacketQueue};
use crate::sim::SimTime;

/// 单向网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 是否正在序列化一个 packet（该 packet 不占用队列容量）
    pub busy: bool,
    /// 链路上的排队策略（默认 DropTail，容量极大）
    pub queue: Box<dyn PacketQueue>,
}

impl Link {
    /// 创建新链路
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            from,
            to,
            latency,
            bandwidth_bps,
            busy: false,
            queue: Box::new(DropTailQueue::new(u64::MAX)),
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        SimTime::transmit_time(bytes as u64, self.bandwidth_bps).unwrap_or(SimTime(u64::MAX / 4))
    }
}
