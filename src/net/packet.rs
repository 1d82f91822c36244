//! 数据包类型
//!
//! 定义网络数据包及其相关操作。

use super::id::{FlowId, NodeId};
use super::transport::Transport;
use crate::sim::SimTime;

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: FlowId,
    /// 线上大小（含头部），用于发送时延与队列占用
    pub size_bytes: u32,
    pub route: Vec<NodeId>,
    pub hop: usize, // 当前所在节点在 route 中的索引
    /// 源端交给网络的时刻，用于统计时延/抖动
    pub sent_at: SimTime,
    pub transport: Transport,
}

impl Packet {
    /// 获取当前所在节点
    pub fn at(&self) -> NodeId {
        self.route[self.hop]
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }
}
