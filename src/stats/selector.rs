//! 逐流计数的选择与聚合规则
//!
//! 用流 id 集合或协议选流，用命名的计数器（及丢包原因）选值，而不是依赖
//! 外部集合中的位置下标。快照里缺失的流、未出现过的丢包原因都按 0 计。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::provider::FlowSnapshot;
use crate::net::{DropReason, FlowId, FlowStats, Protocol};

/// 参与聚合的流
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FlowFilter {
    All,
    Ids(BTreeSet<FlowId>),
    Protocol(Protocol),
}

/// 每条流上取的计数器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reasons", rename_all = "snake_case")]
pub enum Counter {
    Dropped(Vec<DropReason>),
    DroppedBytes(Vec<DropReason>),
    TxPackets,
    TxBytes,
    RxPackets,
    RxBytes,
    LostPackets,
}

/// 选择器：对选中流的选中计数求和
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSelector {
    pub flows: FlowFilter,
    pub counter: Counter,
}

impl FlowSelector {
    /// 队列溢出（设备队列 + qdisc）丢包数
    pub fn queue_drops(flows: FlowFilter) -> Self {
        Self {
            flows,
            counter: Counter::Dropped(vec![DropReason::Queue, DropReason::QueueDisc]),
        }
    }

    fn matches(&self, id: FlowId, stats: &FlowStats) -> bool {
        match &self.flows {
            FlowFilter::All => true,
            FlowFilter::Ids(ids) => ids.contains(&id),
            FlowFilter::Protocol(p) => stats.tuple.protocol == *p,
        }
    }

    fn value(&self, stats: &FlowStats) -> u64 {
        match &self.counter {
            Counter::Dropped(reasons) => reasons.iter().map(|r| stats.dropped(*r)).sum(),
            Counter::DroppedBytes(reasons) => {
                reasons.iter().map(|r| stats.dropped_bytes_for(*r)).sum()
            }
            Counter::TxPackets => stats.tx_packets,
            Counter::TxBytes => stats.tx_bytes,
            Counter::RxPackets => stats.rx_packets,
            Counter::RxBytes => stats.rx_bytes,
            Counter::LostPackets => stats.lost_packets(),
        }
    }

    /// 纯函数：同一快照总得到同一结果。
    pub fn aggregate(&self, snapshot: &FlowSnapshot) -> u64 {
        snapshot
            .iter()
            .filter(|(id, stats)| self.matches(**id, stats))
            .map(|(_, stats)| self.value(stats))
            .fold(0u64, u64::saturating_add)
    }
}
