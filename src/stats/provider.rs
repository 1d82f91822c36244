//! 统计提供者

use std::collections::BTreeMap;

use crate::net::{FlowId, FlowMonitor, FlowStats};

/// 某一时刻所有流的统计快照
pub type FlowSnapshot = BTreeMap<FlowId, FlowStats>;

/// 统计提供者：对采样器只读。
pub trait StatsProvider {
    fn snapshot(&self) -> FlowSnapshot;
}

impl StatsProvider for FlowMonitor {
    fn snapshot(&self) -> FlowSnapshot {
        self.flows().clone()
    }
}

impl StatsProvider for FlowSnapshot {
    fn snapshot(&self) -> FlowSnapshot {
        self.clone()
    }
}
