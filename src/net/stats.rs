//! 统计信息
//!
//! 定义网络仿真的全局计数（逐流统计见 `FlowMonitor`）。

/// 网络统计信息
#[derive(Debug, Default)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
}
