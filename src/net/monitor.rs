//! 流监视器（FlowMonitor）
//!
//! 按五元组把 packet 归类为流，并记录每条流的发送/接收/丢包计数、
//! 首末收发时间、时延与抖动累计。仿真期间由网络写入，对采样器只读。

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::FlowId;
use crate::sim::SimTime;

/// 传输层协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// 流分类用的五元组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiveTuple {
    pub src: SocketAddr,
    pub dst: SocketAddr,
    pub protocol: Protocol,
}

impl FiveTuple {
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
            protocol: self.protocol,
        }
    }
}

/// 丢包原因。`index()` 即该原因在 `FlowStats::dropped_packets` 中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoRoute,
    TtlExpire,
    BadChecksum,
    /// 设备队列（DropTail）溢出
    Queue,
    /// 队列规则（qdisc）丢弃
    QueueDisc,
    InterfaceDown,
    RouteError,
    FragmentTimeout,
}

impl DropReason {
    pub const ALL: [DropReason; 8] = [
        DropReason::NoRoute,
        DropReason::TtlExpire,
        DropReason::BadChecksum,
        DropReason::Queue,
        DropReason::QueueDisc,
        DropReason::InterfaceDown,
        DropReason::RouteError,
        DropReason::FragmentTimeout,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 单条流的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStats {
    pub tuple: FiveTuple,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    /// 按 `DropReason::index()` 排列的丢包数；只增长到出现过的最大原因
    pub dropped_packets: Vec<u64>,
    pub dropped_bytes: Vec<u64>,
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    pub delay_sum: SimTime,
    pub jitter_sum: SimTime,
    #[serde(skip)]
    last_delay: Option<SimTime>,
}

impl FlowStats {
    pub fn new(tuple: FiveTuple) -> Self {
        Self {
            tuple,
            tx_packets: 0,
            tx_bytes: 0,
            rx_packets: 0,
            rx_bytes: 0,
            dropped_packets: Vec::new(),
            dropped_bytes: Vec::new(),
            first_tx: None,
            last_tx: None,
            first_rx: None,
            last_rx: None,
            delay_sum: SimTime::ZERO,
            jitter_sum: SimTime::ZERO,
            last_delay: None,
        }
    }

    /// 某个原因的丢包数；未出现过的原因为 0。
    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.dropped_packets.get(reason.index()).copied().unwrap_or(0)
    }

    pub fn dropped_bytes_for(&self, reason: DropReason) -> u64 {
        self.dropped_bytes.get(reason.index()).copied().unwrap_or(0)
    }

    /// 已发送但既未收到也未计为丢包的数量（仍在途或被静默丢弃）
    pub fn lost_packets(&self) -> u64 {
        let dropped: u64 = self.dropped_packets.iter().sum();
        self.tx_packets
            .saturating_sub(self.rx_packets)
            .saturating_sub(dropped)
    }

    /// 发送负载（bit/s），按首末发送时刻计算
    pub fn offered_load_bps(&self) -> Option<f64> {
        rate_bps(self.tx_bytes, self.first_tx?, self.last_tx?)
    }

    /// 吞吐（bit/s），按首末接收时刻计算
    pub fn throughput_bps(&self) -> Option<f64> {
        rate_bps(self.rx_bytes, self.first_rx?, self.last_rx?)
    }

    /// 平均单向时延（秒）
    pub fn mean_delay_secs(&self) -> Option<f64> {
        (self.rx_packets > 0).then(|| self.delay_sum.as_secs_f64() / self.rx_packets as f64)
    }

    /// 平均抖动（秒）
    pub fn mean_jitter_secs(&self) -> Option<f64> {
        (self.rx_packets > 1).then(|| self.jitter_sum.as_secs_f64() / (self.rx_packets - 1) as f64)
    }

    fn bump_drop(&mut self, reason: DropReason, bytes: u64) {
        let idx = reason.index();
        if self.dropped_packets.len() <= idx {
            self.dropped_packets.resize(idx + 1, 0);
            self.dropped_bytes.resize(idx + 1, 0);
        }
        self.dropped_packets[idx] += 1;
        self.dropped_bytes[idx] += bytes;
    }
}

fn rate_bps(bytes: u64, first: SimTime, last: SimTime) -> Option<f64> {
    let span = last.saturating_sub(first);
    (span > SimTime::ZERO).then(|| bytes as f64 * 8.0 / span.as_secs_f64())
}

/// 流监视器
#[derive(Debug, Default)]
pub struct FlowMonitor {
    classifier: HashMap<FiveTuple, FlowId>,
    flows: BTreeMap<FlowId, FlowStats>,
}

impl FlowMonitor {
    /// 五元组 -> FlowId；首次出现时分配新 id（从 1 开始）。
    pub fn classify(&mut self, tuple: FiveTuple) -> FlowId {
        if let Some(&id) = self.classifier.get(&tuple) {
            return id;
        }
        let id = FlowId(self.flows.len() as u32 + 1);
        debug!(flow_id = id.0, ?tuple, "新流");
        self.classifier.insert(tuple, id);
        self.flows.insert(id, FlowStats::new(tuple));
        id
    }

    pub fn flow_id(&self, tuple: &FiveTuple) -> Option<FlowId> {
        self.classifier.get(tuple).copied()
    }

    pub fn stats(&self, id: FlowId) -> Option<&FlowStats> {
        self.flows.get(&id)
    }

    pub fn flows(&self) -> &BTreeMap<FlowId, FlowStats> {
        &self.flows
    }

    pub(crate) fn record_tx(&mut self, id: FlowId, bytes: u32, now: SimTime) {
        let Some(f) = self.flows.get_mut(&id) else {
            return;
        };
        f.tx_packets += 1;
        f.tx_bytes += bytes as u64;
        f.first_tx.get_or_insert(now);
        f.last_tx = Some(now);
    }

    pub(crate) fn record_rx(&mut self, id: FlowId, bytes: u32, sent_at: SimTime, now: SimTime) {
        let Some(f) = self.flows.get_mut(&id) else {
            return;
        };
        let delay = now.saturating_sub(sent_at);
        f.rx_packets += 1;
        f.rx_bytes += bytes as u64;
        f.first_rx.get_or_insert(now);
        f.last_rx = Some(now);
        f.delay_sum = f.delay_sum.saturating_add(delay);
        if let Some(prev) = f.last_delay {
            let jitter = SimTime(delay.0.abs_diff(prev.0));
            f.jitter_sum = f.jitter_sum.saturating_add(jitter);
        }
        f.last_delay = Some(delay);
    }

    pub(crate) fn record_drop(&mut self, id: FlowId, reason: DropReason, bytes: u32) {
        if let Some(f) = self.flows.get_mut(&id) {
            f.bump_drop(reason, bytes as u64);
        }
    }

    /// 导出为 JSON（替代 XML 序列化）
    pub fn to_json(&self) -> serde_json::Result<String> {
        let flows: Vec<FlowEntry<'_>> = self
            .flows
            .iter()
            .map(|(id, stats)| FlowEntry { flow_id: *id, stats })
            .collect();
        serde_json::to_string_pretty(&flows)
    }
}

#[derive(Serialize)]
struct FlowEntry<'a> {
    flow_id: FlowId,
    #[serde(flatten)]
    stats: &'a FlowStats,
}
