//! 实验场景描述与构建
//!
//! 一条瓶颈链路连接发送端与接收端：一条大流量 TCP 流贯穿全程，若干 UDP CBR
//! 流在各自的时间窗内开启，与 TCP 竞争瓶颈队列。场景用 JSON 描述，所有字段
//! 都有默认值，缺省时即为标准实验。

use std::collections::BTreeSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::app::{self, AppId, PacedSource, SourceConfig, SourceError};
use crate::net::{ConnId, FlowId, NetWorld, NodeId};
use crate::proto::{
    CongestionOps, Endpoint, EndpointError, NewReno, TcpConfig, TcpSocket, TraceSource, UdpSocket,
};
use crate::sim::{SimTime, Simulator};
use crate::stats::{FlowFilter, FlowSelector, SamplerError, SamplerId};
use crate::trace::{ByteCountTracer, DropEventTracer, MetricChangeTracer, SharedSink};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid scenario json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sampler(#[from] SamplerError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioSpec {
    pub link: LinkSpec,
    pub hosts: HostsSpec,
    pub bulk: BulkFlowSpec,
    pub cbr: CbrSpec,
    pub sampler: SamplerSpec,
    /// 仿真停止时刻（毫秒）
    pub stop_ms: u64,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            link: LinkSpec::default(),
            hosts: HostsSpec::default(),
            bulk: BulkFlowSpec::default(),
            cbr: CbrSpec::default(),
            sampler: SamplerSpec::default(),
            stop_ms: 1800,
        }
    }
}

/// 点到点瓶颈链路（两个方向参数相同）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkSpec {
    pub bandwidth_bps: u64,
    pub latency_us: u64,
    /// DropTail 队列容量（字节）
    pub queue_bytes: u64,
}

impl Default for LinkSpec {
    fn default() -> Self {
        Self {
            bandwidth_bps: 1_000_000,
            latency_us: 10_000,
            queue_bytes: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostsSpec {
    pub sender_addr: IpAddr,
    pub receiver_addr: IpAddr,
    /// TCP 接收端口
    pub bulk_port: u16,
    /// UDP 接收端口
    pub cbr_port: u16,
}

impl Default for HostsSpec {
    fn default() -> Self {
        Self {
            sender_addr: IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)),
            receiver_addr: IpAddr::V4(Ipv4Addr::new(10, 1, 1, 2)),
            bulk_port: 8080,
            cbr_port: 8000,
        }
    }
}

/// 大流量 TCP 的拥塞控制算法；命令行用 `--congestion-control new-reno` 选择。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CongestionControl {
    NewReno,
}

impl CongestionControl {
    /// 输出文件名前缀的缺省值
    pub fn label(self) -> &'static str {
        match self {
            CongestionControl::NewReno => "TcpNewReno",
        }
    }

    fn ops(self) -> Box<dyn CongestionOps> {
        match self {
            CongestionControl::NewReno => Box::new(NewReno),
        }
    }
}

/// 大流量 TCP 流
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BulkFlowSpec {
    pub congestion_control: CongestionControl,
    pub unit_bytes: u32,
    pub max_units: Option<u64>,
    pub rate_bps: u64,
    pub start_ms: u64,
    pub stop_ms: u64,
}

impl Default for BulkFlowSpec {
    fn default() -> Self {
        Self {
            congestion_control: CongestionControl::NewReno,
            unit_bytes: 512,
            max_units: Some(100_000),
            rate_bps: 1_000_000,
            start_ms: 0,
            stop_ms: 1800,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start_ms: u64,
    pub stop_ms: u64,
}

/// UDP 恒定速率流：每个时间窗一条流
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CbrSpec {
    pub unit_bytes: u32,
    pub rate_bps: u64,
    pub windows: Vec<ActiveWindow>,
}

impl Default for CbrSpec {
    fn default() -> Self {
        let w = |start_ms, stop_ms| ActiveWindow { start_ms, stop_ms };
        Self {
            unit_bytes: 512,
            rate_bps: 300_000,
            windows: vec![
                w(200, 1800),
                w(400, 1800),
                w(600, 1200),
                w(800, 1400),
                w(1000, 1600),
            ],
        }
    }
}

/// 丢包采样器
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SamplerSpec {
    pub interval_ms: u64,
    /// 首次采样时刻（毫秒）；缺省为一个采样间隔
    pub first_sample_ms: Option<u64>,
    pub selector: FlowSelector,
}

impl Default for SamplerSpec {
    fn default() -> Self {
        // TCP 连接最先建立：数据方向为流 1，ACK 方向为流 2
        let tcp_flows: BTreeSet<FlowId> = [FlowId(1), FlowId(2)].into_iter().collect();
        Self {
            interval_ms: 10,
            first_sample_ms: None,
            selector: FlowSelector::queue_drops(FlowFilter::Ids(tcp_flows)),
        }
    }
}

impl ScenarioSpec {
    pub fn from_json(s: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// 构建网络、应用和采样器，并把 cwnd / 丢包 trace 接到给定 sink 上。
    pub fn build(&self, sinks: ScenarioSinks) -> Result<Scenario, ScenarioError> {
        let mut sim = Simulator::default();
        let mut world = NetWorld::default();
        let net = &mut world.net;

        let sender = net.add_host("sender");
        let receiver = net.add_host("receiver");
        net.assign_address(sender, self.hosts.sender_addr);
        net.assign_address(receiver, self.hosts.receiver_addr);

        let latency = SimTime::from_micros(self.link.latency_us);
        net.connect(sender, receiver, latency, self.link.bandwidth_bps);
        net.connect(receiver, sender, latency, self.link.bandwidth_bps);
        net.set_link_queue_capacity_bytes(sender, receiver, self.link.queue_bytes);
        net.set_link_queue_capacity_bytes(receiver, sender, self.link.queue_bytes);
        net.subscribe_tx_bytes(Box::new(ByteCountTracer::new(sinks.packet_bytes)));

        // 大流量 TCP
        let cc = self.bulk.congestion_control.ops();
        let mut tcp = TcpSocket::with_config(sender, TcpConfig::default(), cc, net);
        let tcp_conn = tcp.conn_id();
        tcp.subscribe_value(
            TraceSource::CongestionWindow,
            Box::new(MetricChangeTracer::new("cwnd", sinks.cwnd)),
            net,
        )?;
        tcp.subscribe_event(
            TraceSource::Drop,
            Box::new(DropEventTracer::new(sinks.packet_drops)),
            net,
        )?;
        let bulk = PacedSource::configure(
            Box::new(tcp),
            SourceConfig {
                peer: SocketAddr::new(self.hosts.receiver_addr, self.hosts.bulk_port),
                unit_bytes: self.bulk.unit_bytes,
                max_units: self.bulk.max_units,
                rate_bps: self.bulk.rate_bps,
            },
        )?;
        let bulk_app = world.add_app(bulk);
        app::schedule_start(&mut sim, bulk_app, SimTime::from_millis(self.bulk.start_ms));
        app::schedule_stop(&mut sim, bulk_app, SimTime::from_millis(self.bulk.stop_ms));

        // CBR
        let mut cbr_apps = Vec::with_capacity(self.cbr.windows.len());
        for w in &self.cbr.windows {
            let src = PacedSource::configure(
                Box::new(UdpSocket::new(sender)),
                SourceConfig {
                    peer: SocketAddr::new(self.hosts.receiver_addr, self.hosts.cbr_port),
                    unit_bytes: self.cbr.unit_bytes,
                    max_units: None,
                    rate_bps: self.cbr.rate_bps,
                },
            )?;
            let id = world.add_app(src);
            app::schedule_start(&mut sim, id, SimTime::from_millis(w.start_ms));
            app::schedule_stop(&mut sim, id, SimTime::from_millis(w.stop_ms));
            cbr_apps.push(id);
        }

        // 丢包采样
        let interval = SimTime::from_millis(self.sampler.interval_ms);
        let first = self
            .sampler
            .first_sample_ms
            .map_or(interval, SimTime::from_millis);
        let drop_sampler = world.add_sampler(self.sampler.selector.clone());
        if let Some(s) = world.sampler_mut(drop_sampler) {
            s.start_with_delay(&mut sim, first, interval)?;
        }

        let stop_at = SimTime::from_millis(self.stop_ms);
        sim.stop_at(stop_at);
        info!(
            cbr_flows = cbr_apps.len(),
            stop_at = ?stop_at,
            queue_bytes = self.link.queue_bytes,
            "场景构建完成"
        );

        Ok(Scenario {
            sim,
            world,
            sender,
            receiver,
            bulk_app,
            cbr_apps,
            tcp_conn,
            drop_sampler,
        })
    }
}

/// 场景运行期间写入的 trace 输出
pub struct ScenarioSinks {
    /// cwnd 变化：`t old new`
    pub cwnd: SharedSink,
    /// TCP 包被丢弃的时刻：`t`
    pub packet_drops: SharedSink,
    /// 所有节点发出的 packet 字节数：`t bytes`
    pub packet_bytes: SharedSink,
}

/// 构建好的一次运行
pub struct Scenario {
    pub sim: Simulator,
    pub world: NetWorld,
    pub sender: NodeId,
    pub receiver: NodeId,
    pub bulk_app: AppId,
    pub cbr_apps: Vec<AppId>,
    pub tcp_conn: ConnId,
    pub drop_sampler: SamplerId,
}

impl Scenario {
    /// 运行到停止时刻
    pub fn run(&mut self) {
        self.sim.run(&mut self.world);
    }

    /// 放弃所有剩余事件
    pub fn destroy(&mut self) {
        self.sim.destroy();
    }
}
