//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含主机、地址、链路、数据包转发、流统计和 TCP 协议栈。

use std::collections::HashMap;
use std::net::IpAddr;

use super::addr::AddrFamily;
use super::deliver_packet::DeliverPacket;
use super::id::{ConnId, FlowId, LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::monitor::{DropReason, FlowMonitor};
use super::packet::Packet;
use super::proto_bridge::with_tcp_stack;
use super::routing::RoutingTable;
use super::stats::Stats;
use super::transport::Transport;
use crate::proto::tcp::TcpStack;
use crate::queue::DropTailQueue;
use crate::sim::{SimTime, Simulator};
use crate::trace::{SampleListener, TraceSample};
use tracing::{debug, trace, warn};

/// 临时端口起点
const EPHEMERAL_PORT_START: u16 = 49153;

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    node_names: Vec<String>,
    node_addrs: Vec<Vec<IpAddr>>,
    addr_index: HashMap<IpAddr, NodeId>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    adj: Vec<Vec<NodeId>>,
    routing: RoutingTable,
    next_pkt_id: u64,
    next_port: u16,
    pub monitor: FlowMonitor,
    pub stats: Stats,
    pub(crate) tcp: TcpStack,
    /// TCP 协议栈被临时取出期间发生的丢包，放回后补发通知
    pub(crate) tcp_detached: bool,
    tcp_drop_backlog: Vec<(ConnId, SimTime)>,
    /// 任一节点发出 packet（源端发送或中间节点转发）时的线上字节数
    tx_bytes: TraceSample,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.node_names.len());
        self.node_names.push(name.into());
        self.node_addrs.push(Vec::new());
        self.adj.push(Vec::new());
        self.routing.mark_dirty();
        id
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        &self.node_names[id.0]
    }

    /// 订阅每个节点发出 packet 的字节数，在入队（或丢弃）之前通知。
    pub fn subscribe_tx_bytes(&mut self, listener: Box<dyn SampleListener>) {
        self.tx_bytes.connect(listener);
    }

    /// 为节点分配一个 IP 地址；同一地址重复分配时以最后一次为准。
    pub fn assign_address(&mut self, node: NodeId, ip: IpAddr) {
        if let Some(prev) = self.addr_index.insert(ip, node) {
            self.node_addrs[prev.0].retain(|a| *a != ip);
        }
        self.node_addrs[node.0].push(ip);
    }

    pub fn addresses(&self, node: NodeId) -> &[IpAddr] {
        &self.node_addrs[node.0]
    }

    /// 节点上第一个属于 `family` 的地址
    pub fn local_address(&self, node: NodeId, family: AddrFamily) -> Option<IpAddr> {
        self.node_addrs
            .get(node.0)?
            .iter()
            .copied()
            .find(|ip| AddrFamily::of_ip(ip) == family)
    }

    /// IP -> 节点
    pub fn resolve(&self, ip: IpAddr) -> Option<NodeId> {
        self.addr_index.get(&ip).copied()
    }

    /// 分配一个临时端口
    pub fn alloc_port(&mut self) -> u16 {
        if self.next_port < EPHEMERAL_PORT_START {
            self.next_port = EPHEMERAL_PORT_START;
        }
        let port = self.next_port;
        self.next_port = self.next_port.checked_add(1).unwrap_or(EPHEMERAL_PORT_START);
        port
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, bandwidth_bps));
        self.edges.insert((from, to), id);
        self.adj[from.0].push(to);
        self.routing.mark_dirty();
        id
    }

    pub fn link(&self, from: NodeId, to: NodeId) -> Option<&Link> {
        let id = self.edges.get(&(from, to))?;
        self.links.get(id.0)
    }

    /// 把 from->to 链路的队列替换为指定字节容量的 DropTail；链路不存在返回 false。
    pub fn set_link_queue_capacity_bytes(&mut self, from: NodeId, to: NodeId, cap_bytes: u64) -> bool {
        let Some(id) = self.edges.get(&(from, to)).copied() else {
            return false;
        };
        self.links[id.0].queue = Box::new(DropTailQueue::new(cap_bytes));
        true
    }

    /// 最短跳数路径（含首尾）
    pub fn route(&mut self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        self.routing.ensure_built(&self.adj);
        self.routing.path(src, dst)
    }

    /// 创建数据包
    pub fn make_packet(
        &mut self,
        flow_id: FlowId,
        size_bytes: u32,
        route: Vec<NodeId>,
        transport: Transport,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            route,
            hop: 0,
            sent_at: SimTime::ZERO,
            transport,
        }
    }

    /// 源端把数据包交给网络：记录流发送统计后从源节点转发。
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, flow_id = pkt.flow_id.0))]
    pub fn transmit(&mut self, mut pkt: Packet, sim: &mut Simulator) {
        pkt.sent_at = sim.now();
        self.monitor.record_tx(pkt.flow_id, pkt.size_bytes, sim.now());
        self.tx_bytes.fire(sim.now(), pkt.size_bytes as u64);
        if !pkt.has_next() {
            // 源即目的（环回）
            let to = pkt.at();
            sim.schedule(sim.now(), DeliverPacket { to, pkt });
            return;
        }
        let src = pkt.at();
        self.forward_from(src, pkt, sim);
    }

    /// 从指定节点转发数据包：链路空闲则直接发送，否则入队；队列满则丢弃。
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, from = ?from, hop = pkt.hop))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(to) = pkt.next() else {
            warn!("数据包没有下一跳");
            self.drop_packet(pkt, DropReason::RouteError, sim);
            return;
        };
        let Some(link_id) = self.edges.get(&(from, to)).copied() else {
            warn!(to = ?to, "找不到链路");
            self.drop_packet(pkt, DropReason::NoRoute, sim);
            return;
        };

        let link = &mut self.links[link_id.0];
        if !link.busy {
            self.start_tx(link_id, pkt, sim);
            return;
        }
        match link.queue.enqueue(pkt) {
            Ok(()) => {
                trace!(
                    link_id = ?link_id,
                    q_bytes = link.queue.bytes(),
                    q_len = link.queue.len(),
                    "链路忙，数据包入队"
                );
            }
            Err(pkt) => {
                debug!(
                    link_id = ?link_id,
                    q_bytes = link.queue.bytes(),
                    q_cap_bytes = link.queue.capacity_bytes(),
                    "队列已满，尾丢弃"
                );
                self.drop_packet(pkt, DropReason::Queue, sim);
            }
        }
    }

    /// 在链路上开始序列化一个 packet：depart 时刻链路就绪，arrive 时刻交付下一跳。
    fn start_tx(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        let to = link.to;
        let now = sim.now();
        let depart = now.saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        link.busy = true;

        trace!(
            now = ?now,
            depart = ?depart,
            arrive = ?arrive,
            "计算传输时间"
        );

        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(arrive, DeliverPacket { to, pkt: pkt.advance() });
    }

    /// 链路完成一次发送：取队首继续发送，或转为空闲。
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        link.busy = false;
        if let Some(pkt) = link.queue.dequeue() {
            self.start_tx(link_id, pkt, sim);
        }
    }

    /// 数据包到达节点 `to`
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        if pkt.has_next() {
            trace!(node_name = %self.node_names[to.0], "未到达目的地，继续转发");
            self.tx_bytes.fire(sim.now(), pkt.size_bytes as u64);
            self.forward_from(to, pkt, sim);
        } else {
            self.on_delivered(to, pkt, sim);
        }
    }

    /// 数据包送达目的地时的处理
    fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        trace!(pkt_id = pkt.id, flow_id = pkt.flow_id.0, "✅ 数据包送达目的地");

        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        self.monitor
            .record_rx(pkt.flow_id, pkt.size_bytes, pkt.sent_at, sim.now());

        // 传输层处理（TCP：目的端产生 ACK、源端处理 ACK 驱动继续发送）
        if let Transport::Tcp { conn, seg } = pkt.transport {
            with_tcp_stack(self, |tcp, net| tcp.on_segment(conn, at, seg, sim, net));
        }
    }

    /// 丢弃数据包：更新统计，并通知所属 TCP 连接的丢包 trace。
    fn drop_packet(&mut self, pkt: Packet, reason: DropReason, sim: &mut Simulator) {
        debug!(pkt_id = pkt.id, flow_id = pkt.flow_id.0, ?reason, "🗑️  丢包");
        self.stats.dropped_pkts += 1;
        self.stats.dropped_bytes += pkt.size_bytes as u64;
        self.monitor.record_drop(pkt.flow_id, reason, pkt.size_bytes);
        if let Transport::Tcp { conn, .. } = pkt.transport {
            self.tcp_drop_backlog.push((conn, sim.now()));
            if !self.tcp_detached {
                self.flush_tcp_drops();
            }
        }
    }

    /// 把积压的丢包通知交给 TCP 协议栈（同一仿真时刻内同步完成）
    pub(crate) fn flush_tcp_drops(&mut self) {
        for (conn, at) in std::mem::take(&mut self.tcp_drop_backlog) {
            self.tcp.on_drop(conn, at);
        }
    }
}
