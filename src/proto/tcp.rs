//! TCP（简化版）协议实现
//!
//! 目标：为拥塞窗口实验提供足够真实的窗口变化：
//! - 数据段/累计 ACK，接收端缓存乱序段
//! - 可替换的拥塞控制（默认 NewReno：慢启动 + 拥塞避免）
//! - 3 dupACK 快速重传 + 快速恢复（部分 ACK 继续重传）
//! - RTT 估计 + 指数退避的 RTO（定时器可取消），超时后回退 N 重传
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现握手/FIN/窗口通告/选择确认等。

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;

use tracing::{debug, info, trace};

use super::{Endpoint, EndpointError, TCP_HEADER_BYTES, TraceSource};
use crate::net::{
    AddrFamily, ConnId, FiveTuple, FlowId, NetWorld, Network, NodeId, Protocol, TcpSegment,
    Transport, with_tcp_stack,
};
use crate::sim::{Event, EventId, SimTime, Simulator, World};
use crate::trace::{EventListener, TraceEvent, TracedValue, ValueListener};

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// ACK 包大小（字节）
    pub ack_bytes: u32,
    /// 初始 cwnd（单位：MSS 个数）
    pub init_cwnd_segments: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO（尚无 RTT 样本时使用）
    pub init_rto: SimTime,
    pub min_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
    /// 发送缓冲区（已写入但未确认的字节上限）
    pub snd_buf_bytes: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            mss: 536,
            ack_bytes: TCP_HEADER_BYTES,
            init_cwnd_segments: 10,
            init_ssthresh_bytes: u32::MAX as u64,
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            snd_buf_bytes: 131_072,
        }
    }
}

/// 可替换的拥塞控制算法
pub trait CongestionOps: Send + std::fmt::Debug {
    fn name(&self) -> &'static str;
    /// 收到推进 `acked` 字节的新 ACK（不在快速恢复中）后的 cwnd
    fn on_ack(&mut self, cwnd: u64, ssthresh: u64, acked: u64, mss: u64) -> u64;
    /// 检测到丢包后的 ssthresh
    fn ssthresh(&mut self, cwnd: u64, bytes_in_flight: u64, mss: u64) -> u64;
}

/// NewReno 窗口增长
#[derive(Debug, Default, Clone, Copy)]
pub struct NewReno;

impl CongestionOps for NewReno {
    fn name(&self) -> &'static str {
        "new_reno"
    }

    fn on_ack(&mut self, cwnd: u64, ssthresh: u64, acked: u64, mss: u64) -> u64 {
        if cwnd < ssthresh {
            // 慢启动：每个 ACK 最多增长一个 MSS
            cwnd.saturating_add(acked.min(mss))
        } else {
            // 拥塞避免：每个 ACK 增长 mss^2/cwnd（至少 1 字节）
            let inc = (mss.saturating_mul(mss) / cwnd.max(1)).max(1);
            cwnd.saturating_add(inc)
        }
    }

    fn ssthresh(&mut self, _cwnd: u64, bytes_in_flight: u64, mss: u64) -> u64 {
        (bytes_in_flight / 2).max(2 * mss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Created,
    Bound,
    Established,
    Closed,
}

#[derive(Debug, Clone)]
struct SentSeg {
    len: u32,
    sent_at: SimTime,
    retransmitted: bool,
}

#[derive(Debug)]
pub struct TcpConn {
    pub id: ConnId,
    pub node: NodeId,
    pub cfg: TcpConfig,
    cc: Box<dyn CongestionOps>,
    state: TcpState,
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    peer_node: Option<NodeId>,
    fwd_route: Vec<NodeId>,
    rev_route: Vec<NodeId>,
    data_flow: Option<FlowId>,
    ack_flow: Option<FlowId>,

    // sender
    app_bytes: u64,
    next_seq: u64,
    high_tx: u64,
    last_acked: u64,
    cwnd: TracedValue,
    ssthresh: TracedValue,
    dup_acks: u32,
    in_recovery: bool,
    recover: u64,
    inflight: BTreeMap<u64, SentSeg>, // seq -> segment
    rto: SimTime,
    srtt: Option<SimTime>,
    rttvar: SimTime,
    rto_timer: Option<EventId>,

    // receiver
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,

    drop_trace: TraceEvent,
    retransmits: u64,
    timeouts: u64,
}

impl TcpConn {
    fn new(id: ConnId, node: NodeId, cfg: TcpConfig, cc: Box<dyn CongestionOps>) -> Self {
        let mss = cfg.mss as u64;
        let cwnd = cfg.init_cwnd_segments.max(1).saturating_mul(mss);
        let ssthresh = cfg.init_ssthresh_bytes.max(2 * mss);
        let rto = cfg.init_rto;
        Self {
            id,
            node,
            cfg,
            cc,
            state: TcpState::Created,
            local: None,
            peer: None,
            peer_node: None,
            fwd_route: Vec::new(),
            rev_route: Vec::new(),
            data_flow: None,
            ack_flow: None,
            app_bytes: 0,
            next_seq: 0,
            high_tx: 0,
            last_acked: 0,
            cwnd: TracedValue::new(cwnd),
            ssthresh: TracedValue::new(ssthresh),
            dup_acks: 0,
            in_recovery: false,
            recover: 0,
            inflight: BTreeMap::new(),
            rto,
            srtt: None,
            rttvar: SimTime::ZERO,
            rto_timer: None,
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            drop_trace: TraceEvent::default(),
            retransmits: 0,
            timeouts: 0,
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn congestion_ops(&self) -> &str {
        self.cc.name()
    }

    pub fn cwnd_bytes(&self) -> u64 {
        self.cwnd.get()
    }

    pub fn ssthresh_bytes(&self) -> u64 {
        self.ssthresh.get()
    }

    pub fn bytes_acked(&self) -> u64 {
        self.last_acked
    }

    pub fn bytes_written(&self) -> u64 {
        self.app_bytes
    }

    pub fn bytes_received(&self) -> u64 {
        self.rcv_nxt
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    pub fn rto(&self) -> SimTime {
        self.rto
    }

    pub fn local(&self) -> Option<SocketAddr> {
        self.local
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn data_flow(&self) -> Option<FlowId> {
        self.data_flow
    }

    pub fn ack_flow(&self) -> Option<FlowId> {
        self.ack_flow
    }

    /// 乱序缓存中尚未并入的段数
    pub fn reassembly_backlog(&self) -> usize {
        self.ooo.len()
    }

    /// 把起点不超过 `rcv_nxt` 的乱序段并入；重传切分不同导致的重叠段同样会被消化，
    /// 不会残留在缓存里。
    fn drain_reassembly(&mut self) {
        while let Some((&s, &l)) = self.ooo.first_key_value() {
            if s > self.rcv_nxt {
                break;
            }
            self.ooo.pop_first();
            self.rcv_nxt = self.rcv_nxt.max(s + l as u64);
        }
    }

    fn flight_bytes(&self) -> u64 {
        self.next_seq.saturating_sub(self.last_acked)
    }

    fn update_rtt(&mut self, sample: SimTime) {
        match self.srtt {
            None => {
                self.srtt = Some(sample);
                self.rttvar = SimTime(sample.0 / 2);
            }
            Some(srtt) => {
                let err = srtt.0.abs_diff(sample.0);
                self.rttvar = SimTime((3 * self.rttvar.0 + err) / 4);
                self.srtt = Some(SimTime((7 * srtt.0 + sample.0) / 8));
            }
        }
        let srtt = self.srtt.unwrap_or(sample);
        let rto = srtt.saturating_add(SimTime(self.rttvar.0.saturating_mul(4)));
        self.rto = rto.max(self.cfg.min_rto).min(self.cfg.max_rto);
    }
}

#[derive(Debug, Default)]
pub struct TcpStack {
    conns: HashMap<ConnId, TcpConn>,
    next_id: ConnId,
}

impl TcpStack {
    pub fn create(&mut self, node: NodeId, cfg: TcpConfig, cc: Box<dyn CongestionOps>) -> ConnId {
        self.next_id += 1;
        let id = self.next_id;
        self.conns.insert(id, TcpConn::new(id, node, cfg, cc));
        id
    }

    pub fn get(&self, id: ConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    fn conn_mut(&mut self, id: ConnId) -> Result<&mut TcpConn, EndpointError> {
        self.conns.get_mut(&id).ok_or(EndpointError::Closed)
    }

    /// 应用写入 `bytes` 字节
    fn write(
        &mut self,
        id: ConnId,
        bytes: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), EndpointError> {
        let conn = self.conn_mut(id)?;
        match conn.state {
            TcpState::Established => {}
            TcpState::Closed => return Err(EndpointError::Closed),
            TcpState::Created | TcpState::Bound => return Err(EndpointError::NotConnected),
        }
        let buffered = conn.app_bytes - conn.last_acked;
        if buffered.saturating_add(bytes as u64) > conn.cfg.snd_buf_bytes {
            trace!(conn_id = id, buffered, "发送缓冲区已满");
            return Err(EndpointError::BufferFull);
        }
        conn.app_bytes += bytes as u64;
        self.send_data_if_possible(id, sim, net);
        Ok(())
    }

    fn close(&mut self, id: ConnId, sim: &mut Simulator) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state == TcpState::Closed {
            return;
        }
        conn.state = TcpState::Closed;
        if let Some(timer) = conn.rto_timer.take() {
            sim.cancel(timer);
        }
        info!(
            conn_id = id,
            bytes_acked = conn.last_acked,
            retransmits = conn.retransmits,
            timeouts = conn.timeouts,
            "TCP 连接关闭"
        );
    }

    fn arm_rto(conn: &mut TcpConn, sim: &mut Simulator) {
        if let Some(timer) = conn.rto_timer.take() {
            sim.cancel(timer);
        }
        let timer = sim.schedule_in(conn.rto, TcpRto { conn_id: conn.id });
        conn.rto_timer = Some(timer);
    }

    pub(crate) fn send_data_if_possible(&mut self, id: ConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != TcpState::Established {
            return;
        }
        let Some(flow) = conn.data_flow else {
            return;
        };

        // 发送窗口：flight < cwnd，且只发满 MSS 的段（除非是缓冲区最后的尾巴）
        while conn.next_seq < conn.app_bytes {
            let avail = conn.cwnd.get().saturating_sub(conn.flight_bytes());
            let remain = conn.app_bytes - conn.next_seq;
            let len = (conn.cfg.mss as u64).min(remain);
            if len == 0 || avail < len {
                break;
            }
            let len = len as u32;
            let seq = conn.next_seq;
            conn.next_seq += len as u64;
            let retransmitted = seq < conn.high_tx;
            conn.high_tx = conn.high_tx.max(conn.next_seq);
            if retransmitted {
                conn.retransmits += 1;
            }

            conn.inflight.insert(
                seq,
                SentSeg {
                    len,
                    sent_at: sim.now(),
                    retransmitted,
                },
            );
            if conn.rto_timer.is_none_or(|t| !sim.is_pending(t)) {
                Self::arm_rto(conn, sim);
            }

            let pkt = net.make_packet(
                flow,
                len + TCP_HEADER_BYTES,
                conn.fwd_route.clone(),
                Transport::Tcp {
                    conn: id,
                    seg: TcpSegment::Data { seq, len },
                },
            );
            net.transmit(pkt, sim);
        }
    }

    fn retransmit(&mut self, id: ConnId, seq: u64, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        let Some(flow) = conn.data_flow else {
            return;
        };
        let Some(seg) = conn.inflight.get_mut(&seq) else {
            return;
        };
        seg.retransmitted = true;
        seg.sent_at = sim.now();
        let len = seg.len;
        conn.retransmits += 1;
        debug!(conn_id = id, seq, len, "重传");
        let pkt = net.make_packet(
            flow,
            len + TCP_HEADER_BYTES,
            conn.fwd_route.clone(),
            Transport::Tcp {
                conn: id,
                seg: TcpSegment::Data { seq, len },
            },
        );
        net.transmit(pkt, sim);
    }

    fn send_ack(&mut self, id: ConnId, ack: u64, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get(&id) else {
            return;
        };
        let Some(flow) = conn.ack_flow else {
            return;
        };
        let pkt = net.make_packet(
            flow,
            conn.cfg.ack_bytes,
            conn.rev_route.clone(),
            Transport::Tcp {
                conn: id,
                seg: TcpSegment::Ack { ack },
            },
        );
        net.transmit(pkt, sim);
    }

    pub(crate) fn on_segment(
        &mut self,
        conn_id: ConnId,
        at: NodeId,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        match seg {
            TcpSegment::Data { seq, len } => {
                let Some(conn) = self.conns.get_mut(&conn_id) else {
                    return;
                };
                if Some(at) != conn.peer_node {
                    return;
                }
                let end = seq + len as u64;
                if seq <= conn.rcv_nxt {
                    conn.rcv_nxt = conn.rcv_nxt.max(end);
                    conn.drain_reassembly();
                } else {
                    let slot = conn.ooo.entry(seq).or_insert(0);
                    *slot = (*slot).max(len);
                }
                // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
                let ack = conn.rcv_nxt;
                self.send_ack(conn_id, ack, sim, net);
            }
            TcpSegment::Ack { ack } => {
                let Some(conn) = self.conns.get(&conn_id) else {
                    return;
                };
                if at != conn.node || conn.state != TcpState::Established {
                    return;
                }
                self.on_ack(conn_id, ack, sim, net);
            }
        }
    }

    fn on_ack(&mut self, id: ConnId, ack: u64, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        let now = sim.now();
        let mss = conn.cfg.mss as u64;

        if ack > conn.last_acked {
            let newly_acked = ack - conn.last_acked;
            conn.last_acked = ack;
            conn.next_seq = conn.next_seq.max(ack);
            conn.dup_acks = 0;

            // 移除已确认段；用最早一个未重传段做 RTT 样本（Karn）
            let mut rtt_sample = None;
            while let Some((&s, sent)) = conn.inflight.first_key_value() {
                if s + sent.len as u64 > ack {
                    break;
                }
                if rtt_sample.is_none() && !sent.retransmitted {
                    rtt_sample = Some(now.saturating_sub(sent.sent_at));
                }
                conn.inflight.pop_first();
            }
            if let Some(sample) = rtt_sample {
                conn.update_rtt(sample);
            }

            if conn.in_recovery {
                if ack >= conn.recover {
                    conn.in_recovery = false;
                    let ss = conn.ssthresh.get();
                    conn.cwnd.set(now, ss);
                } else {
                    // 部分 ACK：重传下一个缺口，窗口部分收缩
                    let cwnd = conn.cwnd.get().saturating_sub(newly_acked).saturating_add(mss);
                    conn.cwnd.set(now, cwnd);
                    let hole = conn.last_acked;
                    self.retransmit(id, hole, sim, net);
                }
            } else {
                let cwnd = conn
                    .cc
                    .on_ack(conn.cwnd.get(), conn.ssthresh.get(), newly_acked, mss);
                conn.cwnd.set(now, cwnd);
            }

            let Some(conn) = self.conns.get_mut(&id) else {
                return;
            };
            if conn.inflight.is_empty() {
                if let Some(timer) = conn.rto_timer.take() {
                    sim.cancel(timer);
                }
            } else {
                Self::arm_rto(conn, sim);
            }
            self.send_data_if_possible(id, sim, net);
        } else if ack == conn.last_acked && conn.flight_bytes() > 0 {
            conn.dup_acks += 1;
            if conn.dup_acks == 3 && !conn.in_recovery {
                let flight = conn.flight_bytes();
                let ss = conn.cc.ssthresh(conn.cwnd.get(), flight, mss);
                conn.ssthresh.set(now, ss);
                conn.cwnd.set(now, ss + 3 * mss);
                conn.recover = conn.next_seq;
                conn.in_recovery = true;
                debug!(conn_id = id, ssthresh = ss, "3 dupACK，快速重传");
                let hole = conn.last_acked;
                self.retransmit(id, hole, sim, net);
            } else if conn.in_recovery {
                // 快速恢复：每个额外 dupACK 膨胀一个 MSS
                let cwnd = conn.cwnd.get().saturating_add(mss);
                conn.cwnd.set(now, cwnd);
                self.send_data_if_possible(id, sim, net);
            }
        }
    }

    fn on_rto(&mut self, id: ConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        conn.rto_timer = None;
        if conn.state != TcpState::Established || conn.inflight.is_empty() {
            return;
        }
        let now = sim.now();
        let mss = conn.cfg.mss as u64;
        let flight = conn.flight_bytes();
        let ss = conn.cc.ssthresh(conn.cwnd.get(), flight, mss);
        conn.ssthresh.set(now, ss);
        conn.cwnd.set(now, mss);
        conn.dup_acks = 0;
        conn.in_recovery = false;
        conn.timeouts += 1;
        conn.rto = SimTime(conn.rto.0.saturating_mul(2)).min(conn.cfg.max_rto);
        info!(conn_id = id, seq = conn.last_acked, rto = ?conn.rto, "⏰ RTO 超时，回退重传");

        // 回退 N：从最早未确认字节重新发送
        conn.inflight.clear();
        conn.next_seq = conn.last_acked;
        self.send_data_if_possible(id, sim, net);
    }

    /// 属于该连接的包在网络中被丢弃
    pub(crate) fn on_drop(&mut self, id: ConnId, now: SimTime) {
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.drop_trace.fire(now);
        }
    }
}

/// TCP RTO 事件
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: ConnId,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        with_tcp_stack(&mut w.net, |tcp, net| tcp.on_rto(conn_id, sim, net));
    }
}

/// TCP endpoint 句柄：连接状态保存在 `Network` 的 TCP 协议栈中。
#[derive(Debug)]
pub struct TcpSocket {
    conn: ConnId,
    local: Option<SocketAddr>,
    closed: bool,
}

impl TcpSocket {
    /// 默认配置 + NewReno
    pub fn new(node: NodeId, net: &mut Network) -> Self {
        Self::with_config(node, TcpConfig::default(), Box::new(NewReno), net)
    }

    pub fn with_config(
        node: NodeId,
        cfg: TcpConfig,
        cc: Box<dyn CongestionOps>,
        net: &mut Network,
    ) -> Self {
        let conn = net.tcp.create(node, cfg, cc);
        Self {
            conn,
            local: None,
            closed: false,
        }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn
    }
}

impl Endpoint for TcpSocket {
    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    fn bind(&mut self, family: AddrFamily, net: &mut Network) -> Result<(), EndpointError> {
        let node = net.tcp.conn_mut(self.conn)?.node;
        match net.tcp.conn_mut(self.conn)?.state {
            TcpState::Created => {}
            TcpState::Closed => return Err(EndpointError::Closed),
            TcpState::Bound | TcpState::Established => return Err(EndpointError::AlreadyConnected),
        }
        let ip = net
            .local_address(node, family)
            .ok_or(EndpointError::AddressUnavailable { node, family })?;
        let port = net.alloc_port();
        let local = SocketAddr::new(ip, port);
        let conn = net.tcp.conn_mut(self.conn)?;
        conn.local = Some(local);
        conn.state = TcpState::Bound;
        self.local = Some(local);
        Ok(())
    }

    fn connect(
        &mut self,
        peer: SocketAddr,
        _sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), EndpointError> {
        let (node, local) = {
            let conn = net.tcp.conn_mut(self.conn)?;
            match conn.state {
                TcpState::Bound => {}
                TcpState::Created => return Err(EndpointError::NotBound),
                TcpState::Established => return Err(EndpointError::AlreadyConnected),
                TcpState::Closed => return Err(EndpointError::Closed),
            }
            (conn.node, conn.local.ok_or(EndpointError::NotBound)?)
        };
        let dst = net.resolve(peer.ip()).ok_or(EndpointError::Unreachable(peer))?;
        let fwd = net.route(node, dst).ok_or(EndpointError::Unreachable(peer))?;
        let rev = net.route(dst, node).ok_or(EndpointError::Unreachable(peer))?;
        let tuple = FiveTuple {
            src: local,
            dst: peer,
            protocol: Protocol::Tcp,
        };
        let data_flow = net.monitor.classify(tuple);
        let ack_flow = net.monitor.classify(tuple.reversed());

        let conn = net.tcp.conn_mut(self.conn)?;
        conn.peer = Some(peer);
        conn.peer_node = Some(dst);
        conn.fwd_route = fwd;
        conn.rev_route = rev;
        conn.data_flow = Some(data_flow);
        conn.ack_flow = Some(ack_flow);
        conn.state = TcpState::Established;
        info!(
            conn_id = self.conn,
            %local,
            %peer,
            data_flow = data_flow.0,
            ack_flow = ack_flow.0,
            cc = conn.cc.name(),
            "TCP 连接建立"
        );
        Ok(())
    }

    fn send(&mut self, bytes: u32, sim: &mut Simulator, net: &mut Network) -> Result<(), EndpointError> {
        let id = self.conn;
        with_tcp_stack(net, |tcp, net| tcp.write(id, bytes, sim, net))
    }

    fn close(&mut self, sim: &mut Simulator, net: &mut Network) {
        self.closed = true;
        net.tcp.close(self.conn, sim);
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    fn subscribe_value(
        &mut self,
        source: TraceSource,
        listener: Box<dyn ValueListener>,
        net: &mut Network,
    ) -> Result<(), EndpointError> {
        let conn = net.tcp.conn_mut(self.conn)?;
        match source {
            TraceSource::CongestionWindow => conn.cwnd.connect(listener),
            TraceSource::SlowStartThreshold => conn.ssthresh.connect(listener),
            TraceSource::Drop => return Err(EndpointError::UnknownTraceSource(source)),
        }
        Ok(())
    }

    fn subscribe_event(
        &mut self,
        source: TraceSource,
        listener: Box<dyn EventListener>,
        net: &mut Network,
    ) -> Result<(), EndpointError> {
        let conn = net.tcp.conn_mut(self.conn)?;
        match source {
            TraceSource::Drop => conn.drop_trace.connect(listener),
            _ => return Err(EndpointError::UnknownTraceSource(source)),
        }
        Ok(())
    }
}
