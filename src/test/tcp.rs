use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::net::{AddrFamily, DropReason, NetWorld, NodeId, TcpSegment, with_tcp_stack};
use crate::proto::{
    CongestionOps, Endpoint, EndpointError, NewReno, TcpSocket, TraceSource,
};
use crate::sim::{SimTime, Simulator};
use crate::trace::{DropEventTracer, MemorySink, MetricChangeTracer, Record, shared};

const RECEIVER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 1, 1, 2));

fn setup() -> (Simulator, NetWorld, NodeId) {
    let mut world = NetWorld::default();
    let net = &mut world.net;
    let h0 = net.add_host("h0");
    let h1 = net.add_host("h1");
    net.assign_address(h0, IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)));
    net.assign_address(h1, RECEIVER);
    net.connect(h0, h1, SimTime::from_millis(10), 1_000_000);
    net.connect(h1, h0, SimTime::from_millis(10), 1_000_000);
    net.set_link_queue_capacity_bytes(h0, h1, 1500);
    net.set_link_queue_capacity_bytes(h1, h0, 1500);
    (Simulator::default(), world, h0)
}

#[test]
fn cwnd_and_drop_traces_fire_through_hooks() {
    let (mut sim, mut world, h0) = setup();
    let cwnd = shared(MemorySink::default());
    let drops = shared(MemorySink::default());

    let mut tcp = TcpSocket::new(h0, &mut world.net);
    tcp.subscribe_value(
        TraceSource::CongestionWindow,
        Box::new(MetricChangeTracer::new("cwnd", cwnd.clone())),
        &mut world.net,
    )
    .expect("cwnd trace");
    tcp.subscribe_event(
        TraceSource::Drop,
        Box::new(DropEventTracer::new(drops.clone())),
        &mut world.net,
    )
    .expect("drop trace");

    tcp.bind(AddrFamily::Ipv4, &mut world.net).expect("bind");
    tcp.connect(SocketAddr::new(RECEIVER, 8080), &mut sim, &mut world.net)
        .expect("connect");

    // 10 个 512 B 段一次性进入初始窗口：1 个在链路上、2 个排队，其余 7 个尾丢弃
    for _ in 0..20 {
        tcp.send(512, &mut sim, &mut world.net).expect("send");
    }
    {
        let d = drops.lock().expect("sink lock");
        assert_eq!(d.len(), 7);
        assert!(d.records().iter().all(|r| r.at == SimTime::ZERO));
    }
    assert!(cwnd.lock().expect("sink lock").is_empty());

    sim.run(&mut world);

    // 第一个 ACK：552 B 数据 4.416 ms + 10 ms，40 B ACK 0.32 ms + 10 ms
    let c = cwnd.lock().expect("sink lock");
    assert_eq!(
        c.records()[0],
        Record::new(SimTime(24_736_000), vec![5360, 5872])
    );
    assert!(c.len() > 1);

    let conn = world.net.tcp.get(tcp.conn_id()).expect("conn");
    assert_eq!(conn.bytes_acked(), 20 * 512);
    assert!(conn.retransmits() > 0);
    // 每个被丢弃的数据段或 ACK 恰好对应一条 Drop 记录
    let queue_drops: u64 = [conn.data_flow(), conn.ack_flow()]
        .into_iter()
        .flatten()
        .filter_map(|f| world.net.monitor.stats(f))
        .map(|s| s.dropped(DropReason::Queue))
        .sum();
    assert_eq!(queue_drops as usize, drops.lock().expect("sink lock").len());
}

#[test]
fn tcp_exposes_only_its_own_trace_sources() {
    let (_sim, mut world, h0) = setup();
    let mut tcp = TcpSocket::new(h0, &mut world.net);

    let err = tcp
        .subscribe_value(
            TraceSource::Drop,
            Box::new(|_: SimTime, _: u64, _: u64| {}),
            &mut world.net,
        )
        .expect_err("drop is an event source");
    assert_eq!(err, EndpointError::UnknownTraceSource(TraceSource::Drop));

    let err = tcp
        .subscribe_event(
            TraceSource::CongestionWindow,
            Box::new(|_: SimTime| {}),
            &mut world.net,
        )
        .expect_err("cwnd is a value source");
    assert_eq!(
        err,
        EndpointError::UnknownTraceSource(TraceSource::CongestionWindow)
    );

    tcp.subscribe_value(
        TraceSource::SlowStartThreshold,
        Box::new(|_: SimTime, _: u64, _: u64| {}),
        &mut world.net,
    )
    .expect("ssthresh trace");
}

#[test]
fn tcp_endpoint_state_machine() {
    let (mut sim, mut world, h0) = setup();
    let peer = SocketAddr::new(RECEIVER, 8080);
    let mut tcp = TcpSocket::new(h0, &mut world.net);

    assert_eq!(
        tcp.connect(peer, &mut sim, &mut world.net),
        Err(EndpointError::NotBound)
    );
    tcp.bind(AddrFamily::Ipv4, &mut world.net).expect("bind");
    assert!(tcp.local_addr().is_some());
    assert_eq!(
        tcp.send(512, &mut sim, &mut world.net),
        Err(EndpointError::NotConnected)
    );
    tcp.connect(peer, &mut sim, &mut world.net).expect("connect");
    assert_eq!(
        tcp.connect(peer, &mut sim, &mut world.net),
        Err(EndpointError::AlreadyConnected)
    );

    tcp.close(&mut sim, &mut world.net);
    tcp.close(&mut sim, &mut world.net);
    assert!(tcp.is_closed());
    assert_eq!(
        tcp.send(512, &mut sim, &mut world.net),
        Err(EndpointError::Closed)
    );
}

#[test]
fn new_reno_grows_per_ack_and_halves_flight_on_loss() {
    let mut cc = NewReno;
    let mss = 536;
    // 慢启动：每个 ACK 最多一个 MSS
    assert_eq!(cc.on_ack(5360, u64::MAX, 512, mss), 5872);
    assert_eq!(cc.on_ack(5360, u64::MAX, 4000, mss), 5896);
    // 拥塞避免：mss*mss/cwnd
    assert_eq!(cc.on_ack(10_720, 5360, 536, mss), 10_720 + 26);
    assert_eq!(cc.ssthresh(10_720, 8000, mss), 4000);
    assert_eq!(cc.ssthresh(10_720, 600, mss), 2 * mss);
    assert_eq!(cc.name(), "new_reno");
}

#[test]
fn receiver_absorbs_out_of_order_segments_overlapped_by_a_resplit_retransmit() {
    let (mut sim, mut world, h0) = setup();
    let h1 = world.net.resolve(RECEIVER).expect("receiver node");
    let mut tcp = TcpSocket::new(h0, &mut world.net);
    tcp.bind(AddrFamily::Ipv4, &mut world.net).expect("bind");
    tcp.connect(SocketAddr::new(RECEIVER, 8080), &mut sim, &mut world.net)
        .expect("connect");
    let conn = tcp.conn_id();

    let deliver = |seq: u64, len: u32, sim: &mut Simulator, world: &mut NetWorld| {
        with_tcp_stack(&mut world.net, |stack, net| {
            stack.on_segment(conn, h1, TcpSegment::Data { seq, len }, sim, net)
        });
    };

    // [1000, 1500) 与 [2000, 2536) 先到，缺口 [0, 1000)
    deliver(1000, 500, &mut sim, &mut world);
    deliver(2000, 536, &mut sim, &mut world);
    let c = world.net.tcp.get(conn).expect("conn");
    assert_eq!(c.bytes_received(), 0);
    assert_eq!(c.reassembly_backlog(), 2);

    // 重传按不同边界切分：[0, 1200) 越过了缓存段的起点 1000
    deliver(0, 1200, &mut sim, &mut world);
    let c = world.net.tcp.get(conn).expect("conn");
    assert_eq!(c.bytes_received(), 1500);
    assert_eq!(c.reassembly_backlog(), 1);

    // 起点落在已收范围内、尾部越过 rcv_nxt 的段同样推进
    deliver(1400, 600, &mut sim, &mut world);
    let c = world.net.tcp.get(conn).expect("conn");
    assert_eq!(c.bytes_received(), 2536);
    assert_eq!(c.reassembly_backlog(), 0);

    // 纯重复段不改变状态
    deliver(0, 536, &mut sim, &mut world);
    let c = world.net.tcp.get(conn).expect("conn");
    assert_eq!(c.bytes_received(), 2536);
    assert_eq!(c.reassembly_backlog(), 0);
}
