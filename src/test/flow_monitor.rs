use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::net::{DropReason, FiveTuple, FlowId, FlowMonitor, Protocol};
use crate::sim::SimTime;

fn tuple(src_port: u16, protocol: Protocol) -> FiveTuple {
    FiveTuple {
        src: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)), src_port),
        dst: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 1, 2)), 8080),
        protocol,
    }
}

#[test]
fn classifier_assigns_ids_from_one_and_reuses_them() {
    let mut m = FlowMonitor::default();
    let t = tuple(49153, Protocol::Tcp);
    assert_eq!(m.classify(t), FlowId(1));
    assert_eq!(m.classify(t.reversed()), FlowId(2));
    assert_eq!(m.classify(t), FlowId(1));
    assert_eq!(m.flow_id(&t.reversed()), Some(FlowId(2)));
    assert_eq!(m.flow_id(&tuple(1, Protocol::Udp)), None);
    assert_eq!(m.flows().len(), 2);
}

#[test]
fn summary_metrics_follow_first_and_last_timestamps() {
    let mut m = FlowMonitor::default();
    let id = m.classify(tuple(49153, Protocol::Udp));

    m.record_tx(id, 1000, SimTime::ZERO);
    m.record_tx(id, 1000, SimTime::from_millis(8));
    m.record_rx(id, 1000, SimTime::ZERO, SimTime::from_millis(10));
    m.record_rx(id, 1000, SimTime::from_millis(8), SimTime::from_millis(22));

    let s = m.stats(id).expect("flow");
    // 16000 bit / 8 ms = 2 Mb/s
    let load = s.offered_load_bps().expect("two tx");
    assert!((load - 2_000_000.0).abs() < 1e-6);
    // 16000 bit / 12 ms
    let tput = s.throughput_bps().expect("two rx");
    assert!((tput - 16_000.0 / 0.012).abs() < 1e-6);
    // 时延 10 ms 与 14 ms
    assert!((s.mean_delay_secs().expect("rx") - 0.012).abs() < 1e-12);
    assert!((s.mean_jitter_secs().expect("two rx") - 0.004).abs() < 1e-12);
}

#[test]
fn summary_metrics_are_none_without_enough_samples() {
    let mut m = FlowMonitor::default();
    let id = m.classify(tuple(49153, Protocol::Udp));
    m.record_tx(id, 100, SimTime(5));
    let s = m.stats(id).expect("flow");
    assert_eq!(s.offered_load_bps(), None);
    assert_eq!(s.throughput_bps(), None);
    assert_eq!(s.mean_delay_secs(), None);
    assert_eq!(s.mean_jitter_secs(), None);
    assert_eq!(s.lost_packets(), 1);
}

#[test]
fn drop_vector_grows_to_the_highest_reason_seen() {
    let mut m = FlowMonitor::default();
    let id = m.classify(tuple(49153, Protocol::Tcp));
    m.record_drop(id, DropReason::Queue, 576);
    m.record_drop(id, DropReason::Queue, 576);

    let s = m.stats(id).expect("flow");
    assert_eq!(s.dropped_packets, vec![0, 0, 0, 2]);
    assert_eq!(s.dropped(DropReason::Queue), 2);
    assert_eq!(s.dropped(DropReason::QueueDisc), 0);
    assert_eq!(s.dropped_bytes_for(DropReason::Queue), 1152);
    assert_eq!(DropReason::ALL.len(), 8);
    assert_eq!(DropReason::Queue.index(), 3);
    assert_eq!(DropReason::QueueDisc.index(), 4);
}

#[test]
fn json_export_lists_flows_in_id_order() {
    let mut m = FlowMonitor::default();
    let a = m.classify(tuple(49153, Protocol::Tcp));
    let b = m.classify(tuple(49154, Protocol::Udp));
    m.record_tx(b, 540, SimTime(1));

    let v: serde_json::Value = serde_json::from_str(&m.to_json().expect("json")).expect("parse");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["flow_id"], serde_json::json!(a.0));
    assert_eq!(arr[1]["flow_id"], serde_json::json!(b.0));
    assert_eq!(arr[1]["tx_bytes"], serde_json::json!(540));
    assert_eq!(arr[1]["tuple"]["protocol"], serde_json::json!("udp"));
}
