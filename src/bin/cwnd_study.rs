//! 拥塞窗口 / 丢包实验
//!
//! 一条 TCP 大流量流与若干 UDP CBR 流共享 1 Mb/s 瓶颈链路，记录 TCP 的
//! cwnd 变化和队列丢包，并输出流监视器统计。

use clap::Parser;
use cwnd_sim::net::FlowId;
use cwnd_sim::scenario::{CongestionControl, ScenarioError, ScenarioSinks, ScenarioSpec};
use cwnd_sim::trace::{FileSink, RecordSink, shared};
use std::fs;
use std::path::PathBuf;
use std::sync::PoisonError;

#[derive(Debug, Parser)]
#[command(name = "cwnd-study", about = "TCP 拥塞窗口与丢包实验：TCP 大流量 + UDP CBR 竞争瓶颈链路")]
struct Args {
    /// 场景 JSON 文件；不填则使用标准实验参数
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出目录
    #[arg(long, default_value = "Output")]
    out_dir: PathBuf,

    /// 覆盖大流量 TCP 的拥塞控制算法
    #[arg(long, value_enum)]
    congestion_control: Option<CongestionControl>,

    /// 输出文件名前缀；缺省为算法名（如 TcpNewReno）
    #[arg(long)]
    label: Option<String>,

    /// 覆盖仿真停止时刻（毫秒）
    #[arg(long)]
    until_ms: Option<u64>,

    /// 覆盖丢包采样间隔（毫秒）
    #[arg(long)]
    sample_interval_ms: Option<u64>,

    /// 覆盖瓶颈队列容量（字节）
    #[arg(long)]
    queue_bytes: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("cwnd-study: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), ScenarioError> {
    let mut spec = match &args.config {
        Some(path) => ScenarioSpec::from_path(path)?,
        None => ScenarioSpec::default(),
    };
    if let Some(ms) = args.until_ms {
        spec.stop_ms = ms;
    }
    if let Some(ms) = args.sample_interval_ms {
        spec.sampler.interval_ms = ms;
    }
    if let Some(bytes) = args.queue_bytes {
        spec.link.queue_bytes = bytes;
    }
    if let Some(cc) = args.congestion_control {
        spec.bulk.congestion_control = cc;
    }
    let label = args
        .label
        .clone()
        .unwrap_or_else(|| spec.bulk.congestion_control.label().to_string());

    fs::create_dir_all(&args.out_dir)?;
    let out = |ext: &str| args.out_dir.join(format!("{label}.{ext}"));

    let cwnd = shared(FileSink::create(out("cwnd"))?);
    let pkt_drops = shared(FileSink::create(out("pktdrop"))?);
    let pkt_bytes = shared(FileSink::create(out("pktbytes"))?);
    let mut scenario = spec.build(ScenarioSinks {
        cwnd: cwnd.clone(),
        packet_drops: pkt_drops.clone(),
        packet_bytes: pkt_bytes.clone(),
    })?;

    scenario.run();

    let monitor = &scenario.world.net.monitor;
    if let Some(s) = monitor.stats(FlowId(1)) {
        let mbps = |bps: Option<f64>| bps.map_or(0.0, |v| v / 1_000_000.0);
        println!();
        println!("Flow monitor output:");
        println!("Tx Packets:   {}", s.tx_packets);
        println!("Tx Bytes:     {}", s.tx_bytes);
        println!("Offered Load: {} Mbps", mbps(s.offered_load_bps()));
        println!("Rx Packets:   {}", s.rx_packets);
        println!("Rx Bytes:     {}", s.rx_bytes);
        println!("Throughput:   {} Mbps", mbps(s.throughput_bps()));
        println!("Mean delay:   {}", s.mean_delay_secs().unwrap_or(0.0));
        println!("Mean jitter:  {}", s.mean_jitter_secs().unwrap_or(0.0));
    }
    fs::write(out("flowmon.json"), monitor.to_json()?)?;

    let net = &scenario.world.net;
    println!(
        "done @ {:?}\n  net: delivered_pkts={}, delivered_bytes={}, dropped_pkts={}, dropped_bytes={}",
        scenario.sim.now(),
        net.stats.delivered_pkts,
        net.stats.delivered_bytes,
        net.stats.dropped_pkts,
        net.stats.dropped_bytes
    );

    scenario.destroy();

    if let Some(sampler) = scenario.world.sampler(scenario.drop_sampler) {
        let mut drop_file = FileSink::create(out("drop"))?;
        sampler.series().write_to(&mut drop_file)?;
        eprintln!("wrote {} drop samples to {}", sampler.series().len(), drop_file.path().display());
    }
    cwnd.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
    pkt_drops.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
    pkt_bytes.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
    Ok(())
}
