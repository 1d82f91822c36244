//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：主机地址、链路、数据包、路由、流监视器和网络拓扑。

// 子模块声明
mod addr;
mod id;
mod packet;
mod transport;
mod proto_bridge;
mod link;
mod monitor;
mod stats;
mod network;
mod deliver_packet;
mod net_world;
mod link_ready;
mod routing;

// 重新导出公共接口
pub use addr::AddrFamily;
pub use id::{ConnId, FlowId, LinkId, NodeId};
pub use packet::Packet;
pub use transport::{TcpSegment, Transport};
pub(crate) use proto_bridge::with_tcp_stack;
pub use link::Link;
pub use monitor::{DropReason, FiveTuple, FlowMonitor, FlowStats, Protocol};
pub use stats::Stats;
pub use network::Network;
pub use deliver_packet::DeliverPacket;
pub use net_world::NetWorld;
pub use link_ready::LinkReady;
pub use routing::RoutingTable;
