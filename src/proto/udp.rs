//! UDP endpoint
//!
//! 无连接：`connect` 只记录对端、计算路由并登记流；每次 `send` 直接产生一个数据报。

use std::net::SocketAddr;

use tracing::debug;

use super::{Endpoint, EndpointError, TraceSource, UDP_HEADER_BYTES};
use crate::net::{AddrFamily, FiveTuple, FlowId, Network, NodeId, Protocol, Transport};
use crate::sim::Simulator;
use crate::trace::{EventListener, ValueListener};

#[derive(Debug)]
pub struct UdpSocket {
    node: NodeId,
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    route: Vec<NodeId>,
    flow: Option<FlowId>,
    next_seq: u64,
    closed: bool,
}

impl UdpSocket {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            local: None,
            peer: None,
            route: Vec::new(),
            flow: None,
            next_seq: 0,
            closed: false,
        }
    }

    pub fn flow_id(&self) -> Option<FlowId> {
        self.flow
    }

    pub fn datagrams_sent(&self) -> u64 {
        self.next_seq
    }
}

impl Endpoint for UdpSocket {
    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    fn bind(&mut self, family: AddrFamily, net: &mut Network) -> Result<(), EndpointError> {
        if self.closed {
            return Err(EndpointError::Closed);
        }
        let ip = net
            .local_address(self.node, family)
            .ok_or(EndpointError::AddressUnavailable {
                node: self.node,
                family,
            })?;
        self.local = Some(SocketAddr::new(ip, net.alloc_port()));
        Ok(())
    }

    fn connect(
        &mut self,
        peer: SocketAddr,
        _sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), EndpointError> {
        if self.closed {
            return Err(EndpointError::Closed);
        }
        let local = self.local.ok_or(EndpointError::NotBound)?;
        let dst = net.resolve(peer.ip()).ok_or(EndpointError::Unreachable(peer))?;
        let route = net
            .route(self.node, dst)
            .ok_or(EndpointError::Unreachable(peer))?;
        let flow = net.monitor.classify(FiveTuple {
            src: local,
            dst: peer,
            protocol: Protocol::Udp,
        });
        debug!(flow_id = flow.0, %local, %peer, "UDP connect");
        self.peer = Some(peer);
        self.route = route;
        self.flow = Some(flow);
        Ok(())
    }

    fn send(&mut self, bytes: u32, sim: &mut Simulator, net: &mut Network) -> Result<(), EndpointError> {
        if self.closed {
            return Err(EndpointError::Closed);
        }
        let flow = self.flow.ok_or(EndpointError::NotConnected)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        let pkt = net.make_packet(
            flow,
            bytes.saturating_add(UDP_HEADER_BYTES),
            self.route.clone(),
            Transport::Udp { seq },
        );
        net.transmit(pkt, sim);
        Ok(())
    }

    fn close(&mut self, _sim: &mut Simulator, _net: &mut Network) {
        self.closed = true;
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
        _listener: Box<dyn ValueListener>,
        _net: &mut Network,
    ) -> Result<(), EndpointError> {
        Err(EndpointError::UnknownTraceSource(source))
    }

    fn subscribe_event(
        &mut self,
        source: TraceSource,
        _listener: Box<dyn EventListener>,
        _net: &mut Network,
    ) -> Result<(), EndpointError> {
        Err(EndpointError::UnknownTraceSource(source))
    }
}
