//! Helpers for running the TCP stack against the network that owns it.

use crate::proto::tcp::TcpStack;

use super::Network;

/// Temporarily detaches the TCP stack so it can drive `net` mutably.
///
/// Drops that happen while the stack is detached are queued and replayed to
/// it as soon as it is put back, still within the same simulated instant.
pub(crate) fn with_tcp_stack<F, R>(net: &mut Network, f: F) -> R
where
    F: FnOnce(&mut TcpStack, &mut Network) -> R,
{
    let mut tcp = std::mem::take(&mut net.tcp);
    let was_detached = std::mem::replace(&mut net.tcp_detached, true);
    let result = f(&mut tcp, net);
    net.tcp = tcp;
    net.tcp_detached = was_detached;
    if !was_detached {
        net.flush_tcp_drops();
    }
    result
}
