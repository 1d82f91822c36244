//! 地址族

use std::net::{IpAddr, SocketAddr};

/// 地址族：决定 endpoint 绑定 IPv4 还是 IPv6 本地地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrFamily {
    Ipv4,
    Ipv6,
}

impl AddrFamily {
    /// 根据对端地址的语法形式选择地址族。
    pub fn of(addr: &SocketAddr) -> Self {
        Self::of_ip(&addr.ip())
    }

    pub fn of_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddrFamily::Ipv4,
            IpAddr::V6(_) => AddrFamily::Ipv6,
        }
    }
}
