//! 标识符类型
//!
//! 定义节点、链路、流和连接的唯一标识符。

use serde::{Deserialize, Serialize};

/// 节点标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// 链路标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 流标识符（由 FlowMonitor 的五元组分类器按首次出现顺序从 1 开始分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub u32);

/// TCP 连接标识符
pub type ConnId = u64;
