//! 最短跳数路由
//!
//! 拓扑变化后惰性重建：对每个目的节点在反向图上做 BFS，
//! 记录每个 (from, dst) 的下一跳，再按下一跳拼出完整路径。

use std::collections::{HashMap, VecDeque};

use super::id::NodeId;

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    built: bool,
    /// (from, dst) -> 最短路径上的下一跳（多条等价路径时取编号最小的邻居）
    next_hop: HashMap<(NodeId, NodeId), NodeId>,
}

impl RoutingTable {
    pub fn mark_dirty(&mut self) {
        self.built = false;
    }

    /// 确保路由表基于当前拓扑是最新的。
    ///
    /// `adj[from]` 为从 `from` 出发的所有出边邻居。
    pub fn ensure_built(&mut self, adj: &[Vec<NodeId>]) {
        if self.built {
            return;
        }

        let n = adj.len();
        let mut rev_adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for (from, outs) in adj.iter().enumerate() {
            for &to in outs {
                rev_adj[to.0].push(NodeId(from));
            }
        }

        self.next_hop.clear();
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();
            dist[dst_idx] = 0;
            q.push_back(NodeId(dst_idx));

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &pred in &rev_adj[v.0] {
                    if dist[pred.0] == u32::MAX {
                        dist[pred.0] = dv + 1;
                        q.push_back(pred);
                    }
                }
            }

            for from_idx in 0..n {
                let df = dist[from_idx];
                if from_idx == dst_idx || df == u32::MAX {
                    continue;
                }
                let best = adj[from_idx]
                    .iter()
                    .filter(|nh| dist[nh.0] == df - 1)
                    .min_by_key(|nh| nh.0);
                if let Some(&nh) = best {
                    self.next_hop.insert((NodeId(from_idx), NodeId(dst_idx)), nh);
                }
            }
        }

        self.built = true;
    }

    /// 完整路径（含首尾节点）；不可达返回 None。
    pub fn path(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![src];
        let mut cur = src;
        while cur != dst {
            cur = *self.next_hop.get(&(cur, dst))?;
            path.push(cur);
        }
        Some(path)
    }
}
