//! 仿真器
//!
//! 定义事件驱动仿真器（事件内核）：维护当前时间、事件队列、取消集合与停止时刻。
//!
//! 取消采用"存活集合"实现：`schedule` 把序列号放入 `pending`，`cancel` 将其移除，
//! 出队时不在 `pending` 中的事件直接丢弃。因此即使事件已经排在当前时刻的队首，
//! 只要在它出队之前被取消，就不会被执行。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 已调度事件的句柄，仅用于取消/查询。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    pending: HashSet<u64>,
    stop_at: Option<SimTime>,
    executed: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行。早于当前时间的请求按当前时间处理。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.insert(seq);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 在 `delay` 之后调度事件。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消事件。已执行、已取消或已被销毁的事件返回 false（幂等）。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.pending.remove(&id.0);
        if removed {
            trace!(seq = id.0, "事件已取消");
        }
        removed
    }

    /// 事件是否仍在等待执行。
    pub fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains(&id.0)
    }

    /// 尚未执行且未取消的事件数量。
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// 已执行的事件总数。
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// 设置全局停止时刻：`run` 执行到该时刻（含）为止，之后的事件被放弃。
    pub fn stop_at(&mut self, at: SimTime) {
        info!(stop_at = ?at, "设置仿真停止时刻");
        self.stop_at = Some(at);
    }

    /// 弹出下一个存活事件（跳过已取消的），若超过 `limit` 则保留在队列中。
    fn pop_live(&mut self, limit: Option<SimTime>) -> Option<ScheduledEvent> {
        loop {
            let top = self.q.peek()?;
            if limit.is_some_and(|l| top.at > l) {
                return None;
            }
            let item = self.q.pop()?;
            if self.pending.remove(&item.seq) {
                return Some(item);
            }
            trace!(seq = item.seq, at = ?item.at, "跳过已取消事件");
        }
    }

    fn dispatch(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.now = item.at;
        self.executed = self.executed.saturating_add(1);
        trace!(
            now = ?self.now,
            seq = item.seq,
            remaining_queue = self.q.len(),
            "执行事件"
        );
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空或到达 `until`（恰好在 `until` 的事件会被执行）。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(item) = self.pop_live(Some(until)) {
            self.dispatch(item, world);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件，直到队列为空或到达 `stop_at` 设置的停止时刻。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), stop_at = ?self.stop_at, "初始状态");

        let start_count = self.executed;
        let limit = self.stop_at;
        while let Some(item) = self.pop_live(limit) {
            self.dispatch(item, world);
        }
        if let Some(stop) = limit {
            self.now = self.now.max(stop);
        }

        info!(
            total_events = self.executed - start_count,
            final_time = ?self.now,
            abandoned = self.pending.len(),
            "✅ 仿真完成"
        );
    }

    /// 销毁：放弃所有尚未执行的事件，不调用它们。
    pub fn destroy(&mut self) {
        let abandoned = self.pending.len();
        self.q.clear();
        self.pending.clear();
        debug!(abandoned, "仿真器已销毁，放弃剩余事件");
    }
}
