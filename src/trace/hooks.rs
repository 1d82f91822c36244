//! 跟踪钩子
//!
//! 钩子在通知回调内同步执行，除 sink 句柄外没有状态。

use tracing::warn;

use super::sink::{Record, SharedSink, append_to};
use super::traced_value::{EventListener, SampleListener, ValueListener};
use crate::sim::SimTime;

/// 数值变化钩子：每次通知追加 `(now, previous, current)`。
///
/// 第一次通知原样记录，不补写 t=0 的基线。
pub struct MetricChangeTracer {
    name: &'static str,
    sink: SharedSink,
}

impl MetricChangeTracer {
    pub fn new(name: &'static str, sink: SharedSink) -> Self {
        Self { name, sink }
    }

    pub fn on_metric_change(&mut self, now: SimTime, previous: u64, current: u64) {
        if let Err(err) = append_to(&self.sink, Record::new(now, vec![previous, current])) {
            warn!(trace = self.name, %err, "写入 trace 记录失败");
        }
    }
}

impl ValueListener for MetricChangeTracer {
    fn on_change(&mut self, now: SimTime, previous: u64, current: u64) {
        self.on_metric_change(now, previous, current);
    }
}

/// 丢包钩子：每次通知追加 `(now)`，重复通知即重复记录。
pub struct DropEventTracer {
    sink: SharedSink,
}

impl DropEventTracer {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }

    pub fn on_drop_event(&mut self, now: SimTime) {
        if let Err(err) = append_to(&self.sink, Record::new(now, Vec::new())) {
            warn!(%err, "写入丢包记录失败");
        }
    }
}

impl EventListener for DropEventTracer {
    fn on_event(&mut self, now: SimTime) {
        self.on_drop_event(now);
    }
}

/// 字节计数钩子：每个发出的 packet 追加 `(now, bytes)`。
pub struct ByteCountTracer {
    sink: SharedSink,
}

impl ByteCountTracer {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }
}

impl SampleListener for ByteCountTracer {
    fn on_sample(&mut self, now: SimTime, bytes: u64) {
        if let Err(err) = append_to(&self.sink, Record::new(now, vec![bytes])) {
            warn!(%err, "写入字节计数记录失败");
        }
    }
}
