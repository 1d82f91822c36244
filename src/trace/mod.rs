//! 事件跟踪钩子
//!
//! trace 源（`TracedValue` / `TraceEvent`）由协议状态持有，在状态变化时同步调用
//! 已注册的监听器；监听器（`MetricChangeTracer` / `DropEventTracer`）把观测追加到 sink。

mod hooks;
mod sink;
mod traced_value;

pub use hooks::{ByteCountTracer, DropEventTracer, MetricChangeTracer};
pub use sink::{FileSink, MemorySink, Record, RecordSink, SharedSink, append_to, shared};
pub use traced_value::{
    EventListener, SampleListener, TraceEvent, TraceSample, TracedValue, ValueListener,
};
