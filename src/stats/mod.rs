//! 周期性指标采样
//!
//! 采样器按固定的虚拟时间间隔查询统计提供者，用可配置的选择器把逐流计数
//! 聚合成一个标量，并追加到时间序列中。

mod provider;
mod sampler;
mod selector;
mod series;

pub use provider::{FlowSnapshot, StatsProvider};
pub use sampler::{PeriodicSampler, SampleTick, SamplerError, SamplerId};
pub use selector::{Counter, FlowFilter, FlowSelector};
pub use series::MetricSeries;
