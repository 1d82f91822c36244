//! 周期采样器
//!
//! 启动后每次采样都无条件地在 `interval` 之后重新调度自己，没有显式的停止操作；
//! 仿真器到达停止时刻或被销毁时，剩余的采样事件被放弃。

use thiserror::Error;
use tracing::{debug, info};

use super::provider::StatsProvider;
use super::selector::FlowSelector;
use super::series::MetricSeries;
use crate::net::NetWorld;
use crate::sim::{Event, EventId, SimTime, Simulator, World};

/// 采样器在 `NetWorld` 中的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub usize);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    #[error("invalid sampler config: {0}")]
    InvalidConfig(&'static str),
    #[error("sampler already started")]
    AlreadyStarted,
}

/// 周期采样器
#[derive(Debug)]
pub struct PeriodicSampler {
    id: SamplerId,
    selector: FlowSelector,
    interval: Option<SimTime>,
    series: MetricSeries,
    next: Option<EventId>,
}

impl PeriodicSampler {
    pub fn new(id: SamplerId, selector: FlowSelector) -> Self {
        Self {
            id,
            selector,
            interval: None,
            series: MetricSeries::default(),
            next: None,
        }
    }

    pub fn id(&self) -> SamplerId {
        self.id
    }

    pub fn selector(&self) -> &FlowSelector {
        &self.selector
    }

    pub fn interval(&self) -> Option<SimTime> {
        self.interval
    }

    pub fn series(&self) -> &MetricSeries {
        &self.series
    }

    /// 首次采样在 `now + interval`。
    pub fn start(&mut self, sim: &mut Simulator, interval: SimTime) -> Result<(), SamplerError> {
        self.start_with_delay(sim, interval, interval)
    }

    /// 首次采样在 `now + first_delay`（可以为 0），之后每隔 `interval` 一次。
    pub fn start_with_delay(
        &mut self,
        sim: &mut Simulator,
        first_delay: SimTime,
        interval: SimTime,
    ) -> Result<(), SamplerError> {
        if interval == SimTime::ZERO {
            return Err(SamplerError::InvalidConfig("interval must be positive"));
        }
        if self.interval.is_some() {
            return Err(SamplerError::AlreadyStarted);
        }
        info!(
            sampler = self.id.0,
            first_at = ?sim.now().saturating_add(first_delay),
            interval = ?interval,
            "启动周期采样"
        );
        self.interval = Some(interval);
        self.next = Some(sim.schedule_in(first_delay, SampleTick { sampler: self.id }));
        Ok(())
    }

    /// 一次采样：读取快照、聚合、追加，然后无条件重新调度。
    pub fn sample_tick(&mut self, sim: &mut Simulator, provider: &dyn StatsProvider) {
        let Some(interval) = self.interval else {
            return;
        };
        let now = sim.now();
        let value = self.selector.aggregate(&provider.snapshot());
        self.series.push(now, value);
        debug!(sampler = self.id.0, now = ?now, value, "采样");
        self.next = Some(sim.schedule_in(interval, SampleTick { sampler: self.id }));
    }

    /// 下一次采样事件是否仍在等待
    pub fn is_armed(&self, sim: &Simulator) -> bool {
        self.next.is_some_and(|id| sim.is_pending(id))
    }
}

/// 事件：触发一次采样
#[derive(Debug)]
pub struct SampleTick {
    pub sampler: SamplerId,
}

impl Event for SampleTick {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SampleTick { sampler } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        let Some(s) = w.samplers.get_mut(sampler.0) else {
            return;
        };
        s.sample_tick(sim, &w.net.monitor);
    }
}
