//! 应用层流量源
//!
//! 应用通过 `Endpoint` 发送数据，生命周期由 `StartApp` / `StopApp` 事件在指定的
//! 仿真时刻驱动。

mod paced_source;

pub use paced_source::{
    AppId, Lifecycle, PacedSource, SendUnit, SourceConfig, SourceError, StartApp, StopApp,
};

use crate::net::Network;
use crate::sim::{EventId, SimTime, Simulator};

/// 有启动/停止生命周期的应用
pub trait Application {
    fn start(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), SourceError>;
    /// 停止；重复调用无副作用。
    fn stop(&mut self, sim: &mut Simulator, net: &mut Network);
}

/// 在 `at` 时刻启动应用 `app`
pub fn schedule_start(sim: &mut Simulator, app: AppId, at: SimTime) -> EventId {
    sim.schedule(at, StartApp { app })
}

/// 在 `at` 时刻停止应用 `app`
pub fn schedule_stop(sim: &mut Simulator, app: AppId, at: SimTime) -> EventId {
    sim.schedule(at, StopApp { app })
}
