//! 网络世界实现
//!
//! 一次运行内的全部状态：网络拓扑、流量源和周期采样器。

use super::network::Network;
use crate::app::{AppId, PacedSource};
use crate::sim::World;
use crate::stats::{FlowSelector, PeriodicSampler, SamplerId};
use std::any::Any;

/// 默认的网络世界：持有 Network，以及按编号寻址的应用和采样器。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub apps: Vec<PacedSource>,
    pub samplers: Vec<PeriodicSampler>,
}

impl NetWorld {
    /// 登记一个流量源，之后由 `StartApp` / `StopApp` / `SendUnit` 事件按编号驱动。
    pub fn add_app(&mut self, mut app: PacedSource) -> AppId {
        let id = AppId(self.apps.len());
        app.assign_id(id);
        self.apps.push(app);
        id
    }

    pub fn app(&self, id: AppId) -> Option<&PacedSource> {
        self.apps.get(id.0)
    }

    pub fn app_mut(&mut self, id: AppId) -> Option<&mut PacedSource> {
        self.apps.get_mut(id.0)
    }

    pub fn add_sampler(&mut self, selector: FlowSelector) -> SamplerId {
        let id = SamplerId(self.samplers.len());
        self.samplers.push(PeriodicSampler::new(id, selector));
        id
    }

    pub fn sampler(&self, id: SamplerId) -> Option<&PeriodicSampler> {
        self.samplers.get(id.0)
    }

    pub fn sampler_mut(&mut self, id: SamplerId) -> Option<&mut PeriodicSampler> {
        self.samplers.get_mut(id.0)
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
