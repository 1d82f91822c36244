//! 匀速流量源
//!
//! 以固定速率逐个发送固定大小的数据单元：每次发送后按 `unit_bytes * 8 / rate_bps`
//! （向上取整到纳秒）调度下一次发送，直到达到数量上限或被停止。
//!
//! 任意时刻至多有一个待执行的发送事件，其 `EventId` 保存在 `send_event` 中；
//! `stop` 通过内核取消它，因此与停止同一时刻排队的发送也不会执行。

use std::net::SocketAddr;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::Application;
use crate::net::{AddrFamily, NetWorld, Network};
use crate::proto::{Endpoint, EndpointError};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

/// 流量源在 `NetWorld` 中的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// 对端地址；地址族决定本端绑定 IPv4 还是 IPv6
    pub peer: SocketAddr,
    /// 每个数据单元的字节数
    pub unit_bytes: u32,
    /// 发送数量上限，`None` 表示不限
    pub max_units: Option<u64>,
    /// 发送速率（bit/s）
    pub rate_bps: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid source config: {0}")]
    InvalidConfig(&'static str),
    #[error("source already running")]
    AlreadyRunning,
    #[error("source already stopped")]
    AlreadyStopped,
    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct PacedSource {
    id: Option<AppId>,
    endpoint: Box<dyn Endpoint>,
    config: SourceConfig,
    interval: Option<SimTime>,
    lifecycle: Lifecycle,
    units_sent: u64,
    units_rejected: u64,
    send_event: Option<EventId>,
    last_error: Option<EndpointError>,
}

impl PacedSource {
    /// 校验配置并接管 endpoint。
    ///
    /// 上限为 `Some(0)` 时不会发送任何数据，此时允许单元大小或速率为 0。
    pub fn configure(endpoint: Box<dyn Endpoint>, config: SourceConfig) -> Result<Self, SourceError> {
        let sends_nothing = config.max_units == Some(0);
        if !sends_nothing {
            if config.unit_bytes == 0 {
                return Err(SourceError::InvalidConfig("unit size must be positive"));
            }
            if config.rate_bps == 0 {
                return Err(SourceError::InvalidConfig("data rate must be positive"));
            }
        }
        let interval = SimTime::transmit_time(config.unit_bytes as u64, config.rate_bps);
        Ok(Self {
            id: None,
            endpoint,
            config,
            interval,
            lifecycle: Lifecycle::Idle,
            units_sent: 0,
            units_rejected: 0,
            send_event: None,
            last_error: None,
        })
    }

    pub(crate) fn assign_id(&mut self, id: AppId) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<AppId> {
        self.id
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// 相邻两次发送的间隔
    pub fn interval(&self) -> Option<SimTime> {
        self.interval
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// 已计入上限的发送次数（含被 endpoint 暂时拒绝的）
    pub fn units_sent(&self) -> u64 {
        self.units_sent
    }

    /// 因发送缓冲区满等瞬时原因被拒绝的次数
    pub fn units_rejected(&self) -> u64 {
        self.units_rejected
    }

    pub fn last_error(&self) -> Option<&EndpointError> {
        self.last_error.as_ref()
    }

    /// 是否有尚未执行的发送事件
    pub fn pending_send(&self, sim: &Simulator) -> bool {
        self.send_event.is_some_and(|ev| sim.is_pending(ev))
    }

    pub fn endpoint(&self) -> &dyn Endpoint {
        self.endpoint.as_ref()
    }

    pub fn endpoint_mut(&mut self) -> &mut dyn Endpoint {
        self.endpoint.as_mut()
    }

    fn quota_reached(&self) -> bool {
        self.config.max_units.is_some_and(|max| self.units_sent >= max)
    }

    /// 发送一个数据单元；未达上限时调度下一次。
    pub fn send_unit(&mut self, sim: &mut Simulator, net: &mut Network) {
        if let Some(ev) = self.send_event.take() {
            sim.cancel(ev);
        }
        if self.lifecycle != Lifecycle::Running || self.quota_reached() {
            return;
        }

        match self.endpoint.send(self.config.unit_bytes, sim, net) {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                self.units_rejected += 1;
                debug!(app = ?self.id, now = ?sim.now(), %err, "endpoint 暂时拒绝发送，计入配额");
            }
            Err(err) => {
                warn!(app = ?self.id, now = ?sim.now(), %err, "endpoint 发送失败，停止调度");
                self.last_error = Some(err);
                return;
            }
        }
        self.units_sent += 1;

        if self.quota_reached() {
            info!(app = ?self.id, units = self.units_sent, now = ?sim.now(), "达到发送上限");
            return;
        }
        self.schedule_next(sim);
    }

    /// 在一个发送间隔之后调度下一次发送；未运行时什么也不做。
    pub fn schedule_next(&mut self, sim: &mut Simulator) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }
        let (Some(app), Some(interval)) = (self.id, self.interval) else {
            warn!(app = ?self.id, "流量源未登记到 NetWorld，无法调度发送");
            return;
        };
        if let Some(prev) = self.send_event.take() {
            sim.cancel(prev);
        }
        self.send_event = Some(sim.schedule_in(interval, SendUnit { app }));
    }
}

impl Application for PacedSource {
    /// 绑定、连接，然后立即发送第一个数据单元。
    fn start(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), SourceError> {
        match self.lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running => return Err(SourceError::AlreadyRunning),
            Lifecycle::Stopped => return Err(SourceError::AlreadyStopped),
        }
        let peer = self.config.peer;
        self.endpoint.bind(AddrFamily::of(&peer), net)?;
        if let Err(err) = self.endpoint.connect(peer, sim, net) {
            // 只尝试一次：已绑定的 endpoint 随即关闭
            self.endpoint.close(sim, net);
            return Err(err.into());
        }
        self.lifecycle = Lifecycle::Running;
        info!(
            app = ?self.id,
            %peer,
            protocol = ?self.endpoint.protocol(),
            unit_bytes = self.config.unit_bytes,
            rate_bps = self.config.rate_bps,
            interval = ?self.interval,
            now = ?sim.now(),
            "启动流量源"
        );
        self.send_unit(sim, net);
        Ok(())
    }

    fn stop(&mut self, sim: &mut Simulator, net: &mut Network) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        self.lifecycle = Lifecycle::Stopped;
        if let Some(ev) = self.send_event.take() {
            sim.cancel(ev);
        }
        // 不论是否启动过，endpoint 只关闭一次
        if !self.endpoint.is_closed() {
            self.endpoint.close(sim, net);
        }
        info!(app = ?self.id, units = self.units_sent, now = ?sim.now(), "停止流量源");
    }
}

fn net_world(world: &mut dyn World) -> &mut NetWorld {
    world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld")
}

/// 事件：启动应用
#[derive(Debug)]
pub struct StartApp {
    pub app: AppId,
}

impl Event for StartApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let StartApp { app } = *self;
        let NetWorld { net, apps, .. } = net_world(world);
        let Some(src) = apps.get_mut(app.0) else {
            warn!(?app, "启动事件找不到应用");
            return;
        };
        if let Err(err) = src.start(sim, net) {
            warn!(?app, %err, "应用启动失败");
        }
    }
}

/// 事件：停止应用
#[derive(Debug)]
pub struct StopApp {
    pub app: AppId,
}

impl Event for StopApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let StopApp { app } = *self;
        let NetWorld { net, apps, .. } = net_world(world);
        if let Some(src) = apps.get_mut(app.0) {
            src.stop(sim, net);
        }
    }
}

/// 事件：发送下一个数据单元
#[derive(Debug)]
pub struct SendUnit {
    pub app: AppId,
}

impl Event for SendUnit {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SendUnit { app } = *self;
        let NetWorld { net, apps, .. } = net_world(world);
        if let Some(src) = apps.get_mut(app.0) {
            src.send_unit(sim, net);
        }
    }
}
