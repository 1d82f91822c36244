//! 世界 trait
//!
//! 定义仿真世界接口。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（网络、应用、采样器等一次运行内的全部状态）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// 每个事件执行完毕后回调。
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
