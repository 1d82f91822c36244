//! 事件 trait
//!
//! 仿真中所有可调度的动作（发包、采样、到达、超时）都实现此接口。

use super::simulator::Simulator;
use super::world::World;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
///
/// 除在途数据包外，事件只携带标识符（AppId、LinkId 等），状态统一放在 `World` 中。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}
