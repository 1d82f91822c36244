//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换。

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// 仿真时间（纳秒）。既表示时刻，也表示时长。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(NANOS_PER_SEC))
    }

    /// 浮点秒 -> 纳秒（四舍五入）。负数、NaN 返回 None。
    pub fn from_secs_f64(s: f64) -> Option<SimTime> {
        if !s.is_finite() || s < 0.0 {
            return None;
        }
        let nanos = (s * NANOS_PER_SEC as f64).round();
        if nanos >= u64::MAX as f64 {
            return Some(SimTime::MAX);
        }
        Some(SimTime(nanos as u64))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    pub fn saturating_add(self, d: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(d.0))
    }

    pub fn saturating_sub(self, d: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(d.0))
    }

    /// 以 `bps` 速率发送 `bytes` 字节所需时间：ceil(bytes*8 / bps) 秒 -> 纳秒。
    ///
    /// 向上取整到下一个纳秒，因此只要 `bytes > 0` 结果就不会为零。
    /// `bps == 0` 时返回 None。
    pub fn transmit_time(bytes: u64, bps: u64) -> Option<SimTime> {
        if bps == 0 {
            return None;
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(NANOS_PER_SEC as u128) + (bps as u128 - 1)) / bps as u128;
        Some(SimTime(nanos.min(u64::MAX as u128) as u64))
    }
}
