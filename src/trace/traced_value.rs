//! Trace 源

use std::fmt;

use crate::sim::SimTime;

/// 数值变化监听器：`(now, previous, current)`。
pub trait ValueListener: Send {
    fn on_change(&mut self, now: SimTime, previous: u64, current: u64);
}

impl<F> ValueListener for F
where
    F: FnMut(SimTime, u64, u64) + Send,
{
    fn on_change(&mut self, now: SimTime, previous: u64, current: u64) {
        self(now, previous, current)
    }
}

/// 无载荷通知监听器（例如丢包）。
pub trait EventListener: Send {
    fn on_event(&mut self, now: SimTime);
}

impl<F> EventListener for F
where
    F: FnMut(SimTime) + Send,
{
    fn on_event(&mut self, now: SimTime) {
        self(now)
    }
}

/// 携带一个数值的通知监听器（例如发出的字节数）。
pub trait SampleListener: Send {
    fn on_sample(&mut self, now: SimTime, value: u64);
}

impl<F> SampleListener for F
where
    F: FnMut(SimTime, u64) + Send,
{
    fn on_sample(&mut self, now: SimTime, value: u64) {
        self(now, value)
    }
}

/// 可被订阅的数值：值真正改变时按注册顺序通知所有监听器。
#[derive(Default)]
pub struct TracedValue {
    value: u64,
    listeners: Vec<Box<dyn ValueListener>>,
}

impl TracedValue {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            listeners: Vec::new(),
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    /// 写入新值；与旧值相同时不通知。
    pub fn set(&mut self, now: SimTime, value: u64) {
        let previous = self.value;
        if previous == value {
            return;
        }
        self.value = value;
        for l in &mut self.listeners {
            l.on_change(now, previous, value);
        }
    }

    pub fn connect(&mut self, listener: Box<dyn ValueListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for TracedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedValue")
            .field("value", &self.value)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// 可被订阅的通知源：每次 `fire` 都通知，不去重。
#[derive(Default)]
pub struct TraceEvent {
    listeners: Vec<Box<dyn EventListener>>,
}

impl TraceEvent {
    pub fn fire(&mut self, now: SimTime) {
        for l in &mut self.listeners {
            l.on_event(now);
        }
    }

    pub fn connect(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceEvent")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// 带数值载荷的通知源：每次 `fire` 都通知，不去重、不比较。
#[derive(Default)]
pub struct TraceSample {
    listeners: Vec<Box<dyn SampleListener>>,
}

impl TraceSample {
    pub fn fire(&mut self, now: SimTime, value: u64) {
        for l in &mut self.listeners {
            l.on_sample(now, value);
        }
    }

    pub fn connect(&mut self, listener: Box<dyn SampleListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for TraceSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSample")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
