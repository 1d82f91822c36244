use crate::sim::{Event, EventId, SimTime, Simulator, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DummyWorld {
    ticks: usize,
}

impl World for DummyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        self.ticks = self.ticks.saturating_add(1);
    }
}

type Log = Arc<Mutex<Vec<u32>>>;

struct Push {
    id: u32,
    log: Log,
}

impl Event for Push {
    fn execute(self: Box<Self>, _sim: &mut Simulator, _world: &mut dyn World) {
        let Push { id, log } = *self;
        log.lock().expect("log lock").push(id);
    }
}

fn push(id: u32, log: &Log) -> Push {
    Push {
        id,
        log: Arc::clone(log),
    }
}

/// 执行时取消另一个事件
struct CancelOther {
    victim: Arc<Mutex<Option<EventId>>>,
    cancelled: Arc<Mutex<Option<bool>>>,
}

impl Event for CancelOther {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        let victim = self.victim.lock().expect("victim lock").expect("victim set");
        *self.cancelled.lock().expect("result lock") = Some(sim.cancel(victim));
    }
}

/// 每次执行后在 `gap` 之后重新调度自己
struct Rearm {
    gap: SimTime,
    log: Arc<Mutex<Vec<SimTime>>>,
}

impl Event for Rearm {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        self.log.lock().expect("log lock").push(sim.now());
        let gap = self.gap;
        sim.schedule_in(gap, *self);
    }
}

#[test]
fn scheduled_events_order_by_time_then_seq() {
    let log = Log::default();

    let mut sim = Simulator::default();
    sim.schedule(SimTime(10), push(1, &log));
    sim.schedule(SimTime(5), push(2, &log));
    sim.schedule(SimTime(10), push(3, &log));

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2, 1, 3]);
    assert_eq!(world.ticks, 3);
    assert_eq!(sim.now(), SimTime(10));
    assert_eq!(sim.executed_events(), 3);
}

#[test]
fn cancelled_event_never_runs_and_cancel_is_idempotent() {
    let log = Log::default();

    let mut sim = Simulator::default();
    let a = sim.schedule(SimTime(5), push(1, &log));
    sim.schedule(SimTime(6), push(2, &log));

    assert!(sim.is_pending(a));
    assert!(sim.cancel(a));
    assert!(!sim.is_pending(a));
    assert!(!sim.cancel(a));
    assert_eq!(sim.pending_events(), 1);

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2]);
    assert_eq!(world.ticks, 1);
}

#[test]
fn cancel_after_execution_returns_false() {
    let log = Log::default();
    let mut sim = Simulator::default();
    let a = sim.schedule(SimTime(1), push(1, &log));

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert!(!sim.is_pending(a));
    assert!(!sim.cancel(a));
}

#[test]
fn event_cancelled_at_the_same_instant_by_an_earlier_event_is_skipped() {
    let log = Log::default();
    let victim = Arc::new(Mutex::new(None));
    let cancelled = Arc::new(Mutex::new(None));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(7),
        CancelOther {
            victim: Arc::clone(&victim),
            cancelled: Arc::clone(&cancelled),
        },
    );
    let id = sim.schedule(SimTime(7), push(9, &log));
    *victim.lock().expect("victim lock") = Some(id);

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(*cancelled.lock().expect("result lock"), Some(true));
    assert!(log.lock().expect("log lock").is_empty());
    assert_eq!(world.ticks, 1);
}

#[test]
fn schedule_in_is_relative_and_past_times_are_clamped_to_now() {
    let log = Log::default();
    let mut sim = Simulator::default();
    let mut world = DummyWorld::default();

    sim.run_until(SimTime(100), &mut world);
    sim.schedule_in(SimTime(5), push(1, &log));
    sim.schedule(SimTime(50), push(2, &log));
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2, 1]);
    assert_eq!(sim.now(), SimTime(105));
}

#[test]
fn stop_at_is_inclusive_and_abandons_later_events() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(10),
        Rearm {
            gap: SimTime(10),
            log: Arc::clone(&log),
        },
    );
    sim.stop_at(SimTime(50));

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    let times: Vec<u64> = log.lock().expect("log lock").iter().map(|t| t.0).collect();
    assert_eq!(times, vec![10, 20, 30, 40, 50]);
    assert_eq!(sim.now(), SimTime(50));
    // 第 60ns 的那次仍在队列里，但不会执行
    assert_eq!(sim.pending_events(), 1);
}

#[test]
fn destroy_drops_pending_events_without_running_them() {
    let log = Log::default();
    let mut sim = Simulator::default();
    let a = sim.schedule(SimTime(1), push(1, &log));
    sim.schedule(SimTime(2), push(2, &log));

    sim.destroy();
    assert_eq!(sim.pending_events(), 0);
    assert!(!sim.is_pending(a));

    let mut world = DummyWorld::default();
    sim.run(&mut world);
    assert!(log.lock().expect("log lock").is_empty());
    assert_eq!(world.ticks, 0);
}

struct PushThenScheduleNow {
    id: u32,
    next_id: u32,
    log: Log,
}

impl Event for PushThenScheduleNow {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        let PushThenScheduleNow { id, next_id, log } = *self;
        log.lock().expect("log lock").push(id);
        sim.schedule(sim.now(), Push { id: next_id, log });
    }
}

#[test]
fn event_scheduled_at_same_time_inside_event_runs_after_current_event() {
    let log = Log::default();

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        PushThenScheduleNow {
            id: 1,
            next_id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
    assert_eq!(sim.now(), SimTime::ZERO);
}

#[test]
fn run_until_executes_events_at_until_and_keeps_later_ones() {
    let log = Log::default();

    let mut sim = Simulator::default();
    sim.schedule(SimTime(5), push(1, &log));
    sim.schedule(SimTime(10), push(2, &log));

    let mut world = DummyWorld::default();
    sim.run_until(SimTime(5), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    assert_eq!(sim.now(), SimTime(5));

    sim.run(&mut world);
    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn run_until_advances_time_even_if_there_are_no_events() {
    let mut sim = Simulator::default();
    let mut world = DummyWorld::default();

    sim.run_until(SimTime(7), &mut world);
    assert_eq!(sim.now(), SimTime(7));
    assert_eq!(world.ticks, 0);
}
