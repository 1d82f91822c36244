use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn transmit_time_rounds_up_to_the_next_nanosecond() {
    // 512 B @ 300 kb/s = 13.6533... ms
    assert_eq!(SimTime::transmit_time(512, 300_000), Some(SimTime(13_653_334)));
    // 1500 B @ 1 Mb/s = 12 ms，整除时不进位
    assert_eq!(SimTime::transmit_time(1500, 1_000_000), Some(SimTime::from_millis(12)));
    // 1 bit 也至少 1 ns
    assert_eq!(SimTime::transmit_time(1, u64::MAX), Some(SimTime(1)));
}

#[test]
fn transmit_time_rejects_zero_rate() {
    assert_eq!(SimTime::transmit_time(512, 0), None);
    assert_eq!(SimTime::transmit_time(0, 1_000), Some(SimTime::ZERO));
}

#[test]
fn secs_f64_round_trip_and_rejects_negative() {
    assert_eq!(SimTime::from_secs_f64(0.01), Some(SimTime::from_millis(10)));
    assert_eq!(SimTime::from_secs_f64(-1.0), None);
    assert_eq!(SimTime::from_secs_f64(f64::NAN), None);
    assert!((SimTime::from_millis(1800).as_secs_f64() - 1.8).abs() < 1e-12);
}
