//! 指标时间序列

use std::io;

use crate::sim::SimTime;
use crate::trace::{Record, RecordSink};

/// 只追加的 `(时间, 值)` 序列；时间严格递增。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSeries {
    points: Vec<(SimTime, u64)>,
}

impl MetricSeries {
    pub fn push(&mut self, at: SimTime, value: u64) {
        debug_assert!(
            self.points.last().is_none_or(|&(t, _)| t < at),
            "metric series timestamps must strictly increase"
        );
        self.points.push((at, value));
    }

    pub fn points(&self) -> &[(SimTime, u64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<(SimTime, u64)> {
        self.points.last().copied()
    }

    /// 按顺序写入 sink，每个点一行 `时间\t值`。
    pub fn write_to(&self, sink: &mut dyn RecordSink) -> io::Result<()> {
        for &(at, v) in &self.points {
            sink.append(Record::new(at, vec![v]))?;
        }
        sink.flush()
    }
}
