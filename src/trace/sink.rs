//! 观测记录的输出端
//!
//! sink 只追加、保持顺序。文件格式为每行 `时间(秒)\t值...`。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::sim::SimTime;

/// 一条观测：时间戳加若干整数值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub at: SimTime,
    pub values: Vec<u64>,
}

impl Record {
    pub fn new(at: SimTime, values: Vec<u64>) -> Self {
        Self { at, values }
    }

    /// 制表符分隔的一行（不含换行）
    pub fn to_line(&self) -> String {
        let mut line = format!("{:.9}", self.at.as_secs_f64());
        for v in &self.values {
            line.push('\t');
            line.push_str(&v.to_string());
        }
        line
    }
}

/// 只追加的记录输出端
pub trait RecordSink: Send {
    fn append(&mut self, rec: Record) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 多个钩子共享同一个 sink 时的句柄；互斥锁保证单写者。
pub type SharedSink = Arc<Mutex<dyn RecordSink>>;

/// 包装成共享句柄。调用方保留具体类型的 `Arc` 以便运行结束后读取。
pub fn shared<S: RecordSink + 'static>(sink: S) -> Arc<Mutex<S>> {
    Arc::new(Mutex::new(sink))
}

/// 向共享 sink 追加一条记录（锁中毒时继续使用内部数据）
pub fn append_to(sink: &SharedSink, rec: Record) -> io::Result<()> {
    sink.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .append(rec)
}

/// 内存 sink
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<Record>,
}

impl MemorySink {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, rec: Record) -> io::Result<()> {
        self.records.push(rec);
        Ok(())
    }
}

/// 文件 sink（带缓冲；drop 时 BufWriter 自动刷出）
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    out: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn append(&mut self, rec: Record) -> io::Result<()> {
        writeln!(self.out, "{}", rec.to_line())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
