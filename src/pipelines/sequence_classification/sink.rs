use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use derive_new::new;
use serde::{Deserialize, Serialize};

/// A destination for scalar metrics, keyed by tag and global step
pub trait Sink {
    /// Record one value
    fn record_scalar(&mut self, tag: &str, value: f64, step: usize);
}

/// One recorded value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Scalar {
    /// The metric name, such as `train/loss`
    pub tag: String,

    /// The metric value
    pub value: f64,

    /// The global step the value belongs to
    pub step: usize,
}

/// Writes every scalar as a structured `log` line
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn record_scalar(&mut self, tag: &str, value: f64, step: usize) {
        info!("step={} {}={:.6}", step, tag, value);
    }
}

/// Writes one JSON object per scalar to a file
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Create (or truncate) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl Sink for JsonLinesSink {
    fn record_scalar(&mut self, tag: &str, value: f64, step: usize) {
        let scalar = Scalar::new(tag.to_string(), value, step);

        let result = serde_json::to_writer(&mut self.writer, &scalar)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());

        if let Err(e) = result {
            warn!("Unable to record {} at step {}: {}", tag, step, e);
        }
    }
}

/// Keeps every scalar in memory
#[derive(Clone, Debug, Default)]
pub struct History {
    /// Every scalar in the order it was recorded
    pub scalars: Vec<Scalar>,
}

impl History {
    /// The (step, value) pairs recorded for a tag
    pub fn values(&self, tag: &str) -> Vec<(usize, f64)> {
        self.scalars
            .iter()
            .filter(|scalar| scalar.tag == tag)
            .map(|scalar| (scalar.step, scalar.value))
            .collect()
    }
}

impl Sink for History {
    fn record_scalar(&mut self, tag: &str, value: f64, step: usize) {
        self.scalars.push(Scalar::new(tag.to_string(), value, step));
    }
}

/// Sends every scalar to several sinks
#[derive(Default)]
pub struct Fanout<'a> {
    sinks: Vec<&'a mut dyn Sink>,
}

impl<'a> Fanout<'a> {
    /// Add a sink
    pub fn with(mut self, sink: &'a mut dyn Sink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Sink for Fanout<'_> {
    fn record_scalar(&mut self, tag: &str, value: f64, step: usize) {
        for sink in self.sinks.iter_mut() {
            sink.record_scalar(tag, value, step);
        }
    }
}
