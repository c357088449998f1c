//! Sensor sources polled by the sampler.
//!
//! A [`Source`] contributes one or more named values per sampling tick. It
//! runs on the sampler's timer thread, so `sample` must stay within the
//! sampling period budget: no blocking I/O, no long computation.

pub mod queued;
pub mod synthetic;

use crate::buffer::{Frame, Series};
use crate::error::{BufferError, SourceError};

pub use queued::{PushHandle, PushSource};
pub use synthetic::{CounterSource, OscillatorSource, WaveSource};

/// One sampled value: a scalar or a fixed-width vector.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl SampleValue {
    /// Width of the column this value occupies.
    pub fn width(&self) -> usize {
        match self {
            SampleValue::Scalar(_) => 1,
            SampleValue::Vector(v) => v.len(),
        }
    }

    fn write_to(&self, series: &mut Series) -> Result<(), BufferError> {
        match self {
            SampleValue::Scalar(v) => series.push_row(&[*v]),
            SampleValue::Vector(v) => series.push_row(v),
        }
    }
}

/// What a source yields on one tick.
///
/// Sources are polymorphic in output shape: a `Single` value is stored under
/// the name the source was registered with, while `Named` sub-values are
/// merged into the record individually.
#[derive(Debug, Clone)]
pub enum SourceOutput {
    Single(SampleValue),
    Named(Vec<(String, SampleValue)>),
}

/// An external callable contributing values per sampling tick.
pub trait Source: Send {
    /// Called once from the caller's thread before sampling begins.
    fn start(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Called once after the timer thread has been joined.
    fn stop(&mut self) {}

    /// Produce this tick's value(s), given seconds elapsed since `start`.
    fn sample(&mut self, elapsed: f64) -> Result<SourceOutput, SourceError>;
}

/// One sampled instant: absolute timestamp plus the values every source
/// contributed on that tick.
#[derive(Debug, Clone)]
pub struct Record {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub values: Vec<(String, SampleValue)>,
}

impl Record {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            values: Vec::new(),
        }
    }
}

/// Column name carrying the absolute timestamp in collated batches.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Collate records into one columnar batch, preserving arrival order.
///
/// All records must carry the same value names and widths; a disagreement is
/// a `ShapeMismatch` or `ColumnSetMismatch`.
pub fn collate(records: &[Record]) -> Result<Frame, BufferError> {
    let Some(first) = records.first() else {
        return Ok(Frame::new());
    };

    let mut columns: Vec<(String, Series)> = Vec::with_capacity(first.values.len() + 1);
    columns.push((TIMESTAMP_COLUMN.to_string(), Series::new(1)));
    for (name, value) in &first.values {
        columns.push((name.clone(), Series::new(value.width())));
    }

    for record in records {
        if record.values.len() != first.values.len() {
            return Err(BufferError::ColumnSetMismatch {
                expected: first.values.iter().map(|(n, _)| n.clone()).collect(),
                got: record.values.iter().map(|(n, _)| n.clone()).collect(),
            });
        }
        columns[0].1.push_row(&[record.timestamp])?;
        for (slot, (name, value)) in columns[1..].iter_mut().zip(&record.values) {
            if slot.0 != *name {
                return Err(BufferError::ColumnSetMismatch {
                    expected: vec![slot.0.clone()],
                    got: vec![name.clone()],
                });
            }
            value.write_to(&mut slot.1)?;
        }
    }

    Frame::from_columns(columns)
}
