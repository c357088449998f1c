//! Deterministic signal generators.
//!
//! These stand in for hardware sensors in the demo binary and in tests,
//! the same way a platform-free collector stands in for a real event tap.

use std::f64::consts::TAU;

use crate::error::SourceError;
use crate::source::{SampleValue, Source, SourceOutput};

/// A sine wave of the given frequency and amplitude.
#[derive(Debug, Clone)]
pub struct WaveSource {
    frequency_hz: f64,
    amplitude: f64,
}

impl WaveSource {
    pub fn new(frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            frequency_hz,
            amplitude,
        }
    }
}

impl Source for WaveSource {
    fn sample(&mut self, elapsed: f64) -> Result<SourceOutput, SourceError> {
        let value = self.amplitude * (TAU * self.frequency_hz * elapsed).sin();
        Ok(SourceOutput::Single(SampleValue::Scalar(value)))
    }
}

/// Sine and cosine of one oscillator, reported as two named sub-values.
///
/// Exercises the `Named` output shape: both values are merged into the
/// record under their own names rather than the source's registered name.
#[derive(Debug, Clone)]
pub struct OscillatorSource {
    frequency_hz: f64,
}

impl OscillatorSource {
    pub fn new(frequency_hz: f64) -> Self {
        Self { frequency_hz }
    }
}

impl Source for OscillatorSource {
    fn sample(&mut self, elapsed: f64) -> Result<SourceOutput, SourceError> {
        let phase = TAU * self.frequency_hz * elapsed;
        Ok(SourceOutput::Named(vec![
            ("osc_sin".to_string(), SampleValue::Scalar(phase.sin())),
            ("osc_cos".to_string(), SampleValue::Scalar(phase.cos())),
        ]))
    }
}

/// Counts sampling ticks; useful for asserting exact sample accounting.
#[derive(Debug, Clone, Default)]
pub struct CounterSource {
    count: u64,
}

impl CounterSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Source for CounterSource {
    fn sample(&mut self, _elapsed: f64) -> Result<SourceOutput, SourceError> {
        let value = self.count as f64;
        self.count += 1;
        Ok(SourceOutput::Single(SampleValue::Scalar(value)))
    }
}
