//! Pulseframe - fixed-rate multi-channel sampling with windowed inference.
//!
//! This library acquires multi-channel sensor samples at a fixed rate,
//! buffers them in bounded memory, and runs windowed machine-learning
//! inference over sliding windows to produce per-sample predictions
//! synchronized with the input stream.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Pulseframe                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐   │
//! │  │   Sources   │──▶│   Sampler   │──▶│     Windowed     │   │
//! │  │ (per tick)  │   │(timer thread│   │    Inference     │   │
//! │  └─────────────┘   │  + queue)   │   │ (raw→feat→pred)  │   │
//! │                    └─────────────┘   └──────────────────┘   │
//! │                          │                     │             │
//! │                          ▼                     ▼             │
//! │                   ┌─────────────┐      ┌─────────────┐      │
//! │                   │   Bounded   │      │ Per-sample  │      │
//! │                   │   Buffers   │      │ Predictions │      │
//! │                   └─────────────┘      └─────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sampler's timer thread polls every [`Source`] once per period and
//! publishes timestamped records through an unbounded channel; a consumer
//! drains them with [`Sampler::read`] and feeds the batches to a
//! [`WindowedInference`] pipeline, which returns exactly one prediction row
//! per input sample.
//!
//! # Example
//!
//! ```no_run
//! use pulseframe::sampler::Sampler;
//! use pulseframe::source::WaveSource;
//!
//! let sources = vec![(
//!     "wave".to_string(),
//!     Box::new(WaveSource::new(2.0, 1.0)) as Box<dyn pulseframe::source::Source>,
//! )];
//! let mut sampler = Sampler::new(sources, 100.0).expect("valid rate");
//!
//! sampler.start().expect("failed to start sampler");
//! // ... periodically: let batch = sampler.read()?;
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sampler;
pub mod source;

// Re-export key types at crate root for convenience
pub use buffer::{Buffer, Columnar, Frame, ResamplingBuffer, Series};
pub use config::{Config, ConfigError, PipelineConfig};
pub use error::{BufferError, ModelError, PipelineError, SamplerError, SourceError};
pub use pipeline::{InferenceMode, WindowSpec, WindowedInference, PREDICTED_COLUMN};
pub use sampler::Sampler;
pub use source::{Record, SampleValue, Source, SourceOutput, TIMESTAMP_COLUMN};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
