//! Bounded column-oriented buffers for sampled data.
//!
//! [`Buffer`] provides append-only storage with FIFO eviction over either
//! storage variant ([`Series`] or [`Frame`]); [`ResamplingBuffer`] adds
//! phase-correct fixed-stride decimation on top.

pub mod bounded;
pub mod columnar;
pub mod resample;

pub use bounded::Buffer;
pub use columnar::{Columnar, Frame, Series};
pub use resample::ResamplingBuffer;
