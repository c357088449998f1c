//! Hand-off source for continuously-capturing producers.
//!
//! Most buffers in this crate are single-owner and need no locking: the
//! timer thread is the only executor of source callbacks, and the sampler's
//! queue is the only cross-thread channel. A source that captures on its own
//! thread (an event tap, an audio callback) is the one exception to that
//! rule and needs its own explicit hand-off, which this module provides.

use std::sync::{Arc, Mutex};

use crate::error::SourceError;
use crate::source::{SampleValue, Source, SourceOutput};

/// Shared slot holding the most recent pushed value.
#[derive(Debug)]
struct Shared {
    latest: Mutex<SampleValue>,
}

/// Producer side: cloneable, safe to call from any thread.
#[derive(Debug, Clone)]
pub struct PushHandle {
    shared: Arc<Shared>,
}

impl PushHandle {
    /// Publish a new scalar value.
    pub fn push(&self, value: f64) {
        self.push_value(SampleValue::Scalar(value));
    }

    /// Publish a new value of any shape. The shape must stay fixed for the
    /// lifetime of the stream, like any other source output.
    pub fn push_value(&self, value: SampleValue) {
        *self.shared.latest.lock().expect("push slot poisoned") = value;
    }
}

/// A source fed by an external thread through a [`PushHandle`].
///
/// `sample` reports the most recently pushed value (sample-and-hold); ticks
/// between pushes repeat the previous value.
#[derive(Debug)]
pub struct PushSource {
    shared: Arc<Shared>,
}

impl PushSource {
    /// Create the source and its producer handle, seeded with `initial`.
    pub fn new(initial: SampleValue) -> (Self, PushHandle) {
        let shared = Arc::new(Shared {
            latest: Mutex::new(initial),
        });
        (
            Self {
                shared: shared.clone(),
            },
            PushHandle { shared },
        )
    }
}

impl Source for PushSource {
    fn sample(&mut self, _elapsed: f64) -> Result<SourceOutput, SourceError> {
        let value = self.shared.latest.lock().expect("push slot poisoned").clone();
        Ok(SourceOutput::Single(value))
    }
}
