//! Fixed-rate sampling engine.
//!
//! A dedicated timer thread polls every registered source once per period,
//! merges the outputs into a timestamped [`Record`] and publishes it on an
//! unbounded channel. The consumer drains the channel with [`Sampler::read`].
//!
//! The timer loop is drift-resistant: each iteration captures its start
//! instant, runs the callbacks, then spin-sleeps in short naps until the
//! next deadline. OS sleep resolution is too coarse for sensor-rate
//! sampling, and downstream window alignment is sensitive to jitter, so the
//! loop trades CPU for sub-millisecond accuracy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use crate::buffer::Frame;
use crate::error::{SamplerError, SourceError};
use crate::source::{collate, Record, Source, SourceOutput};

/// Default nap length inside the spin-wait.
pub const DEFAULT_SPIN_SLEEP: Duration = Duration::from_micros(1);

type NamedSources = Vec<(String, Box<dyn Source>)>;

/// Seconds since the Unix epoch.
fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

/// Polls named sources at a fixed rate on a dedicated timer thread.
///
/// Concurrency contract: the timer thread is the only executor of source
/// callbacks; a single caller thread executes `read()`; the channel between
/// them is the sole synchronization point. The channel is unbounded, so the
/// producer never blocks on the consumer; a consumer that stops draining
/// lets the queue grow without limit.
pub struct Sampler {
    period: Duration,
    spin_sleep: Duration,
    /// Present while stopped; moved onto the timer thread while running.
    sources: Option<NamedSources>,
    tx: Sender<Record>,
    rx: Receiver<Record>,
    stop_flag: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<SourceError>>>,
    handle: Option<JoinHandle<NamedSources>>,
    start_time: Option<f64>,
    active: bool,
}

impl Sampler {
    /// Create a sampler over an ordered list of named sources at
    /// `sample_rate` Hz.
    pub fn new(sources: NamedSources, sample_rate: f64) -> Result<Self, SamplerError> {
        Self::with_spin_sleep(sources, sample_rate, DEFAULT_SPIN_SLEEP)
    }

    /// As [`new`](Sampler::new), with an explicit spin-wait nap length.
    pub fn with_spin_sleep(
        sources: NamedSources,
        sample_rate: f64,
        spin_sleep: Duration,
    ) -> Result<Self, SamplerError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SamplerError::InvalidRate(sample_rate));
        }
        let (tx, rx) = unbounded();
        Ok(Self {
            period: Duration::from_secs_f64(1.0 / sample_rate),
            spin_sleep,
            sources: Some(sources),
            tx,
            rx,
            stop_flag: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
            handle: None,
            start_time: None,
            active: false,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start the sources and launch the timer thread.
    ///
    /// A panic on a previous timer thread loses the sources; restarting
    /// after one fails rather than sampling nothing.
    pub fn start(&mut self) -> Result<(), SamplerError> {
        if self.active {
            return Err(SamplerError::AlreadyRunning);
        }
        let mut sources = self.sources.take().ok_or(SamplerError::WorkerPanic)?;

        for i in 0..sources.len() {
            if let Err(e) = sources[i].1.start() {
                // Wind back the hooks that already ran.
                for (_, source) in &mut sources[..i] {
                    source.stop();
                }
                self.sources = Some(sources);
                return Err(SamplerError::Source(e));
            }
        }

        let start_time = now_secs();
        self.start_time = Some(start_time);
        self.stop_flag.store(false, Ordering::SeqCst);

        let stop_flag = self.stop_flag.clone();
        let failure = self.failure.clone();
        let tx = self.tx.clone();
        let period = self.period;
        let spin_sleep = self.spin_sleep;

        self.handle = Some(thread::spawn(move || {
            run_timer_loop(
                sources, start_time, period, spin_sleep, stop_flag, failure, tx,
            )
        }));
        self.active = true;
        debug!(period_us = self.period.as_micros() as u64, "sampler started");
        Ok(())
    }

    /// Stop the timer thread and the sources.
    ///
    /// By the time this returns the thread has been joined in full: no
    /// further callback will execute and no further record will be
    /// enqueued. A source failure captured on the timer thread and not yet
    /// surfaced through `read()` is re-raised here.
    pub fn stop(&mut self) -> Result<(), SamplerError> {
        if !self.active {
            return Err(SamplerError::NotRunning);
        }
        self.active = false;
        self.stop_flag.store(true, Ordering::SeqCst);

        let handle = self.handle.take().ok_or(SamplerError::WorkerPanic)?;
        let mut sources = handle.join().map_err(|_| SamplerError::WorkerPanic)?;

        // The thread owned the sources, so the stop hooks run after the
        // join; the no-callback-after-stop guarantee is unaffected.
        for (_, source) in &mut sources {
            source.stop();
        }
        self.sources = Some(sources);
        debug!("sampler stopped");

        if let Some(e) = self.failure.lock().expect("failure slot poisoned").take() {
            return Err(SamplerError::Source(e));
        }
        Ok(())
    }

    /// Drain all currently queued records into one columnar batch.
    ///
    /// Non-blocking: returns an empty frame when nothing is queued. Arrival
    /// order is preserved. A source failure captured on the timer thread is
    /// re-raised here instead of returning data.
    pub fn read(&mut self) -> Result<Frame, SamplerError> {
        if let Some(e) = self.failure.lock().expect("failure slot poisoned").take() {
            return Err(SamplerError::Source(e));
        }
        let mut records = Vec::new();
        while let Ok(record) = self.rx.try_recv() {
            records.push(record);
        }
        Ok(collate(&records)?)
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if self.active {
            let _ = self.stop();
        }
    }
}

/// The fixed-rate loop run by the timer thread. Returns the sources so the
/// owner can run their stop hooks and restart later.
fn run_timer_loop(
    mut sources: NamedSources,
    start_time: f64,
    period: Duration,
    spin_sleep: Duration,
    stop_flag: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<SourceError>>>,
    tx: Sender<Record>,
) -> NamedSources {
    while !stop_flag.load(Ordering::SeqCst) {
        let loop_start = Instant::now();
        let t = now_secs();

        let mut record = Record::new(t);
        for (name, source) in &mut sources {
            match source.sample(t - start_time) {
                Ok(SourceOutput::Single(value)) => {
                    record.values.push((name.clone(), value));
                }
                Ok(SourceOutput::Named(values)) => {
                    record.values.extend(values);
                }
                Err(e) => {
                    // Capture and terminate; the owner re-raises from
                    // read() or stop().
                    *failure.lock().expect("failure slot poisoned") = Some(e);
                    return sources;
                }
            }
        }

        if tx.send(record).is_err() {
            break;
        }

        let deadline = loop_start + period;
        while Instant::now() < deadline {
            thread::sleep(spin_sleep);
        }
    }
    sources
}
