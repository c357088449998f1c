//! Windowed real-time inference over a sampled stream.
//!
//! Three buffers reconcile three time granularities: a raw buffer holds
//! unconsumed samples awaiting windowing, a feature buffer holds
//! preprocessed windows awaiting lookback aggregation, and a prediction
//! queue holds upsampled per-sample predictions not yet returned. Every call
//! to [`WindowedInference::process`] returns exactly one prediction row per
//! input sample.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buffer::{Buffer, Columnar, Frame, Series};
use crate::error::{ModelError, PipelineError};

/// How feature windows are consumed per inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Predict on the oldest `lookback` feature rows, then advance by one:
    /// every window is re-evaluated up to `lookback` times as the lookback
    /// slides over it.
    SlidingLookback,
    /// Consume the oldest `lookback` feature rows per inference; windows
    /// map 1:1 onto inferences when `lookback` is 1.
    FixedStride,
}

/// Window geometry for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Raw samples per window.
    pub win_size: usize,
    /// Raw samples a window advances by between extractions.
    pub hop_length: usize,
    /// Consecutive feature windows fed to the model per inference.
    pub lookback: usize,
    pub mode: InferenceMode,
}

/// Preprocessing callback: raw window table to feature row(s).
pub type PreprocessFn = Box<dyn FnMut(&Frame) -> Result<Series, ModelError> + Send>;

/// Prediction callback: feature matrix to one probability vector.
pub type PredictFn = Box<dyn FnMut(&Series) -> Result<Vec<f64>, ModelError> + Send>;

/// Column name carrying the arg-max class index in pipeline output.
pub const PREDICTED_COLUMN: &str = "y_pred";

/// Chains raw, feature and prediction buffers through externally supplied
/// preprocess and predict functions.
///
/// Single-threaded and synchronous; call it from one logical thread at a
/// time. Preprocess/predict failures propagate unchanged to the caller, with
/// no internal retry.
pub struct WindowedInference {
    spec: WindowSpec,
    output_names: Vec<String>,
    raw: Buffer<Frame>,
    features: Buffer<Series>,
    predictions: Buffer<Series>,
    preprocess: PreprocessFn,
    predict: PredictFn,
    desync_count: u64,
}

impl WindowedInference {
    pub fn new(
        spec: WindowSpec,
        output_names: Vec<String>,
        preprocess: PreprocessFn,
        predict: PredictFn,
    ) -> Result<Self, PipelineError> {
        if spec.win_size < 1 {
            return Err(PipelineError::InvalidConfig(
                "win_size must be at least 1".into(),
            ));
        }
        if spec.hop_length < 1 || spec.hop_length > spec.win_size {
            return Err(PipelineError::InvalidConfig(format!(
                "hop_length must be in 1..={}, got {}",
                spec.win_size, spec.hop_length
            )));
        }
        if spec.lookback < 1 {
            return Err(PipelineError::InvalidConfig(
                "lookback must be at least 1".into(),
            ));
        }
        if output_names.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one output class is required".into(),
            ));
        }
        if output_names.iter().any(|n| n == PREDICTED_COLUMN) {
            return Err(PipelineError::InvalidConfig(format!(
                "'{PREDICTED_COLUMN}' is reserved for the arg-max column"
            )));
        }

        let mut predictions = Buffer::unbounded();
        predictions.extend(warmup_rows(&spec, output_names.len()))?;

        Ok(Self {
            spec,
            output_names,
            raw: Buffer::unbounded(),
            features: Buffer::unbounded(),
            predictions,
            preprocess,
            predict,
            desync_count: 0,
        })
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Times the desync condition has been observed so far.
    pub fn desync_count(&self) -> u64 {
        self.desync_count
    }

    /// Feed a raw batch and get exactly one prediction row per input row.
    ///
    /// Rows the pipeline cannot predict yet (warm-up) come back as all-zero
    /// scores with class index 0.
    pub fn process(&mut self, batch: Frame) -> Result<Frame, PipelineError> {
        let n = batch.len();
        let n_classes = self.output_names.len();
        self.raw.extend(batch)?;

        // Slide windows out of the raw buffer into feature rows.
        while self.raw.len() >= self.spec.win_size {
            let window = self.raw.view_front(self.spec.win_size);
            let features = (self.preprocess)(&window).map_err(PipelineError::Model)?;
            self.features.extend(features)?;
            self.raw.popleft(self.spec.hop_length)?;
        }

        // Run inference whenever enough feature windows are queued.
        while self.features.len() >= self.spec.lookback {
            let scores = match self.spec.mode {
                InferenceMode::SlidingLookback => {
                    let input = self.features.view_front(self.spec.lookback);
                    let scores = (self.predict)(&input).map_err(PipelineError::Model)?;
                    self.features.popleft(1)?;
                    scores
                }
                InferenceMode::FixedStride => {
                    let input = self.features.popleft(self.spec.lookback)?;
                    (self.predict)(&input).map_err(PipelineError::Model)?
                }
            };
            assert_eq!(
                scores.len(),
                n_classes,
                "predict returned {} scores for {} classes",
                scores.len(),
                n_classes
            );
            // One prediction per window; upsample to one per raw sample.
            let upsampled =
                Series::from_rows(n_classes, scores.repeat(self.spec.hop_length))?;
            self.predictions.extend(upsampled)?;
        }

        // Exactly n rows out: queued predictions first, zero rows for any
        // warm-up shortfall.
        let available = self.predictions.len().min(n);
        let mut rows = if available > 0 {
            self.predictions.popleft(available)?
        } else {
            Series::new(n_classes)
        };
        if rows.len() < n {
            rows.concat(&Series::zeros(n - rows.len(), n_classes));
        }

        if self.predictions.len() + self.raw.len() > self.spec.win_size {
            self.desync_count += 1;
            warn!(
                queued = self.predictions.len(),
                raw = self.raw.len(),
                win_size = self.spec.win_size,
                "predictions out of sync: queue contains stale outputs"
            );
        }

        self.build_output(&rows)
    }

    /// Drop all buffered state and re-seed the warm-up rows.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        self.raw.clear();
        self.features.clear();
        self.predictions.clear();
        self.predictions
            .extend(warmup_rows(&self.spec, self.output_names.len()))?;
        self.desync_count = 0;
        Ok(())
    }

    /// Per-class score columns plus the arg-max class index.
    fn build_output(&self, rows: &Series) -> Result<Frame, PipelineError> {
        let mut predicted = Vec::with_capacity(rows.len());
        for row in rows.rows() {
            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (i, score) in row.iter().enumerate() {
                if *score > best_score {
                    best_score = *score;
                    best = i;
                }
            }
            predicted.push(best as f64);
        }

        let mut columns = Vec::with_capacity(self.output_names.len() + 1);
        for (i, name) in self.output_names.iter().enumerate() {
            let scores = rows.component(i).unwrap_or_default();
            columns.push((name.clone(), Series::scalars(scores)));
        }
        columns.push((PREDICTED_COLUMN.to_string(), Series::scalars(predicted)));
        Ok(Frame::from_columns(columns)?)
    }
}

/// Zero rows covering the gap between the stream start and the first
/// prediction: the first window's output covers only the last `hop` samples
/// it advanced by, leaving `win_size - hop` leading samples without one.
fn warmup_rows(spec: &WindowSpec, n_classes: usize) -> Series {
    Series::zeros(spec.win_size - spec.hop_length, n_classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_batch(values: &[f64]) -> Frame {
        Frame::from_columns([("x", Series::scalars(values.to_vec()))]).unwrap()
    }

    /// Mean of the window's `x` column as a single feature.
    fn mean_preprocess() -> PreprocessFn {
        Box::new(|window: &Frame| {
            let x = window.column("x").expect("missing x column");
            let mean = x.values().iter().sum::<f64>() / x.len() as f64;
            Ok(Series::scalars(vec![mean]))
        })
    }

    /// Two classes: "high" wins when the newest feature exceeds 0.5.
    fn threshold_predict() -> PredictFn {
        Box::new(|features: &Series| {
            let last = features.values().last().copied().unwrap_or(0.0);
            let p_high = if last > 0.5 { 0.9 } else { 0.1 };
            Ok(vec![1.0 - p_high, p_high])
        })
    }

    fn pipeline(win: usize, hop: usize, lookback: usize, mode: InferenceMode) -> WindowedInference {
        WindowedInference::new(
            WindowSpec {
                win_size: win,
                hop_length: hop,
                lookback,
                mode,
            },
            vec!["low".to_string(), "high".to_string()],
            mean_preprocess(),
            threshold_predict(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let make = |win, hop, lookback| {
            WindowedInference::new(
                WindowSpec {
                    win_size: win,
                    hop_length: hop,
                    lookback,
                    mode: InferenceMode::FixedStride,
                },
                vec!["a".to_string()],
                mean_preprocess(),
                threshold_predict(),
            )
        };
        assert!(matches!(make(0, 1, 1), Err(PipelineError::InvalidConfig(_))));
        assert!(matches!(make(4, 0, 1), Err(PipelineError::InvalidConfig(_))));
        assert!(matches!(make(4, 5, 1), Err(PipelineError::InvalidConfig(_))));
        assert!(matches!(make(4, 2, 0), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_warmup_scenario() {
        // win 4, hop 2, lookback 1: the first window's prediction covers
        // samples 3 and 4, so one call with 4 samples returns
        // [default, default, pred, pred].
        let mut pipe = pipeline(4, 2, 1, InferenceMode::FixedStride);
        let out = pipe.process(raw_batch(&[1.0, 1.0, 1.0, 1.0])).unwrap();

        assert_eq!(out.len(), 4);
        let high = out.column("high").unwrap().values().to_vec();
        assert_eq!(high[..2], [0.0, 0.0]);
        assert_eq!(high[2..], [0.9, 0.9]);
        let y = out.column(PREDICTED_COLUMN).unwrap().values().to_vec();
        assert_eq!(y, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_one_prediction_per_sample_across_chunkings() {
        for chunk in [1usize, 2, 3, 5, 7] {
            let mut pipe = pipeline(6, 3, 2, InferenceMode::SlidingLookback);
            let stream: Vec<f64> = (0..40).map(|i| (i % 4) as f64).collect();
            let mut total = 0;
            for batch in stream.chunks(chunk) {
                let out = pipe.process(raw_batch(batch)).unwrap();
                assert_eq!(out.len(), batch.len());
                total += out.len();
            }
            assert_eq!(total, stream.len());
            assert_eq!(pipe.desync_count(), 0);
        }
    }

    #[test]
    fn test_all_defaults_before_first_window() {
        let mut pipe = pipeline(8, 4, 1, InferenceMode::FixedStride);
        let out = pipe.process(raw_batch(&[9.0; 7])).unwrap();
        assert_eq!(out.len(), 7);
        assert!(out.column("high").unwrap().values().iter().all(|v| *v == 0.0));
        assert!(out.column("low").unwrap().values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_sliding_lookback_reevaluates_windows() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let mut pipe = WindowedInference::new(
            WindowSpec {
                win_size: 2,
                hop_length: 2,
                lookback: 2,
                mode: InferenceMode::SlidingLookback,
            },
            vec!["a".to_string()],
            mean_preprocess(),
            Box::new(move |features: &Series| {
                calls_in.fetch_add(1, Ordering::SeqCst);
                assert_eq!(features.len(), 2);
                Ok(vec![1.0])
            }),
        )
        .unwrap();

        // 8 samples -> 4 windows -> lookback pairs (1,2), (2,3), (3,4).
        for chunk in [2, 2, 2, 2] {
            pipe.process(raw_batch(&vec![1.0; chunk])).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_sliding_lookback_walks_a_backlog_front_to_back() {
        use std::sync::{Arc, Mutex};

        let inputs: Arc<Mutex<Vec<Vec<f64>>>> = Arc::new(Mutex::new(Vec::new()));
        let inputs_in = inputs.clone();
        let mut pipe = WindowedInference::new(
            WindowSpec {
                win_size: 2,
                hop_length: 1,
                lookback: 2,
                mode: InferenceMode::SlidingLookback,
            },
            vec!["a".to_string()],
            mean_preprocess(),
            Box::new(move |features: &Series| {
                inputs_in.lock().unwrap().push(features.values().to_vec());
                Ok(vec![1.0])
            }),
        )
        .unwrap();

        // One call backlogs three feature means (1, 3, 5); the lookback
        // must slide over them from the oldest pair, evaluating each pair
        // exactly once.
        pipe.process(raw_batch(&[0.0, 2.0, 4.0, 6.0])).unwrap();
        let seen = inputs.lock().unwrap().clone();
        assert_eq!(seen, vec![vec![1.0, 3.0], vec![3.0, 5.0]]);
    }

    #[test]
    fn test_desync_counts_when_predictions_accumulate() {
        // A preprocess emitting two feature rows per window outpaces the
        // consumer: the prediction queue grows past win_size and the
        // desync condition trips.
        let mut pipe = WindowedInference::new(
            WindowSpec {
                win_size: 4,
                hop_length: 2,
                lookback: 1,
                mode: InferenceMode::FixedStride,
            },
            vec!["low".to_string(), "high".to_string()],
            Box::new(|_: &Frame| Ok(Series::scalars(vec![1.0, 1.0]))),
            threshold_predict(),
        )
        .unwrap();

        let out = pipe.process(raw_batch(&[1.0; 4])).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(pipe.desync_count(), 0);

        // Second call: four windows' worth of predictions are queued while
        // only four samples arrive.
        let out = pipe.process(raw_batch(&[1.0; 4])).unwrap();
        assert_eq!(out.len(), 4);
        assert!(pipe.desync_count() > 0);
    }

    #[test]
    fn test_fixed_stride_consumes_lookback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let mut pipe = WindowedInference::new(
            WindowSpec {
                win_size: 2,
                hop_length: 2,
                lookback: 2,
                mode: InferenceMode::FixedStride,
            },
            vec!["a".to_string()],
            mean_preprocess(),
            Box::new(move |_: &Series| {
                calls_in.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1.0])
            }),
        )
        .unwrap();

        // 8 samples -> 4 windows -> non-overlapping pairs (1,2), (3,4).
        pipe.process(raw_batch(&[1.0; 8])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_model_errors_propagate() {
        let mut pipe = WindowedInference::new(
            WindowSpec {
                win_size: 2,
                hop_length: 1,
                lookback: 1,
                mode: InferenceMode::FixedStride,
            },
            vec!["a".to_string()],
            mean_preprocess(),
            Box::new(|_: &Series| Err("model exploded".into())),
        )
        .unwrap();

        let err = pipe.process(raw_batch(&[1.0, 2.0])).unwrap_err();
        match err {
            PipelineError::Model(e) => assert_eq!(e.to_string(), "model exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reset_restores_warmup() {
        let mut pipe = pipeline(4, 2, 1, InferenceMode::FixedStride);
        pipe.process(raw_batch(&[1.0; 10])).unwrap();
        pipe.reset().unwrap();

        let out = pipe.process(raw_batch(&[1.0, 1.0])).unwrap();
        // Right after reset the first two rows are warm-up defaults again.
        assert!(out.column("high").unwrap().values().iter().all(|v| *v == 0.0));
    }
}
