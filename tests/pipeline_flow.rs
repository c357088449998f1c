//! Integration test: a live sampler feeding the windowed inference pipeline.

use std::thread;
use std::time::Duration;

use pulseframe::{
    buffer::Columnar,
    pipeline::{InferenceMode, WindowSpec, WindowedInference},
    sampler::Sampler,
    source::{CounterSource, PushSource, SampleValue, Source, TIMESTAMP_COLUMN},
    Series, PREDICTED_COLUMN,
};

#[test]
fn test_sampler_feeds_pipeline_one_prediction_per_sample() {
    let (push_source, handle) = PushSource::new(SampleValue::Scalar(0.0));
    let sources: Vec<(String, Box<dyn Source>)> = vec![
        ("count".to_string(), Box::new(CounterSource::new())),
        ("level".to_string(), Box::new(push_source)),
    ];
    let mut sampler = Sampler::new(sources, 200.0).expect("valid rate");

    let mut pipeline = WindowedInference::new(
        WindowSpec {
            win_size: 8,
            hop_length: 4,
            lookback: 1,
            mode: InferenceMode::FixedStride,
        },
        vec!["low".to_string(), "high".to_string()],
        Box::new(|window| {
            let level = window.column("level").ok_or("missing level column")?;
            let mean = level.values().iter().sum::<f64>() / level.len() as f64;
            Ok(Series::scalars(vec![mean]))
        }),
        Box::new(|features| {
            let mean = features.values().last().copied().unwrap_or(0.0);
            let p = if mean > 0.5 { 1.0 } else { 0.0 };
            Ok(vec![1.0 - p, p])
        }),
    )
    .expect("valid pipeline");

    sampler.start().expect("failed to start sampler");
    handle.push(1.0);

    let mut total_in = 0usize;
    let mut total_out = 0usize;
    let mut high_seen = false;

    for _ in 0..6 {
        thread::sleep(Duration::from_millis(50));
        let batch = sampler.read().expect("read failed");
        if batch.is_empty() {
            continue;
        }
        assert!(batch.column(TIMESTAMP_COLUMN).is_some());
        total_in += batch.len();

        let predictions = pipeline.process(batch).expect("pipeline failed");
        total_out += predictions.len();

        let y = predictions.column(PREDICTED_COLUMN).expect("missing y_pred");
        if y.values().iter().any(|v| *v == 1.0) {
            high_seen = true;
        }
    }

    sampler.stop().expect("failed to stop sampler");

    // Exactly one prediction per sampled record, across all batches.
    assert_eq!(total_in, total_out);
    assert!(total_in > 0, "sampler produced no records");
    // The pushed level of 1.0 must eventually surface as the "high" class.
    assert!(high_seen, "pipeline never left the warm-up default");
    assert_eq!(pipeline.desync_count(), 0);
}

#[test]
fn test_timestamps_are_monotonic_and_ordered() {
    let sources: Vec<(String, Box<dyn Source>)> =
        vec![("count".to_string(), Box::new(CounterSource::new()))];
    let mut sampler = Sampler::new(sources, 500.0).expect("valid rate");

    sampler.start().expect("failed to start sampler");
    thread::sleep(Duration::from_millis(100));
    sampler.stop().expect("failed to stop sampler");

    let batch = sampler.read().expect("read failed");
    assert!(batch.len() > 1);

    let timestamps = batch.column(TIMESTAMP_COLUMN).unwrap().values().to_vec();
    assert!(
        timestamps.windows(2).all(|w| w[0] <= w[1]),
        "timestamps out of arrival order"
    );

    let counts = batch.column("count").unwrap().values().to_vec();
    let expected: Vec<f64> = (0..counts.len()).map(|i| i as f64).collect();
    assert_eq!(counts, expected, "records dropped or reordered");
}
