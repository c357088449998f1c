//! Pulseframe CLI
//!
//! Demonstrates the full data flow on synthetic sources: fixed-rate
//! sampling into a queue, batch reads, and windowed inference producing one
//! prediction per sample.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::info;

use pulseframe::{
    buffer::{Columnar, Frame, Series},
    config::Config,
    pipeline::{InferenceMode, WindowSpec, WindowedInference, PREDICTED_COLUMN},
    sampler::Sampler,
    source::{OscillatorSource, Source, WaveSource},
    VERSION,
};

#[derive(Parser)]
#[command(name = "pulseframe")]
#[command(version = VERSION)]
#[command(about = "Fixed-rate sampling with windowed inference", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample synthetic sources and run windowed inference
    Run {
        /// Sampling rate in Hz
        #[arg(long, default_value = "100.0")]
        rate: f64,

        /// How long to run, in seconds (0 = until Ctrl+C)
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Raw samples per window
        #[arg(long, default_value = "50")]
        win_size: usize,

        /// Samples the window advances by between extractions
        #[arg(long, default_value = "10")]
        hop: usize,

        /// Feature windows fed to the model per inference
        #[arg(long, default_value = "1")]
        lookback: usize,

        /// Re-evaluate windows as the lookback slides (stride-1 inference)
        #[arg(long)]
        sliding: bool,

        /// Frequency of the demo wave source, in Hz
        #[arg(long, default_value = "2.0")]
        wave_hz: f64,
    },

    /// Show the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            rate,
            seconds,
            win_size,
            hop,
            lookback,
            sliding,
            wave_hz,
        } => {
            cmd_run(rate, seconds, win_size, hop, lookback, sliding, wave_hz);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn cmd_run(
    rate: f64,
    seconds: u64,
    win_size: usize,
    hop: usize,
    lookback: usize,
    sliding: bool,
    wave_hz: f64,
) {
    println!("Pulseframe v{VERSION}");
    println!("  Rate: {rate} Hz");
    println!("  Window: {win_size} samples, hop {hop}, lookback {lookback}");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let sources: Vec<(String, Box<dyn Source>)> = vec![
        ("wave".to_string(), Box::new(WaveSource::new(wave_hz, 1.0))),
        ("osc".to_string(), Box::new(OscillatorSource::new(0.2))),
    ];

    let mut sampler = match Sampler::new(sources, rate) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error creating sampler: {e}");
            std::process::exit(1);
        }
    };

    let mode = if sliding {
        InferenceMode::SlidingLookback
    } else {
        InferenceMode::FixedStride
    };
    let mut pipeline = match WindowedInference::new(
        WindowSpec {
            win_size,
            hop_length: hop,
            lookback,
            mode,
        },
        vec!["quiet".to_string(), "active".to_string()],
        Box::new(wave_energy_preprocess),
        Box::new(energy_threshold_predict),
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error creating pipeline: {e}");
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    if let Err(e) = sampler.start() {
        eprintln!("Error starting sampler: {e}");
        std::process::exit(1);
    }

    let started = Instant::now();
    let mut total_samples = 0usize;
    let mut class_counts = [0usize; 2];
    let mut last_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        if seconds > 0 && started.elapsed() >= Duration::from_secs(seconds) {
            break;
        }
        thread::sleep(Duration::from_millis(100));

        let batch = match sampler.read() {
            Ok(batch) => batch,
            Err(e) => {
                eprintln!("Sampler failed: {e}");
                break;
            }
        };
        if batch.is_empty() {
            continue;
        }

        let predictions = match pipeline.process(batch) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Pipeline failed: {e}");
                break;
            }
        };

        total_samples += predictions.len();
        if let Some(y) = predictions.column(PREDICTED_COLUMN) {
            for value in y.values() {
                class_counts[(*value as usize).min(1)] += 1;
            }
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            info!(
                total_samples,
                quiet = class_counts[0],
                active = class_counts[1],
                desyncs = pipeline.desync_count(),
                "pipeline progress"
            );
            last_report = Instant::now();
        }
    }

    println!();
    println!("Stopping...");
    if let Err(e) = sampler.stop() {
        eprintln!("Error stopping sampler: {e}");
    }

    println!();
    println!("Processed {total_samples} samples");
    println!("  quiet:  {}", class_counts[0]);
    println!("  active: {}", class_counts[1]);
    println!("  desync warnings: {}", pipeline.desync_count());
}

fn cmd_config() {
    match Config::load() {
        Ok(config) => match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("Configuration file: {:?}", Config::config_path());
                println!("{json}");
            }
            Err(e) => eprintln!("Error serializing config: {e}"),
        },
        Err(e) => eprintln!("Error loading config: {e}"),
    }
}

/// RMS energy of the demo wave channel over one window.
fn wave_energy_preprocess(
    window: &Frame,
) -> Result<Series, pulseframe::error::ModelError> {
    let wave = window
        .column("wave")
        .ok_or("window is missing the 'wave' column")?;
    let n = wave.len().max(1);
    let energy =
        (wave.values().iter().map(|v| v * v).sum::<f64>() / n as f64).sqrt();
    Ok(Series::scalars(vec![energy]))
}

/// Two-class score from the newest feature: "active" above 0.3 RMS.
fn energy_threshold_predict(
    features: &Series,
) -> Result<Vec<f64>, pulseframe::error::ModelError> {
    let energy = features.values().last().copied().unwrap_or(0.0);
    let p_active = (energy / 0.3).clamp(0.0, 1.0);
    Ok(vec![1.0 - p_active, p_active])
}
