use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rppg_lib::{
    estimator,
    extractor::{ExtractorConfig, PulseExtractor},
    frame::{ColorFormat, Frame},
    io::text as text_io,
    signal,
};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

mod synth;

#[derive(Parser)]
#[command(name = "rppg", version, about = "Remote-PPG pulse extraction tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Method {
    /// Frequency-domain peak picking (zero-padded FFT), the default.
    Freq,
    /// Time-domain peak detection and RR-interval averaging.
    Time,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate BPM from newline-delimited samples read from stdin or --input
    Estimate {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Sampling rate, used when the input has no timestamp column
        #[arg(long, default_value_t = 30.0)]
        fs: f64,
        #[arg(long, default_value_t = 40.0)]
        min_bpm: f64,
        #[arg(long, default_value_t = 200.0)]
        max_bpm: f64,
        #[arg(long, value_enum, default_value = "freq")]
        method: Method,
        /// Band-restrict the signal to [min_bpm, max_bpm] first
        #[arg(long)]
        bandpass: bool,
    },
    /// Detect pulse peaks in a sample series
    FindPeaks {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 30.0)]
        fs: f64,
        #[arg(long, default_value_t = 200.0)]
        max_bpm: f64,
        /// Relative amplitude threshold in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
    },
    /// Drive the full extractor with synthetic camera frames
    Simulate {
        #[arg(long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(long, default_value_t = 30.0)]
        fs: f64,
        #[arg(long, default_value_t = 4.0)]
        seconds: f64,
        /// Pulse amplitude in green-channel levels
        #[arg(long, default_value_t = 10.0)]
        amplitude: f64,
        /// Uniform level noise, green-channel levels
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Estimate {
            input,
            fs,
            min_bpm,
            max_bpm,
            method,
            bandpass,
        } => cmd_estimate(input.as_deref(), fs, min_bpm, max_bpm, method, bandpass)?,
        Commands::FindPeaks {
            input,
            fs,
            max_bpm,
            threshold,
        } => cmd_find_peaks(input.as_deref(), fs, max_bpm, threshold)?,
        Commands::Simulate {
            bpm,
            fs,
            seconds,
            amplitude,
            noise,
            seed,
        } => cmd_simulate(bpm, fs, seconds, amplitude, noise, seed)?,
    }
    Ok(())
}

fn read_series(input: Option<&Path>) -> Result<text_io::TimedSeries> {
    match input {
        Some(path) => text_io::read_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_series(&buf)
        }
    }
}

fn min_rr_samples(max_bpm: f64, fs: f64) -> usize {
    ((60.0 / max_bpm) * fs).round().max(1.0) as usize
}

#[derive(Serialize)]
struct EstimateOutput {
    bpm: f64,
    method: &'static str,
    samples: usize,
    fs: f64,
}

fn cmd_estimate(
    input: Option<&Path>,
    fallback_fs: f64,
    min_bpm: f64,
    max_bpm: f64,
    method: Method,
    bandpass: bool,
) -> Result<()> {
    let series = read_series(input)?;
    let fs = series.sampling_rate(fallback_fs);
    let mut samples = signal::rescale(&series.values);
    if bandpass {
        samples = signal::bandpass(&samples, fs, min_bpm / 60.0, max_bpm / 60.0);
    }
    info!("estimating over {} samples at {:.2} Hz", samples.len(), fs);

    let (bpm, method) = match method {
        Method::Freq => (
            estimator::bpm_from_spectrum(&samples, fs, min_bpm, max_bpm)?,
            "freq",
        ),
        Method::Time => {
            let duration = (samples.len().saturating_sub(1)) as f64 / fs;
            let peaks = estimator::pulse_peaks(
                &samples,
                duration,
                min_rr_samples(max_bpm, fs),
                estimator::PEAK_THRESHOLD,
            );
            (estimator::bpm_from_peaks(&peaks)?, "time")
        }
    };

    let out = EstimateOutput {
        bpm,
        method,
        samples: samples.len(),
        fs,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_find_peaks(input: Option<&Path>, fallback_fs: f64, max_bpm: f64, threshold: f64) -> Result<()> {
    let series = read_series(input)?;
    let fs = series.sampling_rate(fallback_fs);
    let samples = signal::rescale(&series.values);

    let duration = (samples.len().saturating_sub(1)) as f64 / fs;
    let peaks = estimator::pulse_peaks(
        &samples,
        duration,
        min_rr_samples(max_bpm, fs),
        threshold,
    );
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}

#[derive(Serialize)]
struct SimulateOutput {
    frames: usize,
    available: bool,
    bpm: Option<f64>,
    true_bpm: f64,
}

fn cmd_simulate(
    bpm: f64,
    fs: f64,
    seconds: f64,
    amplitude: f64,
    noise: f64,
    seed: u64,
) -> Result<()> {
    let config = ExtractorConfig {
        framerate: fs,
        ..ExtractorConfig::default()
    };
    let mut extractor = PulseExtractor::ppg(config);
    let mut session = synth::SyntheticSession::new(fs, bpm, amplitude, noise, seed);

    let frames = (seconds * fs).round() as usize;
    for _ in 0..frames {
        let (pixels, t) = session.next_frame();
        let frame = Frame::new(&pixels, synth::FRAME_SIZE, synth::FRAME_SIZE, ColorFormat::Rgb)?;
        extractor.add_frame(&frame, t)?;
    }

    let available = extractor.pulse_signal_available();
    let estimate = if available { extractor.bpm().ok() } else { None };
    info!(
        "fed {} frames, available={}, estimate={:?}",
        frames, available, estimate
    );

    let out = SimulateOutput {
        frames,
        available,
        bpm: estimate,
        true_bpm: bpm,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
