use assert_cmd::Command;
use serde::Deserialize;
use std::error::Error;
use std::f64::consts::TAU;

#[derive(Deserialize)]
struct EstimateOutput {
    bpm: f64,
    method: String,
    samples: usize,
}

#[derive(Deserialize)]
struct PeaksOutput {
    indices: Vec<usize>,
    times: Vec<f64>,
    amplitudes: Vec<f64>,
}

#[derive(Deserialize)]
struct SimulateOutput {
    frames: usize,
    available: bool,
    bpm: Option<f64>,
}

fn sine_series(fs: f64, bpm: f64, n: usize) -> String {
    // Phase offset keeps crests off the sample grid, so no two neighboring
    // samples tie for the maximum.
    (0..n)
        .map(|i| {
            let phase = TAU * bpm / 60.0 * i as f64 / fs + 1.0;
            format!("{}\n", 128.0 + 10.0 * phase.sin())
        })
        .collect()
}

#[test]
fn estimate_recovers_sine_bpm() -> Result<(), Box<dyn Error>> {
    let input = sine_series(30.0, 72.0, 300);

    let mut cmd = Command::cargo_bin("rppg")?;
    let output = cmd
        .args(["estimate", "--fs", "30"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let actual: EstimateOutput = serde_json::from_slice(&output)?;

    assert_eq!(actual.method, "freq");
    assert_eq!(actual.samples, 300);
    assert!(
        (actual.bpm - 72.0).abs() <= 2.0,
        "expected ~72 BPM, got {}",
        actual.bpm
    );
    Ok(())
}

#[test]
fn estimate_time_domain_on_pulse_train() -> Result<(), Box<dyn Error>> {
    // Gaussian bumps every 0.8 s at 30 Hz -> 75 BPM.
    let fs = 30.0;
    let n = 300;
    let input: String = (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let mut v: f64 = 0.0;
            let mut beat = 0.4;
            while beat < n as f64 / fs {
                v += (-0.5 * ((t - beat) / 0.05).powi(2)).exp();
                beat += 0.8;
            }
            format!("{v}\n")
        })
        .collect();

    let mut cmd = Command::cargo_bin("rppg")?;
    let output = cmd
        .args(["estimate", "--fs", "30", "--method", "time"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let actual: EstimateOutput = serde_json::from_slice(&output)?;

    assert_eq!(actual.method, "time");
    assert!(
        (actual.bpm - 75.0).abs() <= 3.0,
        "expected ~75 BPM, got {}",
        actual.bpm
    );
    Ok(())
}

#[test]
fn find_peaks_reports_consistent_fields() -> Result<(), Box<dyn Error>> {
    let input = sine_series(30.0, 60.0, 150);

    let mut cmd = Command::cargo_bin("rppg")?;
    let output = cmd
        .args(["find-peaks", "--fs", "30"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let actual: PeaksOutput = serde_json::from_slice(&output)?;

    // 1 Hz over 5 s: one peak per second, minus window edges.
    assert!(
        (4..=5).contains(&actual.indices.len()),
        "expected 4-5 peaks, got {}",
        actual.indices.len()
    );
    assert_eq!(actual.indices.len(), actual.times.len());
    assert_eq!(actual.indices.len(), actual.amplitudes.len());
    // Times interpolate across the recorded duration, the same convention the
    // library applies to extractor peaks.
    for (&index, &time) in actual.indices.iter().zip(&actual.times) {
        assert!(
            (time - index as f64 / 30.0).abs() < 1e-9,
            "peak {index} at unexpected time {time}"
        );
    }
    Ok(())
}

#[test]
fn simulate_reaches_availability_and_bpm() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("rppg")?;
    let output = cmd
        .args(["simulate", "--bpm", "72", "--seconds", "4", "--seed", "7"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let actual: SimulateOutput = serde_json::from_slice(&output)?;

    assert_eq!(actual.frames, 120);
    assert!(actual.available, "synthetic session should warm up");
    let bpm = actual.bpm.expect("bpm present when available");
    assert!((bpm - 72.0).abs() <= 3.0, "expected ~72 BPM, got {bpm}");
    Ok(())
}

#[test]
fn estimate_fails_cleanly_on_empty_input() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("rppg")?;
    cmd.args(["estimate"]).write_stdin("# only comments\n");
    cmd.assert().failure();
    Ok(())
}
