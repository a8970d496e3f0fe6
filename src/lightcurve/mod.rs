//! Synthetic photometry: brightness sampled from off-screen renders over time.
//!
//! - `photometer` renders a scene into an off-screen target and sums its pixels
//! - [`Lightcurve`] collects the samples and writes them as two text columns

use anyhow::Context as _;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub mod photometer;

pub use photometer::{Photometer, padded_bytes_per_row, sum_intensity};

#[derive(Debug, Clone, PartialEq)]
pub struct LightcurveConfig {
    /// Width and height of the off-screen target in pixels.
    pub size: [u32; 2],
    /// Simulated time between two samples.
    pub sample_interval: f64,
    pub output_path: PathBuf,
}

impl Default for LightcurveConfig {
    fn default() -> Self {
        Self {
            size: [256, 256],
            sample_interval: 0.005,
            output_path: PathBuf::from("lightcurve.txt"),
        }
    }
}

/// Number of samples at `0, interval, 2 * interval, ...` that fall within
/// `[0, duration]`. The final multiple counts even when rounding puts it a hair
/// past `duration`.
pub fn sample_count(duration: f64, interval: f64) -> u64 {
    if interval.is_nan() || interval <= 0.0 || !duration.is_finite() || duration < 0.0 {
        return 0;
    }
    (duration / interval + 1e-9).floor() as u64 + 1
}

/// Time of sample `index` on a fixed grid.
pub fn sample_time(index: u64, interval: f64) -> f64 {
    index as f64 * interval
}

/// Ordered `(time, brightness)` samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lightcurve {
    samples: Vec<(f64, f64)>,
}

impl Lightcurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: f64, brightness: f64) {
        self.samples.push((time, brightness));
    }

    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.samples.last().copied()
    }

    /// True if no sample was taken yet or the last one is at least `interval` old.
    pub fn due(&self, time: f64, interval: f64) -> bool {
        match self.last() {
            Some((last, _)) => time - last >= interval,
            None => true,
        }
    }

    pub fn max_brightness(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|&(_, b)| b)
            .fold(None, |max, b| Some(max.map_or(b, |m: f64| m.max(b))))
    }

    /// Samples divided by the maximum brightness. A curve without any positive
    /// brightness is returned unchanged.
    pub fn normalized(&self) -> Vec<(f64, f64)> {
        match self.max_brightness() {
            Some(max) if max > 0.0 => self.samples.iter().map(|&(t, b)| (t, b / max)).collect(),
            _ => self.samples.clone(),
        }
    }

    /// Writes one `time normalized_brightness` line per sample.
    pub fn write(&self, mut out: impl Write) -> std::io::Result<()> {
        for (t, b) in self.normalized() {
            writeln!(out, "{t:.6} {b:.6}")?;
        }
        out.flush()
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        self.write(BufWriter::new(file))?;
        log::info!("wrote {} lightcurve samples to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve(samples: &[(f64, f64)]) -> Lightcurve {
        let mut lc = Lightcurve::new();
        for &(t, b) in samples {
            lc.push(t, b);
        }
        lc
    }

    #[test]
    fn normalizes_by_the_maximum() {
        let lc = curve(&[(0.0, 2.0), (0.5, 8.0), (1.0, 4.0)]);
        let n = lc.normalized();
        assert_relative_eq!(n[0].1, 0.25);
        assert_relative_eq!(n[1].1, 1.0);
        assert_relative_eq!(n[2].1, 0.5);
        assert_eq!(n[2].0, 1.0);
    }

    #[test]
    fn all_dark_curve_is_left_alone() {
        let lc = curve(&[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(lc.normalized(), vec![(0.0, 0.0), (1.0, 0.0)]);
    }

    #[test]
    fn writes_two_columns() {
        let lc = curve(&[(0.0, 1.0), (0.25, 4.0)]);
        let mut out = Vec::new();
        lc.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "0.000000 0.250000\n0.250000 1.000000\n");
    }

    #[test]
    fn empty_curve_writes_an_empty_file() {
        let path = std::env::temp_dir().join(format!("empty_lightcurve_{}.txt", std::process::id()));
        Lightcurve::new().write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn sample_grid_reaches_the_end() {
        assert_eq!(sample_count(0.5, 0.005), 101);
        assert_relative_eq!(sample_time(100, 0.005), 0.5);
        // summing the interval drifts past the end and would drop this sample
        let summed = (0..100).fold(0.0, |t: f64, _| t + 0.1);
        assert!(summed != 10.0);
        assert_eq!(sample_count(10.0, 0.1), 101);
        assert_eq!(sample_count(0.0, 0.1), 1);
        assert_eq!(sample_count(1.0, 0.0), 0);
        assert_eq!(sample_count(f64::NAN, 0.1), 0);
    }

    #[test]
    fn unwritable_path_names_the_file() {
        let path = std::env::temp_dir()
            .join(format!("no_such_dir_{}", std::process::id()))
            .join("lightcurve.txt");
        let err = curve(&[(0.0, 1.0)]).write_to(&path).unwrap_err();
        assert!(err.to_string().contains("lightcurve.txt"), "{err}");
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn sampling_is_due_after_the_interval() {
        let mut lc = Lightcurve::new();
        assert!(lc.due(0.0, 0.1));
        lc.push(0.0, 1.0);
        assert!(!lc.due(0.05, 0.1));
        assert!(lc.due(0.1, 0.1));
    }
}
