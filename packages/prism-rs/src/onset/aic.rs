use crate::array_ops::{median, peak, variance};

use super::EventOnsetDetector;

/// Two-segment AIC picker.
///
/// For every split `k` with `left = x[0..=k]` and `right = x[k+1..]`:
///   AIC(k) = (k + 1) ln var(left) + (n - k - 1) ln var(right)
/// The pick is the first sample of the right segment at the minimum.
#[derive(Debug, Clone, Copy)]
pub struct AicPicker {
    /// Only search samples up to the absolute peak
    pub to_peak: bool,
    pub buffer_seconds: f64,
}

impl AicPicker {
    pub fn new(to_peak: bool, buffer_seconds: f64) -> Self {
        Self {
            to_peak,
            buffer_seconds,
        }
    }

    /// AIC value for every split; `None` where a side has no variance.
    pub fn aic_curve(samples: &[f64]) -> Vec<Option<f64>> {
        let n = samples.len();
        if n < 2 {
            return Vec::new();
        }

        let mut s1 = Vec::with_capacity(n + 1);
        let mut s2 = Vec::with_capacity(n + 1);
        s1.push(0.0);
        s2.push(0.0);
        for &x in samples {
            s1.push(s1[s1.len() - 1] + x);
            s2.push(s2[s2.len() - 1] + x * x);
        }

        let split_variance = |from: usize, to: usize| {
            let m = (to - from) as f64;
            let mean = (s1[to] - s1[from]) / m;
            (s2[to] - s2[from]) / m - mean * mean
        };
        let floor = variance(samples) * 1e-12;

        (0..n - 1)
            .map(|k| {
                let left = split_variance(0, k + 1);
                let right = split_variance(k + 1, n);
                if left <= floor || right <= floor {
                    None
                } else {
                    Some((k + 1) as f64 * left.ln() + (n - k - 1) as f64 * right.ln())
                }
            })
            .collect()
    }
}

impl Default for AicPicker {
    fn default() -> Self {
        Self::new(true, 0.5)
    }
}

impl EventOnsetDetector for AicPicker {
    fn name(&self) -> &'static str {
        "aic"
    }

    fn buffer_seconds(&self) -> f64 {
        self.buffer_seconds
    }

    fn pick(&self, samples: &[f64], _dt: f64) -> Option<usize> {
        let m = median(samples);
        let mut centered: Vec<f64> = samples.iter().map(|&x| x - m).collect();
        if self.to_peak {
            let p = peak(&centered)?;
            centered.truncate(p.index + 1);
        }

        let mut best: Option<(usize, f64)> = None;
        for (k, value) in Self::aic_curve(&centered).into_iter().enumerate() {
            let Some(value) = value else { continue };
            if best.map_or(true, |(_, b)| value < b) {
                best = Some((k, value));
            }
        }
        best.map(|(k, _)| k + 1)
    }
}
