//! Frequency-domain integration, differentiation and resampling

use rustfft::{num_complex::Complex, FftPlanner};
use std::cell::RefCell;
use std::f64::consts::PI;

use crate::array_ops::{cosine_taper, remove_linear_trend};

// Thread-local FFT planner, reused across channels processed in parallel
thread_local! {
    static FFT_PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

fn forward(buffer: &mut [Complex<f64>]) {
    FFT_PLANNER.with(|planner| {
        let fft = planner.borrow_mut().plan_fft_forward(buffer.len());
        fft.process(buffer);
    });
}

fn inverse(buffer: &mut [Complex<f64>]) {
    FFT_PLANNER.with(|planner| {
        let fft = planner.borrow_mut().plan_fft_inverse(buffer.len());
        fft.process(buffer);
    });
}

fn zero_padded(values: &[f64], nfft: usize) -> Vec<Complex<f64>> {
    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(nfft, Complex::new(0.0, 0.0));
    buffer
}

/// Smallest power of two `>= n` (1 for an empty input)
pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Move the zero-frequency bin to the centre of the spectrum
pub fn fft_shift<T>(values: &mut [T]) {
    let half = values.len() / 2;
    values.rotate_right(half);
}

/// Undo `fft_shift`
pub fn ifft_shift<T>(values: &mut [T]) {
    let half = values.len() / 2;
    values.rotate_left(half);
}

/// Angular frequency of bin `j` of a shifted spectrum of length `nfft`
fn shifted_angular_frequency(j: usize, nfft: usize, dt: f64) -> f64 {
    let df = 1.0 / (nfft as f64 * dt);
    2.0 * PI * (j as f64 - (nfft / 2) as f64) * df
}

/// Integrate by dividing the spectrum by `iω`.
///
/// The zero-frequency bin is discarded, so the result is detrended and then
/// shifted so that its first sample equals `init`.
pub fn integrate(values: &[f64], dt: f64, init: f64) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let nfft = next_pow2(n);
    let mut spectrum = zero_padded(values, nfft);
    forward(&mut spectrum);
    fft_shift(&mut spectrum);

    for (j, bin) in spectrum.iter_mut().enumerate() {
        let omega = shifted_angular_frequency(j, nfft, dt);
        *bin = if omega == 0.0 {
            Complex::new(0.0, 0.0)
        } else {
            *bin / Complex::new(0.0, omega)
        };
    }

    ifft_shift(&mut spectrum);
    inverse(&mut spectrum);
    let scale = 1.0 / nfft as f64;
    let mut out: Vec<f64> = spectrum[..n].iter().map(|c| c.re * scale).collect();

    remove_linear_trend(&mut out);
    let offset = init - out[0];
    for v in out.iter_mut() {
        *v += offset;
    }
    out
}

/// Differentiate by multiplying the spectrum by `iω`.
///
/// When `taper_len > 0` both ends of a copy of the input are cosine-tapered
/// over that many samples first.
pub fn differentiate(values: &[f64], dt: f64, taper_len: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut input = values.to_vec();
    if taper_len > 0 {
        cosine_taper(&mut input, taper_len, taper_len);
    }

    let nfft = next_pow2(n);
    let mut spectrum = zero_padded(&input, nfft);
    forward(&mut spectrum);
    fft_shift(&mut spectrum);

    for (j, bin) in spectrum.iter_mut().enumerate() {
        // The Nyquist bin has no conjugate partner, drop it
        if nfft > 1 && j == 0 {
            *bin = Complex::new(0.0, 0.0);
            continue;
        }
        *bin *= Complex::new(0.0, shifted_angular_frequency(j, nfft, dt));
    }

    ifft_shift(&mut spectrum);
    inverse(&mut spectrum);
    let scale = 1.0 / nfft as f64;
    spectrum[..n].iter().map(|c| c.re * scale).collect()
}

/// Integer factor that lifts a record to at least `min_sps` samples per second
pub fn resample_factor(min_sps: f64, dt: f64) -> usize {
    let ratio = min_sps * dt;
    if !ratio.is_finite() || ratio <= 1.0 + 1e-9 {
        return 1;
    }
    (ratio - 1e-9).ceil() as usize
}

/// Band-limited upsampling by zero insertion in the spectrum.
///
/// Output length is `n * factor`.
pub fn upsample(values: &[f64], factor: usize) -> Vec<f64> {
    let n = values.len();
    if factor <= 1 || n == 0 {
        return values.to_vec();
    }
    let nfft = next_pow2(n);
    let mut spectrum = zero_padded(values, nfft);
    forward(&mut spectrum);

    let long = nfft * factor;
    let mut expanded = vec![Complex::new(0.0, 0.0); long];
    let half = nfft / 2;
    if nfft == 1 {
        expanded[0] = spectrum[0];
    } else {
        expanded[..half].copy_from_slice(&spectrum[..half]);
        for j in 1..half {
            expanded[long - j] = spectrum[nfft - j];
        }
        // Split the Nyquist bin between the two new mirror positions
        let nyquist = spectrum[half] * 0.5;
        expanded[half] = nyquist;
        expanded[long - half] = nyquist;
    }

    inverse(&mut expanded);
    let scale = 1.0 / nfft as f64;
    expanded[..n * factor].iter().map(|c| c.re * scale).collect()
}

/// Band-limited decimation by spectrum truncation.
///
/// Output length is `ceil(n / factor)`.
pub fn decimate(values: &[f64], factor: usize) -> Vec<f64> {
    let n = values.len();
    if factor <= 1 || n == 0 {
        return values.to_vec();
    }
    let nfft = next_pow2(n).div_ceil(factor) * factor;
    let mut spectrum = zero_padded(values, nfft);
    forward(&mut spectrum);

    let short = nfft / factor;
    let mut reduced = vec![Complex::new(0.0, 0.0); short];
    for (k, bin) in reduced.iter_mut().enumerate() {
        if short % 2 == 0 && k == short / 2 {
            *bin = Complex::new(spectrum[k].re, 0.0);
        } else if k <= short / 2 {
            *bin = spectrum[k];
        } else {
            *bin = spectrum[nfft - (short - k)];
        }
    }

    inverse(&mut reduced);
    let scale = 1.0 / nfft as f64;
    reduced[..n.div_ceil(factor)]
        .iter()
        .map(|c| c.re * scale)
        .collect()
}
