mod common;

use common::{max_abs, sine};
use prism_rs::array_ops::central_difference;
use prism_rs::filters::{ButterworthFilter, MAX_ROLL_OFF};
use prism_rs::fourier;
use prism_rs::{IntegrationMethod, Integrator};
use std::f64::consts::PI;

const DT: f64 = 0.01;
const FREQ: f64 = 0.78125;

#[test]
fn test_time_domain_differentiate_undoes_integrate() {
    let integrator = Integrator::new(IntegrationMethod::TimeDomain, 5);
    let x = sine(1024, DT, FREQ);
    let back = integrator
        .differentiate(&integrator.integrate(&x, DT, 0.0), DT)
        .unwrap();
    for i in 10..1014 {
        assert!((back[i] - x[i]).abs() < 5e-3, "sample {}", i);
    }
}

#[test]
fn test_frequency_differentiate_undoes_integrate() {
    let integrator = Integrator::new(IntegrationMethod::Frequency, 5);
    let x = sine(1024, DT, FREQ);
    let back = integrator
        .differentiate(&integrator.integrate(&x, DT, 0.0), DT)
        .unwrap();
    for i in 256..768 {
        assert!((back[i] - x[i]).abs() < 1e-3, "sample {}", i);
    }
}

#[test]
fn test_time_domain_integrate_undoes_differentiate() {
    let integrator = Integrator::new(IntegrationMethod::TimeDomain, 7);
    let x = sine(1024, DT, FREQ);
    let back = integrator.integrate(&integrator.differentiate(&x, DT).unwrap(), DT, x[0]);
    for i in 0..1024 {
        assert!((back[i] - x[i]).abs() < 1e-2, "sample {}", i);
    }
}

#[test]
fn test_central_difference_orders_agree_on_sine() {
    let x = sine(1000, DT, 1.0);
    let omega = 2.0 * PI;
    for order in [3, 5, 7, 9] {
        let d = central_difference(&x, DT, order).unwrap();
        for i in 5..995 {
            let expected = omega * (omega * i as f64 * DT).cos();
            assert!((d[i] - expected).abs() < 0.01 * omega, "order {} sample {}", order, i);
        }
    }
}

#[test]
fn test_every_valid_filter_keeps_zero_input_zero() {
    for roll_off in 1..=MAX_ROLL_OFF {
        for (low, high) in [(0.05, 25.0), (0.1, 40.0), (2.0, 2.5), (5.0, 45.0)] {
            for causal in [false, true] {
                let filter = ButterworthFilter::new(low, high, DT, roll_off, causal).unwrap();
                let mut values = vec![0.0; 500];
                filter.apply(&mut values, 100, 1.0, 0.2);
                assert_eq!(max_abs(&values), 0.0);
            }
        }
    }
}

#[test]
fn test_filter_is_stable_for_impulse() {
    let filter = ButterworthFilter::new(0.1, 20.0, DT, 4, true).unwrap();
    let mut values = vec![0.0; 20000];
    values[10] = 1.0;
    filter.apply(&mut values, 10, 0.0, 0.0);
    assert!(values.iter().all(|v| v.is_finite()));
    assert!(max_abs(&values[15000..]) < 1e-3);
}

#[test]
fn test_resample_round_trip_preserves_sine() {
    let x = sine(1024, DT, FREQ);
    let up = fourier::upsample(&x, 4);
    let down = fourier::decimate(&up, 4);
    assert_eq!(down.len(), 1024);
    for i in 100..900 {
        assert!((down[i] - x[i]).abs() < 1e-6, "sample {}", i);
    }
}
