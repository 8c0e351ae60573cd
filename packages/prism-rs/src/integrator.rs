use serde::{Deserialize, Serialize};

use crate::array_ops::{central_difference, integrate_trapezoid};
use crate::error::Result;
use crate::fourier;

/// Integration and differentiation back end used for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Trapezoid rule and central differences
    #[default]
    TimeDomain,
    /// Spectral division and multiplication by `iω`
    Frequency,
}

impl IntegrationMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "time_domain" | "time" | "td" => Some(Self::TimeDomain),
            "frequency" | "fft" => Some(Self::Frequency),
            _ => None,
        }
    }
}

/// Integrator bound to a method and a central-difference order
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    pub method: IntegrationMethod,
    pub difference_order: usize,
}

impl Integrator {
    pub fn new(method: IntegrationMethod, difference_order: usize) -> Self {
        Self {
            method,
            difference_order,
        }
    }

    pub fn integrate(&self, values: &[f64], dt: f64, init: f64) -> Vec<f64> {
        match self.method {
            IntegrationMethod::TimeDomain => integrate_trapezoid(values, dt, init),
            IntegrationMethod::Frequency => fourier::integrate(values, dt, init),
        }
    }

    pub fn differentiate(&self, values: &[f64], dt: f64) -> Result<Vec<f64>> {
        match self.method {
            IntegrationMethod::TimeDomain => central_difference(values, dt, self.difference_order),
            IntegrationMethod::Frequency => Ok(fourier::differentiate(values, dt, 0)),
        }
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(IntegrationMethod::TimeDomain, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(IntegrationMethod::from_str("FFT"), Some(IntegrationMethod::Frequency));
        assert_eq!(IntegrationMethod::from_str("time_domain"), Some(IntegrationMethod::TimeDomain));
        assert_eq!(IntegrationMethod::from_str("simpson"), None);
    }

    #[test]
    fn test_time_domain_round_trip_on_parabola() {
        let dt = 0.01;
        let integrator = Integrator::default();
        let accel = vec![2.0; 500];
        let velocity = integrator.integrate(&accel, dt, 0.0);
        let back = integrator.differentiate(&velocity, dt).unwrap();
        for v in &back[1..499] {
            assert!((v - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&IntegrationMethod::Frequency).unwrap();
        assert_eq!(json, "\"frequency\"");
    }
}
