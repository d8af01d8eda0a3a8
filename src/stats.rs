use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Mean and sample variance of repeated trial durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub variance: f64,
    pub samples: usize,
}

impl Summary {
    /// Two-pass estimate: mean first, then `sum((x - mean)^2) / (n - 1)`.
    /// A single sample has zero variance; no samples gives `None`.
    pub fn from_samples(samples: &[f64]) -> Option<Summary> {
        let n = samples.len();
        if n == 0 {
            return None;
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Some(Summary {
            mean,
            variance,
            samples: n,
        })
    }

    pub fn from_durations(durations: &[Duration]) -> Option<Summary> {
        let secs: Vec<f64> = durations.iter().map(Duration::as_secs_f64).collect();
        Self::from_samples(&secs)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}
