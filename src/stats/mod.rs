//! Descriptive statistics over floating point samples (count, mean,
//! sample standard deviation, extremes and quartiles).
//!
//! All results are computed from the sorted values, thus do not
//! depend on the order in which the samples are given, down to the
//! last bit.

pub mod quantiles;

use num_traits::{Pow, Zero};

use crate::stats::quantiles::exclusive_cut_points;

/// We cut into 4 sections, i.e. report quartiles; the middle cut
/// point is the median.
pub const QUANTILE_SECTIONS: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("no inputs given")]
    NoInputs,
    #[error("non-finite input value {0}")]
    NonFinite(f64),
}

/// The three quartile cut points of a sample.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Quartiles {
    pub q0: f64,
    /// The median
    pub q1: f64,
    pub q2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleStats {
    pub num_values: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator), 0 for a single
    /// value.
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub quartiles: Quartiles,
}

impl SampleStats {
    /// (Needs to own `vals` for sorting, internally.)
    pub fn from_values(mut vals: Vec<f64>) -> Result<Self, StatsError> {
        let num_values = vals.len();
        if num_values.is_zero() {
            return Err(StatsError::NoInputs);
        }
        if let Some(x) = vals.iter().find(|x| !x.is_finite()) {
            return Err(StatsError::NonFinite(*x));
        }
        vals.sort_by(f64::total_cmp);

        let mean = vals.iter().sum::<f64>() / num_values as f64;

        let stddev = if num_values == 1 {
            0.
        } else {
            let sum_squared_error: f64 = vals.iter().map(|x| (x - mean).pow(2)).sum();
            (sum_squared_error / (num_values - 1) as f64).sqrt()
        };

        // QUANTILE_SECTIONS - 1 == 3 cut points
        let cuts = exclusive_cut_points::<QUANTILE_SECTIONS>(&vals);
        let quartiles = Quartiles {
            q0: cuts[0],
            q1: cuts[1],
            q2: cuts[2],
        };

        Ok(SampleStats {
            num_values,
            mean,
            stddev,
            min: vals[0],
            max: vals[num_values - 1],
            quartiles,
        })
    }

    pub fn median(&self) -> f64 {
        self.quartiles.q1
    }
}

/// Mean of values that are known to be finite and non-empty; sorted
/// first, for order independence.
pub fn mean(mut vals: Vec<f64>) -> Result<f64, StatsError> {
    if vals.is_empty() {
        return Err(StatsError::NoInputs);
    }
    vals.sort_by(f64::total_cmp);
    Ok(vals.iter().sum::<f64>() / vals.len() as f64)
}
