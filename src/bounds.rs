//! Padded display ranges for axes, computed from the samples that are
//! to be shown.

use std::fmt::Display;

use crate::warn;

/// Fraction of the sample spread added on either side. The padding is
/// rounded to an integer (ties to even) before it is applied, thus
/// for spreads below 20 it is 0.
pub const MARGIN_FRACTION: f64 = 0.025;

/// Padding used on either side when all samples are equal.
pub const DEGENERATE_MARGIN: f64 = 0.025;

/// Natural domain of a metric's values, e.g. `[0, 1]` for ratios.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainClamp {
    pub low: f64,
    pub high: f64,
}

impl DomainClamp {
    pub const UNIT: DomainClamp = DomainClamp {
        low: 0.0,
        high: 1.0,
    };

    /// Both ends must be finite, and `low <= high`.
    pub fn check(&self) -> Result<(), InvalidDomainError> {
        let Self { low, high } = *self;
        if low.is_finite() && high.is_finite() && low <= high {
            Ok(())
        } else {
            Err(InvalidDomainError { low, high })
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("invalid domain [{low}, {high}]: need finite ends with low <= high")]
pub struct InvalidDomainError {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DisplayRange {
    pub low: f64,
    pub high: f64,
}

impl DisplayRange {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn contains(&self, x: f64) -> bool {
        self.low <= x && x <= self.high
    }
}

impl Display for DisplayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { low, high } = self;
        write!(f, "[{low}, {high}]")
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("no samples given to compute a display range from")]
pub struct InsufficientDataError;

/// `low = min - m`, `high = max + m` with `m = round(0.025 * (max -
/// min))`, or `DEGENERATE_MARGIN` if all samples are equal; then
/// clamped into `domain_clamp` if given. Non-finite samples must have
/// been rejected by the caller. A domain failing
/// `DomainClamp::check` is ignored.
pub fn bounds(
    samples: impl IntoIterator<Item = f64>,
    domain_clamp: Option<DomainClamp>,
) -> Result<DisplayRange, InsufficientDataError> {
    let (min, max) = samples
        .into_iter()
        .fold(None, |acc: Option<(f64, f64)>, x| match acc {
            None => Some((x, x)),
            Some((min, max)) => Some((min.min(x), max.max(x))),
        })
        .ok_or(InsufficientDataError)?;

    let delta = max - min;
    let margin = if delta == 0. {
        DEGENERATE_MARGIN
    } else {
        (MARGIN_FRACTION * delta).round_ties_even()
    };
    let mut range = DisplayRange {
        low: min - margin,
        high: max + margin,
    };
    if let Some(domain) = domain_clamp {
        match domain.check() {
            Ok(()) => {
                range.low = range.low.clamp(domain.low, domain.high);
                range.high = range.high.clamp(domain.low, domain.high);
            }
            Err(e) => warn!("not clamping display range {range}: {e}"),
        }
    }
    Ok(range)
}

/// Per-objective display ranges over a set of objective vectors
/// (e.g. the points of all approximated Pareto fronts for one problem
/// instance). Vectors with fewer than `num_objectives` values are
/// ignored; extra values are ignored, too.
pub fn objective_bounds(
    points: &[Vec<f64>],
    num_objectives: usize,
) -> Result<Vec<DisplayRange>, InsufficientDataError> {
    let complete: Vec<&Vec<f64>> = points
        .iter()
        .filter(|point| point.len() >= num_objectives)
        .collect();
    (0..num_objectives)
        .map(|i| bounds(complete.iter().map(|point| point[i]), None))
        .collect()
}
