//! Quantile cut points with linear interpolation between order
//! statistics, "exclusive" method (the default of Python's
//! `statistics.quantiles`, and method 6 in Hyndman & Fan): the data
//! is treated as a sample of a larger population, so the cut points
//! for small samples may lie outside of the sample range.

/// Cut `sorted` into `SECTIONS` equal-probability sections, returning
/// the `SECTIONS - 1` cut points. For `SECTIONS == 4` these are the
/// quartiles, with the middle one always being the median.
///
/// `sorted` must be sorted ascending and not be empty; a single value
/// is returned as every cut point.
pub fn exclusive_cut_points<const SECTIONS: usize>(sorted: &[f64]) -> Vec<f64> {
    assert!(SECTIONS >= 2, "need at least two sections to have a cut point");
    let len = sorted.len();
    assert!(len > 0, "cut points of an empty sample are undefined");
    if len == 1 {
        return vec![sorted[0]; SECTIONS - 1];
    }

    // All index arithmetic in integers, in units of 1/SECTIONS.
    let n = SECTIONS as i64;
    let m = len as i64 + 1;
    (1..n)
        .map(|i| {
            let j = (i * m / n).clamp(1, len as i64 - 1);
            let delta = i * m - j * n;
            let lower = sorted[(j - 1) as usize];
            let upper = sorted[j as usize];
            (lower * (n - delta) as f64 + upper * delta as f64) / n as f64
        })
        .collect()
}
