//! Numeric helpers shared by cleaning, statistics and charts.
//!
//! Moments and quantiles come from `u_numflow::stats`; this module adds the guards that keep
//! degenerate columns (empty, single-valued, zero variance) from producing NaN.

use serde::Serialize;

/// Sort finite values ascending.
pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Linear-interpolated quantile of pre-sorted values, `q` in `[0, 1]`.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    u_numflow::stats::quantile(sorted, q.clamp(0.0, 1.0))
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    u_numflow::stats::mean(values).filter(|m| m.is_finite())
}

/// Returns `true` when every value equals the first one.
pub(crate) fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}

/// Population standard deviation; 0 when there is at most one value.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 || is_constant(values) {
        return 0.0;
    }
    // `u_numflow` reports the sample variance; rescale to the population form.
    let sample = u_numflow::stats::variance(values).unwrap_or(0.0);
    let var = sample * (n - 1) as f64 / n as f64;
    if var.is_finite() { var.max(0.0).sqrt() } else { 0.0 }
}

/// Fisher-Pearson coefficient of skewness; 0 when the deviation is 0.
pub(crate) fn skewness(values: &[f64]) -> f64 {
    if values.len() <= 2 || is_constant(values) {
        return 0.0;
    }
    u_numflow::stats::skewness(values)
        .filter(|g| g.is_finite())
        .unwrap_or(0.0)
}

/// Multiplier `k` of the IQR fences `Q1 - k*IQR` and `Q3 + k*IQR`, shared by the cleaning
/// report, the statistics and box plots.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Interquartile-range fences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrFences {
    /// 25th percentile.
    pub q1: f64,
    /// 75th percentile.
    pub q3: f64,
    /// `q1 - k * iqr`.
    pub lower: f64,
    /// `q3 + k * iqr`.
    pub upper: f64,
}

impl IqrFences {
    /// Compute fences from pre-sorted values.
    pub(crate) fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let k = IQR_MULTIPLIER;
        let q1 = quantile_sorted(sorted, 0.25)?;
        let q3 = quantile_sorted(sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        })
    }

    /// Returns `true` when `v` lies outside the fences.
    pub fn is_outlier(&self, v: f64) -> bool {
        v < self.lower || v > self.upper
    }
}

/// Pearson correlation of paired samples; `None` when either side has zero variance.
pub(crate) fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if n < 2 || is_constant(xs) || is_constant(ys) {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (sxy, sxx, syy) = xs.iter().zip(ys).fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (x, y)| {
        let (dx, dy) = (x - mx, y - my);
        (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
    });
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if r.is_finite() { Some(r.clamp(-1.0, 1.0)) } else { None }
}
