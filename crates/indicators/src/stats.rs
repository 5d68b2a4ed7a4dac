//! Descriptive and rolling statistics over `f64` slices.
//!
//! Undefined results (too few observations, zero variance) are `None`, never
//! NaN. Standard deviations are sample standard deviations (n - 1).

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation. A constant input yields exactly `0.0`.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    if is_constant(values) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Central moments m2, m3, m4 (population form).
fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let m = mean(values)?;
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Bias-corrected sample skewness (G1). Needs 3 observations and variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 || is_constant(values) {
        return None;
    }
    let (m2, m3, _) = central_moments(values)?;
    let n = n as f64;
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Bias-corrected sample excess kurtosis (G2). Needs 4 observations and variance.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 || is_constant(values) {
        return None;
    }
    let (m2, _, m4) = central_moments(values)?;
    let n = n as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    Some((n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0))
}

/// Trailing mean over `window` observations; `None` until the window is full.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Trailing sample standard deviation over `window` observations.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                stat(&values[i + 1 - window..=i])
            }
        })
        .collect()
}

/// Trailing statistic over partially defined input. A window containing any
/// `None` yields `None`.
fn rolling_opt<F>(values: &[Option<f64>], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice: Option<Vec<f64>> = values[i + 1 - window..=i].iter().copied().collect();
            slice.and_then(|s| stat(&s))
        })
        .collect()
}

pub fn rolling_mean_opt(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_opt(values, window, mean)
}

pub fn rolling_std_opt(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_opt(values, window, sample_std)
}

/// Statistic of all defined observations up to and including each index.
fn expanding_opt<F>(values: &[Option<f64>], stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut seen = Vec::with_capacity(values.len());
    values
        .iter()
        .map(|v| {
            if let Some(v) = v {
                seen.push(*v);
            }
            stat(&seen)
        })
        .collect()
}

/// Expanding mean; defined from the first defined observation on.
pub fn expanding_mean(values: &[Option<f64>]) -> Vec<Option<f64>> {
    expanding_opt(values, mean)
}

/// Expanding sample standard deviation; defined from the second defined
/// observation on.
pub fn expanding_std(values: &[Option<f64>]) -> Vec<Option<f64>> {
    expanding_opt(values, sample_std)
}

/// Pearson correlation coefficient of two equally long samples.
///
/// `None` when there are fewer than two pairs, the lengths differ, or either
/// side is constant. The result is clamped to `[-1, 1]`.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 || is_constant(x) || is_constant(y) {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((cov / denominator).clamp(-1.0, 1.0))
}

/// Pearson correlation over a trailing window of paired observations.
pub fn rolling_pearson(x: &[f64], y: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = x.len().min(y.len());
    if window == 0 {
        return vec![None; n];
    }
    (0..n)
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let start = i + 1 - window;
                pearson(&x[start..=i], &y[start..=i])
            }
        })
        .collect()
}

/// Least-squares slope of `y` on `x` (with intercept).
pub fn ols_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 || is_constant(x) {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        sxy += dx * (yi - mean_y);
        sxx += dx * dx;
    }
    (sxx > 0.0).then(|| sxy / sxx)
}

/// Standard score of `value`; `None` when `std` is zero or any input is undefined.
pub fn zscore(value: f64, mean: Option<f64>, std: Option<f64>) -> Option<f64> {
    match (mean, std) {
        (Some(m), Some(s)) if s > 0.0 => {
            let z = (value - m) / s;
            z.is_finite().then_some(z)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn mean_and_sample_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v).unwrap() - 5.0).abs() < EPS);
        // population std is 2, sample std is sqrt(32 / 7)
        assert!((sample_std(&v).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < EPS);
        assert_eq!(sample_std(&[1.0]), None);
        assert_eq!(sample_std(&[0.1, 0.1, 0.1]), Some(0.0));
    }

    #[test]
    fn symmetric_sample_has_zero_skew() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&v).unwrap().abs() < EPS);
        assert_eq!(skewness(&[1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn kurtosis_of_uniform_grid() {
        // pandas: pd.Series([1, 2, 3, 4, 5]).kurt() == -1.2
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((excess_kurtosis(&v).unwrap() + 1.2).abs() < 1e-9);
    }

    #[test]
    fn rolling_windows_warm_up() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let m = rolling_mean(&v, 3);
        assert_eq!(m[..2], [None, None]);
        assert!((m[2].unwrap() - 2.0).abs() < EPS);
        assert!((m[3].unwrap() - 3.0).abs() < EPS);
        let s = rolling_std(&v, 3);
        assert!((s[3].unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn rolling_opt_needs_a_full_defined_window() {
        let v = [Some(1.0), None, Some(3.0), Some(5.0), Some(7.0)];
        let m = rolling_mean_opt(&v, 2);
        assert_eq!(m[1], None);
        assert_eq!(m[2], None);
        assert!((m[3].unwrap() - 4.0).abs() < EPS);
    }

    #[test]
    fn expanding_skips_undefined() {
        let v = [None, Some(1.0), Some(3.0), None];
        let m = expanding_mean(&v);
        assert_eq!(m[0], None);
        assert_eq!(m[1], Some(1.0));
        assert_eq!(m[2], Some(2.0));
        assert_eq!(m[3], Some(2.0));
        let s = expanding_std(&v);
        assert_eq!(s[1], None);
        assert!((s[2].unwrap() - 2f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn pearson_extremes_and_degenerate_cases() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < EPS);
        assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < EPS);
        assert_eq!(pearson(&x, &[5.0, 5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&x[..1], &[1.0]), None);
    }

    #[test]
    fn two_point_rolling_correlation_is_degenerate() {
        let x = [1.0, 2.0, 1.5, 1.5, 3.0];
        let y = [5.0, 4.0, 6.0, 7.0, 7.0];
        let r = rolling_pearson(&x, &y, 2);
        assert_eq!(r[0], None);
        assert_eq!(r[1], Some(-1.0));
        assert_eq!(r[2], Some(-1.0));
        // x is flat over the window
        assert_eq!(r[3], None);
        // y is flat over the window
        assert_eq!(r[4], None);
    }

    #[test]
    fn ols_recovers_slope() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 1.5 * v).collect();
        assert!((ols_slope(&x, &y).unwrap() - 1.5).abs() < EPS);
        assert_eq!(ols_slope(&[2.0, 2.0], &[1.0, 3.0]), None);
    }

    #[test]
    fn zscore_at_the_mean_is_zero() {
        let window = [1.0, 2.0, 3.0, 4.0, 5.0];
        let z = zscore(3.0, mean(&window), sample_std(&window)).unwrap();
        assert_eq!(z, 0.0);
        assert_eq!(zscore(3.0, Some(3.0), Some(0.0)), None);
        assert_eq!(zscore(3.0, None, Some(1.0)), None);
    }
}
