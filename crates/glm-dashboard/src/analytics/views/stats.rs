//! Small descriptive-statistics helpers shared by the analysis views. All of
//! them return `0.0` for empty input.

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let center = mean(values);
    let squares: f64 = values.iter().map(|value| (value - center).powi(2)).sum();
    (squares / (values.len() - 1) as f64).sqrt()
}

pub(crate) fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

pub(crate) fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Percentage of `part` in `total`, `0.0` when `total` is zero.
pub(crate) fn share_pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Pearson correlation; `0.0` when either side has no variance.
pub(crate) fn pearson(left: &[f64], right: &[f64]) -> f64 {
    let n = left.len().min(right.len());
    if n < 2 {
        return 0.0;
    }
    let (left, right) = (&left[..n], &right[..n]);
    let (left_mean, right_mean) = (mean(left), mean(right));

    let mut covariance = 0.0;
    let mut left_var = 0.0;
    let mut right_var = 0.0;
    for (x, y) in left.iter().zip(right) {
        let dx = x - left_mean;
        let dy = y - right_mean;
        covariance += dx * dy;
        left_var += dx * dx;
        right_var += dy * dy;
    }

    let denominator = (left_var * right_var).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        (covariance / denominator).clamp(-1.0, 1.0)
    }
}
