//! Numeric similarity inside absolute or percentage tolerance windows.

/// Absolute-tolerance similarity: 1.0 at equality, falling linearly with
/// the difference inside the window, 0.0 beyond it. A zero tolerance
/// degenerates to exact comparison.
pub fn tolerance_similarity(a: f64, b: f64, tolerance: f64) -> f64 {
    let diff = (a - b).abs();
    if diff == 0.0 {
        1.0
    } else if tolerance <= 0.0 || diff > tolerance {
        0.0
    } else {
        1.0 - diff / (tolerance + 1.0)
    }
}

/// Percentage-tolerance similarity: the difference is taken relative to
/// the larger magnitude, so the measure is symmetric.
pub fn percent_similarity(a: f64, b: f64, max_percent: f64) -> f64 {
    if a == b {
        return 1.0;
    }
    let base = a.abs().max(b.abs());
    if base == 0.0 {
        return 1.0;
    }
    let perc = 100.0 * (a - b).abs() / base;
    if max_percent <= 0.0 || perc > max_percent {
        0.0
    } else {
        1.0 - perc / (max_percent + 1.0)
    }
}
