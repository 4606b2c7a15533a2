//! Date similarity on (day, month, year) components and on day deltas.
//!
//! Callers convert component triples to epoch days themselves (the core
//! crate's `DateParts` does this); functions here only take plain numbers
//! so the crate stays free of record types.

/// Component-wise date similarity with swapped day/month credit.
///
/// Identical dates score 1.0. A date pair that agrees on the year and has
/// day and month transposed (a common data-entry error) scores a fixed
/// 0.5. Anything else scores the fraction of agreeing components.
pub fn components_similarity(
    (da, ma, ya): (u32, u32, i32),
    (db, mb, yb): (u32, u32, i32),
) -> f64 {
    if (da, ma, ya) == (db, mb, yb) {
        return 1.0;
    }
    if ya == yb && da == mb && ma == db && da != ma {
        return 0.5;
    }
    let agreeing = u32::from(da == db) + u32::from(ma == mb) + u32::from(ya == yb);
    agreeing as f64 / 3.0
}

/// Day-window similarity over epoch-day values.
///
/// Asymmetric by design: `max_a_before_b` tolerates date A falling before
/// date B, `max_b_before_a` the reverse (e.g. a registration date can trail
/// a birth date but never precede it). Inside the window the score falls
/// linearly from 1.0; outside it is 0.0.
pub fn day_window_similarity(
    epoch_a: i64,
    epoch_b: i64,
    max_a_before_b: u32,
    max_b_before_a: u32,
) -> f64 {
    let diff = epoch_a - epoch_b;
    if diff == 0 {
        return 1.0;
    }
    let (days, max) = if diff > 0 {
        (diff, max_b_before_a as i64)
    } else {
        (-diff, max_a_before_b as i64)
    };
    if days > max {
        0.0
    } else {
        1.0 - days as f64 / (max + 1) as f64
    }
}

/// Exponentially decaying similarity on an age-in-days delta:
/// `0.5 ^ (|delta| / half_life_days)`.
pub fn age_decay_similarity(epoch_a: i64, epoch_b: i64, half_life_days: f64) -> f64 {
    let delta = (epoch_a - epoch_b).abs() as f64;
    0.5f64.powf(delta / half_life_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn component_agreement() {
        close(components_similarity((12, 11, 1968), (12, 11, 1968)), 1.0);
        close(components_similarity((12, 11, 1968), (12, 11, 1986)), 2.0 / 3.0);
        close(components_similarity((12, 11, 1968), (13, 10, 1986)), 0.0);
    }

    #[test]
    fn swapped_day_month_gets_partial_credit() {
        close(components_similarity((12, 11, 1968), (11, 12, 1968)), 0.5);
        // Day == month means no transposition is detectable.
        close(components_similarity((3, 3, 1968), (3, 3, 1968)), 1.0);
    }

    #[test]
    fn day_window_is_asymmetric() {
        // A 3 days before B, tolerated up to 7 days.
        close(day_window_similarity(100, 103, 7, 0), 1.0 - 3.0 / 8.0);
        // B before A is not tolerated at all here.
        close(day_window_similarity(103, 100, 7, 0), 0.0);
        close(day_window_similarity(100, 100, 0, 0), 1.0);
    }

    #[test]
    fn age_decay_halves_at_half_life() {
        close(age_decay_similarity(0, 0, 365.0), 1.0);
        close(age_decay_similarity(0, 365, 365.0), 0.5);
        close(age_decay_similarity(365, 0, 365.0), 0.5);
        close(age_decay_similarity(0, 730, 365.0), 0.25);
    }
}
