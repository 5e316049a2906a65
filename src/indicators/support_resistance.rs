// =============================================================================
// Support / Resistance — order-statistic approximation
// =============================================================================
//
// Sorts the whole series ascending and reads the elements at the 10th and
// 90th percentile positions (`floor(n * 0.1)` / `floor(n * 0.9)`). This is a
// cheap range estimate, not a swing-point detector.
// =============================================================================

use serde::{Deserialize, Serialize};

const MIN_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Estimate support and resistance for `prices`.
///
/// # Edge cases
/// - Fewer than 5 prices => series minimum / maximum.
/// - Empty input => `0.0` for both levels.
pub fn find_support_resistance(prices: &[f64]) -> SupportResistance {
    if prices.is_empty() {
        return SupportResistance {
            support: 0.0,
            resistance: 0.0,
        };
    }

    if prices.len() < MIN_POINTS {
        let support = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let resistance = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        return SupportResistance { support, resistance };
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let support = sorted[(n * 0.1).floor() as usize];
    let resistance = sorted[(n * 0.9).floor() as usize];

    SupportResistance { support, resistance }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sr_empty_input() {
        let sr = find_support_resistance(&[]);
        assert_eq!(sr.support, 0.0);
        assert_eq!(sr.resistance, 0.0);
    }

    #[test]
    fn sr_short_series_uses_min_max() {
        let sr = find_support_resistance(&[3.0, 1.0, 4.0, 1.5]);
        assert_eq!(sr.support, 1.0);
        assert_eq!(sr.resistance, 4.0);
    }

    #[test]
    fn sr_percentile_indices() {
        // 50 points 0..49 shuffled by a stride: sorted[5] = 5, sorted[45] = 45.
        let prices: Vec<f64> = (0..50).map(|i| ((i * 17) % 50) as f64).collect();
        let sr = find_support_resistance(&prices);
        assert_eq!(sr.support, 5.0);
        assert_eq!(sr.resistance, 45.0);
    }

    #[test]
    fn sr_five_points() {
        // floor(0.5) = 0, floor(4.5) = 4
        let sr = find_support_resistance(&[9.0, 7.0, 8.0, 6.0, 10.0]);
        assert_eq!(sr.support, 6.0);
        assert_eq!(sr.resistance, 10.0);
    }

    #[test]
    fn sr_support_never_above_resistance() {
        for len in 1..60 {
            let prices: Vec<f64> = (0..len).map(|i| (i as f64 * 0.9).cos() * 4.0).collect();
            let sr = find_support_resistance(&prices);
            assert!(sr.support <= sr.resistance, "len {len}: {sr:?}");
        }
    }
}
