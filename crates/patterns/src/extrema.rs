//! Local peak and trough detection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumKind {
    Peak,
    Trough,
}

/// A local extremum. `index` is relative to the slice it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub index: usize,
    pub price: f64,
    pub kind: ExtremumKind,
}

/// Finds every peak and trough in `prices`, in index order.
///
/// A peak dominates the closed neighbourhood `[i - order, i + order]` and
/// stands more than `min_relative_change` above the lowest value on each side;
/// troughs mirror this. Nothing is reported within `order` positions of either
/// boundary. On a plateau only the leftmost index qualifies.
pub fn find_extrema(prices: &[f64], order: usize, min_relative_change: f64) -> Vec<Extremum> {
    let n = prices.len();
    if order == 0 || n < 2 * order + 1 {
        return Vec::new();
    }

    let mut extrema = Vec::new();
    for i in order..n - order {
        let center = prices[i];
        let left = &prices[i - order..i];
        let right = &prices[i + 1..=i + order];

        if is_peak(center, left, right, min_relative_change) {
            extrema.push(Extremum {
                index: i,
                price: center,
                kind: ExtremumKind::Peak,
            });
        } else if is_trough(center, left, right, min_relative_change) {
            extrema.push(Extremum {
                index: i,
                price: center,
                kind: ExtremumKind::Trough,
            });
        }
    }
    extrema
}

/// Peaks only.
pub fn find_peaks(prices: &[f64], order: usize, min_relative_change: f64) -> Vec<Extremum> {
    find_extrema(prices, order, min_relative_change)
        .into_iter()
        .filter(|e| e.kind == ExtremumKind::Peak)
        .collect()
}

/// Troughs only.
pub fn find_troughs(prices: &[f64], order: usize, min_relative_change: f64) -> Vec<Extremum> {
    find_extrema(prices, order, min_relative_change)
        .into_iter()
        .filter(|e| e.kind == ExtremumKind::Trough)
        .collect()
}

fn is_peak(center: f64, left: &[f64], right: &[f64], threshold: f64) -> bool {
    if !center.is_finite() || left.iter().any(|&v| v >= center) || right.iter().any(|&v| v > center)
    {
        return false;
    }
    let left_min = left.iter().copied().fold(f64::INFINITY, f64::min);
    let right_min = right.iter().copied().fold(f64::INFINITY, f64::min);
    if left_min <= 0.0 || right_min <= 0.0 {
        return false;
    }
    let height = ((center - left_min) / left_min).min((center - right_min) / right_min);
    height > threshold
}

fn is_trough(center: f64, left: &[f64], right: &[f64], threshold: f64) -> bool {
    if !center.is_finite()
        || center <= 0.0
        || left.iter().any(|&v| v <= center)
        || right.iter().any(|&v| v < center)
    {
        return false;
    }
    let left_max = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let right_max = right.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let depth = ((left_max - center) / center).min((right_max - center) / center);
    depth > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_alternating_extrema() {
        let prices = [100.0, 102.0, 105.0, 103.0, 100.0, 97.0, 99.0, 104.0, 101.0];
        let extrema = find_extrema(&prices, 2, 0.01);

        assert_eq!(
            extrema,
            vec![
                Extremum { index: 2, price: 105.0, kind: ExtremumKind::Peak },
                Extremum { index: 5, price: 97.0, kind: ExtremumKind::Trough },
            ]
        );
    }

    #[test]
    fn ignores_boundaries() {
        // The global max sits at the edge and must not be reported.
        let prices = [120.0, 100.0, 101.0, 100.0, 99.0];
        assert!(find_peaks(&prices, 2, 0.0).is_empty());
    }

    #[test]
    fn small_moves_are_filtered_by_prominence() {
        let prices = [100.0, 100.2, 100.5, 100.2, 100.0];
        assert_eq!(find_peaks(&prices, 2, 0.001).len(), 1);
        assert!(find_peaks(&prices, 2, 0.01).is_empty());
    }

    #[test]
    fn plateau_resolves_to_first_index() {
        let prices = [100.0, 103.0, 110.0, 110.0, 104.0, 100.0, 99.0];
        let peaks = find_peaks(&prices, 2, 0.01);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        assert!(find_extrema(&[], 3, 0.01).is_empty());
        assert!(find_extrema(&[1.0, 2.0, 1.0], 0, 0.01).is_empty());
        assert!(find_extrema(&[1.0, 2.0, 1.0], 2, 0.01).is_empty());
    }
}
