//! Cycle conversion schedule
//!
//! Each mint cycle carries a conversion factor used when deriving the
//! base-denomination equivalent of a minted amount. The schedule is fixed:
//! cycles 1..=14 step down from 1.00 to 0.48, and any cycle outside the
//! schedule falls back to 1.00 (no discount).

/// Factors for cycles 1..=14, in cycle order.
const CYCLE_FACTORS: [f64; 14] = [
    1.00, 0.96, 0.92, 0.88, 0.84, 0.80, 0.76, 0.72, 0.68, 0.64, 0.60, 0.56, 0.52, 0.48,
];

/// Factor applied when a cycle has no entry in the schedule.
const DEFAULT_FACTOR: f64 = 1.0;

/// Conversion factor for a mint cycle.
///
/// Total over all cycle ids: 0 and anything past the schedule return the
/// default factor.
pub fn conversion_factor(cycle_id: u32) -> f64 {
    match cycle_id {
        1..=14 => CYCLE_FACTORS[(cycle_id - 1) as usize],
        _ => DEFAULT_FACTOR,
    }
}

/// The factor expressed in hundredths, as consumed by the integer
/// accrual arithmetic: `round(factor * 100)`, floored at 1 so the divisor
/// can never be zero.
pub fn conversion_scale(cycle_id: u32) -> u64 {
    let scale = (conversion_factor(cycle_id) * 100.0).round() as u64;
    scale.max(1)
}
