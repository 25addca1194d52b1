//! Points awarded for a correct answer.

/// Floor on the time-based component of an award.
pub const BASE_POINTS_FLOOR: u32 = 100;
/// Points per second left on the clock.
pub const POINTS_PER_SECOND: u32 = 10;

/// Points for a correct answer given the time left and the streak *before* this answer.
///
/// `round(max(100, seconds_remaining * 10) * (1 + streak * 0.1))`. The base is
/// always a multiple of ten, so the combo multiplier is applied in exact
/// integer arithmetic as `base * (10 + streak) / 10`.
#[must_use]
pub fn compute_points(seconds_remaining: u32, streak_before: u32) -> u32 {
    let base = u64::from(seconds_remaining)
        .saturating_mul(u64::from(POINTS_PER_SECOND))
        .max(u64::from(BASE_POINTS_FLOOR));
    let tenths = 10_u64.saturating_add(u64::from(streak_before));
    let points = base.saturating_mul(tenths) / 10;
    u32::try_from(points).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_points_follow_time_left() {
        assert_eq!(compute_points(15, 0), 150);
        assert_eq!(compute_points(10, 0), 100);
    }

    #[test]
    fn floor_applies_when_time_is_low() {
        assert_eq!(compute_points(0, 0), 100);
        assert_eq!(compute_points(3, 0), 100);
    }

    #[test]
    fn streak_adds_ten_percent_each() {
        assert_eq!(compute_points(15, 2), 180);
        assert_eq!(compute_points(10, 1), 110);
        assert_eq!(compute_points(0, 5), 150);
    }

    #[test]
    fn huge_inputs_saturate() {
        assert_eq!(compute_points(u32::MAX, u32::MAX), u32::MAX);
    }
}
