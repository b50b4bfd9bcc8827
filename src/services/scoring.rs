//! Deterministic scoring for submitted answers.

/// Points awarded for any correct answer before the speed bonus.
pub const BASE_POINTS: i64 = 100;
/// Largest possible speed bonus.
pub const MAX_SPEED_BONUS: i64 = 50;

/// Compute the points for one answer.
///
/// Incorrect and synthetic "no answer" submissions score zero. Correct
/// answers earn [`BASE_POINTS`] plus a bonus proportional to the time left
/// on the clock, floored and clamped so the result always lands in
/// `[100, 150]` no matter how noisy the timestamps are.
pub fn score(is_correct: bool, deadline_at_ms: i64, seconds_per_question: u32, now_ms: i64) -> i64 {
    if !is_correct {
        return 0;
    }

    let total_ms = i64::from(seconds_per_question) * 1000;
    if total_ms <= 0 {
        return BASE_POINTS;
    }

    let remaining_ms = deadline_at_ms - now_ms;
    let bonus = (remaining_ms * MAX_SPEED_BONUS / total_ms).clamp(0, MAX_SPEED_BONUS);

    BASE_POINTS + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_always_scores_zero() {
        assert_eq!(score(false, 30_000, 30, 0), 0);
        assert_eq!(score(false, 0, 30, 30_000), 0);
    }

    #[test]
    fn instant_answer_earns_full_bonus() {
        // Answered the moment the window opened: the whole window remains.
        assert_eq!(score(true, 30_000, 30, 0), 150);
    }

    #[test]
    fn halfway_answer_earns_half_bonus() {
        assert_eq!(score(true, 30_000, 30, 15_000), 125);
    }

    #[test]
    fn answer_at_deadline_earns_base_only() {
        assert_eq!(score(true, 30_000, 30, 30_000), 100);
    }

    #[test]
    fn late_clock_never_goes_below_base() {
        // The deadline already passed when the mutation ran; clamp at zero bonus.
        assert_eq!(score(true, 30_000, 30, 45_000), 100);
    }

    #[test]
    fn skewed_clock_never_exceeds_max_bonus() {
        // More time remaining than the window is long; clamp at the max bonus.
        assert_eq!(score(true, 90_000, 30, 0), 150);
    }

    #[test]
    fn bonus_is_floored() {
        // 29_999 ms of 30_000 remaining: 49.998.. floors to 49.
        assert_eq!(score(true, 30_000, 30, 1), 149);
    }

    #[test]
    fn correct_answers_stay_in_closed_range() {
        for now in (-10_000..60_000).step_by(777) {
            let points = score(true, 30_000, 30, now);
            assert!((100..=150).contains(&points), "out of range: {points}");
        }
    }

    #[test]
    fn zero_length_window_scores_base() {
        assert_eq!(score(true, 1_000, 0, 0), BASE_POINTS);
    }
}
