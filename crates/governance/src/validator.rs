//! Interval validation for proposed GA start times
//!
//! A candidate time is legal when it falls inside the category's lookahead
//! window, lies strictly beyond the closest-future floor, and keeps strictly
//! more than the category's minimum interval (never less than the
//! cross-category floor) to the end of the preceding GA and to the start of
//! the following one.

use icn_config::TimingConfig;

use crate::error::{GovernanceError, GovernanceResult};
use crate::schedule::Schedule;
use crate::types::{GaCategory, Timestamp};

/// Pure predicate form of [`check_scheduling_time`]
pub fn is_valid_scheduling_time(
    time: Timestamp,
    category: GaCategory,
    schedule: &Schedule,
    now: Timestamp,
    timing: &TimingConfig,
) -> bool {
    check_scheduling_time(time, category, schedule, now, timing).is_ok()
}

/// Validate `time` and return the position a GA starting then would take
pub fn check_scheduling_time(
    time: Timestamp,
    category: GaCategory,
    schedule: &Schedule,
    now: Timestamp,
    timing: &TimingConfig,
) -> GovernanceResult<usize> {
    // Lookahead and closest-future floor together leave (floor, horizon]
    let floor = now.saturating_add(category.closest_future(timing));
    let horizon = now.saturating_add(category.timespan(timing));
    if time <= floor || time > horizon {
        return Err(GovernanceError::OutOfWindow(format!(
            "{} GA at {} is outside the allowed window [{}, {}]",
            category,
            time,
            floor.saturating_add(1),
            horizon
        )));
    }

    let position = schedule.insertion_position(time);
    let min_interval = category.min_interval(timing);
    let records = schedule.records();

    if let Some(previous) = position.checked_sub(1).map(|i| &records[i]) {
        let gap = time.checked_sub(previous.end_time());
        if !matches!(gap, Some(gap) if gap > min_interval) {
            return Err(GovernanceError::SchedulingConflict(format!(
                "GA at {} is within {}s of the GA ending at {}",
                time,
                min_interval,
                previous.end_time()
            )));
        }
    }

    if let Some(following) = records.get(position) {
        if following.start_time - time <= min_interval {
            return Err(GovernanceError::SchedulingConflict(format!(
                "GA at {} is within {}s of the GA starting at {}",
                time, min_interval, following.start_time
            )));
        }
    }

    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_700_000_000;
    const DAY: u64 = 86_400;
    const WEEK: u64 = 7 * DAY;

    fn timing() -> TimingConfig {
        TimingConfig::default()
    }

    fn schedule_with(starts: &[(Timestamp, GaCategory)]) -> Schedule {
        let mut schedule = Schedule::new();
        for (start, category) in starts {
            schedule
                .insert(*start, DAY, *category, NOW, &timing())
                .unwrap();
        }
        schedule
    }

    #[test]
    fn test_closest_future_floor_on_empty_schedule() {
        let schedule = Schedule::new();
        let floor = NOW + timing().closest_future_ga;

        assert!(!is_valid_scheduling_time(floor, GaCategory::Regular, &schedule, NOW, &timing()));
        assert!(!is_valid_scheduling_time(floor - 1, GaCategory::Regular, &schedule, NOW, &timing()));
        assert!(is_valid_scheduling_time(floor + 1, GaCategory::Regular, &schedule, NOW, &timing()));

        let err = check_scheduling_time(NOW, GaCategory::Regular, &schedule, NOW, &timing())
            .unwrap_err();
        let window = format!("[{}, {}]", floor + 1, NOW + timing().timespan_ga);
        assert!(err.to_string().contains(&window));
    }

    #[test]
    fn test_lookahead_window() {
        let schedule = Schedule::new();
        let horizon = NOW + timing().timespan_ga;

        assert!(is_valid_scheduling_time(horizon, GaCategory::Regular, &schedule, NOW, &timing()));
        assert!(matches!(
            check_scheduling_time(horizon + 1, GaCategory::Regular, &schedule, NOW, &timing()),
            Err(GovernanceError::OutOfWindow(_))
        ));
        assert!(matches!(
            check_scheduling_time(NOW - 1, GaCategory::Regular, &schedule, NOW, &timing()),
            Err(GovernanceError::OutOfWindow(_))
        ));
        // Extraordinary GAs have a shorter lookahead
        assert!(!is_valid_scheduling_time(
            NOW + timing().timespan_ega + 1,
            GaCategory::Extraordinary,
            &schedule,
            NOW,
            &timing()
        ));
    }

    #[test]
    fn test_spacing_is_strict() {
        let first = NOW + 5 * WEEK;
        let schedule = schedule_with(&[(first, GaCategory::Regular)]);
        let end = first + DAY;
        let min = timing().min_interval_ga;

        let at = |t| is_valid_scheduling_time(t, GaCategory::Regular, &schedule, NOW, &timing());
        assert!(!at(end + min));
        assert!(!at(end + min - 1));
        assert!(at(end + min + 1));
    }

    #[test]
    fn test_spacing_before_following_ga() {
        let later = NOW + 40 * WEEK;
        let schedule = schedule_with(&[(later, GaCategory::Regular)]);
        let min = timing().min_interval_ga;

        assert!(matches!(
            check_scheduling_time(later - min, GaCategory::Regular, &schedule, NOW, &timing()),
            Err(GovernanceError::SchedulingConflict(_))
        ));
        assert_eq!(
            check_scheduling_time(later - min - 1, GaCategory::Regular, &schedule, NOW, &timing())
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_cross_floor_applies_between_categories() {
        let timing = TimingConfig {
            min_interval_ega: DAY,
            min_interval_cross: 3 * DAY,
            ..TimingConfig::default()
        };
        let first = NOW + 5 * WEEK;
        let mut schedule = Schedule::new();
        schedule
            .insert(first, DAY, GaCategory::Regular, NOW, &timing)
            .unwrap();

        let end = first + DAY;
        // Extraordinary interval alone would allow this, the cross floor does not
        assert!(!is_valid_scheduling_time(end + 2 * DAY, GaCategory::Extraordinary, &schedule, NOW, &timing));
        assert!(is_valid_scheduling_time(end + 3 * DAY + 1, GaCategory::Extraordinary, &schedule, NOW, &timing));
    }

    #[test]
    fn test_rejects_time_inside_existing_ga() {
        let first = NOW + 10 * WEEK;
        let schedule = schedule_with(&[(first, GaCategory::Regular)]);
        assert!(!is_valid_scheduling_time(first, GaCategory::Extraordinary, &schedule, NOW, &timing()));
        assert!(!is_valid_scheduling_time(first + 1, GaCategory::Extraordinary, &schedule, NOW, &timing()));
    }

    #[test]
    fn test_scan_starts_at_cursor() {
        let mut schedule = Schedule::new();
        schedule
            .insert(NOW + 5 * WEEK, DAY, GaCategory::Regular, NOW, &timing())
            .unwrap();
        let later = NOW + 5 * WEEK + 1;
        assert!(schedule.advance_cursor(later));
        assert_eq!(schedule.cursor(), Some(0));

        let position = schedule.insertion_position(later + 30 * WEEK);
        assert_eq!(position, 1);
    }
}
