//! Advancing the current GA as time passes

use tracing::info;

use crate::schedule::Schedule;
use crate::types::{StatuteHash, Timestamp};

/// Move the cursor onto the next GA if its window has begun, seeding that
/// GA's statute hash from `statute`.
///
/// Steps at most one GA per call; when several windows have begun, call
/// again until it returns `false`.
pub fn advance_if_elapsed(schedule: &mut Schedule, now: Timestamp, statute: &StatuteHash) -> bool {
    if !schedule.advance_cursor(now) {
        return false;
    }

    let Some(index) = schedule.cursor() else {
        return false;
    };
    if let Ok(record) = schedule.get_mut(index) {
        record.statute = *statute;
    }
    info!("GA #{} is now current (statute {})", index, statute);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GaCategory;
    use icn_config::TimingConfig;

    const NOW: Timestamp = 1_700_000_000;
    const WEEK: u64 = 7 * 86_400;

    #[test]
    fn test_advance_seeds_statute() {
        let timing = TimingConfig::default();
        let mut schedule = Schedule::new();
        let first = NOW + 5 * WEEK;
        let second = NOW + 30 * WEEK;
        schedule.insert(first, 86_400, GaCategory::Regular, NOW, &timing).unwrap();
        schedule.insert(second, 86_400, GaCategory::Regular, NOW, &timing).unwrap();

        let statute_a = StatuteHash::digest("statute v1");
        let statute_b = StatuteHash::digest("statute v2");

        assert!(!advance_if_elapsed(&mut schedule, first - 1, &statute_a));
        assert!(advance_if_elapsed(&mut schedule, first, &statute_a));
        assert_eq!(schedule.current().unwrap().statute, statute_a);
        assert!(schedule.records()[1].statute.is_unset());

        assert!(!advance_if_elapsed(&mut schedule, second - 1, &statute_b));
        assert!(advance_if_elapsed(&mut schedule, second + 1, &statute_b));
        assert_eq!(schedule.cursor(), Some(1));
        assert_eq!(schedule.records()[0].statute, statute_a);
        assert_eq!(schedule.records()[1].statute, statute_b);
    }

    #[test]
    fn test_empty_schedule_never_advances() {
        let mut schedule = Schedule::new();
        assert!(!advance_if_elapsed(&mut schedule, NOW, &StatuteHash::default()));
        assert_eq!(schedule.cursor(), None);
    }
}
