//! Ordered store of scheduled General Assemblies
//!
//! Records are kept strictly ascending by start time. `cursor` names the
//! GA currently in progress (or most recently begun); everything before it
//! is concluded. It is `None` until the first GA begins.

use serde::{Deserialize, Serialize};
use tracing::info;

use icn_config::TimingConfig;
use icn_core::utils::format_span;

use crate::error::{GovernanceError, GovernanceResult};
use crate::types::{GaCategory, GaRecord, Timestamp};
use crate::validator::check_scheduling_time;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    records: Vec<GaRecord>,
    cursor: Option<usize>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of GAs ever scheduled
    pub fn total_scheduled(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GaRecord] {
        &self.records
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn get(&self, index: usize) -> GovernanceResult<&GaRecord> {
        self.records.get(index).ok_or(GovernanceError::InvalidReference {
            index,
            total: self.records.len(),
        })
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> GovernanceResult<&mut GaRecord> {
        let total = self.records.len();
        self.records
            .get_mut(index)
            .ok_or(GovernanceError::InvalidReference { index, total })
    }

    /// Index of the GA starting exactly at `start_time`
    pub fn index_of_start(&self, start_time: Timestamp) -> Option<usize> {
        self.records
            .binary_search_by_key(&start_time, |record| record.start_time)
            .ok()
    }

    /// The GA the cursor points at, if any has begun
    pub fn current(&self) -> Option<&GaRecord> {
        self.cursor.and_then(|i| self.records.get(i))
    }

    /// Index of the first GA after the cursor
    pub fn next_index(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    /// The first GA after the cursor, with its index
    pub fn upcoming(&self) -> Option<(usize, &GaRecord)> {
        let index = self.next_index();
        self.records.get(index).map(|record| (index, record))
    }

    /// Position a GA starting at `time` takes: the first entry from the
    /// cursor onward that starts later, or the end of the schedule.
    pub fn insertion_position(&self, time: Timestamp) -> usize {
        let from = self.cursor.unwrap_or(0);
        self.records[from..]
            .iter()
            .position(|record| record.start_time > time)
            .map_or(self.records.len(), |offset| from + offset)
    }

    /// Validate and insert a GA, returning its index.
    ///
    /// Entries at or after the insertion point move one place later. The
    /// shifted sequence is built in full and then installed.
    pub fn insert(
        &mut self,
        time: Timestamp,
        duration: u64,
        category: GaCategory,
        now: Timestamp,
        timing: &TimingConfig,
    ) -> GovernanceResult<usize> {
        if duration == 0 {
            return Err(GovernanceError::SchedulingConflict(
                "GA duration must be greater than zero".to_string(),
            ));
        }

        let position = check_scheduling_time(time, category, self, now, timing)?;
        let record = GaRecord::new(time, duration, category);

        if let Some(following) = self.records.get(position) {
            let gap = following.start_time.checked_sub(record.end_time());
            if !matches!(gap, Some(gap) if gap > timing.min_interval_cross) {
                return Err(GovernanceError::SchedulingConflict(format!(
                    "GA ending at {} runs into the GA starting at {}",
                    record.end_time(),
                    following.start_time
                )));
            }
        }

        let shifted: Vec<GaRecord> = self.records[..position]
            .iter()
            .cloned()
            .chain(std::iter::once(record))
            .chain(self.records[position..].iter().cloned())
            .collect();
        self.records = shifted;

        if let Some(cursor) = self.cursor {
            if position <= cursor {
                self.cursor = Some(cursor + 1);
            }
        }

        info!(
            "Scheduled {} GA #{} at {} for {} ({} total)",
            category,
            position,
            time,
            format_span(duration),
            self.records.len()
        );
        Ok(position)
    }

    /// Step the cursor onto the next GA once its window has begun
    pub(crate) fn advance_cursor(&mut self, now: Timestamp) -> bool {
        match self.upcoming() {
            Some((index, record)) if record.has_started(now) => {
                self.cursor = Some(index);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_700_000_000;
    const DAY: u64 = 86_400;
    const WEEK: u64 = 7 * DAY;

    fn starts(schedule: &Schedule) -> Vec<Timestamp> {
        schedule.records().iter().map(|r| r.start_time).collect()
    }

    #[test]
    fn test_insert_keeps_order() {
        let timing = TimingConfig::default();
        let mut schedule = Schedule::new();

        let a = NOW + 80 * WEEK;
        let b = NOW + 10 * WEEK;
        let c = NOW + 40 * WEEK;

        assert_eq!(schedule.insert(a, DAY, GaCategory::Regular, NOW, &timing).unwrap(), 0);
        assert_eq!(schedule.insert(b, DAY, GaCategory::Regular, NOW, &timing).unwrap(), 0);
        assert_eq!(schedule.insert(c, DAY, GaCategory::Regular, NOW, &timing).unwrap(), 1);

        assert_eq!(starts(&schedule), vec![b, c, a]);
        assert_eq!(schedule.total_scheduled(), 3);
        assert!(schedule
            .records()
            .iter()
            .all(|r| r.current_end_watermark == r.start_time));
    }

    #[test]
    fn test_rejected_insert_changes_nothing() {
        let timing = TimingConfig::default();
        let mut schedule = Schedule::new();
        schedule
            .insert(NOW + 10 * WEEK, DAY, GaCategory::Regular, NOW, &timing)
            .unwrap();
        let before = schedule.clone();

        assert!(schedule
            .insert(NOW + 11 * WEEK, DAY, GaCategory::Regular, NOW, &timing)
            .is_err());
        assert!(schedule
            .insert(NOW + 30 * WEEK, 0, GaCategory::Regular, NOW, &timing)
            .is_err());
        assert_eq!(schedule, before);
    }

    #[test]
    fn test_long_ga_may_not_run_into_the_next() {
        let timing = TimingConfig::default();
        let mut schedule = Schedule::new();
        let later = NOW + 40 * WEEK;
        schedule
            .insert(later, DAY, GaCategory::Regular, NOW, &timing)
            .unwrap();

        let early = NOW + 20 * WEEK;
        let err = schedule
            .insert(early, 21 * WEEK, GaCategory::Regular, NOW, &timing)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::SchedulingConflict(_)));
        assert_eq!(schedule.total_scheduled(), 1);
    }

    #[test]
    fn test_get_out_of_range() {
        let schedule = Schedule::new();
        assert!(matches!(
            schedule.get(0),
            Err(GovernanceError::InvalidReference { index: 0, total: 0 })
        ));
    }

    #[test]
    fn test_advance_cursor_single_step() {
        let timing = TimingConfig::default();
        let mut schedule = Schedule::new();
        let first = NOW + 5 * WEEK;
        let second = NOW + 20 * WEEK;
        schedule.insert(first, DAY, GaCategory::Regular, NOW, &timing).unwrap();
        schedule.insert(second, DAY, GaCategory::Regular, NOW, &timing).unwrap();

        assert!(!schedule.advance_cursor(first - 1));
        assert_eq!(schedule.cursor(), None);
        assert_eq!(schedule.upcoming().map(|(i, _)| i), Some(0));

        // Both windows have begun, but only one step is taken per call
        assert!(schedule.advance_cursor(second + 1));
        assert_eq!(schedule.cursor(), Some(0));
        assert!(schedule.advance_cursor(second + 1));
        assert_eq!(schedule.cursor(), Some(1));
        assert!(!schedule.advance_cursor(second + 1));
        assert!(schedule.upcoming().is_none());
    }
}
