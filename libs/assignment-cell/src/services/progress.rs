use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::models::{CheckInEvent, ProgressSnapshot};

/// Pure fold of check-ins over an expanded occurrence list.
///
/// Takes immutable snapshots and holds no state, so any number of readers can
/// recompute progress concurrently without coordination.
pub struct ProgressTracker;

impl ProgressTracker {
    pub fn new() -> Self {
        Self
    }

    /// Occurrences are expected in ascending date order, as produced by the
    /// recurrence expander. Check-ins match occurrences by date, not by
    /// insertion order.
    pub fn snapshot(
        &self,
        occurrences: &[NaiveDate],
        check_ins: &[CheckInEvent],
        today: NaiveDate,
    ) -> ProgressSnapshot {
        let completed: BTreeSet<NaiveDate> =
            check_ins.iter().map(|c| c.occurrence_date).collect();

        let mut completed_count = 0;
        let mut last_completed_date = None;
        for date in occurrences {
            if completed.contains(date) {
                completed_count += 1;
                if last_completed_date.map_or(true, |last| last < *date) {
                    last_completed_date = Some(*date);
                }
            }
        }

        // Walk the occurrences that are already due from newest to oldest,
        // stopping at the first one without a check-in.
        let mut current_streak = 0;
        for date in occurrences.iter().rev().filter(|d| **d <= today) {
            if completed.contains(date) {
                current_streak += 1;
            } else {
                break;
            }
        }

        ProgressSnapshot {
            completed_count,
            total_occurrences: occurrences.len(),
            current_streak,
            last_completed_date,
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn check_in(day: u32) -> CheckInEvent {
        CheckInEvent {
            occurrence_date: date(day),
            completed_at: Utc.with_ymd_and_hms(2025, 1, day, 20, 0, 0).unwrap(),
            value: None,
        }
    }

    fn five_days() -> Vec<NaiveDate> {
        (1..=5).map(date).collect()
    }

    #[test]
    fn trailing_run_counts_toward_the_streak() {
        let tracker = ProgressTracker::new();
        let check_ins = vec![check_in(3), check_in(4), check_in(5)];

        let snapshot = tracker.snapshot(&five_days(), &check_ins, date(5));
        assert_eq!(snapshot.completed_count, 3);
        assert_eq!(snapshot.total_occurrences, 5);
        assert_eq!(snapshot.current_streak, 3);
        assert_eq!(snapshot.last_completed_date, Some(date(5)));
    }

    #[test]
    fn uncompleted_latest_occurrence_breaks_the_streak() {
        let tracker = ProgressTracker::new();
        let check_ins = vec![check_in(1)];

        let snapshot = tracker.snapshot(&five_days(), &check_ins, date(5));
        assert_eq!(snapshot.completed_count, 1);
        assert_eq!(snapshot.current_streak, 0);
        assert_eq!(snapshot.last_completed_date, Some(date(1)));
    }

    #[test]
    fn gaps_cut_the_streak_short() {
        let tracker = ProgressTracker::new();
        // Day 3 is missing: only the 4-5 run counts.
        let check_ins = vec![check_in(1), check_in(2), check_in(4), check_in(5)];

        let snapshot = tracker.snapshot(&five_days(), &check_ins, date(5));
        assert_eq!(snapshot.completed_count, 4);
        assert_eq!(snapshot.current_streak, 2);
    }

    #[test]
    fn future_occurrences_do_not_break_the_streak() {
        let tracker = ProgressTracker::new();
        let check_ins = vec![check_in(1), check_in(2), check_in(3)];

        // Days 4 and 5 are not due yet.
        let snapshot = tracker.snapshot(&five_days(), &check_ins, date(3));
        assert_eq!(snapshot.current_streak, 3);
    }

    #[test]
    fn check_ins_outside_the_occurrence_set_are_ignored() {
        let tracker = ProgressTracker::new();
        let check_ins = vec![check_in(2), check_in(20)];

        let snapshot = tracker.snapshot(&five_days(), &check_ins, date(5));
        assert_eq!(snapshot.completed_count, 1);
        assert_eq!(snapshot.last_completed_date, Some(date(2)));
    }

    #[test]
    fn empty_inputs_yield_an_empty_snapshot() {
        let tracker = ProgressTracker::new();
        let snapshot = tracker.snapshot(&[], &[], date(1));
        assert_eq!(snapshot.completed_count, 0);
        assert_eq!(snapshot.total_occurrences, 0);
        assert_eq!(snapshot.current_streak, 0);
        assert_eq!(snapshot.last_completed_date, None);
    }
}
