use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::{AssignmentError, OccurrenceWindow, RecurrenceFrequency, RecurrenceRule};

/// Expands a recurrence rule into concrete occurrence dates.
///
/// Occurrence `i` is derived from the rule and `i` alone, so two expansions of
/// the same rule always agree and no iteration state is shared between
/// readers. Monthly rules keep the start's day-of-month and fall back to the
/// last day of shorter months (Jan 31 -> Feb 28/29).
pub struct RecurrenceExpander;

impl RecurrenceExpander {
    pub fn new() -> Self {
        Self
    }

    /// Collect every occurrence inside `window`, validating the rule first.
    pub fn expand(
        &self,
        rule: &RecurrenceRule,
        window: &OccurrenceWindow,
    ) -> Result<Vec<NaiveDate>, AssignmentError> {
        rule.validate()?;
        Ok(self.occurrences(rule, window).collect())
    }

    /// Lazy occurrence sequence; assumes `rule` was validated.
    pub fn occurrences(&self, rule: &RecurrenceRule, window: &OccurrenceWindow) -> Occurrences {
        Occurrences {
            rule: *rule,
            window: *window,
            anchor: anchor_for(rule),
            index: 0,
        }
    }

    /// Window covering the whole rule, or `None` for an open-ended rule.
    pub fn rule_bounds(&self, rule: &RecurrenceRule) -> Option<OccurrenceWindow> {
        let until = match (rule.end_date, rule.occurrence_count) {
            (Some(end), _) => end,
            (None, Some(count)) => occurrence_date(rule, anchor_for(rule), count.checked_sub(1)?)?,
            (None, None) => return None,
        };
        Some(OccurrenceWindow {
            from: rule.start_date,
            until,
        })
    }
}

impl Default for RecurrenceExpander {
    fn default() -> Self {
        Self::new()
    }
}

/// First occurrence: `start_date`, advanced to the pinned weekday for
/// weekly/biweekly rules that set one.
fn anchor_for(rule: &RecurrenceRule) -> NaiveDate {
    match (rule.frequency, rule.day_of_week) {
        (RecurrenceFrequency::Weekly | RecurrenceFrequency::Biweekly, Some(weekday)) => {
            let mut date = rule.start_date;
            while date.weekday() != weekday {
                date += Duration::days(1);
            }
            date
        }
        _ => rule.start_date,
    }
}

fn occurrence_date(rule: &RecurrenceRule, anchor: NaiveDate, index: u32) -> Option<NaiveDate> {
    match rule.frequency {
        RecurrenceFrequency::Daily => anchor.checked_add_signed(Duration::days(index as i64)),
        RecurrenceFrequency::Weekly => {
            anchor.checked_add_signed(Duration::days(7 * index as i64))
        }
        RecurrenceFrequency::Biweekly => {
            anchor.checked_add_signed(Duration::days(14 * index as i64))
        }
        // checked_add_months clamps the day to the end of short months.
        RecurrenceFrequency::Monthly => anchor.checked_add_months(Months::new(index)),
    }
}

/// Restartable occurrence iterator. Dates before the window are skipped but
/// still consume their occurrence index; the sequence ends at the rule's own
/// bound or the window horizon, whichever comes first.
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: RecurrenceRule,
    window: OccurrenceWindow,
    anchor: NaiveDate,
    index: u32,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            if let Some(count) = self.rule.occurrence_count {
                if self.index >= count {
                    return None;
                }
            }
            let date = occurrence_date(&self.rule, self.anchor, self.index)?;
            if date > self.window.until {
                return None;
            }
            if let Some(end) = self.rule.end_date {
                if date > end {
                    return None;
                }
            }
            self.index += 1;
            if date < self.window.from {
                continue;
            }
            return Some(date);
        }
    }
}
