use tracing::debug;

use crate::models::{SchedulingError, TimeSlot};

/// Ordered set of booked intervals for a single therapist.
///
/// Slots are kept sorted by start and pairwise disjoint, so an overlap query
/// only has to look at the neighbors of the binary-search insertion point
/// instead of walking the whole calendar. The index is maintained
/// incrementally by the booking service; it is never rebuilt per request.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    slots: Vec<TimeSlot>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insert a booked interval.
    ///
    /// The caller is expected to have run conflict detection already, but the
    /// index re-checks anyway: it is the single source of truth for "is this
    /// therapist free" and must never silently admit an overlapping entry.
    pub fn insert(&mut self, slot: TimeSlot) -> Result<(), SchedulingError> {
        if let Some(conflicting) = self.first_conflict(&slot) {
            return Err(SchedulingError::Conflict { conflicting });
        }
        let at = self.slots.partition_point(|s| s.start() < slot.start());
        self.slots.insert(at, slot);
        debug!("indexed slot {} ({} booked)", slot, self.slots.len());
        Ok(())
    }

    /// Remove exactly one interval matching `slot`.
    ///
    /// A missing entry is an error so cancellation bugs surface instead of
    /// silently no-opping.
    pub fn remove(&mut self, slot: &TimeSlot) -> Result<(), SchedulingError> {
        let at = self.slots.partition_point(|s| s.start() < slot.start());
        if at < self.slots.len() && self.slots[at] == *slot {
            self.slots.remove(at);
            debug!("released slot {} ({} booked)", slot, self.slots.len());
            return Ok(());
        }
        Err(SchedulingError::SlotNotIndexed)
    }

    /// First stored interval overlapping `proposed`, if any.
    ///
    /// Because stored slots are disjoint and sorted, the earliest overlap can
    /// only be the predecessor of the insertion point or the first successor.
    pub fn first_conflict(&self, proposed: &TimeSlot) -> Option<TimeSlot> {
        let at = self.slots.partition_point(|s| s.start() < proposed.start());
        if at > 0 {
            let prev = &self.slots[at - 1];
            if prev.overlaps(proposed) {
                return Some(*prev);
            }
        }
        if at < self.slots.len() {
            let next = &self.slots[at];
            if next.overlaps(proposed) {
                return Some(*next);
            }
        }
        None
    }

    pub fn is_free(&self, proposed: &TimeSlot) -> bool {
        self.first_conflict(proposed).is_none()
    }

    /// Stored intervals overlapping `range`, in start order.
    pub fn slots_in(&self, range: &TimeSlot) -> Vec<TimeSlot> {
        let mut at = self.slots.partition_point(|s| s.start() < range.start());
        // The predecessor may spill into the range.
        if at > 0 && self.slots[at - 1].overlaps(range) {
            at -= 1;
        }
        self.slots[at..]
            .iter()
            .take_while(|s| s.start() < range.end())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn slot(start_hour: u32, end_hour: u32) -> TimeSlot {
        let at = |hour: u32| -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap()
        };
        TimeSlot::new(at(start_hour), at(end_hour)).unwrap()
    }

    #[test]
    fn insert_keeps_slots_sorted() {
        let mut index = AvailabilityIndex::new();
        index.insert(slot(14, 15)).unwrap();
        index.insert(slot(9, 10)).unwrap();
        index.insert(slot(11, 12)).unwrap();

        assert_eq!(index.len(), 3);
        let day = slot(8, 20);
        let stored = index.slots_in(&day);
        assert_eq!(stored, vec![slot(9, 10), slot(11, 12), slot(14, 15)]);
    }

    #[test]
    fn insert_refuses_overlap() {
        let mut index = AvailabilityIndex::new();
        index.insert(slot(14, 15)).unwrap();

        let result = index.insert(slot(14, 16));
        assert!(matches!(
            result,
            Err(SchedulingError::Conflict { conflicting }) if conflicting == slot(14, 15)
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn query_finds_predecessor_spilling_into_proposal() {
        let mut index = AvailabilityIndex::new();
        index.insert(slot(9, 12)).unwrap();

        // Proposed starts after the stored start but inside the interval.
        assert_eq!(index.first_conflict(&slot(10, 11)), Some(slot(9, 12)));
    }

    #[test]
    fn query_ignores_touching_neighbors() {
        let mut index = AvailabilityIndex::new();
        index.insert(slot(9, 10)).unwrap();
        index.insert(slot(11, 12)).unwrap();

        assert_eq!(index.first_conflict(&slot(10, 11)), None);
        assert!(index.is_free(&slot(10, 11)));
    }

    #[test]
    fn remove_releases_exactly_one_interval() {
        let mut index = AvailabilityIndex::new();
        index.insert(slot(9, 10)).unwrap();
        index.insert(slot(11, 12)).unwrap();

        index.remove(&slot(9, 10)).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.is_free(&slot(9, 10)));

        let missing = index.remove(&slot(9, 10));
        assert!(matches!(missing, Err(SchedulingError::SlotNotIndexed)));
    }

    #[test]
    fn remove_requires_exact_bounds() {
        let mut index = AvailabilityIndex::new();
        index.insert(slot(9, 11)).unwrap();

        assert!(matches!(
            index.remove(&slot(9, 10)),
            Err(SchedulingError::SlotNotIndexed)
        ));
        assert_eq!(index.len(), 1);
    }
}
