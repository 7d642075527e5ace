// libs/appointment-cell/src/services/time_range.rs
use chrono::NaiveDateTime;

use crate::models::TimeRange;

/// Half-open overlap test: `[a_start, a_end)` and `[b_start, b_end)` intersect.
///
/// Back-to-back ranges (`a_end == b_start`) do not overlap.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

impl TimeRange {
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_partial_overlap() {
        assert!(overlaps(at(10, 0), at(11, 0), at(10, 30), at(11, 30)));
        assert!(overlaps(at(10, 30), at(11, 30), at(10, 0), at(11, 0)));
    }

    #[test]
    fn test_containment_overlaps() {
        assert!(overlaps(at(9, 0), at(12, 0), at(10, 0), at(10, 15)));
        assert!(overlaps(at(10, 0), at(10, 15), at(9, 0), at(12, 0)));
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        assert!(!overlaps(at(9, 0), at(10, 0), at(10, 0), at(11, 0)));
        assert!(!overlaps(at(10, 0), at(11, 0), at(9, 0), at(10, 0)));
    }

    #[test]
    fn test_disjoint_ranges() {
        assert!(!overlaps(at(8, 0), at(9, 0), at(14, 0), at(15, 0)));
    }

    #[test]
    fn test_range_contains_is_half_open() {
        let range = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
        assert!(range.contains(at(10, 0)));
        assert!(range.contains(at(10, 59)));
        assert!(!range.contains(at(11, 0)));
    }
}
