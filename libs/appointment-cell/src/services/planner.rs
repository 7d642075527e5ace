// libs/appointment-cell/src/services/planner.rs
use chrono::NaiveTime;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{Appointment, TimeRange};

/// Daily window the planner keeps suggestions inside, `[open, close)` local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

impl BusinessHours {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            open: config.business_hours_start,
            close: config.business_hours_end,
        }
    }
}

/// Which candidate the planner settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    JustAfter,
    JustBefore,
    Unchanged,
}

/// Pre-fills the reschedule form. Never touches the appointment itself.
#[derive(Debug, Clone, Default)]
pub struct ReschedulePlanner {
    hours: BusinessHours,
}

impl ReschedulePlanner {
    pub fn new(hours: BusinessHours) -> Self {
        Self { hours }
    }

    pub fn suggest_reschedule_interval(&self, appointment: &Appointment) -> TimeRange {
        self.suggest(appointment.interval()).0
    }

    /// Same-length slot right after the current one, else right before it,
    /// else the current interval untouched. Bounds are taken on the calendar
    /// day the current interval starts.
    pub fn suggest(&self, current: TimeRange) -> (TimeRange, SuggestionKind) {
        let duration = current.duration();
        let day = current.start.date();
        let close_at = day.and_time(self.hours.close);
        let open_at = day.and_time(self.hours.open);

        // Candidates that fall off the representable calendar are rejected.
        let after = current
            .end
            .checked_add_signed(duration)
            .map(|end| TimeRange {
                start: current.end,
                end,
            });
        if let Some(after) = after.filter(|slot| slot.end <= close_at) {
            debug!("Suggesting slot just after {}: {}", current, after);
            return (after, SuggestionKind::JustAfter);
        }

        let before = current
            .start
            .checked_sub_signed(duration)
            .map(|start| TimeRange {
                start,
                end: current.start,
            });
        if let Some(before) = before.filter(|slot| slot.start >= open_at) {
            debug!("Suggesting slot just before {}: {}", current, before);
            return (before, SuggestionKind::JustBefore);
        }

        debug!("No slot around {} fits business hours, leaving it unchanged", current);
        (current, SuggestionKind::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn range(from: NaiveDateTime, to: NaiveDateTime) -> TimeRange {
        TimeRange::new(from, to).unwrap()
    }

    #[test]
    fn test_just_after_when_it_fits() {
        let planner = ReschedulePlanner::default();
        let (slot, kind) = planner.suggest(range(at(10, 0), at(11, 0)));

        assert_eq!(kind, SuggestionKind::JustAfter);
        assert_eq!(slot, range(at(11, 0), at(12, 0)));
    }

    #[test]
    fn test_just_after_may_end_exactly_at_close() {
        let planner = ReschedulePlanner::default();
        let (slot, kind) = planner.suggest(range(at(16, 0), at(16, 30)));

        assert_eq!(kind, SuggestionKind::JustAfter);
        assert_eq!(slot, range(at(16, 30), at(17, 0)));
    }

    #[test]
    fn test_falls_back_to_just_before() {
        let planner = ReschedulePlanner::default();
        let (slot, kind) = planner.suggest(range(at(16, 30), at(17, 0)));

        assert_eq!(kind, SuggestionKind::JustBefore);
        assert_eq!(slot, range(at(16, 0), at(16, 30)));
    }

    #[test]
    fn test_unchanged_when_neither_side_fits() {
        let planner = ReschedulePlanner::default();
        let current = range(at(9, 0), at(16, 0));
        let (slot, kind) = planner.suggest(current);

        assert_eq!(kind, SuggestionKind::Unchanged);
        assert_eq!(slot, current);
    }

    #[test]
    fn test_custom_business_hours() {
        let planner = ReschedulePlanner::new(BusinessHours {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        });
        let (slot, kind) = planner.suggest(range(at(11, 0), at(12, 0)));

        assert_eq!(kind, SuggestionKind::JustBefore);
        assert_eq!(slot, range(at(10, 0), at(11, 0)));
    }

    #[test]
    fn test_calendar_edges_use_the_representable_side() {
        let planner = ReschedulePlanner::new(BusinessHours {
            open: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        });

        let last = range(NaiveDateTime::MAX - Duration::hours(1), NaiveDateTime::MAX);
        let (slot, kind) = planner.suggest(last);
        assert_eq!(kind, SuggestionKind::JustBefore);
        assert_eq!(slot.end, last.start);

        let first = range(NaiveDateTime::MIN, NaiveDateTime::MIN + Duration::hours(1));
        let (slot, kind) = planner.suggest(first);
        assert_eq!(kind, SuggestionKind::JustAfter);
        assert_eq!(slot.start, first.end);
    }

    #[test]
    fn test_no_representable_neighbour_is_unchanged() {
        let planner = ReschedulePlanner::default();
        let whole = range(NaiveDateTime::MIN, NaiveDateTime::MAX);

        let (slot, kind) = planner.suggest(whole);
        assert_eq!(kind, SuggestionKind::Unchanged);
        assert_eq!(slot, whole);
    }

    #[test]
    fn test_overflowing_before_at_calendar_start_is_unchanged() {
        let planner = ReschedulePlanner::default();
        let current = range(NaiveDateTime::MIN, NaiveDateTime::MIN + Duration::hours(10));

        // Just-after ends at 20:00, past close; just-before would precede the calendar.
        let (slot, kind) = planner.suggest(current);
        assert_eq!(kind, SuggestionKind::Unchanged);
        assert_eq!(slot, current);
    }
}
