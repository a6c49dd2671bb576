// src/limits.rs
//
// Conflict & Limit Evaluator: pure interval math over scheduled shifts plus
// the cumulative daily/weekly/monthly cap projection. No side effects; the
// scheduler calls these before committing anything.
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tracing::debug;

use crate::engine::ShiftEngine;
use crate::error::{EngineError, EngineResult, LimitScope};
use crate::model::{EmployeeWorkingHoursLimit, Shift, ShiftId, MINUTES_PER_DAY};

/// A scheduled interval as minutes from midnight. `end` may exceed 1440 for
/// midnight-crossing shifts so the half-open overlap test stays valid.
pub(crate) fn interval_span(start: NaiveTime, end: NaiveTime) -> (i64, i64) {
    let s = i64::from(start.num_seconds_from_midnight()) / 60;
    let mut e = i64::from(end.num_seconds_from_midnight()) / 60;
    if e <= s {
        e += MINUTES_PER_DAY;
    }
    (s, e)
}

/// Half-open overlap test: `start1 < end2 && end1 > start2`. Back-to-back
/// intervals sharing an endpoint do not overlap.
pub(crate) fn spans_overlap(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0 < b.1 && a.1 > b.0
}

/// Net worked minutes for a scheduled interval: duration minus the break
/// allowance, normalized by +24h when the raw difference is negative.
pub fn net_worked_minutes(start: NaiveTime, end: NaiveTime, break_minutes: i64) -> i64 {
    let raw = (end - start).num_minutes();
    let duration = if raw > 0 { raw } else { raw + MINUTES_PER_DAY };
    duration - break_minutes
}

pub fn minutes_to_hours(minutes: i64) -> Decimal {
    Decimal::from(minutes) / dec!(60)
}

impl ShiftEngine {
    /// True if any existing active shift for the employee on `date` overlaps
    /// the candidate interval.
    pub fn has_shift_conflict(
        &self,
        employee_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_shift_id: Option<&str>,
    ) -> bool {
        let shifts = self.shifts.lock().unwrap();
        Self::find_conflict_in(&shifts, employee_id, date, start, end, exclude_shift_id).is_some()
    }

    pub(crate) fn find_conflict_in(
        shifts: &HashMap<ShiftId, Shift>,
        employee_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_shift_id: Option<&str>,
    ) -> Option<Shift> {
        let candidate = interval_span(start, end);
        shifts
            .values()
            .filter(|s| s.active && s.date == date)
            .filter(|s| s.employee_id.as_deref() == Some(employee_id))
            .filter(|s| Some(s.id.as_str()) != exclude_shift_id)
            .find(|s| spans_overlap(interval_span(s.start_time, s.end_time), candidate))
            .cloned()
    }

    /// The limit whose validity interval `[valid_from, valid_to)` contains
    /// `date`, preferring the most recent `valid_from`.
    pub fn active_limit(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Option<EmployeeWorkingHoursLimit> {
        self.limits
            .lock()
            .unwrap()
            .values()
            .filter(|l| l.active && l.employee_id == employee_id)
            .filter(|l| l.valid_from <= date && l.valid_to.map_or(true, |to| date < to))
            .max_by_key(|l| l.valid_from)
            .cloned()
    }

    /// True when scheduling `candidate_hours` on `date` would breach the
    /// employee's active cap.
    pub fn exceeds_working_hours_limit(
        &self,
        employee_id: &str,
        date: NaiveDate,
        candidate_hours: Decimal,
        exclude_shift_id: Option<&str>,
    ) -> bool {
        let shifts = self.shifts.lock().unwrap();
        self.check_limit_in(&shifts, employee_id, date, candidate_hours, exclude_shift_id)
            .is_err()
    }

    /// Cap projection against the active limit. No limit configured means
    /// nothing can be exceeded. The daily cap is checked against the
    /// candidate alone; weekly/monthly caps against the candidate plus the
    /// scheduled net hours already on the books in the same ISO week /
    /// calendar month.
    pub(crate) fn check_limit_in(
        &self,
        shifts: &HashMap<ShiftId, Shift>,
        employee_id: &str,
        date: NaiveDate,
        candidate_hours: Decimal,
        exclude_shift_id: Option<&str>,
    ) -> EngineResult<()> {
        let Some(limit) = self.active_limit(employee_id, date) else {
            return Ok(());
        };

        if let Some(cap) = limit.max_hours_per_day {
            if candidate_hours > cap {
                return Err(EngineError::LimitExceeded {
                    scope: LimitScope::Daily,
                    cap_hours: cap,
                    projected_hours: candidate_hours,
                });
            }
        }

        if let Some(cap) = limit.max_hours_per_week {
            let week = date.iso_week();
            let recorded = Self::scheduled_minutes_where(shifts, employee_id, exclude_shift_id, |s| {
                s.date.iso_week() == week
            });
            let projected = candidate_hours + minutes_to_hours(recorded);
            debug!(
                "Weekly cap check for {}: recorded {}min, projected {}h against cap {}h",
                employee_id, recorded, projected, cap
            );
            if projected > cap {
                return Err(EngineError::LimitExceeded {
                    scope: LimitScope::Weekly,
                    cap_hours: cap,
                    projected_hours: projected,
                });
            }
        }

        if let Some(cap) = limit.max_hours_per_month {
            let recorded = Self::scheduled_minutes_where(shifts, employee_id, exclude_shift_id, |s| {
                s.date.year() == date.year() && s.date.month() == date.month()
            });
            let projected = candidate_hours + minutes_to_hours(recorded);
            if projected > cap {
                return Err(EngineError::LimitExceeded {
                    scope: LimitScope::Monthly,
                    cap_hours: cap,
                    projected_hours: projected,
                });
            }
        }

        Ok(())
    }

    fn scheduled_minutes_where<F: Fn(&Shift) -> bool>(
        shifts: &HashMap<ShiftId, Shift>,
        employee_id: &str,
        exclude_shift_id: Option<&str>,
        in_window: F,
    ) -> i64 {
        shifts
            .values()
            .filter(|s| s.active && s.employee_id.as_deref() == Some(employee_id))
            .filter(|s| Some(s.id.as_str()) != exclude_shift_id)
            .filter(|s| in_window(s))
            .map(|s| s.expected_worked_minutes())
            .sum()
    }
}
