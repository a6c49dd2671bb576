// src/wellbeing.rs
//
// Wellbeing monitor: aggregates net worked hours and recorded overtime over
// the current ISO week and calendar month, and raises a soft alert when the
// week-to-date total reaches the configured level. Advisory only; nothing
// here blocks an operation.
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::engine::ShiftEngine;
use crate::limits::minutes_to_hours;
use crate::model::Shift;
use crate::scheduler::actual_net_minutes;

#[derive(Debug, Clone, Serialize)]
pub struct WellbeingStats {
    pub employee_id: String,
    pub week_hours: Decimal,
    pub month_hours: Decimal,
    pub week_overtime_hours: Decimal,
    pub month_overtime_hours: Decimal,
    pub alert: Option<String>,
}

impl ShiftEngine {
    pub fn wellbeing_stats(&self, employee_id: &str) -> WellbeingStats {
        let today = self.clock.today();
        let week = today.iso_week();
        let in_week = |d: NaiveDate| d.iso_week() == week;
        let in_month = |d: NaiveDate| d.year() == today.year() && d.month() == today.month();

        let (week_minutes, month_minutes) = {
            let shifts = self.shifts.lock().unwrap();
            let breaks = self.breaks.lock().unwrap();
            let mut week_minutes = 0i64;
            let mut month_minutes = 0i64;
            for shift in shifts
                .values()
                .filter(|s| s.active && s.employee_id.as_deref() == Some(employee_id))
            {
                let Some(net) = actual_net_minutes(shift, &breaks) else {
                    continue;
                };
                if in_week(shift.date) {
                    week_minutes += net;
                }
                if in_month(shift.date) {
                    month_minutes += net;
                }
            }
            (week_minutes, month_minutes)
        };

        let (week_overtime, month_overtime) = {
            let shifts = self.shifts.lock().unwrap();
            let overtime = self.overtime.lock().unwrap();
            let mut week_overtime = 0i64;
            let mut month_overtime = 0i64;
            for record in overtime.values().filter(|o| o.employee_id == employee_id) {
                let Some(date) = shifts.get(&record.shift_id).map(|s: &Shift| s.date) else {
                    continue;
                };
                if in_week(date) {
                    week_overtime += record.minutes;
                }
                if in_month(date) {
                    month_overtime += record.minutes;
                }
            }
            (week_overtime, month_overtime)
        };

        let week_hours = minutes_to_hours(week_minutes);
        let alert_level = Decimal::from(self.config.wellbeing_weekly_alert_hours);
        let alert = if week_hours >= alert_level {
            warn!(
                "Wellbeing alert for employee {}: {} hours this week",
                employee_id, week_hours
            );
            Some(format!(
                "You've logged {} hours this week — that's a lot. Please make time to rest \
                 and recover; your wellbeing matters more than any shift.",
                week_hours.round_dp(1)
            ))
        } else {
            None
        };

        WellbeingStats {
            employee_id: employee_id.to_string(),
            week_hours,
            month_hours: minutes_to_hours(month_minutes),
            week_overtime_hours: minutes_to_hours(week_overtime),
            month_overtime_hours: minutes_to_hours(month_overtime),
            alert,
        }
    }

    /// Week-to-date worked minutes, counting completed shifts' punched time
    /// and the live net time of a shift still on the clock.
    pub(crate) fn week_worked_minutes(&self, employee_id: &str, today: NaiveDate) -> i64 {
        let now = self.clock.now();
        let week = today.iso_week();
        let shifts = self.shifts.lock().unwrap();
        let breaks = self.breaks.lock().unwrap();
        let mut minutes = 0i64;
        for shift in shifts
            .values()
            .filter(|s| s.active && s.employee_id.as_deref() == Some(employee_id))
            .filter(|s| s.date.iso_week() == week)
        {
            if let Some(net) = actual_net_minutes(shift, &breaks) {
                minutes += net;
            } else if let Some(check_in) = shift.check_in_time {
                // Still on the clock: count elapsed time net of any breaks,
                // including the open one.
                let mut net = (now - check_in).num_minutes()
                    - Self::completed_break_minutes_in(&breaks, &shift.id);
                if let Some(open) = breaks
                    .values()
                    .find(|b| b.shift_id == shift.id && b.end_time.is_none())
                {
                    net -= (now - open.start_time).num_minutes();
                }
                minutes += net.max(0);
            }
        }
        minutes
    }
}
