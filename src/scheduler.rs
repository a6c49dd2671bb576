// src/scheduler.rs
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::engine::ShiftEngine;
use crate::error::{EngineError, EngineResult};
use crate::limits::{minutes_to_hours, net_worked_minutes};
use crate::model::*;

/// Parameters for creating a single shift.
#[derive(Debug, Clone)]
pub struct NewShift {
    pub business_id: BusinessId,
    pub employee_id: Option<EmployeeId>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub crosses_midnight: bool,
    pub break_minutes: i64,
    pub category: ShiftCategory,
    pub notes: Option<String>,
}

impl NewShift {
    pub fn new(
        business_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            business_id: business_id.to_string(),
            employee_id: None,
            date,
            start_time,
            end_time,
            crosses_midnight: false,
            break_minutes: 0,
            category: ShiftCategory::default(),
            notes: None,
        }
    }

    pub fn employee(mut self, employee_id: &str) -> Self {
        self.employee_id = Some(employee_id.to_string());
        self
    }

    pub fn break_minutes(mut self, minutes: i64) -> Self {
        self.break_minutes = minutes;
        self
    }

    pub fn category(mut self, category: ShiftCategory) -> Self {
        self.category = category;
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn crosses_midnight(mut self) -> Self {
        self.crosses_midnight = true;
        self
    }
}

/// Field-wise update for an existing shift. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ShiftUpdate {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub crosses_midnight: Option<bool>,
    pub break_minutes: Option<i64>,
    pub category: Option<ShiftCategory>,
    pub notes: Option<String>,
    pub confirmed: Option<bool>,
}

/// Recurring pattern for bulk shift creation over a date range.
#[derive(Debug, Clone)]
pub struct ShiftTemplate {
    pub business_id: BusinessId,
    pub employee_id: Option<EmployeeId>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub crosses_midnight: bool,
    pub break_minutes: i64,
    pub category: ShiftCategory,
    pub notes: Option<String>,
    pub weekdays: Vec<Weekday>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeShiftStats {
    pub employee_id: EmployeeId,
    pub shift_count: usize,
    pub scheduled_hours: Decimal,
    pub worked_hours: Decimal,
    pub overtime_minutes: i64,
    pub anomaly_count: usize,
}

impl ShiftEngine {
    // --- Writes ---

    pub fn create_shift(&self, req: NewShift) -> EngineResult<Shift> {
        validate_interval(
            req.start_time,
            req.end_time,
            req.crosses_midnight,
            req.break_minutes,
        )?;

        let mut shifts = self.shifts.lock().unwrap();
        if let Some(employee_id) = &req.employee_id {
            self.ensure_schedulable_in(
                &shifts,
                employee_id,
                req.date,
                req.start_time,
                req.end_time,
                req.break_minutes,
                None,
            )?;
        }

        let shift = Shift {
            id: Self::new_id("shf"),
            business_id: req.business_id,
            employee_id: req.employee_id,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            crosses_midnight: req.crosses_midnight,
            break_minutes: req.break_minutes,
            category: req.category,
            notes: req.notes,
            confirmed: false,
            checked_in: false,
            check_in_time: None,
            check_in_location: None,
            checked_out: false,
            check_out_time: None,
            check_out_location: None,
            validation_status: ValidationStatus::Pending,
            validated_by: None,
            validated_at: None,
            active: true,
            version: 0,
        };
        info!(
            "Created shift {} for business {} on {} ({}-{})",
            shift.id, shift.business_id, shift.date, shift.start_time, shift.end_time
        );
        shifts.insert(shift.id.clone(), shift.clone());
        Ok(shift)
    }

    pub fn update_shift(&self, shift_id: &str, update: ShiftUpdate) -> EngineResult<Shift> {
        let mut shifts = self.shifts.lock().unwrap();
        let current = shifts
            .get(shift_id)
            .filter(|s| s.active)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))?;

        let mut next = current.clone();
        if let Some(date) = update.date {
            next.date = date;
        }
        if let Some(start) = update.start_time {
            next.start_time = start;
        }
        if let Some(end) = update.end_time {
            next.end_time = end;
        }
        if let Some(crosses) = update.crosses_midnight {
            next.crosses_midnight = crosses;
        }
        if let Some(break_minutes) = update.break_minutes {
            next.break_minutes = break_minutes;
        }
        if let Some(category) = update.category {
            next.category = category;
        }
        if let Some(notes) = update.notes {
            next.notes = Some(notes);
        }
        if let Some(confirmed) = update.confirmed {
            next.confirmed = confirmed;
        }

        validate_interval(
            next.start_time,
            next.end_time,
            next.crosses_midnight,
            next.break_minutes,
        )?;
        if let Some(employee_id) = next.employee_id.clone() {
            self.ensure_schedulable_in(
                &shifts,
                &employee_id,
                next.date,
                next.start_time,
                next.end_time,
                next.break_minutes,
                Some(shift_id),
            )?;
        }

        next.version += 1;
        info!("Updated shift {} (v{})", next.id, next.version);
        shifts.insert(shift_id.to_string(), next.clone());
        Ok(next)
    }

    pub fn assign_shift(&self, shift_id: &str, employee_id: &str) -> EngineResult<Shift> {
        let mut shifts = self.shifts.lock().unwrap();
        let current = shifts
            .get(shift_id)
            .filter(|s| s.active)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))?
            .clone();

        self.ensure_schedulable_in(
            &shifts,
            employee_id,
            current.date,
            current.start_time,
            current.end_time,
            current.break_minutes,
            Some(shift_id),
        )?;

        let shift = shifts.get_mut(shift_id).expect("shift vanished under lock");
        shift.employee_id = Some(employee_id.to_string());
        shift.version += 1;
        info!("Assigned shift {} to employee {}", shift_id, employee_id);
        Ok(shift.clone())
    }

    /// Soft-deactivates a shift. History (breaks, anomalies, overtime,
    /// corrections) stays in place.
    pub fn delete_shift(&self, shift_id: &str) -> EngineResult<()> {
        let mut shifts = self.shifts.lock().unwrap();
        let shift = shifts
            .get_mut(shift_id)
            .filter(|s| s.active)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))?;
        shift.active = false;
        shift.version += 1;
        info!("Deactivated shift {}", shift_id);
        Ok(())
    }

    /// Creates one shift per matching weekday over `[from, to]`. Days that
    /// would conflict or breach a working-hour cap are skipped, not failed:
    /// bulk creation is best-effort.
    pub fn create_shifts_from_template(
        &self,
        template: &ShiftTemplate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<Shift>> {
        if from > to {
            return Err(EngineError::validation(format!(
                "template date range is empty: {} > {}",
                from, to
            )));
        }
        if template.weekdays.is_empty() {
            return Err(EngineError::validation(
                "template weekday filter is empty".to_string(),
            ));
        }
        validate_interval(
            template.start_time,
            template.end_time,
            template.crosses_midnight,
            template.break_minutes,
        )?;

        let mut created = Vec::new();
        let mut date = from;
        loop {
            if template.weekdays.contains(&date.weekday()) {
                let req = NewShift {
                    business_id: template.business_id.clone(),
                    employee_id: template.employee_id.clone(),
                    date,
                    start_time: template.start_time,
                    end_time: template.end_time,
                    crosses_midnight: template.crosses_midnight,
                    break_minutes: template.break_minutes,
                    category: template.category,
                    notes: template.notes.clone(),
                };
                match self.create_shift(req) {
                    Ok(shift) => created.push(shift),
                    Err(EngineError::Conflict { .. }) | Err(EngineError::LimitExceeded { .. }) => {
                        debug!("Template creation skipping {} (conflict or cap)", date);
                    }
                    Err(other) => return Err(other),
                }
            }
            match date.succ_opt() {
                Some(next) if next <= to => date = next,
                _ => break,
            }
        }
        info!(
            "Template created {} shifts for business {} between {} and {}",
            created.len(),
            template.business_id,
            from,
            to
        );
        Ok(created)
    }

    // --- Reads ---

    pub fn shift_by_id(&self, shift_id: &str) -> EngineResult<Shift> {
        self.shifts
            .lock()
            .unwrap()
            .get(shift_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("shift", shift_id))
    }

    pub fn merchant_shifts(&self, business_id: &str, from: NaiveDate, to: NaiveDate) -> Vec<Shift> {
        let shifts = self.shifts.lock().unwrap();
        let mut out: Vec<Shift> = shifts
            .values()
            .filter(|s| s.active && s.business_id == business_id)
            .filter(|s| s.date >= from && s.date <= to)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.date, s.start_time, s.id.clone()));
        out
    }

    pub fn employee_shifts(&self, employee_id: &str, from: NaiveDate, to: NaiveDate) -> Vec<Shift> {
        let shifts = self.shifts.lock().unwrap();
        let mut out: Vec<Shift> = shifts
            .values()
            .filter(|s| s.active && s.employee_id.as_deref() == Some(employee_id))
            .filter(|s| s.date >= from && s.date <= to)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.date, s.start_time, s.id.clone()));
        out
    }

    pub fn employee_shift_stats(
        &self,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EmployeeShiftStats {
        let shifts = self.employee_shifts(employee_id, from, to);
        let breaks = self.breaks.lock().unwrap();
        let overtime = self.overtime.lock().unwrap();
        let anomalies = self.anomalies.lock().unwrap();

        let mut scheduled_minutes = 0i64;
        let mut worked_minutes = 0i64;
        let mut anomaly_count = 0usize;
        for shift in &shifts {
            scheduled_minutes += shift.expected_worked_minutes();
            if let Some(actual) = actual_net_minutes(shift, &breaks) {
                worked_minutes += actual;
            }
            anomaly_count += anomalies.values().filter(|a| a.shift_id == shift.id).count();
        }
        let overtime_minutes = overtime
            .values()
            .filter(|o| o.employee_id == employee_id)
            .filter(|o| shifts.iter().any(|s| s.id == o.shift_id))
            .map(|o| o.minutes)
            .sum();

        EmployeeShiftStats {
            employee_id: employee_id.to_string(),
            shift_count: shifts.len(),
            scheduled_hours: minutes_to_hours(scheduled_minutes),
            worked_hours: minutes_to_hours(worked_minutes),
            overtime_minutes,
            anomaly_count,
        }
    }

    // --- Internal ---

    fn ensure_schedulable_in(
        &self,
        shifts: &HashMap<ShiftId, Shift>,
        employee_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        break_minutes: i64,
        exclude_shift_id: Option<&str>,
    ) -> EngineResult<()> {
        if let Some(existing) =
            Self::find_conflict_in(shifts, employee_id, date, start, end, exclude_shift_id)
        {
            warn!(
                "Shift conflict for employee {} on {}: {} ({}-{})",
                employee_id, date, existing.id, existing.start_time, existing.end_time
            );
            return Err(EngineError::Conflict {
                date,
                existing_shift_id: existing.id,
                existing_start: existing.start_time,
                existing_end: existing.end_time,
                candidate_start: start,
                candidate_end: end,
            });
        }

        let candidate_hours = minutes_to_hours(net_worked_minutes(start, end, break_minutes));
        self.check_limit_in(shifts, employee_id, date, candidate_hours, exclude_shift_id)
            .map_err(|e| {
                warn!("Working-hours cap rejection for employee {}: {}", employee_id, e);
                e
            })
    }
}

/// Actual net worked minutes for a completed shift: punch-to-punch minus
/// completed breaks. `None` until the shift is checked out.
pub(crate) fn actual_net_minutes(
    shift: &Shift,
    breaks: &HashMap<BreakId, ShiftBreak>,
) -> Option<i64> {
    let check_in = shift.check_in_time?;
    let check_out = shift.check_out_time?;
    let gross = (check_out - check_in).num_minutes();
    Some(gross - ShiftEngine::completed_break_minutes_in(breaks, &shift.id))
}

fn validate_interval(
    start: NaiveTime,
    end: NaiveTime,
    crosses_midnight: bool,
    break_minutes: i64,
) -> EngineResult<()> {
    if end <= start && !crosses_midnight {
        return Err(EngineError::validation(format!(
            "shift end {} must be after start {} (set crosses_midnight for overnight shifts)",
            end, start
        )));
    }
    if break_minutes < 0 {
        return Err(EngineError::validation(
            "break minutes cannot be negative".to_string(),
        ));
    }
    let scheduled = net_worked_minutes(start, end, 0);
    if break_minutes >= scheduled {
        return Err(EngineError::validation(format!(
            "break allowance {}min swallows the whole {}min shift",
            break_minutes, scheduled
        )));
    }
    Ok(())
}
