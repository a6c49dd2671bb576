// src/attendance.rs
//
// Check-in / break / check-out state machine for a single shift, plus the
// self-service status view. Every transition checks its precondition and
// mutates under the same store guard, so two racing calls cannot both pass
// the "already checked in" (or "already checked out") gate.
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::ShiftEngine;
use crate::error::{EngineError, EngineResult};
use crate::limits::minutes_to_hours;
use crate::model::*;

#[derive(Debug, Clone, Serialize)]
pub struct CheckInConfirmation {
    pub shift_id: ShiftId,
    pub checked_in_at: DateTime<Utc>,
    pub planned_hours: Decimal,
    /// Midpoint break suggestion, present for shifts of 6+ scheduled hours.
    pub suggested_break_time: Option<NaiveTime>,
    pub anomaly: Option<ShiftAnomaly>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutSummary {
    pub shift_id: ShiftId,
    pub checked_out_at: DateTime<Utc>,
    pub worked_minutes: i64,
    pub worked_hours: Decimal,
    /// Signed deviation of worked vs expected minutes. Positive means extra
    /// time on the clock.
    pub overtime_minutes: i64,
    pub overtime_record_id: Option<OvertimeId>,
    pub classification_prompt: Option<String>,
    pub anomaly: Option<ShiftAnomaly>,
    pub validation_status: ValidationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentStatus {
    pub shift_id: Option<ShiftId>,
    pub checked_in: bool,
    pub on_break: bool,
    pub worked_minutes_so_far: i64,
    pub week_hours: Decimal,
    pub status_line: String,
    pub suggested_action: Option<String>,
}

impl ShiftEngine {
    /// Punches the employee in. Within ±tolerance of the scheduled start no
    /// anomaly is raised; early arrivals beyond it get an informational
    /// severity-1 note, late arrivals a severity-2 (or, past the severe
    /// threshold, severity-3) anomaly inviting an explanation.
    pub fn check_in(
        &self,
        employee_id: &str,
        shift_id: &str,
        location: Option<String>,
    ) -> EngineResult<CheckInConfirmation> {
        let now = self.clock.now();

        let shift = {
            let mut shifts = self.shifts.lock().unwrap();
            let shift = Self::owned_shift_in(&mut shifts, shift_id, employee_id)?;
            if shift.checked_in {
                return Err(EngineError::invalid_state(format!(
                    "shift {} is already checked in",
                    shift_id
                )));
            }
            shift.checked_in = true;
            shift.check_in_time = Some(now);
            shift.check_in_location = location;
            shift.version += 1;
            shift.clone()
        };

        let minutes_difference = (now - shift.scheduled_start()).num_minutes();
        let anomaly = self.raise_check_in_anomaly(&shift, minutes_difference);

        let planned_hours = minutes_to_hours(shift.scheduled_minutes());
        let suggested_break_time =
            if shift.scheduled_minutes() >= self.config.break_suggestion_min_hours * 60 {
                Some(
                    (shift.scheduled_start() + Duration::minutes(shift.scheduled_minutes() / 2))
                        .time(),
                )
            } else {
                None
            };

        info!(
            "Employee {} checked in to shift {} at {} ({:+} min vs schedule)",
            employee_id, shift_id, now, minutes_difference
        );
        Ok(CheckInConfirmation {
            shift_id: shift.id.clone(),
            checked_in_at: now,
            planned_hours,
            suggested_break_time,
            message: format!(
                "Checked in at {}. Planned hours today: {}.",
                now.format("%H:%M"),
                planned_hours
            ),
            anomaly,
        })
    }

    /// Opens a break. Requires a checked-in, not-yet-checked-out shift and
    /// no other open break on it. Holds the shifts guard (then breaks, same
    /// order as check-out) across the check and the insert, so a racing
    /// check-out cannot slip between them.
    pub fn start_break(
        &self,
        employee_id: &str,
        shift_id: &str,
        category: BreakCategory,
    ) -> EngineResult<ShiftBreak> {
        let now = self.clock.now();
        let mut shifts = self.shifts.lock().unwrap();
        let shift = Self::owned_shift_in(&mut shifts, shift_id, employee_id)?;
        if !shift.checked_in {
            return Err(EngineError::invalid_state(format!(
                "cannot start a break: shift {} is not checked in",
                shift_id
            )));
        }
        if shift.checked_out {
            return Err(EngineError::invalid_state(format!(
                "cannot start a break: shift {} is already checked out",
                shift_id
            )));
        }

        let mut breaks = self.breaks.lock().unwrap();
        if breaks
            .values()
            .any(|b| b.shift_id == shift_id && b.end_time.is_none())
        {
            return Err(EngineError::invalid_state(format!(
                "shift {} already has an open break",
                shift_id
            )));
        }
        let brk = ShiftBreak {
            id: Self::new_id("brk"),
            shift_id: shift_id.to_string(),
            start_time: now,
            end_time: None,
            duration_minutes: None,
            category,
            short_break: false,
        };
        info!("Break {} started on shift {}", brk.id, shift_id);
        breaks.insert(brk.id.clone(), brk.clone());
        Ok(brk)
    }

    /// Closes the shift's open break, computing whole-minute duration and
    /// flagging short breaks.
    pub fn end_break(&self, employee_id: &str, shift_id: &str) -> EngineResult<ShiftBreak> {
        let now = self.clock.now();
        {
            let mut shifts = self.shifts.lock().unwrap();
            Self::owned_shift_in(&mut shifts, shift_id, employee_id)?;
        }

        let mut breaks = self.breaks.lock().unwrap();
        let brk = breaks
            .values_mut()
            .find(|b| b.shift_id == shift_id && b.end_time.is_none())
            .ok_or_else(|| {
                EngineError::invalid_state(format!("shift {} has no open break", shift_id))
            })?;
        let duration = (now - brk.start_time).num_minutes();
        brk.end_time = Some(now);
        brk.duration_minutes = Some(duration);
        brk.short_break = duration < self.config.short_break_minutes;
        info!(
            "Break {} ended on shift {} after {} min{}",
            brk.id,
            shift_id,
            duration,
            if brk.short_break { " (short)" } else { "" }
        );
        Ok(brk.clone())
    }

    /// Punches the employee out, computes worked vs expected minutes, emits
    /// an overtime record and/or a check-out anomaly where thresholds are
    /// crossed, and settles the validation status: auto-approved inside the
    /// tolerance band, flagged for review outside it.
    pub fn check_out(
        &self,
        employee_id: &str,
        shift_id: &str,
        location: Option<String>,
    ) -> EngineResult<CheckOutSummary> {
        let now = self.clock.now();

        let (shift, worked_minutes, overtime_minutes) = {
            // Shifts guard first, breaks guard second (the order start_break
            // uses). The shifts guard is held from the open-break check
            // through the transition commit, so a racing start_break cannot
            // slot a break in between.
            let mut shifts = self.shifts.lock().unwrap();
            let shift = Self::owned_shift_in(&mut shifts, shift_id, employee_id)?;
            if !shift.checked_in {
                return Err(EngineError::invalid_state(format!(
                    "cannot check out: shift {} was never checked in",
                    shift_id
                )));
            }
            if shift.checked_out {
                return Err(EngineError::invalid_state(format!(
                    "shift {} is already checked out",
                    shift_id
                )));
            }
            let completed_breaks = {
                let breaks = self.breaks.lock().unwrap();
                if breaks
                    .values()
                    .any(|b| b.shift_id == shift_id && b.end_time.is_none())
                {
                    return Err(EngineError::invalid_state(format!(
                        "shift {} still has an open break",
                        shift_id
                    )));
                }
                Self::completed_break_minutes_in(&breaks, shift_id)
            };
            let check_in_time = shift
                .check_in_time
                .expect("checked-in shift is missing its check-in timestamp");
            let gross = (now - check_in_time).num_minutes();
            // Reported worked time subtracts only punched breaks; for the
            // overtime comparison an employee who never punched a break is
            // assumed to have taken the configured allowance.
            let worked = gross - completed_breaks;
            let assumed_breaks = if completed_breaks > 0 {
                completed_breaks
            } else {
                shift.break_minutes
            };
            let overtime = (gross - assumed_breaks) - shift.expected_worked_minutes();

            shift.checked_out = true;
            shift.check_out_time = Some(now);
            shift.check_out_location = location;
            shift.validation_status = if overtime.abs() <= self.config.overtime_threshold_minutes {
                ValidationStatus::AutoApproved
            } else {
                ValidationStatus::RequiresReview
            };
            shift.version += 1;
            (shift.clone(), worked, overtime)
        };

        let overtime_record_id = if overtime_minutes > self.config.overtime_threshold_minutes {
            let record = OvertimeRecord {
                id: Self::new_id("ovt"),
                shift_id: shift.id.clone(),
                employee_id: employee_id.to_string(),
                business_id: shift.business_id.clone(),
                minutes: overtime_minutes,
                kind: OvertimeKind::Pending,
                auto_detected: true,
                approved: false,
                approved_by: None,
                approved_at: None,
                notes: None,
            };
            warn!(
                "Auto-detected {} overtime minutes on shift {} (record {})",
                overtime_minutes, shift.id, record.id
            );
            self.overtime
                .lock()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Some(record.id)
        } else {
            None
        };

        let anomaly = self.raise_check_out_anomaly(&shift, overtime_minutes);

        info!(
            "Employee {} checked out of shift {}: worked {} min, overtime {:+} min, status {:?}",
            employee_id, shift_id, worked_minutes, overtime_minutes, shift.validation_status
        );
        Ok(CheckOutSummary {
            shift_id: shift.id.clone(),
            checked_out_at: now,
            worked_minutes,
            worked_hours: minutes_to_hours(worked_minutes),
            overtime_minutes,
            classification_prompt: overtime_record_id.as_ref().map(|_| {
                format!(
                    "You logged {} extra minutes. How should they be classified \
                     (paid, banked hours, recovery, voluntary)?",
                    overtime_minutes
                )
            }),
            overtime_record_id,
            anomaly,
            validation_status: shift.validation_status,
        })
    }

    /// The employee's shift on the clock's current date, if any.
    pub fn today_shift(&self, employee_id: &str) -> Option<Shift> {
        let today = self.clock.today();
        let shifts = self.shifts.lock().unwrap();
        let mut todays: Vec<&Shift> = shifts
            .values()
            .filter(|s| s.active && s.date == today)
            .filter(|s| s.employee_id.as_deref() == Some(employee_id))
            .collect();
        todays.sort_by_key(|s| s.start_time);
        todays.first().map(|s| (*s).clone())
    }

    /// Live view for the employee app: where they stand in today's shift,
    /// net minutes so far (open break included), week-to-date hours, and a
    /// suggested next action.
    pub fn current_status(&self, employee_id: &str) -> CurrentStatus {
        let now = self.clock.now();
        let week_hours = minutes_to_hours(self.week_worked_minutes(employee_id, self.clock.today()));

        let Some(shift) = self.today_shift(employee_id) else {
            return CurrentStatus {
                shift_id: None,
                checked_in: false,
                on_break: false,
                worked_minutes_so_far: 0,
                week_hours,
                status_line: "No shift scheduled today.".to_string(),
                suggested_action: None,
            };
        };

        let breaks = self.breaks.lock().unwrap();
        let completed_breaks = Self::completed_break_minutes_in(&breaks, &shift.id);
        let open_break = breaks
            .values()
            .find(|b| b.shift_id == shift.id && b.end_time.is_none())
            .cloned();
        drop(breaks);
        let break_count = self.breaks_for_shift(&shift.id).len();

        let (checked_in, worked_minutes_so_far) = match (shift.check_in_time, shift.check_out_time)
        {
            (Some(cin), Some(cout)) => (false, (cout - cin).num_minutes() - completed_breaks),
            (Some(cin), None) => {
                let open_elapsed = open_break
                    .as_ref()
                    .map(|b| (now - b.start_time).num_minutes())
                    .unwrap_or(0);
                (true, (now - cin).num_minutes() - completed_breaks - open_elapsed)
            }
            _ => (false, 0),
        };
        let on_break = open_break.is_some();

        let status_line = if shift.checked_out {
            format!(
                "Shift complete — {} worked today.",
                format_minutes(worked_minutes_so_far)
            )
        } else if let Some(brk) = &open_break {
            format!("On break since {}.", brk.start_time.format("%H:%M"))
        } else if checked_in {
            format!(
                "Checked in — {} worked so far.",
                format_minutes(worked_minutes_so_far)
            )
        } else {
            format!(
                "Not checked in yet — shift starts at {}.",
                shift.start_time.format("%H:%M")
            )
        };

        let suggested_action = if checked_in
            && !on_break
            && break_count == 0
            && worked_minutes_so_far >= self.config.break_prompt_minutes
        {
            Some(format!(
                "You've worked {} without a break — consider taking one.",
                format_minutes(worked_minutes_so_far)
            ))
        } else {
            None
        };

        CurrentStatus {
            shift_id: Some(shift.id),
            checked_in,
            on_break,
            worked_minutes_so_far,
            week_hours,
            status_line,
            suggested_action,
        }
    }

    /// Sweep for a business day: raises a MissingCheckIn anomaly for every
    /// assigned, confirmed shift that was never punched. Only past days are
    /// swept; a shift cannot be missing its check-in before the day is over.
    /// Returns the number flagged. Already-flagged shifts are skipped, so
    /// the sweep is safe to re-run.
    pub fn flag_missing_check_ins(&self, business_id: &str, date: NaiveDate) -> usize {
        if date >= self.clock.today() {
            debug!(
                "Missing check-in sweep skipped for {}: the day is not over",
                date
            );
            return 0;
        }
        let candidates: Vec<Shift> = {
            let shifts = self.shifts.lock().unwrap();
            shifts
                .values()
                .filter(|s| s.active && s.business_id == business_id && s.date == date)
                .filter(|s| s.employee_id.is_some() && s.confirmed && !s.checked_in)
                .cloned()
                .collect()
        };

        let mut flagged = 0;
        let mut anomalies = self.anomalies.lock().unwrap();
        for shift in candidates {
            let already = anomalies
                .values()
                .any(|a| a.shift_id == shift.id && a.kind == AnomalyKind::MissingCheckIn);
            if already {
                continue;
            }
            let anomaly = ShiftAnomaly {
                id: Self::new_id("anm"),
                shift_id: shift.id.clone(),
                kind: AnomalyKind::MissingCheckIn,
                severity: 2,
                message: format!(
                    "We didn't see a check-in for your shift on {}. If you worked, you can \
                     request a correction; otherwise let your manager know what happened.",
                    shift.date
                ),
                employee_reason: None,
                employee_notes: None,
                resolved: false,
                resolution: None,
                requires_review: true,
            };
            warn!("Missing check-in flagged on shift {}", shift.id);
            anomalies.insert(anomaly.id.clone(), anomaly);
            flagged += 1;
        }
        flagged
    }

    // --- Anomaly emission ---

    fn raise_check_in_anomaly(
        &self,
        shift: &Shift,
        minutes_difference: i64,
    ) -> Option<ShiftAnomaly> {
        let tolerance = self.config.tolerance_minutes;
        let anomaly = if minutes_difference > tolerance {
            let late_by = minutes_difference;
            let severity = if late_by > self.config.severe_late_minutes {
                3
            } else {
                2
            };
            let message = if severity == 3 {
                format!(
                    "You checked in {} minutes after your scheduled start. We hope everything \
                     is okay — please add a short note so your manager has the context.",
                    late_by
                )
            } else {
                format!(
                    "You checked in {} minutes after your scheduled start. No worries — \
                     let us know what happened.",
                    late_by
                )
            };
            ShiftAnomaly {
                id: Self::new_id("anm"),
                shift_id: shift.id.clone(),
                kind: AnomalyKind::LateCheckIn,
                severity,
                message,
                employee_reason: None,
                employee_notes: None,
                resolved: false,
                resolution: None,
                requires_review: true,
            }
        } else if minutes_difference < -tolerance {
            let early_by = -minutes_difference;
            ShiftAnomaly {
                id: Self::new_id("anm"),
                shift_id: shift.id.clone(),
                kind: AnomalyKind::EarlyCheckIn,
                severity: 1,
                message: format!(
                    "You're {} minutes early — great start! Nothing to do here.",
                    early_by
                ),
                employee_reason: None,
                employee_notes: None,
                resolved: false,
                resolution: None,
                requires_review: false,
            }
        } else {
            return None;
        };

        warn!(
            "Check-in anomaly on shift {}: {:?} severity {}",
            shift.id, anomaly.kind, anomaly.severity
        );
        self.anomalies
            .lock()
            .unwrap()
            .insert(anomaly.id.clone(), anomaly.clone());
        Some(anomaly)
    }

    fn raise_check_out_anomaly(&self, shift: &Shift, overtime_minutes: i64) -> Option<ShiftAnomaly> {
        if overtime_minutes.abs() <= self.config.checkout_anomaly_minutes {
            return None;
        }
        let anomaly = if overtime_minutes > 0 {
            ShiftAnomaly {
                id: Self::new_id("anm"),
                shift_id: shift.id.clone(),
                kind: AnomalyKind::LateCheckOut,
                severity: 2,
                message: format!(
                    "You worked {} minutes past your expected time. Thank you for the effort — \
                     please make sure you get some rest.",
                    overtime_minutes
                ),
                employee_reason: None,
                employee_notes: None,
                resolved: false,
                resolution: None,
                requires_review: true,
            }
        } else {
            ShiftAnomaly {
                id: Self::new_id("anm"),
                shift_id: shift.id.clone(),
                kind: AnomalyKind::EarlyCheckOut,
                severity: 2,
                message: format!(
                    "You checked out {} minutes before your expected time. Just checking in — \
                     add a note if something came up.",
                    -overtime_minutes
                ),
                employee_reason: None,
                employee_notes: None,
                resolved: false,
                resolution: None,
                requires_review: true,
            }
        };
        warn!(
            "Check-out anomaly on shift {}: {:?} ({:+} min)",
            shift.id, anomaly.kind, overtime_minutes
        );
        self.anomalies
            .lock()
            .unwrap()
            .insert(anomaly.id.clone(), anomaly.clone());
        Some(anomaly)
    }
}

fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
