// src/adjustments.rs
//
// Post-hoc adjustment of recorded attendance facts: anomaly resolution,
// overtime classification, and the time-boxed self-correction flow.
use chrono::DateTime;
use tracing::{info, warn};

use crate::engine::ShiftEngine;
use crate::error::{EngineError, EngineResult};
use crate::model::*;

impl ShiftEngine {
    /// Records the employee's explanation on an anomaly and marks it
    /// resolved. A low-risk reason (traffic, technical issue, approved
    /// remote work) also waives the merchant-review requirement — but only
    /// for severity 1 and 2; a severity-3 anomaly stays flagged so the
    /// merchant sees it once.
    pub fn resolve_anomaly(
        &self,
        anomaly_id: &str,
        reason: AnomalyReason,
        notes: Option<String>,
    ) -> EngineResult<ShiftAnomaly> {
        let mut anomalies = self.anomalies.lock().unwrap();
        let anomaly = anomalies
            .get_mut(anomaly_id)
            .ok_or_else(|| EngineError::not_found("anomaly", anomaly_id))?;

        if anomaly.resolved {
            // Re-submitting the identical resolution is a no-op.
            if anomaly.employee_reason == Some(reason) && anomaly.employee_notes == notes {
                return Ok(anomaly.clone());
            }
            return Err(EngineError::invalid_state(format!(
                "anomaly {} is already resolved",
                anomaly_id
            )));
        }

        anomaly.employee_reason = Some(reason);
        anomaly.employee_notes = notes;
        anomaly.resolved = true;
        anomaly.resolution = Some(ResolutionMethod::EmployeeExplanation);
        if reason.is_low_risk() && anomaly.severity <= 2 {
            anomaly.requires_review = false;
        }
        info!(
            "Anomaly {} resolved with {:?} (review still required: {})",
            anomaly_id, reason, anomaly.requires_review
        );
        Ok(anomaly.clone())
    }

    /// Rewrites an overtime record's classification and notes. Minutes are
    /// not re-validated. Identical re-submissions are no-ops; differing
    /// values last-write-win.
    pub fn classify_overtime(
        &self,
        overtime_id: &str,
        kind: OvertimeKind,
        notes: Option<String>,
    ) -> EngineResult<OvertimeRecord> {
        let mut overtime = self.overtime.lock().unwrap();
        let record = overtime
            .get_mut(overtime_id)
            .ok_or_else(|| EngineError::not_found("overtime record", overtime_id))?;
        if record.kind == kind && record.notes == notes {
            return Ok(record.clone());
        }
        record.kind = kind;
        record.notes = notes;
        info!("Overtime record {} classified as {:?}", overtime_id, kind);
        Ok(record.clone())
    }

    /// Approves an overtime record, stamping the approver.
    pub fn approve_overtime(&self, overtime_id: &str, approver: &str) -> EngineResult<OvertimeRecord> {
        let mut overtime = self.overtime.lock().unwrap();
        let record = overtime
            .get_mut(overtime_id)
            .ok_or_else(|| EngineError::not_found("overtime record", overtime_id))?;
        if record.approved {
            return Err(EngineError::invalid_state(format!(
                "overtime record {} is already approved",
                overtime_id
            )));
        }
        record.approved = true;
        record.approved_by = Some(approver.to_string());
        record.approved_at = Some(self.clock.now());
        info!("Overtime record {} approved by {}", overtime_id, approver);
        Ok(record.clone())
    }

    /// Self-service correction of a recorded attendance fact. Within the
    /// 24-hour window after the shift date the new value is applied
    /// immediately and the shift becomes SelfCorrected; outside the window
    /// the request parks until a merchant approves it. A correction record
    /// with the original value snapshot is written on both paths.
    pub fn correct_shift(
        &self,
        employee_id: &str,
        shift_id: &str,
        field: CorrectionField,
        new_value: &str,
        reason: &str,
    ) -> EngineResult<ShiftCorrection> {
        let now = self.clock.now();

        // Identical re-submissions return the existing record instead of
        // writing a duplicate — but only while that record is still pending,
        // or while the field still holds the requested value. Once the field
        // has moved on (say a later correction restored the old value), the
        // same request is a genuinely new correction.
        let current_value = {
            let mut shifts = self.shifts.lock().unwrap();
            let shift = Self::owned_shift_in(&mut shifts, shift_id, employee_id)?;
            field_value(shift, field)
        };
        {
            let corrections = self.corrections.lock().unwrap();
            if let Some(existing) = corrections.values().find(|c| {
                c.shift_id == shift_id
                    && c.employee_id == employee_id
                    && c.field == field
                    && c.new_value == new_value
            }) {
                if !existing.applied || current_value == new_value {
                    return Ok(existing.clone());
                }
            }
        }

        let (original_value, within_window) = {
            let mut shifts = self.shifts.lock().unwrap();
            let shift = Self::owned_shift_in(&mut shifts, shift_id, employee_id)?;

            let shift_day_start = shift.date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
            let hours_since_shift_date = shift_day_start
                .map(|start| (now - start).num_hours())
                .unwrap_or(i64::MAX);
            let within_window = hours_since_shift_date <= self.config.correction_window_hours;

            let original_value = field_value(shift, field);
            if within_window {
                apply_field_value(shift, field, new_value)?;
                shift.validation_status = ValidationStatus::SelfCorrected;
                shift.version += 1;
            } else {
                // Parse eagerly so an out-of-window request with a malformed
                // value fails now, not at approval time.
                parse_field_value(field, new_value)?;
            }
            (original_value, within_window)
        };

        let correction = ShiftCorrection {
            id: Self::new_id("cor"),
            shift_id: shift_id.to_string(),
            employee_id: employee_id.to_string(),
            field,
            original_value,
            new_value: new_value.to_string(),
            reason: reason.to_string(),
            within_window,
            requires_approval: !within_window,
            applied: within_window,
            approved_by: None,
            approved_at: None,
        };
        if within_window {
            info!(
                "Correction {} applied to shift {} ({:?})",
                correction.id, shift_id, field
            );
        } else {
            warn!(
                "Correction {} on shift {} parked for merchant approval ({:?})",
                correction.id, shift_id, field
            );
        }
        self.corrections
            .lock()
            .unwrap()
            .insert(correction.id.clone(), correction.clone());
        Ok(correction)
    }

    /// Merchant approval of a parked out-of-window correction: applies the
    /// requested value and stamps the approver.
    pub fn approve_correction(
        &self,
        correction_id: &str,
        approver: &str,
    ) -> EngineResult<ShiftCorrection> {
        let now = self.clock.now();
        let mut corrections = self.corrections.lock().unwrap();
        let correction = corrections
            .get_mut(correction_id)
            .ok_or_else(|| EngineError::not_found("correction", correction_id))?;
        if correction.applied {
            return Err(EngineError::invalid_state(format!(
                "correction {} is already applied",
                correction_id
            )));
        }

        {
            let mut shifts = self.shifts.lock().unwrap();
            let shift = shifts
                .get_mut(&correction.shift_id)
                .filter(|s| s.active)
                .ok_or_else(|| EngineError::not_found("shift", correction.shift_id.clone()))?;
            apply_field_value(shift, correction.field, &correction.new_value)?;
            shift.validation_status = ValidationStatus::ManuallyApproved;
            shift.validated_by = Some(approver.to_string());
            shift.validated_at = Some(now);
            shift.version += 1;
        }

        correction.applied = true;
        correction.approved_by = Some(approver.to_string());
        correction.approved_at = Some(now);
        info!("Correction {} approved by {}", correction_id, approver);
        Ok(correction.clone())
    }
}

fn field_value(shift: &Shift, field: CorrectionField) -> String {
    match field {
        CorrectionField::CheckInTime => shift
            .check_in_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        CorrectionField::CheckOutTime => shift
            .check_out_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        CorrectionField::BreakMinutes => shift.break_minutes.to_string(),
        CorrectionField::Notes => shift.notes.clone().unwrap_or_default(),
    }
}

enum ParsedValue {
    Timestamp(chrono::DateTime<chrono::Utc>),
    Minutes(i64),
    Text(String),
}

fn parse_field_value(field: CorrectionField, raw: &str) -> EngineResult<ParsedValue> {
    match field {
        CorrectionField::CheckInTime | CorrectionField::CheckOutTime => {
            let ts = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                EngineError::validation(format!("invalid timestamp '{}': {}", raw, e))
            })?;
            Ok(ParsedValue::Timestamp(ts.with_timezone(&chrono::Utc)))
        }
        CorrectionField::BreakMinutes => {
            let minutes: i64 = raw.parse().map_err(|_| {
                EngineError::validation(format!("invalid break minutes '{}'", raw))
            })?;
            if minutes < 0 {
                return Err(EngineError::validation(
                    "break minutes cannot be negative".to_string(),
                ));
            }
            Ok(ParsedValue::Minutes(minutes))
        }
        CorrectionField::Notes => Ok(ParsedValue::Text(raw.to_string())),
    }
}

fn apply_field_value(shift: &mut Shift, field: CorrectionField, raw: &str) -> EngineResult<()> {
    match (field, parse_field_value(field, raw)?) {
        (CorrectionField::CheckInTime, ParsedValue::Timestamp(ts)) => {
            shift.checked_in = true;
            shift.check_in_time = Some(ts);
        }
        (CorrectionField::CheckOutTime, ParsedValue::Timestamp(ts)) => {
            if !shift.checked_in {
                return Err(EngineError::invalid_state(
                    "cannot correct check-out on a shift that was never checked in".to_string(),
                ));
            }
            shift.checked_out = true;
            shift.check_out_time = Some(ts);
        }
        (CorrectionField::BreakMinutes, ParsedValue::Minutes(minutes)) => {
            shift.break_minutes = minutes;
        }
        (CorrectionField::Notes, ParsedValue::Text(text)) => {
            shift.notes = Some(text);
        }
        _ => unreachable!("parse_field_value returns the variant matching its field"),
    }
    Ok(())
}
