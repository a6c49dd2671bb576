// src/validation.rs
//
// Auto-validation and batch approval sweeps. Both are invoked by an external
// scheduler per business and date; both skip ineligible shifts instead of
// failing, and both flip validation status under the store guard so they
// cannot race a concurrent correction.
use chrono::{Days, NaiveDate};
use tracing::info;

use crate::engine::ShiftEngine;
use crate::model::ValidationStatus;

impl ShiftEngine {
    /// Marks still-Pending, fully punched shifts on the target date (default:
    /// yesterday) AutoApproved when both the check-in and the check-out
    /// landed within tolerance of their scheduled counterparts. Deviating
    /// shifts stay Pending for manual review; this sweep never flips a shift
    /// to RequiresReview. Returns the number validated.
    pub fn auto_validate_shifts(&self, business_id: &str, date: Option<NaiveDate>) -> usize {
        let target = match date {
            Some(d) => d,
            None => match self.clock.today().checked_sub_days(Days::new(1)) {
                Some(d) => d,
                None => return 0,
            },
        };
        let tolerance = self.config.tolerance_minutes;

        let mut shifts = self.shifts.lock().unwrap();
        let mut validated = 0;
        for shift in shifts.values_mut() {
            if !(shift.active
                && shift.business_id == business_id
                && shift.date == target
                && shift.checked_in
                && shift.checked_out
                && shift.validation_status == ValidationStatus::Pending)
            {
                continue;
            }
            let (Some(check_in), Some(check_out)) = (shift.check_in_time, shift.check_out_time)
            else {
                continue;
            };
            let in_deviation = (check_in - shift.scheduled_start()).num_minutes().abs();
            let out_deviation = (check_out - shift.scheduled_end()).num_minutes().abs();
            if in_deviation <= tolerance && out_deviation <= tolerance {
                shift.validation_status = ValidationStatus::AutoApproved;
                shift.version += 1;
                validated += 1;
            }
        }
        info!(
            "Auto-validation for business {} on {}: {} shifts approved",
            business_id, target, validated
        );
        validated
    }

    /// Unconditionally marks the given shifts ManuallyApproved, stamping the
    /// approver. Unknown ids are ignored; the returned count is the number of
    /// shifts actually matched.
    pub fn batch_approve_shifts(
        &self,
        business_id: &str,
        shift_ids: &[String],
        approver: &str,
    ) -> usize {
        let now = self.clock.now();
        let mut shifts = self.shifts.lock().unwrap();
        let mut approved = 0;
        for shift_id in shift_ids {
            let Some(shift) = shifts.get_mut(shift_id) else {
                continue;
            };
            if !shift.active || shift.business_id != business_id {
                continue;
            }
            shift.validation_status = ValidationStatus::ManuallyApproved;
            shift.validated_by = Some(approver.to_string());
            shift.validated_at = Some(now);
            shift.version += 1;
            approved += 1;
        }
        info!(
            "Batch approval for business {} by {}: {} of {} shifts matched",
            business_id,
            approver,
            approved,
            shift_ids.len()
        );
        approved
    }
}
