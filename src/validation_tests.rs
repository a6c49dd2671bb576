// src/validation_tests.rs

#[cfg(test)]
mod tests {
    use crate::model::ValidationStatus;
    use crate::testutil::*;

    const BIZ: &str = "biz_cafe";

    /// Simulates punch data that arrived without being settled at check-out
    /// time (an imported snapshot, for instance) by resetting the shift to
    /// Pending after the fact.
    fn reset_to_pending(engine: &crate::engine::ShiftEngine, shift_id: &str) {
        let mut shifts = engine.shifts.lock().unwrap();
        shifts.get_mut(shift_id).unwrap().validation_status = ValidationStatus::Pending;
    }

    #[test]
    fn sweep_approves_within_tolerance_and_leaves_deviations_pending() {
        let (engine, clock) = engine_at("2025-06-02 09:10:00");
        let on_time = nine_to_five(&engine, BIZ, "emp_ada", "2025-06-02");
        engine.check_in("emp_ada", &on_time.id, None).unwrap();

        clock.set_time("2025-06-02 09:40:00");
        let late = nine_to_five(&engine, BIZ, "emp_bo", "2025-06-02");
        engine.check_in("emp_bo", &late.id, None).unwrap();

        clock.set_time("2025-06-02 17:00:00");
        engine.check_out("emp_bo", &late.id, None).unwrap();
        clock.set_time("2025-06-02 17:05:00");
        engine.check_out("emp_ada", &on_time.id, None).unwrap();

        reset_to_pending(&engine, &on_time.id);
        reset_to_pending(&engine, &late.id);

        assert_eq!(engine.auto_validate_shifts(BIZ, Some(d("2025-06-02"))), 1);
        assert_eq!(
            engine.shift_by_id(&on_time.id).unwrap().validation_status,
            ValidationStatus::AutoApproved
        );
        // Deviating shifts stay put for a human; the sweep never escalates.
        assert_eq!(
            engine.shift_by_id(&late.id).unwrap().validation_status,
            ValidationStatus::Pending
        );
    }

    #[test]
    fn sweep_defaults_to_yesterday() {
        let (engine, clock) = engine_at("2025-06-02 09:00:00");
        let shift = nine_to_five(&engine, BIZ, "emp_ada", "2025-06-02");
        engine.check_in("emp_ada", &shift.id, None).unwrap();
        clock.set_time("2025-06-02 17:00:00");
        engine.check_out("emp_ada", &shift.id, None).unwrap();
        reset_to_pending(&engine, &shift.id);

        clock.set_time("2025-06-03 03:00:00");
        assert_eq!(engine.auto_validate_shifts(BIZ, None), 1);
    }

    #[test]
    fn sweep_skips_unpunched_shifts_and_other_businesses() {
        let (engine, clock) = engine_at("2025-06-02 09:00:00");
        let _unpunched = nine_to_five(&engine, BIZ, "emp_ada", "2025-06-02");
        let elsewhere = nine_to_five(&engine, "biz_bar", "emp_bo", "2025-06-02");
        engine.check_in("emp_bo", &elsewhere.id, None).unwrap();
        clock.set_time("2025-06-02 17:00:00");
        engine.check_out("emp_bo", &elsewhere.id, None).unwrap();
        reset_to_pending(&engine, &elsewhere.id);

        assert_eq!(engine.auto_validate_shifts(BIZ, Some(d("2025-06-02"))), 0);
        assert_eq!(
            engine.shift_by_id(&elsewhere.id).unwrap().validation_status,
            ValidationStatus::Pending
        );
    }

    #[test]
    fn batch_approval_stamps_the_approver_and_skips_strangers() {
        let (engine, _clock) = engine_at("2025-06-02 08:00:00");
        let a = nine_to_five(&engine, BIZ, "emp_ada", "2025-06-02");
        let b = nine_to_five(&engine, BIZ, "emp_bo", "2025-06-02");
        let foreign = nine_to_five(&engine, "biz_bar", "emp_cy", "2025-06-02");

        let ids = vec![
            a.id.clone(),
            b.id.clone(),
            foreign.id.clone(),
            "shf_missing".to_string(),
        ];
        assert_eq!(engine.batch_approve_shifts(BIZ, &ids, "mgr_dana"), 2);

        let approved = engine.shift_by_id(&a.id).unwrap();
        assert_eq!(
            approved.validation_status,
            ValidationStatus::ManuallyApproved
        );
        assert_eq!(approved.validated_by.as_deref(), Some("mgr_dana"));
        assert!(approved.validated_at.is_some());

        // Foreign-business ids are ignored, not approved.
        assert_eq!(
            engine.shift_by_id(&foreign.id).unwrap().validation_status,
            ValidationStatus::Pending
        );
    }

    #[test]
    fn batch_approval_overrides_requires_review() {
        let (engine, clock) = engine_at("2025-06-02 09:00:00");
        let shift = nine_to_five(&engine, BIZ, "emp_ada", "2025-06-02");
        engine.check_in("emp_ada", &shift.id, None).unwrap();
        clock.set_time("2025-06-02 18:30:00");
        let summary = engine.check_out("emp_ada", &shift.id, None).unwrap();
        assert_eq!(summary.validation_status, ValidationStatus::RequiresReview);

        assert_eq!(
            engine.batch_approve_shifts(BIZ, &[shift.id.clone()], "mgr_dana"),
            1
        );
        assert_eq!(
            engine.shift_by_id(&shift.id).unwrap().validation_status,
            ValidationStatus::ManuallyApproved
        );
    }
}
