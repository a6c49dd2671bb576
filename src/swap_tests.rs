// src/swap_tests.rs

#[cfg(test)]
mod tests {
    use crate::engine::ShiftEngine;
    use crate::error::EngineError;
    use crate::model::*;
    use crate::swaps::SwapDecision;
    use crate::testutil::*;

    const BIZ: &str = "biz_cafe";

    /// Ada works Saturday, Bo works Sunday; each would rather have the
    /// other's day.
    fn weekend_pair(engine: &ShiftEngine) -> (Shift, Shift) {
        let saturday = nine_to_five(engine, BIZ, "emp_ada", "2025-06-07");
        let sunday = nine_to_five(engine, BIZ, "emp_bo", "2025-06-08");
        (saturday, sunday)
    }

    #[test]
    fn requester_must_own_the_shift() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, _) = weekend_pair(&engine);
        let err = engine
            .create_swap_request("emp_bo", &saturday.id, None, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn offered_shift_must_belong_to_the_target() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);
        let err = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_cy".to_string()),
                Some(sunday.id.clone()),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn approval_exchanges_assignments_exactly_once() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);

        let request = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_bo".to_string()),
                Some(sunday.id.clone()),
                Some("family thing on Saturday".to_string()),
            )
            .unwrap();
        assert_eq!(request.status, SwapStatus::Pending);

        let settled = engine
            .respond_to_swap_request(&request.id, SwapDecision::Approve, None, "mgr_dana")
            .unwrap();
        assert_eq!(settled.status, SwapStatus::Approved);
        assert_eq!(settled.responded_by.as_deref(), Some("mgr_dana"));

        let saturday = engine.shift_by_id(&saturday.id).unwrap();
        let sunday = engine.shift_by_id(&sunday.id).unwrap();
        assert_eq!(saturday.employee_id.as_deref(), Some("emp_bo"));
        assert_eq!(sunday.employee_id.as_deref(), Some("emp_ada"));

        // A settled request cannot be responded to again, so the exchange
        // cannot run twice.
        let err = engine
            .respond_to_swap_request(&request.id, SwapDecision::Approve, None, "mgr_dana")
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(
            engine
                .shift_by_id(&saturday.id)
                .unwrap()
                .employee_id
                .as_deref(),
            Some("emp_bo")
        );
    }

    #[test]
    fn rejection_records_the_response_and_leaves_shifts_alone() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);
        let request = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_bo".to_string()),
                Some(sunday.id.clone()),
                None,
            )
            .unwrap();

        let settled = engine
            .respond_to_swap_request(
                &request.id,
                SwapDecision::Reject,
                Some("short-staffed that Sunday".to_string()),
                "mgr_dana",
            )
            .unwrap();
        assert_eq!(settled.status, SwapStatus::Rejected);
        assert_eq!(
            settled.response_message.as_deref(),
            Some("short-staffed that Sunday")
        );
        assert_eq!(
            engine
                .shift_by_id(&saturday.id)
                .unwrap()
                .employee_id
                .as_deref(),
            Some("emp_ada")
        );
    }

    #[test]
    fn approval_without_an_offered_shift_changes_no_assignments() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, _) = weekend_pair(&engine);
        let request = engine
            .create_swap_request("emp_ada", &saturday.id, None, None, None)
            .unwrap();

        let settled = engine
            .respond_to_swap_request(&request.id, SwapDecision::Approve, None, "mgr_dana")
            .unwrap();
        assert_eq!(settled.status, SwapStatus::Approved);
        assert_eq!(
            engine
                .shift_by_id(&saturday.id)
                .unwrap()
                .employee_id
                .as_deref(),
            Some("emp_ada")
        );
    }

    #[test]
    fn approval_revalidates_ownership_at_decision_time() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);
        let request = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_bo".to_string()),
                Some(sunday.id.clone()),
                None,
            )
            .unwrap();

        // The offered shift changes hands while the request sits pending.
        engine.assign_shift(&sunday.id, "emp_cy").unwrap();

        let err = engine
            .respond_to_swap_request(&request.id, SwapDecision::Approve, None, "mgr_dana")
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        // Nobody's assignment moved and the request is still pending.
        assert_eq!(
            engine
                .shift_by_id(&saturday.id)
                .unwrap()
                .employee_id
                .as_deref(),
            Some("emp_ada")
        );
        assert_eq!(
            engine
                .shift_by_id(&sunday.id)
                .unwrap()
                .employee_id
                .as_deref(),
            Some("emp_cy")
        );
        assert_eq!(
            engine.swap_request_by_id(&request.id).unwrap().status,
            SwapStatus::Pending
        );
    }

    #[test]
    fn requesters_shift_changing_hands_also_blocks_approval() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);
        let request = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_bo".to_string()),
                Some(sunday.id.clone()),
                None,
            )
            .unwrap();
        engine.assign_shift(&saturday.id, "emp_cy").unwrap();

        let err = engine
            .respond_to_swap_request(&request.id, SwapDecision::Approve, None, "mgr_dana")
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(
            engine
                .shift_by_id(&sunday.id)
                .unwrap()
                .employee_id
                .as_deref(),
            Some("emp_bo")
        );
    }

    #[test]
    fn approval_fails_cleanly_when_a_shift_was_deleted_meanwhile() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);
        let request = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_bo".to_string()),
                Some(sunday.id.clone()),
                None,
            )
            .unwrap();
        engine.delete_shift(&sunday.id).unwrap();

        let err = engine
            .respond_to_swap_request(&request.id, SwapDecision::Approve, None, "mgr_dana")
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        // The request stays pending and can still be rejected.
        assert_eq!(
            engine.swap_request_by_id(&request.id).unwrap().status,
            SwapStatus::Pending
        );
        engine
            .respond_to_swap_request(&request.id, SwapDecision::Reject, None, "mgr_dana")
            .unwrap();
    }

    #[test]
    fn only_the_requester_may_cancel_and_only_while_pending() {
        let (engine, _clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, _) = weekend_pair(&engine);
        let request = engine
            .create_swap_request("emp_ada", &saturday.id, None, None, None)
            .unwrap();

        let err = engine.cancel_swap_request(&request.id, "emp_bo").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let cancelled = engine.cancel_swap_request(&request.id, "emp_ada").unwrap();
        assert_eq!(cancelled.status, SwapStatus::Cancelled);

        let err = engine.cancel_swap_request(&request.id, "emp_ada").unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn listings_cover_both_sides_of_a_negotiation() {
        let (engine, clock) = engine_at("2025-06-02 10:00:00");
        let (saturday, sunday) = weekend_pair(&engine);

        let first = engine
            .create_swap_request(
                "emp_ada",
                &saturday.id,
                Some("emp_bo".to_string()),
                Some(sunday.id.clone()),
                None,
            )
            .unwrap();
        clock.set_time("2025-06-02 11:00:00");
        let second = engine
            .create_swap_request("emp_bo", &sunday.id, None, None, None)
            .unwrap();

        let board = engine.swap_requests_for_business(BIZ);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].id, first.id);
        assert_eq!(board[1].id, second.id);

        // Ada opened one request; Bo opened one and is targeted by the other.
        assert_eq!(engine.swap_requests_for_employee("emp_ada").len(), 1);
        assert_eq!(engine.swap_requests_for_employee("emp_bo").len(), 2);
        assert!(engine.swap_requests_for_employee("emp_cy").is_empty());
    }
}
