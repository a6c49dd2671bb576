// src/swaps.rs
//
// Shift-swap negotiation: Pending -> Approved | Rejected | Cancelled, all
// terminal. An approval carrying both a target employee and an offered shift
// exchanges the two shifts' assignments under a single store guard, so the
// swap happens exactly once.
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::ShiftEngine;
use crate::error::{EngineError, EngineResult};
use crate::model::*;

/// Merchant/target decision on a pending swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwapDecision {
    Approve,
    Reject,
}

impl ShiftEngine {
    /// Opens a swap negotiation. The requester must own the referenced
    /// shift; when an offered shift and target employee are both named, the
    /// offered shift must belong to the target.
    pub fn create_swap_request(
        &self,
        employee_id: &str,
        shift_id: &str,
        target_employee_id: Option<String>,
        offered_shift_id: Option<String>,
        message: Option<String>,
    ) -> EngineResult<ShiftSwapRequest> {
        let now = self.clock.now();
        let shifts = self.shifts.lock().unwrap();

        let shift = shifts
            .get(shift_id)
            .filter(|s| s.active)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))?;
        if shift.employee_id.as_deref() != Some(employee_id) {
            return Err(EngineError::not_found("shift", shift_id));
        }

        if let Some(offered_id) = &offered_shift_id {
            let offered = shifts
                .get(offered_id)
                .filter(|s| s.active)
                .ok_or_else(|| EngineError::not_found("shift", offered_id.clone()))?;
            if let Some(target) = &target_employee_id {
                if offered.employee_id.as_deref() != Some(target.as_str()) {
                    return Err(EngineError::validation(format!(
                        "offered shift {} is not assigned to target employee {}",
                        offered_id, target
                    )));
                }
            }
        }

        let request = ShiftSwapRequest {
            id: Self::new_id("swp"),
            business_id: shift.business_id.clone(),
            shift_id: shift_id.to_string(),
            requesting_employee_id: employee_id.to_string(),
            target_employee_id,
            offered_shift_id,
            message,
            status: SwapStatus::Pending,
            response_message: None,
            requires_merchant_approval: true,
            responded_by: None,
            responded_at: None,
            created_at: now,
        };
        info!(
            "Swap request {} created by {} for shift {}",
            request.id, employee_id, shift_id
        );
        drop(shifts);
        self.swap_requests
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    /// Settles a pending request. Approval with both a target employee and
    /// an offered shift present swaps the two shifts' `employee` fields
    /// atomically; any other transition only records status and response.
    /// Responding to an already-settled request fails with InvalidState.
    pub fn respond_to_swap_request(
        &self,
        request_id: &str,
        decision: SwapDecision,
        response_message: Option<String>,
        responder: &str,
    ) -> EngineResult<ShiftSwapRequest> {
        let now = self.clock.now();
        let mut requests = self.swap_requests.lock().unwrap();
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| EngineError::not_found("swap request", request_id))?;
        if request.status.is_terminal() {
            return Err(EngineError::invalid_state(format!(
                "swap request {} is already {:?}",
                request_id, request.status
            )));
        }

        if decision == SwapDecision::Approve {
            if let (Some(target), Some(offered_id)) = (
                request.target_employee_id.clone(),
                request.offered_shift_id.clone(),
            ) {
                let mut shifts = self.shifts.lock().unwrap();
                // Validate both sides before touching either, so a failed
                // approval leaves the request pending and the shifts intact.
                // Ownership is re-checked here: the schedule may have moved
                // on since the request was created, and an approval must not
                // hand a third employee's shift to the requester.
                let requester = request.requesting_employee_id.clone();
                let original = shifts
                    .get(&request.shift_id)
                    .filter(|s| s.active)
                    .ok_or_else(|| EngineError::not_found("shift", request.shift_id.clone()))?;
                if original.employee_id.as_deref() != Some(requester.as_str()) {
                    return Err(EngineError::invalid_state(format!(
                        "shift {} is no longer assigned to requester {}",
                        request.shift_id, requester
                    )));
                }
                let offered = shifts
                    .get(&offered_id)
                    .filter(|s| s.active)
                    .ok_or_else(|| EngineError::not_found("shift", offered_id.clone()))?;
                if offered.employee_id.as_deref() != Some(target.as_str()) {
                    return Err(EngineError::invalid_state(format!(
                        "offered shift {} is no longer assigned to target employee {}",
                        offered_id, target
                    )));
                }
                {
                    let original = shifts.get_mut(&request.shift_id).expect("validated above");
                    original.employee_id = Some(target.clone());
                    original.version += 1;
                }
                {
                    let offered = shifts.get_mut(&offered_id).expect("validated above");
                    offered.employee_id = Some(requester);
                    offered.version += 1;
                }
                info!(
                    "Swap request {} approved: shifts {} and {} exchanged assignments",
                    request_id, request.shift_id, offered_id
                );
            } else {
                warn!(
                    "Swap request {} approved without an offered shift; no assignments changed",
                    request_id
                );
            }
        }

        request.status = match decision {
            SwapDecision::Approve => SwapStatus::Approved,
            SwapDecision::Reject => SwapStatus::Rejected,
        };
        request.response_message = response_message;
        request.responded_by = Some(responder.to_string());
        request.responded_at = Some(now);
        Ok(request.clone())
    }

    /// Withdraws a pending request. Only the original requester may cancel.
    pub fn cancel_swap_request(
        &self,
        request_id: &str,
        employee_id: &str,
    ) -> EngineResult<ShiftSwapRequest> {
        let now = self.clock.now();
        let mut requests = self.swap_requests.lock().unwrap();
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| EngineError::not_found("swap request", request_id))?;
        if request.requesting_employee_id != employee_id {
            return Err(EngineError::not_found("swap request", request_id));
        }
        if request.status.is_terminal() {
            return Err(EngineError::invalid_state(format!(
                "swap request {} is already {:?}",
                request_id, request.status
            )));
        }
        request.status = SwapStatus::Cancelled;
        request.responded_by = Some(employee_id.to_string());
        request.responded_at = Some(now);
        info!("Swap request {} cancelled by requester", request_id);
        Ok(request.clone())
    }

    pub fn swap_request_by_id(&self, request_id: &str) -> EngineResult<ShiftSwapRequest> {
        self.swap_requests
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("swap request", request_id))
    }

    pub fn swap_requests_for_business(&self, business_id: &str) -> Vec<ShiftSwapRequest> {
        let mut out: Vec<ShiftSwapRequest> = self
            .swap_requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }

    /// Requests the employee either opened or is targeted by.
    pub fn swap_requests_for_employee(&self, employee_id: &str) -> Vec<ShiftSwapRequest> {
        let mut out: Vec<ShiftSwapRequest> = self
            .swap_requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.requesting_employee_id == employee_id
                    || r.target_employee_id.as_deref() == Some(employee_id)
            })
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }
}
