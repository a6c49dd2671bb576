// src/engine.rs
use chrono::NaiveDate;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::*;

/// The shift lifecycle and attendance engine. One instance serves all
/// tenants; every public operation is a short-lived unit of work against the
/// shared stores.
///
/// Each store is a mutex-guarded map. Stateful transitions (check-in,
/// check-out, break open/close, validation-status changes, swap approval)
/// perform their precondition check and their mutation under the same guard,
/// so two racing callers cannot both pass a state check.
#[derive(Clone)]
pub struct ShiftEngine {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    pub(crate) shifts: Arc<Mutex<HashMap<ShiftId, Shift>>>,
    pub(crate) breaks: Arc<Mutex<HashMap<BreakId, ShiftBreak>>>,
    pub(crate) anomalies: Arc<Mutex<HashMap<AnomalyId, ShiftAnomaly>>>,
    pub(crate) overtime: Arc<Mutex<HashMap<OvertimeId, OvertimeRecord>>>,
    pub(crate) corrections: Arc<Mutex<HashMap<CorrectionId, ShiftCorrection>>>,
    pub(crate) limits: Arc<Mutex<HashMap<LimitId, EmployeeWorkingHoursLimit>>>,
    pub(crate) swap_requests: Arc<Mutex<HashMap<SwapRequestId, ShiftSwapRequest>>>,
}

impl ShiftEngine {
    pub fn new(clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            clock,
            config,
            shifts: Arc::new(Mutex::new(HashMap::new())),
            breaks: Arc::new(Mutex::new(HashMap::new())),
            anomalies: Arc::new(Mutex::new(HashMap::new())),
            overtime: Arc::new(Mutex::new(HashMap::new())),
            corrections: Arc::new(Mutex::new(HashMap::new())),
            limits: Arc::new(Mutex::new(HashMap::new())),
            swap_requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn new_id(prefix: &str) -> String {
        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        format!("{}_{}", prefix, token)
    }

    // --- Working-hour limit configuration ---

    /// Registers a working-hour limit for an employee. Which limit is active
    /// for a given date is resolved at evaluation time (see `active_limit`).
    pub fn configure_working_hours_limit(
        &self,
        limit: NewWorkingHoursLimit,
    ) -> EmployeeWorkingHoursLimit {
        let record = EmployeeWorkingHoursLimit {
            id: Self::new_id("lim"),
            employee_id: limit.employee_id,
            business_id: limit.business_id,
            max_hours_per_day: limit.max_hours_per_day,
            max_hours_per_week: limit.max_hours_per_week,
            max_hours_per_month: limit.max_hours_per_month,
            min_hours_per_week: limit.min_hours_per_week,
            min_hours_per_month: limit.min_hours_per_month,
            overtime_allowed: limit.overtime_allowed,
            max_overtime_hours_per_month: limit.max_overtime_hours_per_month,
            valid_from: limit.valid_from,
            valid_to: limit.valid_to,
            active: true,
        };
        info!(
            "Configured working-hours limit {} for employee {} (from {})",
            record.id, record.employee_id, record.valid_from
        );
        self.limits
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        record
    }

    pub fn deactivate_limit(&self, limit_id: &str) -> EngineResult<()> {
        let mut limits = self.limits.lock().unwrap();
        let limit = limits
            .get_mut(limit_id)
            .ok_or_else(|| EngineError::not_found("working-hours limit", limit_id))?;
        limit.active = false;
        Ok(())
    }

    // --- Shared lookup helpers ---

    /// Looks up a shift and enforces caller ownership. A shift that exists
    /// but belongs to someone else reads as not found, so callers cannot
    /// enumerate other employees' schedules.
    pub(crate) fn owned_shift_in<'a>(
        shifts: &'a mut HashMap<ShiftId, Shift>,
        shift_id: &str,
        employee_id: &str,
    ) -> EngineResult<&'a mut Shift> {
        let shift = shifts
            .get_mut(shift_id)
            .filter(|s| s.active)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))?;
        if shift.employee_id.as_deref() != Some(employee_id) {
            return Err(EngineError::not_found("shift", shift_id));
        }
        Ok(shift)
    }

    /// Sum of completed break minutes recorded against a shift.
    pub(crate) fn completed_break_minutes_in(
        breaks: &HashMap<BreakId, ShiftBreak>,
        shift_id: &str,
    ) -> i64 {
        breaks
            .values()
            .filter(|b| b.shift_id == shift_id)
            .filter_map(|b| b.duration_minutes)
            .sum()
    }

    pub fn breaks_for_shift(&self, shift_id: &str) -> Vec<ShiftBreak> {
        let mut out: Vec<ShiftBreak> = self
            .breaks
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.shift_id == shift_id)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.start_time);
        out
    }

    pub fn anomalies_for_shift(&self, shift_id: &str) -> Vec<ShiftAnomaly> {
        self.anomalies
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.shift_id == shift_id)
            .cloned()
            .collect()
    }

    pub fn overtime_for_shift(&self, shift_id: &str) -> Vec<OvertimeRecord> {
        self.overtime
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.shift_id == shift_id)
            .cloned()
            .collect()
    }

    pub fn corrections_for_shift(&self, shift_id: &str) -> Vec<ShiftCorrection> {
        self.corrections
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.shift_id == shift_id)
            .cloned()
            .collect()
    }

    // --- Snapshot persistence ---

    /// Serializes every store to a JSON snapshot file. The CLI uses this so
    /// externally-scheduled sweeps operate on durable state; a real
    /// deployment swaps this edge for its persistence layer.
    pub fn save_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        let snapshot = EngineSnapshot {
            shifts: self.shifts.lock().unwrap().values().cloned().collect(),
            breaks: self.breaks.lock().unwrap().values().cloned().collect(),
            anomalies: self.anomalies.lock().unwrap().values().cloned().collect(),
            overtime: self.overtime.lock().unwrap().values().cloned().collect(),
            corrections: self.corrections.lock().unwrap().values().cloned().collect(),
            limits: self.limits.lock().unwrap().values().cloned().collect(),
            swap_requests: self
                .swap_requests
                .lock()
                .unwrap()
                .values()
                .cloned()
                .collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        info!("Saved engine snapshot to {}", path.display());
        Ok(())
    }

    pub fn load_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: EngineSnapshot = serde_json::from_str(&json)?;
        fn index<T, F: Fn(&T) -> String>(items: Vec<T>, key: F) -> HashMap<String, T> {
            items.into_iter().map(|item| (key(&item), item)).collect()
        }
        *self.shifts.lock().unwrap() = index(snapshot.shifts, |s| s.id.clone());
        *self.breaks.lock().unwrap() = index(snapshot.breaks, |b| b.id.clone());
        *self.anomalies.lock().unwrap() = index(snapshot.anomalies, |a| a.id.clone());
        *self.overtime.lock().unwrap() = index(snapshot.overtime, |o| o.id.clone());
        *self.corrections.lock().unwrap() = index(snapshot.corrections, |c| c.id.clone());
        *self.limits.lock().unwrap() = index(snapshot.limits, |l| l.id.clone());
        *self.swap_requests.lock().unwrap() = index(snapshot.swap_requests, |r| r.id.clone());
        info!("Loaded engine snapshot from {}", path.display());
        Ok(())
    }
}

/// Parameters for registering a working-hour limit.
#[derive(Debug, Clone)]
pub struct NewWorkingHoursLimit {
    pub employee_id: EmployeeId,
    pub business_id: BusinessId,
    pub max_hours_per_day: Option<rust_decimal::Decimal>,
    pub max_hours_per_week: Option<rust_decimal::Decimal>,
    pub max_hours_per_month: Option<rust_decimal::Decimal>,
    pub min_hours_per_week: Option<rust_decimal::Decimal>,
    pub min_hours_per_month: Option<rust_decimal::Decimal>,
    pub overtime_allowed: bool,
    pub max_overtime_hours_per_month: Option<rust_decimal::Decimal>,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    shifts: Vec<Shift>,
    breaks: Vec<ShiftBreak>,
    anomalies: Vec<ShiftAnomaly>,
    overtime: Vec<OvertimeRecord>,
    corrections: Vec<ShiftCorrection>,
    limits: Vec<EmployeeWorkingHoursLimit>,
    swap_requests: Vec<ShiftSwapRequest>,
}
