// src/model.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ShiftId = String;
pub type BreakId = String;
pub type AnomalyId = String;
pub type OvertimeId = String;
pub type CorrectionId = String;
pub type LimitId = String;
pub type SwapRequestId = String;
pub type EmployeeId = String;
pub type BusinessId = String;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Validation axis of a shift's attendance facts, parallel to the
/// check-in/check-out state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Pending,
    AutoApproved,
    RequiresReview,
    ManuallyApproved,
    SelfCorrected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftCategory {
    Regular,
    Opening,
    Closing,
    Inventory,
    Training,
}

impl ShiftCategory {
    /// Display color used by calendar UIs.
    pub fn color_hint(&self) -> &'static str {
        match self {
            ShiftCategory::Regular => "#4caf50",
            ShiftCategory::Opening => "#2196f3",
            ShiftCategory::Closing => "#9c27b0",
            ShiftCategory::Inventory => "#ff9800",
            ShiftCategory::Training => "#607d8b",
        }
    }
}

impl Default for ShiftCategory {
    fn default() -> Self {
        ShiftCategory::Regular
    }
}

/// A scheduled work interval for a business, optionally assigned to an
/// employee. Soft-deactivated on cancellation, never removed while
/// historical facts exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub business_id: BusinessId,
    pub employee_id: Option<EmployeeId>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Explicitly allows `end_time <= start_time`; duration is computed
    /// modulo 24h.
    pub crosses_midnight: bool,
    /// Configured (unpaid) break allowance in whole minutes.
    pub break_minutes: i64,
    pub category: ShiftCategory,
    pub notes: Option<String>,
    pub confirmed: bool,
    pub checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    /// Opaque location string supplied at check-in; not validated here.
    pub check_in_location: Option<String>,
    pub checked_out: bool,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_location: Option<String>,
    pub validation_status: ValidationStatus,
    pub validated_by: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub active: bool,
    /// Bumped on every mutation; transition guards check state and mutate
    /// under one store lock, so concurrent writers lose deterministically.
    pub version: u64,
}

impl Shift {
    /// Scheduled duration in whole minutes, normalized modulo 24h for
    /// midnight-crossing shifts.
    pub fn scheduled_minutes(&self) -> i64 {
        let raw = (self.end_time - self.start_time).num_minutes();
        if raw > 0 {
            raw
        } else {
            raw + MINUTES_PER_DAY
        }
    }

    /// Expected net worked minutes: scheduled duration minus the configured
    /// break allowance.
    pub fn expected_worked_minutes(&self) -> i64 {
        self.scheduled_minutes() - self.break_minutes
    }

    pub fn scheduled_start(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_start() + Duration::minutes(self.scheduled_minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakCategory {
    Meal,
    Rest,
    Personal,
}

impl Default for BreakCategory {
    fn default() -> Self {
        BreakCategory::Rest
    }
}

/// A recorded pause within a checked-in shift. At most one break per shift
/// may be open (no end timestamp) at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftBreak {
    pub id: BreakId,
    pub shift_id: ShiftId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub category: BreakCategory,
    /// Set when the completed duration came in under the short-break
    /// threshold (default 15 minutes).
    pub short_break: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    EarlyCheckIn,
    LateCheckIn,
    EarlyCheckOut,
    LateCheckOut,
    MissingCheckIn,
}

/// Employee-supplied explanation for an anomaly. A closed set so the
/// low-risk waiver is checkable at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyReason {
    Traffic,
    TechnicalIssue,
    ApprovedRemoteWork,
    PersonalEmergency,
    Forgot,
    Other,
}

impl AnomalyReason {
    /// Reasons that waive the merchant-review requirement on resolution.
    pub fn is_low_risk(&self) -> bool {
        matches!(
            self,
            AnomalyReason::Traffic
                | AnomalyReason::TechnicalIssue
                | AnomalyReason::ApprovedRemoteWork
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionMethod {
    EmployeeExplanation,
    MerchantDecision,
}

/// A detected deviation between scheduled and actual check-in/out times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAnomaly {
    pub id: AnomalyId,
    pub shift_id: ShiftId,
    pub kind: AnomalyKind,
    /// 1 = informational, 2 = notable, 3 = serious (>30 minutes).
    pub severity: u8,
    pub message: String,
    pub employee_reason: Option<AnomalyReason>,
    pub employee_notes: Option<String>,
    pub resolved: bool,
    pub resolution: Option<ResolutionMethod>,
    pub requires_review: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OvertimeKind {
    Pending,
    Paid,
    BankedHours,
    Recovery,
    Voluntary,
}

/// A detected excess of worked time over scheduled time, pending
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeRecord {
    pub id: OvertimeId,
    pub shift_id: ShiftId,
    pub employee_id: EmployeeId,
    pub business_id: BusinessId,
    pub minutes: i64,
    pub kind: OvertimeKind,
    pub auto_detected: bool,
    pub approved: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionField {
    CheckInTime,
    CheckOutTime,
    BreakMinutes,
    Notes,
}

/// An employee-requested change to recorded attendance facts. Inside the
/// 24-hour window the change is applied immediately; outside it the record
/// parks until a merchant approves. The original value is always snapshotted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCorrection {
    pub id: CorrectionId,
    pub shift_id: ShiftId,
    pub employee_id: EmployeeId,
    pub field: CorrectionField,
    pub original_value: String,
    pub new_value: String,
    pub reason: String,
    pub within_window: bool,
    pub requires_approval: bool,
    pub applied: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Cumulative working-hour caps for an employee. Multiple limits may exist;
/// the one whose `[valid_from, valid_to)` interval contains the reference
/// date, most recent `valid_from` first, is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeWorkingHoursLimit {
    pub id: LimitId,
    pub employee_id: EmployeeId,
    pub business_id: BusinessId,
    pub max_hours_per_day: Option<Decimal>,
    pub max_hours_per_week: Option<Decimal>,
    pub max_hours_per_month: Option<Decimal>,
    pub min_hours_per_week: Option<Decimal>,
    pub min_hours_per_month: Option<Decimal>,
    pub overtime_allowed: bool,
    pub max_overtime_hours_per_month: Option<Decimal>,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        *self != SwapStatus::Pending
    }
}

/// A request/response negotiation that, on approval with both a target
/// employee and an offered shift, atomically exchanges the two shifts'
/// employee assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSwapRequest {
    pub id: SwapRequestId,
    pub business_id: BusinessId,
    pub shift_id: ShiftId,
    pub requesting_employee_id: EmployeeId,
    pub target_employee_id: Option<EmployeeId>,
    pub offered_shift_id: Option<ShiftId>,
    pub message: Option<String>,
    pub status: SwapStatus,
    pub response_message: Option<String>,
    pub requires_merchant_approval: bool,
    pub responded_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
