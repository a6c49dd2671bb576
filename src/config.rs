// src/config.rs
use serde::Deserialize;

/// Tunable thresholds for the attendance rules. Loaded from the environment
/// with the `SHIFTLY_` prefix (e.g. `SHIFTLY_TOLERANCE_MINUTES=10`); every
/// field has a default matching the product rules.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Band around scheduled start/end within which deviations are normal.
    #[serde(default = "default_tolerance_minutes")]
    pub tolerance_minutes: i64,
    /// Lateness beyond this raises the check-in anomaly to severity 3.
    #[serde(default = "default_severe_late_minutes")]
    pub severe_late_minutes: i64,
    /// Overtime above this creates a pending overtime record at check-out.
    #[serde(default = "default_overtime_threshold_minutes")]
    pub overtime_threshold_minutes: i64,
    /// Worked-vs-expected deviation beyond this raises a check-out anomaly.
    #[serde(default = "default_checkout_anomaly_minutes")]
    pub checkout_anomaly_minutes: i64,
    /// Completed breaks under this are flagged as short.
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: i64,
    /// Shifts scheduled at or above this many hours get a suggested break
    /// time at the midpoint.
    #[serde(default = "default_break_suggestion_min_hours")]
    pub break_suggestion_min_hours: i64,
    /// Continuous worked minutes without a break before the status line
    /// suggests taking one.
    #[serde(default = "default_break_prompt_minutes")]
    pub break_prompt_minutes: i64,
    /// Self-service corrections within this many hours of the shift date are
    /// applied without merchant approval.
    #[serde(default = "default_correction_window_hours")]
    pub correction_window_hours: i64,
    /// Week-to-date worked hours at which the wellbeing monitor raises its
    /// soft alert.
    #[serde(default = "default_wellbeing_weekly_alert_hours")]
    pub wellbeing_weekly_alert_hours: i64,
}

fn default_tolerance_minutes() -> i64 {
    15
}
fn default_severe_late_minutes() -> i64 {
    30
}
fn default_overtime_threshold_minutes() -> i64 {
    15
}
fn default_checkout_anomaly_minutes() -> i64 {
    30
}
fn default_short_break_minutes() -> i64 {
    15
}
fn default_break_suggestion_min_hours() -> i64 {
    6
}
fn default_break_prompt_minutes() -> i64 {
    240
}
fn default_correction_window_hours() -> i64 {
    24
}
fn default_wellbeing_weekly_alert_hours() -> i64 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance_minutes: default_tolerance_minutes(),
            severe_late_minutes: default_severe_late_minutes(),
            overtime_threshold_minutes: default_overtime_threshold_minutes(),
            checkout_anomaly_minutes: default_checkout_anomaly_minutes(),
            short_break_minutes: default_short_break_minutes(),
            break_suggestion_min_hours: default_break_suggestion_min_hours(),
            break_prompt_minutes: default_break_prompt_minutes(),
            correction_window_hours: default_correction_window_hours(),
            wellbeing_weekly_alert_hours: default_wellbeing_weekly_alert_hours(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("SHIFTLY_").from_env()
    }
}
