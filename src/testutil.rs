// src/testutil.rs
//
// Shared builders for the test suites.
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

use crate::clock::TestClock;
use crate::config::EngineConfig;
use crate::engine::ShiftEngine;
use crate::model::Shift;
use crate::scheduler::NewShift;

pub fn d(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
}

pub fn t(time_str: &str) -> NaiveTime {
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .unwrap_or_else(|_| panic!("Invalid time string format: {}", time_str))
}

/// Engine wired to a settable clock, default thresholds.
pub fn engine_at(datetime_str: &str) -> (ShiftEngine, TestClock) {
    let clock = TestClock::new(datetime_str);
    let engine = ShiftEngine::new(Arc::new(clock.clone()), EngineConfig::default());
    (engine, clock)
}

/// The standard fixture shift: 09:00-17:00 with a 60-minute break allowance,
/// i.e. 7 expected worked hours.
pub fn nine_to_five(engine: &ShiftEngine, business: &str, employee: &str, date: &str) -> Shift {
    engine
        .create_shift(
            NewShift::new(business, d(date), t("09:00"), t("17:00"))
                .employee(employee)
                .break_minutes(60),
        )
        .expect("fixture shift should schedule cleanly")
}
