// src/error.rs
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitScope::Daily => write!(f, "daily"),
            LimitScope::Weekly => write!(f, "weekly"),
            LimitScope::Monthly => write!(f, "monthly"),
        }
    }
}

/// Engine failure taxonomy. Every variant is recoverable at the caller; the
/// controller layer (out of scope) translates these into user-facing
/// responses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Entity missing, or found but not owned by the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A transition was requested from a state that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Overlapping shift interval. Carries both intervals for display.
    #[error(
        "shift conflict on {date}: existing shift {existing_shift_id} \
         ({existing_start}-{existing_end}) overlaps requested \
         {candidate_start}-{candidate_end}"
    )]
    Conflict {
        date: NaiveDate,
        existing_shift_id: String,
        existing_start: NaiveTime,
        existing_end: NaiveTime,
        candidate_start: NaiveTime,
        candidate_end: NaiveTime,
    },

    /// Daily/weekly/monthly working-hour cap breach.
    #[error("{scope} working-hour limit exceeded: cap {cap_hours}h, projected {projected_hours}h")]
    LimitExceeded {
        scope: LimitScope,
        cap_hours: Decimal,
        projected_hours: Decimal,
    },

    /// Malformed input (e.g. end before start without a midnight-crossing
    /// flag).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_state(detail: impl Into<String>) -> Self {
        EngineError::InvalidState(detail.into())
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        EngineError::Validation(detail.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
