/// Booking cost and cancellation penalties
///
/// All amounts are CFA francs (XOF) held as `f64` and rounded to two
/// decimal places at the boundary.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::task::TaskStatus;

/// Share of the total cost charged for a late cancellation
pub const LATE_CANCELLATION_RATE: f64 = 0.10;

/// Hours before the task date inside which cancellation is "late"
pub const FREE_CANCELLATION_WINDOW_HOURS: i64 = 24;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `duration_hours * hourly_rate`, rounded to cents
pub fn total_cost(duration_hours: f64, hourly_rate: f64) -> f64 {
    round2(duration_hours * hourly_rate)
}

/// Who asked for the cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelParty {
    Client,
    Tasker,
}

/// Amount owed by the cancelling client, with a human-readable reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationPenalty {
    pub amount: f64,
    pub reason: String,
}

/// Task facts the penalty depends on
#[derive(Debug, Clone, Copy)]
pub struct CancellationInput {
    pub status: TaskStatus,
    pub total_cost: f64,
    pub hourly_rate: f64,
    pub task_date: DateTime<Utc>,
    /// Timer total including any running segment
    pub hours_worked: f64,
}

impl CancellationPenalty {
    pub fn compute(input: CancellationInput, party: CancelParty, now: DateTime<Utc>) -> Self {
        if party == CancelParty::Tasker {
            return Self::free("Cancelled by tasker");
        }

        match input.status {
            TaskStatus::InProgress => {
                let hours = input.hours_worked.max(1.0);
                Self {
                    amount: round2(hours * input.hourly_rate),
                    reason: format!("Charged for {:.2} hours worked", hours),
                }
            }
            TaskStatus::Assigned
                if input.task_date - now <= Duration::hours(FREE_CANCELLATION_WINDOW_HOURS) =>
            {
                Self {
                    amount: round2(input.total_cost * LATE_CANCELLATION_RATE),
                    reason: "Late cancellation fee (10% of total cost)".to_string(),
                }
            }
            TaskStatus::Posted
                if input.task_date - now <= Duration::hours(FREE_CANCELLATION_WINDOW_HOURS) =>
            {
                Self::free("Free cancellation (no tasker assigned)")
            }
            _ => Self::free("Free cancellation (more than 24 hours before task)"),
        }
    }

    fn free(reason: &str) -> Self {
        Self {
            amount: 0.0,
            reason: reason.to_string(),
        }
    }
}
