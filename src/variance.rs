//! Planned vs. actual date variance for a single task.

use crate::status::TaskStatus;
use crate::task::Task;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raised when a task lacks the planned dates variance is measured against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTaskError {
    #[error("task {task_id} has no planned start date")]
    MissingPlannedStart { task_id: String },
    #[error("task {task_id} has no planned end date")]
    MissingPlannedEnd { task_id: String },
}

impl InvalidTaskError {
    pub fn task_id(&self) -> &str {
        match self {
            InvalidTaskError::MissingPlannedStart { task_id }
            | InvalidTaskError::MissingPlannedEnd { task_id } => task_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    OnTrack,
    AtRisk,
    Critical,
}

impl Severity {
    const AT_RISK_MAX_DAYS: i64 = 5;

    pub fn classify(variance_days: i64) -> Self {
        if variance_days <= 0 {
            Severity::OnTrack
        } else if variance_days <= Self::AT_RISK_MAX_DAYS {
            Severity::AtRisk
        } else {
            Severity::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::OnTrack => "on_track",
            Severity::AtRisk => "at_risk",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceResult {
    /// Actual (or, if not started, current) start minus planned start. Positive means late.
    pub start_variance_days: i64,
    /// Actual end minus planned end; `None` while the task is unfinished.
    pub end_variance_days: Option<i64>,
    /// Planned end minus today. Negative means overdue.
    pub remaining_days: i64,
}

impl VarianceResult {
    pub fn severity(&self) -> Severity {
        Severity::classify(self.start_variance_days)
    }

    pub fn end_severity(&self) -> Option<Severity> {
        self.end_variance_days.map(Severity::classify)
    }

    pub fn delay_detected(&self) -> bool {
        self.start_variance_days > 0
    }

    pub fn is_overdue(&self) -> bool {
        self.remaining_days < 0
    }

    /// Health gauge in 0..=100 that loses ten points per day of late start.
    pub fn progress_indicator(&self) -> u8 {
        let raw = 100i64.saturating_sub(self.start_variance_days.saturating_mul(10));
        raw.clamp(0, 100) as u8
    }
}

/// Whole calendar days from `earlier` to `later`.
pub fn day_difference(later: NaiveDate, earlier: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

pub fn compute_variance(task: &Task, now: NaiveDate) -> Result<VarianceResult, InvalidTaskError> {
    let planned_start = task
        .planned_start
        .ok_or_else(|| InvalidTaskError::MissingPlannedStart {
            task_id: task.id.clone(),
        })?;
    let planned_end = task
        .planned_end
        .ok_or_else(|| InvalidTaskError::MissingPlannedEnd {
            task_id: task.id.clone(),
        })?;

    // Until work begins the clock keeps running against the plan.
    let effective_start = task.actual_start.unwrap_or(now);

    Ok(VarianceResult {
        start_variance_days: day_difference(effective_start, planned_start),
        end_variance_days: task
            .actual_end
            .map(|actual_end| day_difference(actual_end, planned_end)),
        remaining_days: day_difference(planned_end, now),
    })
}

/// Status as it should read on `today`: in-progress work past its planned end reads as delayed.
pub fn effective_status(task: &Task, today: NaiveDate) -> TaskStatus {
    match (task.status, task.planned_end) {
        (TaskStatus::InProgress, Some(planned_end)) if planned_end < today => TaskStatus::Delayed,
        (status, _) => status,
    }
}
