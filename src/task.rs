use crate::status::TaskStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Accepts the English and French names, case-insensitively.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "basse" => Some(Priority::Low),
            "medium" | "moyenne" => Some(Priority::Medium),
            "high" | "haute" => Some(Priority::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work belonging to exactly one market.
///
/// Planned dates are optional at the type level because records come from
/// external sources; the variance calculator rejects tasks missing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub market_ref: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<NaiveDate>,
    /// Percent complete, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        market_ref: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            market_ref: market_ref.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            assigned_to: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            progress: None,
        }
    }

    pub fn with_plan(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn belongs_to(&self, market_ref: &str) -> bool {
        self.market_ref == market_ref
    }
}

/// Natural ordering of task ids.
///
/// Ids ending in digits compare by their non-numeric prefix and then by the
/// value of the trailing number, so `M1-T9 < M1-T10` and `9 < 10`. Anything
/// else compares lexicographically.
pub fn compare_task_ids(a: &str, b: &str) -> Ordering {
    match (split_numeric_suffix(a), split_numeric_suffix(b)) {
        (Some((prefix_a, n_a)), Some((prefix_b, n_b))) => prefix_a
            .cmp(prefix_b)
            .then(n_a.cmp(&n_b))
            .then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

/// Splits `"M1-T12"` into `("M1-T", 12)`. `None` without a trailing number.
pub(crate) fn split_numeric_suffix(id: &str) -> Option<(&str, u128)> {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let n = id[digits_start..].parse::<u128>().ok()?;
    Some((&id[..digits_start], n))
}
