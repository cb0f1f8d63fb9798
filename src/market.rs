//! Markets and the status aggregator.

use crate::status::{MarketStatus, TaskStatus};
use crate::task::{Task, compare_task_ids};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Supplies,
    Memorandum,
    Communities,
    ConsultingServices,
    Works,
}

impl MarketType {
    pub const ALL: [MarketType; 5] = [
        MarketType::Supplies,
        MarketType::Memorandum,
        MarketType::Communities,
        MarketType::ConsultingServices,
        MarketType::Works,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Supplies => "supplies",
            MarketType::Memorandum => "memorandum",
            MarketType::Communities => "communities",
            MarketType::ConsultingServices => "consulting_services",
            MarketType::Works => "works",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketType::Supplies => "Fournitures / Bien",
            MarketType::Memorandum => "Mémorandum",
            MarketType::Communities => "Communautés",
            MarketType::ConsultingServices => "Services de consultance",
            MarketType::Works => "Travaux",
        }
    }

    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supplies" | "fournitures" => Some(MarketType::Supplies),
            "memorandum" => Some(MarketType::Memorandum),
            "communities" | "communautes" => Some(MarketType::Communities),
            "consulting_services" | "services" => Some(MarketType::ConsultingServices),
            "works" | "travaux" => Some(MarketType::Works),
            _ => None,
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A procurement contract or tender tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub market_ref: String,
    pub title: String,
    pub market_type: MarketType,
    /// Regional coordination office, e.g. `UCP` or `CIR_MANAKARA`.
    pub coordination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_forecast: Option<f64>,
    /// Budget line codes charged by the market, one to six digits each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub budget_lines: Vec<String>,
    /// Last derived status as cached by the owner of the record.
    #[serde(default)]
    pub status: MarketStatus,
}

impl Market {
    pub fn new(
        market_ref: impl Into<String>,
        title: impl Into<String>,
        market_type: MarketType,
        coordination: impl Into<String>,
    ) -> Self {
        Self {
            market_ref: market_ref.into(),
            title: title.into(),
            market_type,
            coordination: coordination.into(),
            budget_forecast: None,
            budget_lines: Vec::new(),
            status: MarketStatus::NotStarted,
        }
    }

    /// Returns a copy carrying the status derived from `tasks`.
    pub fn with_derived_status(&self, tasks: &[Task]) -> Market {
        let mut market = self.clone();
        market.status = derive_market_status(&self.market_ref, tasks);
        market
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketValidationError {
    #[error("market requires a non-empty market_ref")]
    EmptyRef,
    #[error("market {market_ref} has invalid budget line '{line}' (expected 1 to 6 digits)")]
    InvalidBudgetLine { market_ref: String, line: String },
    #[error("duplicate market_ref {0}")]
    DuplicateRef(String),
}

/// A budget line is one to six ASCII digits.
pub fn is_valid_budget_line(line: &str) -> bool {
    (1..=6).contains(&line.len()) && line.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_market(market: &Market) -> Result<(), MarketValidationError> {
    if market.market_ref.trim().is_empty() {
        return Err(MarketValidationError::EmptyRef);
    }
    if let Some(line) = market
        .budget_lines
        .iter()
        .find(|line| !is_valid_budget_line(line))
    {
        return Err(MarketValidationError::InvalidBudgetLine {
            market_ref: market.market_ref.clone(),
            line: line.clone(),
        });
    }
    Ok(())
}

pub fn validate_market_collection(markets: &[Market]) -> Result<(), MarketValidationError> {
    let mut seen_refs = HashSet::with_capacity(markets.len());
    for market in markets {
        if !seen_refs.insert(market.market_ref.as_str()) {
            return Err(MarketValidationError::DuplicateRef(
                market.market_ref.clone(),
            ));
        }
        validate_market(market)?;
    }
    Ok(())
}

pub fn tasks_for_market<'t>(
    market_ref: &str,
    tasks: &'t [Task],
) -> impl Iterator<Item = &'t Task> {
    tasks.iter().filter(move |task| task.belongs_to(market_ref))
}

/// Derives a market's status from the tasks referencing it.
///
/// Rules apply in order, first match wins:
/// 1. no tasks: not started
/// 2. every task completed: completed
/// 3. any task has left the not-started state: in progress
/// 4. otherwise: not started
pub fn derive_market_status(market_ref: &str, tasks: &[Task]) -> MarketStatus {
    let mut total = 0usize;
    let mut completed = 0usize;
    let mut started = 0usize;
    for task in tasks_for_market(market_ref, tasks) {
        total += 1;
        if task.status.is_completed() {
            completed += 1;
        }
        if task.status.has_started() {
            started += 1;
        }
    }

    if total == 0 {
        MarketStatus::NotStarted
    } else if completed == total {
        MarketStatus::Completed
    } else if started > 0 {
        MarketStatus::InProgress
    } else {
        MarketStatus::NotStarted
    }
}

/// Batch form of [`derive_market_status`], evaluated in parallel. Output keeps input order.
pub fn derive_all_market_statuses<S>(market_refs: &[S], tasks: &[Task]) -> Vec<(String, MarketStatus)>
where
    S: AsRef<str> + Sync,
{
    market_refs
        .par_iter()
        .map(|market_ref| {
            let market_ref = market_ref.as_ref();
            (market_ref.to_string(), derive_market_status(market_ref, tasks))
        })
        .collect()
}

/// The market's task with the greatest id. Display only; ids are assumed monotonic.
pub fn last_task_added<'a>(market_ref: &str, tasks: &'a [Task]) -> Option<&'a Task> {
    tasks_for_market(market_ref, tasks).fold(None, |latest: Option<&Task>, task| match latest {
        Some(current) if compare_task_ids(&current.id, &task.id) == Ordering::Greater => {
            Some(current)
        }
        _ => Some(task),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTaskCounts {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub delayed: usize,
}

impl MarketTaskCounts {
    pub fn for_market(market_ref: &str, tasks: &[Task]) -> Self {
        let mut counts = Self::default();
        for task in tasks_for_market(market_ref, tasks) {
            counts.total += 1;
            match task.status {
                TaskStatus::NotStarted => counts.not_started += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Delayed => counts.delayed += 1,
                TaskStatus::Unrecognized => {}
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, market: &str, status: TaskStatus) -> Task {
        Task::new(id, market, format!("Task {id}")).with_status(status)
    }

    #[test]
    fn other_markets_are_ignored() {
        let tasks = vec![
            task("1", "M1", TaskStatus::Completed),
            task("2", "M2", TaskStatus::NotStarted),
        ];
        assert_eq!(derive_market_status("M1", &tasks), MarketStatus::Completed);
        assert_eq!(derive_market_status("M2", &tasks), MarketStatus::NotStarted);
        assert_eq!(derive_market_status("M3", &tasks), MarketStatus::NotStarted);
    }

    #[test]
    fn unrecognized_and_not_started_stay_not_started() {
        let tasks = vec![
            task("1", "M1", TaskStatus::Unrecognized),
            task("2", "M1", TaskStatus::NotStarted),
        ];
        assert_eq!(derive_market_status("M1", &tasks), MarketStatus::NotStarted);
    }

    #[test]
    fn with_derived_status_leaves_original_untouched() {
        let market = Market::new("M1", "Réhabilitation piste", MarketType::Works, "UCP");
        let tasks = vec![task("1", "M1", TaskStatus::InProgress)];
        let derived = market.with_derived_status(&tasks);
        assert_eq!(derived.status, MarketStatus::InProgress);
        assert_eq!(market.status, MarketStatus::NotStarted);
    }

    #[test]
    fn budget_lines_are_one_to_six_digits() {
        assert!(is_valid_budget_line("6011"));
        assert!(is_valid_budget_line("123456"));
        assert!(!is_valid_budget_line(""));
        assert!(!is_valid_budget_line("1234567"));
        assert!(!is_valid_budget_line("60-11"));
        assert!(!is_valid_budget_line("٣"));

        let mut market = Market::new("M1", "Fournitures", MarketType::Supplies, "UCP");
        market.budget_lines = vec!["6011".into(), "abc".into()];
        assert_eq!(
            validate_market(&market),
            Err(MarketValidationError::InvalidBudgetLine {
                market_ref: "M1".into(),
                line: "abc".into()
            })
        );
    }

    #[test]
    fn duplicate_market_refs_are_rejected() {
        let markets = vec![
            Market::new("M1", "A", MarketType::Works, "UCP"),
            Market::new("M1", "B", MarketType::Works, "UCP"),
        ];
        assert_eq!(
            validate_market_collection(&markets),
            Err(MarketValidationError::DuplicateRef("M1".into()))
        );
    }

    #[test]
    fn counts_split_by_status() {
        let tasks = vec![
            task("1", "M1", TaskStatus::Completed),
            task("2", "M1", TaskStatus::Delayed),
            task("3", "M1", TaskStatus::InProgress),
            task("4", "M1", TaskStatus::Unrecognized),
        ];
        let counts = MarketTaskCounts::for_market("M1", &tasks);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.delayed, 1);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.not_started, 0);
    }
}
