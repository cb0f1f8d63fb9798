use crate::market::{
    self, Market, MarketTaskCounts, MarketValidationError, derive_all_market_statuses,
    last_task_added,
};
use crate::status::{MarketStatus, TaskStatus};
use crate::task::{Task, split_numeric_suffix};
use crate::task_validation::{self, TaskValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("market {0} not found")]
    MarketNotFound(String),
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("task {task_id} references unknown market {market_ref}")]
    UnknownMarket { task_id: String, market_ref: String },
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    #[error(transparent)]
    InvalidMarket(#[from] MarketValidationError),
}

pub type RegisterResult<T> = Result<T, RegisterError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub market_ref: String,
    pub from: MarketStatus,
    pub to: MarketStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub market_count: usize,
    pub not_started_count: usize,
    pub in_progress_count: usize,
    pub completed_count: usize,
    pub changes: Vec<StatusChange>,
}

impl RefreshSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("markets={}", self.market_count));
        parts.push(format!("not_started={}", self.not_started_count));
        parts.push(format!("in_progress={}", self.in_progress_count));
        parts.push(format!("completed={}", self.completed_count));
        if !self.changes.is_empty() {
            let changed = self
                .changes
                .iter()
                .map(|change| format!("{}:{}->{}", change.market_ref, change.from, change.to))
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("changed={}", changed));
        }
        parts.join(", ")
    }
}

/// Owned store of markets and their tasks.
///
/// Holds the records the engine reads; it is the one place that caches the derived
/// market status, and only when [`Register::refresh_market_statuses`] is called.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Register {
    markets: Vec<Market>,
    tasks: Vec<Task>,
}

impl Register {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(markets: Vec<Market>, tasks: Vec<Task>) -> RegisterResult<Self> {
        market::validate_market_collection(&markets)?;
        task_validation::validate_task_collection(&tasks)?;
        let mut register = Self {
            markets,
            tasks: Vec::with_capacity(tasks.len()),
        };
        for task in tasks {
            register.upsert_task(task)?;
        }
        Ok(register)
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find_market(&self, market_ref: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.market_ref == market_ref)
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn upsert_market(&mut self, market: Market) -> RegisterResult<()> {
        market::validate_market(&market)?;
        debug!(market_ref = %market.market_ref, "upserting market");
        match self
            .markets
            .iter_mut()
            .find(|m| m.market_ref == market.market_ref)
        {
            Some(existing) => *existing = market,
            None => self.markets.push(market),
        }
        Ok(())
    }

    /// Replaces the market's budget lines, validating each code.
    pub fn set_budget_lines(
        &mut self,
        market_ref: &str,
        lines: Vec<String>,
    ) -> RegisterResult<&Market> {
        let mut market = self
            .find_market(market_ref)
            .cloned()
            .ok_or_else(|| RegisterError::MarketNotFound(market_ref.to_string()))?;
        market.budget_lines = lines;
        self.upsert_market(market)?;
        self.find_market(market_ref)
            .ok_or_else(|| RegisterError::MarketNotFound(market_ref.to_string()))
    }

    /// Inserts the task, or replaces the one with the same id in place.
    pub fn upsert_task(&mut self, task: Task) -> RegisterResult<()> {
        task_validation::validate_task(&task)?;
        if self.find_market(&task.market_ref).is_none() {
            return Err(RegisterError::UnknownMarket {
                task_id: task.id,
                market_ref: task.market_ref,
            });
        }
        debug!(task_id = %task.id, market_ref = %task.market_ref, status = %task.status, "upserting task");
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        Ok(())
    }

    pub fn update_task<F>(&mut self, task_id: &str, mutator: F) -> RegisterResult<&Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut task = self
            .find_task(task_id)
            .cloned()
            .ok_or_else(|| RegisterError::TaskNotFound(task_id.to_string()))?;
        mutator(&mut task);
        if task.id != task_id {
            return Err(RegisterError::Validation(TaskValidationError::new(format!(
                "task id cannot change from {task_id} to {}",
                task.id
            ))));
        }
        self.upsert_task(task)?;
        self.find_task(task_id)
            .ok_or_else(|| RegisterError::TaskNotFound(task_id.to_string()))
    }

    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        let removed = self.tasks.len() != before;
        if removed {
            debug!(task_id, "deleted task");
        }
        removed
    }

    pub fn start_task(&mut self, task_id: &str, date: NaiveDate) -> RegisterResult<&Task> {
        self.update_task(task_id, |task| {
            task.status = TaskStatus::InProgress;
            task.actual_start = Some(date);
        })
    }

    pub fn complete_task(&mut self, task_id: &str, date: NaiveDate) -> RegisterResult<&Task> {
        self.update_task(task_id, |task| {
            task.status = TaskStatus::Completed;
            task.actual_end = Some(date);
            task.progress = Some(100);
        })
    }

    pub fn tasks_for_market(&self, market_ref: &str) -> Vec<&Task> {
        crate::market::tasks_for_market(market_ref, &self.tasks).collect()
    }

    /// Tasks planned to run entirely inside `[start, end]`.
    pub fn tasks_in_window(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| {
                matches!(
                    (task.planned_start, task.planned_end),
                    (Some(s), Some(e)) if s >= start && e <= end
                )
            })
            .collect()
    }

    /// `<market_ref>-T<n>`, one past the highest `n` already used by any task id.
    pub fn next_task_id(&self, market_ref: &str) -> String {
        let prefix = format!("{market_ref}-T");
        let highest = self
            .tasks
            .iter()
            .filter_map(|task| split_numeric_suffix(&task.id))
            .filter(|(id_prefix, _)| *id_prefix == prefix)
            .map(|(_, n)| n)
            .max()
            .unwrap_or(0);
        format!("{prefix}{}", highest + 1)
    }

    pub fn market_counts(&self, market_ref: &str) -> MarketTaskCounts {
        MarketTaskCounts::for_market(market_ref, &self.tasks)
    }

    pub fn last_task_added(&self, market_ref: &str) -> Option<&Task> {
        last_task_added(market_ref, &self.tasks)
    }

    /// Recomputes and caches every market's derived status.
    pub fn refresh_market_statuses(&mut self) -> RefreshSummary {
        let refs: Vec<&str> = self.markets.iter().map(|m| m.market_ref.as_str()).collect();
        let derived = derive_all_market_statuses(&refs, &self.tasks);

        let mut summary = RefreshSummary {
            market_count: self.markets.len(),
            ..RefreshSummary::default()
        };
        for (market, (_, status)) in self.markets.iter_mut().zip(derived) {
            match status {
                MarketStatus::NotStarted => summary.not_started_count += 1,
                MarketStatus::InProgress => summary.in_progress_count += 1,
                MarketStatus::Completed => summary.completed_count += 1,
            }
            if market.status != status {
                debug!(market_ref = %market.market_ref, from = %market.status, to = %status, "market status changed");
                summary.changes.push(StatusChange {
                    market_ref: market.market_ref.clone(),
                    from: market.status,
                    to: status,
                });
                market.status = status;
            }
        }
        summary
    }
}
