use crate::status::TaskStatus;
use crate::task::Task;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub delayed: usize,
    pub unrecognized: usize,
    /// Not completed and planned to end before `today`.
    pub overdue: usize,
}

impl TaskStatistics {
    pub fn from_tasks<'a, I>(tasks: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut stats = Self::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::NotStarted => stats.not_started += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Delayed => stats.delayed += 1,
                TaskStatus::Unrecognized => stats.unrecognized += 1,
            }
            if !task.status.is_completed() && task.planned_end.is_some_and(|end| end < today) {
                stats.overdue += 1;
            }
        }
        stats
    }

    pub fn completion_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn to_cli_summary(&self) -> String {
        format!(
            "total={}, not_started={}, in_progress={}, completed={}, delayed={}, overdue={}, done={:.0}%",
            self.total,
            self.not_started,
            self.in_progress,
            self.completed,
            self.delayed,
            self.overdue,
            self.completion_ratio() * 100.0
        )
    }
}
