use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a single task.
///
/// Parsing never fails: the English wire names and the French dashboard labels
/// are both accepted, and anything else lands in [`TaskStatus::Unrecognized`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    /// Overlay on an in-progress task whose planned end has passed.
    Delayed,
    Unrecognized,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Delayed => "DELAYED",
            TaskStatus::Unrecognized => "UNRECOGNIZED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Non commencé",
            TaskStatus::InProgress => "En cours",
            TaskStatus::Completed => "Terminé",
            TaskStatus::Delayed => "En retard",
            TaskStatus::Unrecognized => "Inconnu",
        }
    }

    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "NOT_STARTED" | "NON_COMMENCE" => TaskStatus::NotStarted,
            "IN_PROGRESS" | "EN_COURS" => TaskStatus::InProgress,
            "COMPLETED" | "TERMINE" => TaskStatus::Completed,
            "DELAYED" | "EN_RETARD" => TaskStatus::Delayed,
            _ => TaskStatus::Unrecognized,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// True once work has left the not-started state. Unrecognized values never count.
    pub fn has_started(&self) -> bool {
        matches!(
            self,
            TaskStatus::InProgress | TaskStatus::Completed | TaskStatus::Delayed
        )
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<&str> for TaskStatus {
    fn from(value: &str) -> Self {
        Self::parse_lenient(value)
    }
}

impl From<TaskStatus> for &'static str {
    fn from(value: TaskStatus) -> Self {
        value.as_str()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived status of a market. Computed from its tasks, never set directly.
///
/// Ordered by lifecycle: not started, in progress, completed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "String", into = "&'static str")]
pub enum MarketStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::NotStarted => "NOT_STARTED",
            MarketStatus::InProgress => "IN_PROGRESS",
            MarketStatus::Completed => "COMPLETED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketStatus::NotStarted => "Non commencé",
            MarketStatus::InProgress => "En cours",
            MarketStatus::Completed => "Terminé",
        }
    }

    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" | "EN_COURS" => MarketStatus::InProgress,
            "COMPLETED" | "TERMINE" => MarketStatus::Completed,
            _ => MarketStatus::NotStarted,
        }
    }
}

impl From<String> for MarketStatus {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<MarketStatus> for &'static str {
    fn from(value: MarketStatus) -> Self {
        value.as_str()
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
