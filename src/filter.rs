use crate::market::{Market, MarketType, derive_market_status};
use crate::status::{MarketStatus, TaskStatus};
use crate::task::{Priority, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Criteria for narrowing a task list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub market_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_on_or_after: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_on_or_before: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn market(mut self, market_ref: impl Into<String>) -> Self {
        self.market_refs.push(market_ref.into());
        self
    }

    pub fn window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.starts_on_or_after = Some(start);
        self.ends_on_or_before = Some(end);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.market_refs.is_empty() && !self.market_refs.iter().any(|r| task.belongs_to(r)) {
            return false;
        }
        if let Some(term) = self.search_term.as_deref() {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !task.title.to_lowercase().contains(&term) {
                return false;
            }
        }
        if self.status.is_some_and(|status| status != task.status) {
            return false;
        }
        if let Some(assignee) = self.assigned_to.as_deref() {
            if task.assigned_to.as_deref() != Some(assignee) {
                return false;
            }
        }
        if self.priority.is_some_and(|priority| priority != task.priority) {
            return false;
        }
        if let Some(bound) = self.starts_on_or_after {
            if !task.planned_start.is_some_and(|start| start >= bound) {
                return false;
            }
        }
        if let Some(bound) = self.ends_on_or_before {
            if !task.planned_end.is_some_and(|end| end <= bound) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}

/// Column a market listing can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSortKey {
    MarketRef,
    Title,
    MarketType,
    Coordination,
    Status,
    BudgetForecast,
}

impl MarketSortKey {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "market_ref" | "ref" => Some(MarketSortKey::MarketRef),
            "title" => Some(MarketSortKey::Title),
            "market_type" | "type" => Some(MarketSortKey::MarketType),
            "coordination" => Some(MarketSortKey::Coordination),
            "status" => Some(MarketSortKey::Status),
            "budget_forecast" | "budget" => Some(MarketSortKey::BudgetForecast),
            _ => None,
        }
    }

    fn compare(
        self,
        (a, status_a): (&Market, MarketStatus),
        (b, status_b): (&Market, MarketStatus),
    ) -> Ordering {
        match self {
            MarketSortKey::MarketRef => a.market_ref.cmp(&b.market_ref),
            MarketSortKey::Title => a.title.cmp(&b.title),
            MarketSortKey::MarketType => a.market_type.as_str().cmp(b.market_type.as_str()),
            MarketSortKey::Coordination => a.coordination.cmp(&b.coordination),
            MarketSortKey::Status => status_a.cmp(&status_b),
            // Markets without a forecast sort first.
            MarketSortKey::BudgetForecast => a
                .budget_forecast
                .partial_cmp(&b.budget_forecast)
                .unwrap_or(Ordering::Equal),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Criteria for the market table. Status matches the status derived from the
/// tasks, not the cached one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MarketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_type: Option<MarketType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<MarketSortKey>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl MarketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordination(mut self, coordination: impl Into<String>) -> Self {
        self.coordination = Some(coordination.into());
        self
    }

    pub fn status(mut self, status: MarketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn market_type(mut self, market_type: MarketType) -> Self {
        self.market_type = Some(market_type);
        self
    }

    pub fn sort(mut self, key: MarketSortKey, direction: SortDirection) -> Self {
        self.sort_by = Some(key);
        self.direction = direction;
        self
    }

    pub fn matches(&self, market: &Market, tasks: &[Task]) -> bool {
        self.matches_derived(market, derive_market_status(&market.market_ref, tasks))
    }

    fn matches_derived(&self, market: &Market, derived: MarketStatus) -> bool {
        if let Some(coordination) = self.coordination.as_deref() {
            if market.coordination != coordination.trim() {
                return false;
            }
        }
        if self.market_type.is_some_and(|kind| kind != market.market_type) {
            return false;
        }
        !self.status.is_some_and(|status| status != derived)
    }

    /// Matching markets in input order, or sorted when a sort key is set. Sorting is stable.
    pub fn apply<'a>(&self, markets: &'a [Market], tasks: &[Task]) -> Vec<&'a Market> {
        let mut selected: Vec<(&Market, MarketStatus)> = markets
            .iter()
            .map(|market| (market, derive_market_status(&market.market_ref, tasks)))
            .filter(|(market, derived)| self.matches_derived(market, *derived))
            .collect();
        if let Some(key) = self.sort_by {
            selected.sort_by(|a, b| {
                let ordering = key.compare(*a, *b);
                match self.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        selected.into_iter().map(|(market, _)| market).collect()
    }
}
