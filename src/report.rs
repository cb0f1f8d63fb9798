//! Tabular views over markets and tasks for display and export.

use crate::filter::MarketFilter;
use crate::market::{MarketTaskCounts, derive_market_status, last_task_added};
use crate::register::Register;
use crate::task::Task;
use crate::variance::compute_variance;
use chrono::{Datelike, NaiveDate};
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use tracing::warn;

pub const VARIANCE_COLUMNS: [&str; 11] = [
    "id",
    "market_ref",
    "title",
    "planned_start",
    "planned_end",
    "start_variance_days",
    "end_variance_days",
    "remaining_days",
    "severity",
    "progress_indicator",
    "error",
];

pub const MARKET_STATUS_COLUMNS: [&str; 11] = [
    "market_ref",
    "title",
    "coordination",
    "budget_lines",
    "status",
    "total_tasks",
    "not_started",
    "in_progress",
    "completed",
    "delayed",
    "last_task",
];

/// One row per task. Tasks that cannot be measured keep null metrics and an `error` message.
pub fn variance_frame(tasks: &[Task], now: NaiveDate) -> PolarsResult<DataFrame> {
    let height = tasks.len();
    let mut ids = Vec::with_capacity(height);
    let mut market_refs = Vec::with_capacity(height);
    let mut titles = Vec::with_capacity(height);
    let mut planned_start = Vec::with_capacity(height);
    let mut planned_end = Vec::with_capacity(height);
    let mut start_variance: Vec<Option<i64>> = Vec::with_capacity(height);
    let mut end_variance: Vec<Option<i64>> = Vec::with_capacity(height);
    let mut remaining: Vec<Option<i64>> = Vec::with_capacity(height);
    let mut severity: Vec<Option<&str>> = Vec::with_capacity(height);
    let mut indicator: Vec<Option<i32>> = Vec::with_capacity(height);
    let mut errors: Vec<Option<String>> = Vec::with_capacity(height);

    for task in tasks {
        ids.push(task.id.as_str());
        market_refs.push(task.market_ref.as_str());
        titles.push(task.title.as_str());
        planned_start.push(task.planned_start);
        planned_end.push(task.planned_end);
        match compute_variance(task, now) {
            Ok(result) => {
                start_variance.push(Some(result.start_variance_days));
                end_variance.push(result.end_variance_days);
                remaining.push(Some(result.remaining_days));
                severity.push(Some(result.severity().as_str()));
                indicator.push(Some(i32::from(result.progress_indicator())));
                errors.push(None);
            }
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "task excluded from variance metrics");
                start_variance.push(None);
                end_variance.push(None);
                remaining.push(None);
                severity.push(None);
                indicator.push(None);
                errors.push(Some(err.to_string()));
            }
        }
    }

    let columns: Vec<Column> = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("market_ref"), market_refs).into_column(),
        Series::new(PlSmallStr::from_static("title"), titles).into_column(),
        date_series("planned_start", &planned_start)?.into_column(),
        date_series("planned_end", &planned_end)?.into_column(),
        Series::new(PlSmallStr::from_static("start_variance_days"), start_variance).into_column(),
        Series::new(PlSmallStr::from_static("end_variance_days"), end_variance).into_column(),
        Series::new(PlSmallStr::from_static("remaining_days"), remaining).into_column(),
        Series::new(PlSmallStr::from_static("severity"), severity).into_column(),
        Series::new(PlSmallStr::from_static("progress_indicator"), indicator).into_column(),
        Series::new(PlSmallStr::from_static("error"), errors).into_column(),
    ];
    DataFrame::new(columns)
}

/// One row per market selected by `filter`, in its order, with the status
/// derived from the register's tasks.
pub fn market_status_frame(register: &Register, filter: &MarketFilter) -> PolarsResult<DataFrame> {
    let tasks = register.tasks();
    let markets = filter.apply(register.markets(), tasks);
    let height = markets.len();
    let mut refs = Vec::with_capacity(height);
    let mut titles = Vec::with_capacity(height);
    let mut coordinations = Vec::with_capacity(height);
    let mut budget_lines = Vec::with_capacity(height);
    let mut statuses = Vec::with_capacity(height);
    let mut totals = Vec::with_capacity(height);
    let mut not_started = Vec::with_capacity(height);
    let mut in_progress = Vec::with_capacity(height);
    let mut completed = Vec::with_capacity(height);
    let mut delayed = Vec::with_capacity(height);
    let mut last_tasks: Vec<Option<&str>> = Vec::with_capacity(height);

    for market in markets {
        let counts = MarketTaskCounts::for_market(&market.market_ref, tasks);
        refs.push(market.market_ref.as_str());
        titles.push(market.title.as_str());
        coordinations.push(market.coordination.as_str());
        budget_lines.push(market.budget_lines.join(", "));
        statuses.push(derive_market_status(&market.market_ref, tasks).as_str());
        totals.push(counts.total as i64);
        not_started.push(counts.not_started as i64);
        in_progress.push(counts.in_progress as i64);
        completed.push(counts.completed as i64);
        delayed.push(counts.delayed as i64);
        last_tasks.push(last_task_added(&market.market_ref, tasks).map(|t| t.id.as_str()));
    }

    let columns: Vec<Column> = vec![
        Series::new(PlSmallStr::from_static("market_ref"), refs).into_column(),
        Series::new(PlSmallStr::from_static("title"), titles).into_column(),
        Series::new(PlSmallStr::from_static("coordination"), coordinations).into_column(),
        Series::new(PlSmallStr::from_static("budget_lines"), budget_lines).into_column(),
        Series::new(PlSmallStr::from_static("status"), statuses).into_column(),
        Series::new(PlSmallStr::from_static("total_tasks"), totals).into_column(),
        Series::new(PlSmallStr::from_static("not_started"), not_started).into_column(),
        Series::new(PlSmallStr::from_static("in_progress"), in_progress).into_column(),
        Series::new(PlSmallStr::from_static("completed"), completed).into_column(),
        Series::new(PlSmallStr::from_static("delayed"), delayed).into_column(),
        Series::new(PlSmallStr::from_static("last_task"), last_tasks).into_column(),
    ];
    DataFrame::new(columns)
}

fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_i32)).collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
fn date_to_i32(date: NaiveDate) -> i32 {
    const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
