pub mod clock;
pub mod config;
pub mod filter;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod market;
pub mod persistence;
pub mod register;
pub mod report;
pub mod stats;
pub mod status;
pub mod task;
pub mod task_validation;
pub mod variance;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, TrackerConfig};
pub use filter::{MarketFilter, MarketSortKey, SortDirection, TaskFilter};
pub use market::{
    Market, MarketTaskCounts, MarketType, MarketValidationError, derive_all_market_statuses,
    derive_market_status, is_valid_budget_line, last_task_added, tasks_for_market,
    validate_market, validate_market_collection,
};
pub use persistence::{
    JsonFileStore, PersistenceError, RegisterStore, load_register_from_json, load_tasks_from_csv,
    save_register_to_json, save_tasks_to_csv,
};
pub use register::{RefreshSummary, Register, RegisterError, StatusChange};
pub use stats::TaskStatistics;
pub use status::{MarketStatus, TaskStatus};
pub use task::{Priority, Task, compare_task_ids};
pub use task_validation::TaskValidationError;
pub use variance::{
    InvalidTaskError, Severity, VarianceResult, compute_variance, day_difference,
    effective_status,
};
