use crate::task::Task;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskValidationError {
    message: String,
}

impl TaskValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_task(task: &Task) -> Result<(), TaskValidationError> {
    if task.id.trim().is_empty() {
        return Err(TaskValidationError::new("task requires a non-empty id"));
    }
    if task.market_ref.trim().is_empty() {
        return Err(TaskValidationError::new(format!(
            "task {} requires a non-empty market_ref",
            task.id
        )));
    }
    if let Some(progress) = task.progress {
        if progress > 100 {
            return Err(TaskValidationError::new(format!(
                "task {} has invalid progress {} (must be between 0 and 100)",
                task.id, progress
            )));
        }
    }
    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), TaskValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id.as_str()) {
            return Err(TaskValidationError::new(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }
    Ok(())
}
