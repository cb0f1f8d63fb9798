use super::{PersistenceError, PersistenceResult};
use crate::market::Market;
use crate::register::Register;
use crate::status::TaskStatus;
use crate::task::{Priority, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;

#[derive(Serialize, Deserialize)]
struct RegisterSnapshot {
    #[serde(default)]
    markets: Vec<Market>,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl RegisterSnapshot {
    fn from_register(register: &Register) -> PersistenceResult<Self> {
        super::validate_tasks(register.tasks())?;
        Ok(Self {
            markets: register.markets().to_vec(),
            tasks: register.tasks().to_vec(),
        })
    }

    fn into_register(self) -> PersistenceResult<Register> {
        super::validate_tasks(&self.tasks)?;
        Ok(Register::from_parts(self.markets, self.tasks)?)
    }
}

pub fn save_register_to_json<P: AsRef<Path>>(
    register: &Register,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = RegisterSnapshot::from_register(register)?;
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    info!(path = %path.as_ref().display(), markets = snapshot.markets.len(), tasks = snapshot.tasks.len(), "register saved");
    Ok(())
}

pub fn load_register_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Register> {
    let file = File::open(path.as_ref())?;
    let snapshot: RegisterSnapshot = serde_json::from_reader(file)?;
    let register = snapshot.into_register()?;
    info!(path = %path.as_ref().display(), markets = register.markets().len(), tasks = register.tasks().len(), "register loaded");
    Ok(register)
}

#[derive(Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: String,
    market_ref: String,
    title: String,
    #[serde(default)]
    description: String,
    status: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    assigned_to: String,
    planned_start: String,
    planned_end: String,
    actual_start: String,
    actual_end: String,
    #[serde(default)]
    progress: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        TaskCsvRecord {
            id: task.id.clone(),
            market_ref: task.market_ref.clone(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: task.status.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            assigned_to: task.assigned_to.clone().unwrap_or_default(),
            planned_start: format_date(task.planned_start),
            planned_end: format_date(task.planned_end),
            actual_start: format_date(task.actual_start),
            actual_end: format_date(task.actual_end),
            progress: task.progress.map(|p| p.to_string()).unwrap_or_default(),
        }
    }
}

impl TaskCsvRecord {
    fn into_task(self) -> PersistenceResult<Task> {
        if self.id.trim().is_empty() {
            return Err(PersistenceError::InvalidData(
                "task row is missing an id".into(),
            ));
        }
        let mut task = Task::new(self.id, self.market_ref, self.title);
        task.description = parse_string_option(self.description);
        task.status = TaskStatus::parse_lenient(&self.status);
        task.priority = if self.priority.trim().is_empty() {
            Priority::default()
        } else {
            Priority::parse_lenient(&self.priority).ok_or_else(|| {
                PersistenceError::InvalidData(format!("invalid priority '{}'", self.priority))
            })?
        };
        task.assigned_to = parse_string_option(self.assigned_to);
        task.planned_start = parse_date(&self.planned_start)?;
        task.planned_end = parse_date(&self.planned_end)?;
        task.actual_start = parse_date(&self.actual_start)?;
        task.actual_end = parse_date(&self.actual_end)?;
        task.progress = parse_progress(&self.progress)?;
        Ok(task)
    }
}

pub fn save_tasks_to_csv<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    super::validate_tasks(tasks)?;
    let file = File::create(path.as_ref())?;
    let mut writer = csv::Writer::from_writer(file);
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), tasks = tasks.len(), "tasks exported");
    Ok(())
}

pub fn load_tasks_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Task>> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(file);
    let mut tasks = Vec::new();
    for record in reader.deserialize::<TaskCsvRecord>() {
        tasks.push(record?.into_task()?);
    }
    super::validate_tasks(&tasks)?;
    Ok(tasks)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_progress(input: &str) -> PersistenceResult<Option<u8>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<u8>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid progress '{input}': {e}")))
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
