use crate::register::{Register, RegisterError};
use crate::task::Task;
use crate::task_validation::{self, TaskValidationError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("register error: {0}")]
    Register(#[from] RegisterError),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<TaskValidationError> for PersistenceError {
    fn from(value: TaskValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait RegisterStore {
    fn save_register(&self, register: &Register) -> PersistenceResult<()>;
    fn load_register(&self) -> PersistenceResult<Option<Register>>;
}

pub fn validate_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks)?;
    Ok(())
}

/// Keeps the register as a single JSON snapshot on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegisterStore for JsonFileStore {
    fn save_register(&self, register: &Register) -> PersistenceResult<()> {
        save_register_to_json(register, &self.path)
    }

    fn load_register(&self) -> PersistenceResult<Option<Register>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_register_from_json(&self.path).map(Some)
    }
}

pub mod file;

pub use file::{load_register_from_json, load_tasks_from_csv, save_register_to_json, save_tasks_to_csv};
