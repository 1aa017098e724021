//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::balance::BalanceError;
use quiz_core::model::{PracticeError, QuestionSetError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by question generators and the generation task.
///
/// These never reach the end user; the task logs them and marks the set as failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generator is not configured")]
    Disabled,
    #[error("question generator returned an empty response")]
    EmptyResponse,
    #[error("question generator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("question generator returned malformed output: {0}")]
    Malformed(String),
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionSetService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSetServiceError {
    #[error("a question set is already being generated")]
    GenerationInProgress,
    #[error("question set not found")]
    NotFound,
    #[error(transparent)]
    Invalid(#[from] QuestionSetError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for QuestionSetServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeServiceError {
    #[error("practice resource not found")]
    NotFound,
    #[error(transparent)]
    Practice(#[from] PracticeError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for PracticeServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
