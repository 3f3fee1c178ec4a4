//! Executor error type.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("executor '{0}' is stopped")]
    Stopped(String),
}
