use std::fmt;

use thiserror::Error;

/// Engine error taxonomy. Batch execution collects these per operation
/// instead of aborting on the first failure; everything else propagates
/// through `Result` as usual.
#[derive(Debug, Error)]
pub enum Error {
    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("parent task {0} not found")]
    ParentNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(ConflictKind),

    #[error("{0}")]
    ResourceLimit(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Conflicts in the dependency graph or claim state.
#[derive(Debug, PartialEq, Eq)]
pub enum ConflictKind {
    /// A task referencing itself in Blocked-by.
    SelfDependency(String),
    /// Adding the dependency would close a loop; the path runs
    /// origin -> target -> ... -> origin by stable ID.
    CircularDependency(Vec<String>),
    /// Claim of a task that already carries an owner.
    AlreadyOwned { id: String, owner: String },
    /// Claim of a task that is not ready (blocked or not pending).
    NotReady(String),
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfDependency(id) => {
                write!(f, "task cannot depend on itself: {id}")
            }
            Self::CircularDependency(path) => {
                write!(f, "circular dependency detected: {}", path.join(" -> "))
            }
            Self::AlreadyOwned { id, owner } => {
                write!(f, "task {id} is already owned by '{owner}'")
            }
            Self::NotReady(id) => write!(f, "task {id} is not ready to be claimed"),
        }
    }
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
