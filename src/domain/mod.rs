use derive_more::Display;
use thiserror::Error;

pub mod access;
pub mod membership;
pub mod team;
pub mod team_task;
pub mod user;

#[cfg(test)]
pub mod test_util;

/// Names the kind of record which was looked for and not found
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    #[display("team {_0}")]
    Team(i32),
    #[display("user {_0}")]
    User(i32),
    #[display("a user with {_0}")]
    UserMatching(&'static str),
    #[display("membership of user {_0}")]
    Member(i32),
    #[display("task {_0}")]
    Task(i32),
}

/// Failures that can come out of the team domain. Every variant maps to a stable
/// classification at the API boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("input was invalid: {0}")]
    InvalidInput(String),
    #[error("{0} does not exist")]
    DoesNotExist(Missing),
    #[error("not permitted: {0}")]
    NotPermitted(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    PortError(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid(description: impl Into<String>) -> Self {
        Self::InvalidInput(description.into())
    }

    pub(crate) fn not_permitted(description: impl Into<String>) -> Self {
        Self::NotPermitted(description.into())
    }

    pub(crate) fn conflict(description: impl Into<String>) -> Self {
        Self::Conflict(description.into())
    }
}
