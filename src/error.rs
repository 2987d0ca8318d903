use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::generator::Difficulty;

/// Errors returned by the quiz engine. None of these are retried by the core;
/// the front end decides whether to prompt, repair, or fall back to temporary mode.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("invalid username: {}", join_issues(.0))]
    InvalidUsername(Vec<UsernameIssue>),

    #[error("a {difficulty} score already exists for '{username}' (ref #{ref_number})")]
    DuplicateScoreConflict {
        username: String,
        difficulty: Difficulty,
        ref_number: u32,
    },

    #[error("no question topics are enabled")]
    NoTopicsSelected,

    #[error("no free reference numbers left in {min}..={max}")]
    RefNumberCapacityExceeded { min: u32, max: u32 },

    #[error("corrupt data in {}: {reason}", .file.display())]
    CorruptPersistedData { file: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot {action} while session is {state}")]
    InvalidSessionTransition {
        action: &'static str,
        state: &'static str,
    },
}

impl QuizError {
    pub fn io(file: impl Into<PathBuf>, source: io::Error) -> Self {
        QuizError::Io {
            file: file.into(),
            source,
        }
    }

    pub fn corrupt(file: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        QuizError::CorruptPersistedData {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that should push the app into temporary storage mode.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            QuizError::Io { .. } | QuizError::CorruptPersistedData { .. }
        )
    }
}

/// One independently reported problem with a username entry. Variants that
/// can be fixed mechanically carry the adjusted value.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UsernameIssue {
    #[error("username is required and cannot be left blank")]
    Empty,
    #[error("username cannot be shorter than two characters")]
    TooShort,
    #[error("username must contain at least one alphabetical character")]
    NoAlphabetic,
    #[error("username cannot be longer than twenty characters (shortened to '{truncated}')")]
    TooLong { truncated: String },
    #[error("username cannot contain spaces (suggested '{underscored}')")]
    ContainsSpace { underscored: String },
}

fn join_issues(issues: &[UsernameIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type QuizResult<T> = Result<T, QuizError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_username_lists_every_issue() {
        let err = QuizError::InvalidUsername(vec![
            UsernameIssue::TooShort,
            UsernameIssue::NoAlphabetic,
        ]);
        let msg = err.to_string();
        assert!(msg.contains("shorter than two"));
        assert!(msg.contains("alphabetical"));
    }

    #[test]
    fn storage_failures_are_classified() {
        let io_err = QuizError::io("scoreboard.json", io::Error::other("disk full"));
        assert!(io_err.is_storage_failure());
        assert!(io_err.to_string().contains("disk full"));
        assert!(!QuizError::NoTopicsSelected.is_storage_failure());
    }
}
