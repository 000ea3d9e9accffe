//! Failure taxonomy for coordinator actions.
//!
//! The `Display` text of each variant is exactly what a requester sees in an
//! `error` packet, so wording changes here are protocol changes.

use thiserror::Error;

/// Coarse classification used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("Quiz not found")]
    QuizNotFound,

    #[error("Quiz has no questions")]
    EmptyQuiz,

    #[error("Game not found")]
    SessionNotFound,

    #[error("Game not found or already started")]
    JoinUnavailable,

    #[error("Already joined this game")]
    AlreadyJoined,

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Only the host can do that")]
    NotHost,

    #[error("Player not found or resume token invalid")]
    ResumeRejected,

    #[error("No join codes available")]
    CodesExhausted,

    #[error("Quiz generation failed: {0}")]
    Generation(String),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::QuizNotFound
            | CoordinatorError::SessionNotFound
            | CoordinatorError::ResumeRejected => ErrorKind::NotFound,
            CoordinatorError::JoinUnavailable
            | CoordinatorError::AlreadyJoined
            | CoordinatorError::AlreadyStarted
            | CoordinatorError::EmptyQuiz
            | CoordinatorError::CodesExhausted
            | CoordinatorError::Generation(_) => ErrorKind::InvalidState,
            CoordinatorError::NotHost => ErrorKind::Unauthorized,
        }
    }
}
