//! Application error types shared by the store and the HTTP layer.
//!
//! Three failure kinds are meaningful to callers: validation failures
//! (bad input, rejected before any state change), invalid transitions
//! (the entity's current state forbids the requested action), and
//! internal failures (database or I/O trouble). The first two carry
//! messages safe to show to users; internals are logged server-side and
//! sanitized at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied data violates a precondition. Nothing was mutated.
    #[error("{0}")]
    Validation(String),

    /// The requested transition is not legal from the entity's current state.
    #[error("cannot {action} a {state} {entity}")]
    InvalidTransition {
        entity: &'static str,
        action: &'static str,
        state: &'static str,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is known but lacks the privilege for this operation.
    #[error("{0}")]
    Forbidden(&'static str),

    /// No caller identity was supplied, or it matched no member.
    #[error("caller identity required")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation(msg) => {
                tracing::warn!("Validation error: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            Error::InvalidTransition { .. } => {
                tracing::warn!("Rejected transition: {}", self);
                (StatusCode::CONFLICT, self.to_string())
            }
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::Internal(e) => {
                // Log the full chain but never leak it to clients.
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_name_the_blocked_action_and_state() {
        let err = Error::InvalidTransition {
            entity: "project",
            action: "approve",
            state: "completed",
        };
        assert_eq!(err.to_string(), "cannot approve a completed project");
    }

    #[test]
    fn validation_errors_carry_the_caller_message() {
        let err = Error::validation("title must not be empty");
        assert_eq!(err.to_string(), "title must not be empty");
    }
}
