use std::fmt;

use thiserror::Error;

use crate::{ControlAction, JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response from the server, including transport timeouts.
    Network,
    /// Authorization still failing after one credential refresh.
    AuthRequired,
    /// Client-side precondition failed before dispatch.
    Validation,
    InvalidTransition {
        action: ControlAction,
        status: JobStatus,
    },
    /// The server answered with a failure payload.
    ServerRejected,
    CommandInFlight { job_id: JobId },
    CreateInFlight { structure_id: u64 },
    HttpStatus(u16),
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::AuthRequired => write!(f, "authentication required"),
            ErrorKind::Validation => write!(f, "validation error"),
            ErrorKind::InvalidTransition { action, status } => {
                write!(f, "cannot {action} a job that is {status}")
            }
            ErrorKind::ServerRejected => write!(f, "rejected by server"),
            ErrorKind::CommandInFlight { job_id } => {
                write!(f, "a command for job {job_id} is already in flight")
            }
            ErrorKind::CreateInFlight { structure_id } => {
                write!(f, "a job for structure {structure_id} is already being created")
            }
            ErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            ErrorKind::Decode => write!(f, "unexpected response body"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SyncError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn server_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerRejected, message)
    }

    pub fn command_in_flight(job_id: JobId) -> Self {
        Self::new(
            ErrorKind::CommandInFlight { job_id },
            "wait for the previous command to settle",
        )
    }

    pub fn create_in_flight(structure_id: u64) -> Self {
        Self::new(
            ErrorKind::CreateInFlight { structure_id },
            "wait for the previous create to settle",
        )
    }

    /// True for errors raised before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Validation
                | ErrorKind::InvalidTransition { .. }
                | ErrorKind::CommandInFlight { .. }
                | ErrorKind::CreateInFlight { .. }
        )
    }
}
