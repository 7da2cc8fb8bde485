// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The error taxonomy from §7, expressed once so every gRPC boundary maps it
//! the same way instead of re-deriving the mapping per handler.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StigmerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("aborted: {0}")]
    Aborted(String),
}

impl StigmerError {
    pub fn code(&self) -> tonic::Code {
        match self {
            StigmerError::InvalidArgument(_) => tonic::Code::InvalidArgument,
            StigmerError::NotFound(_) => tonic::Code::NotFound,
            StigmerError::AlreadyExists(_) => tonic::Code::AlreadyExists,
            StigmerError::FailedPrecondition(_) => tonic::Code::FailedPrecondition,
            StigmerError::Internal(_) => tonic::Code::Internal,
            StigmerError::Unavailable(_) => tonic::Code::Unavailable,
            StigmerError::DeadlineExceeded(_) => tonic::Code::DeadlineExceeded,
            StigmerError::ResourceExhausted(_) => tonic::Code::ResourceExhausted,
            StigmerError::Aborted(_) => tonic::Code::Aborted,
        }
    }
}

impl From<StigmerError> for tonic::Status {
    fn from(err: StigmerError) -> Self {
        tonic::Status::new(err.code(), err.to_string())
    }
}
