// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::error::StigmerError;
use std::fmt;

/// Wraps the failing step's name around the underlying cause (§4.2, §7).
/// The controller surfaces `cause`'s code unchanged; only the message gains
/// the step name so logs and CLI errors can point at the offending step.
#[derive(Debug, Clone)]
pub struct PipelineError {
    pub step_name: String,
    pub cause: StigmerError,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step '{}' failed: {}", self.step_name, self.cause)
    }
}

impl std::error::Error for PipelineError {}

impl From<PipelineError> for tonic::Status {
    fn from(err: PipelineError) -> Self {
        tonic::Status::new(err.cause.code(), err.to_string())
    }
}
