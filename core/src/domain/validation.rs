// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Field-constraint rules for Layer 1 validation (§4.7). Each rule reports
//! the first violation only; `ValidateProto` stops at the first failure.

use crate::domain::error::StigmerError;

pub trait FieldConstraints {
    /// Returns the first violated field constraint, if any.
    fn validate_fields(&self) -> Option<String>;
}

pub fn require_non_empty(field: &str, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some(format!("{field} must not be empty"))
    } else {
        None
    }
}

pub fn to_invalid_argument(step: &str, message: String) -> StigmerError {
    StigmerError::InvalidArgument(format!("{step}: {message}"))
}
