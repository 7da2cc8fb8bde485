// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Process-lifecycle supervisor (C1, §4.1): everything needed to discover,
//! start, health-check, supervise and stop the daemon's components.

pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod logs;
pub mod process;

pub use error::SupervisorError;
pub use lifecycle::{Component, ComponentStatus, Supervisor};
