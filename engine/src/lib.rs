// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `stigmer-engine`
//!
//! Shared harness for the daemon's two worker subprocesses (C4, §4.5): the
//! well-known task-queue names, the `EngineClient` seam against the embedded
//! durable workflow engine, and the async activity-completion (token
//! handshake) protocol.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`queues`] | Well-known task-queue and workflow/activity names |
//! | [`client`] | `EngineClient` trait — the engine black box |
//! | [`fake`] | Deterministic in-memory `EngineClient` for tests |
//! | [`token`] | `complete-external-activity` system activity |

pub mod client;
pub mod fake;
pub mod queues;
pub mod token;

pub use client::{ActivityResult, EngineClient, EngineError, StructuralOutcome};
