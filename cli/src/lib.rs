// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The supervisor (C1, §4.1): binary discovery, process-group lifecycle,
//! health-gated start/stop, idempotent start, log rotation. The elaborate
//! task/agent/workflow/config CLI surface the original front-end carries is
//! out of scope (§1); this crate keeps only the `server` subcommand the
//! supervisor needs to be driven from a shell.

pub mod commands;
pub mod config;
pub mod supervisor;
