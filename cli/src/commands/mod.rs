// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The `server` subcommand surface (§6): start, stop, restart, status, logs.
//! The task/agent/workflow/config/billing/update surfaces the original CLI
//! front-end carries live outside this repository (§1).

pub mod server;

pub use server::ServerCommand;
