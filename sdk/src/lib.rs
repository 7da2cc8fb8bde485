// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Typed client used by the worker subprocesses and the CLI to call back
//! into the daemon: a thin wrapper over `tonic` channels (§1, SDK
//! ergonomics are a named out-of-scope concern; what's here is only what
//! `stigmer-workflow-worker`, `stigmer-agent-worker` and the `cli` crate
//! actually need to speak the wire protocol without re-deriving it).

pub mod client;

pub use client::StigmerClient;
