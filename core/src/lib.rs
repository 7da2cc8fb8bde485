// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # stigmer-core
//!
//! The daemon's domain model, request pipeline, resource controllers,
//! loopback gRPC, and debug HTTP surface.
//!
//! ## Layer Structure
//!
//! ```text
//! presentation/   ← gRPC server (tonic), debug HTTP surface (axum)
//!     ↓
//! application/    ← Resource controllers built from the pipeline
//!     ↓
//! pipeline/       ← The generic step-based request pipeline
//!     ↓
//! domain/         ← Resource kinds, the Envelope trait, errors
//!     ↓
//! infrastructure/ ← KV store (sled, in-memory)
//! ```

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod pipeline;
pub mod presentation;
