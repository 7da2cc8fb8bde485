// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`grpc`] | gRPC (Tonic) | Network + loopback resource services |
//! | [`http`] | HTTP (Axum) | Read-only debug/introspection surface (dev/local only) |

pub mod grpc;
pub mod http;
