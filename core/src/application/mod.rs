// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The application layer (C3, C7): resource controllers built from the
//! generic pipeline, plus the Layer 2 structural-validation step they share.

pub mod controllers;
