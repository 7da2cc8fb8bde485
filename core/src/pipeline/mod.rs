// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The generic, step-based request processing pipeline (C2, §4.2). Every
//! resource controller (C3) builds and runs a `Pipeline<T>` from these
//! primitives; no controller talks to the KV store or another kind's
//! controller except through steps defined here or in `application`.

pub mod context;
pub mod error;
pub mod pipeline;
pub mod step;
pub mod steps;

pub use context::{OuterContext, RequestContext, RequestMetadata};
pub use error::PipelineError;
pub use pipeline::Pipeline;
pub use step::Step;
