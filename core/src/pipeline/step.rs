// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::context::RequestContext;
use crate::domain::error::StigmerError;
use async_trait::async_trait;

#[async_trait]
pub trait Step<T: Send + Sync>: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError>;
}
