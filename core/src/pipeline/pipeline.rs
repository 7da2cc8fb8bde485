// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `Pipeline<T>` (§4.2): steps run strictly in registration order; the first
//! failure stops execution and no later step runs.

use super::context::RequestContext;
use super::error::PipelineError;
use super::step::Step;
use tracing::{info_span, Instrument};

pub struct Pipeline<T: Send + Sync> {
    name: String,
    steps: Vec<Box<dyn Step<T>>>,
}

pub struct PipelineBuilder<T: Send + Sync> {
    name: String,
    steps: Vec<Box<dyn Step<T>>>,
}

impl<T: Send + Sync> Pipeline<T> {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder<T> {
        PipelineBuilder {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), PipelineError> {
        for step in &self.steps {
            let span = info_span!("pipeline_step", pipeline = %self.name, step = step.name());
            let outcome = async { step.execute(ctx).await }.instrument(span.clone()).await;
            match outcome {
                Ok(()) => {
                    let _enter = span.enter();
                    tracing::debug!(outcome = "ok");
                }
                Err(cause) => {
                    let _enter = span.enter();
                    tracing::warn!(outcome = "err", error = %cause);
                    return Err(PipelineError {
                        step_name: step.name().to_string(),
                        cause,
                    });
                }
            }
        }
        Ok(())
    }
}

impl<T: Send + Sync> PipelineBuilder<T> {
    pub fn add_step(mut self, step: Box<dyn Step<T>>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Pipeline<T> {
        Pipeline {
            name: self.name,
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::StigmerError;
    use crate::pipeline::context::OuterContext;
    use crate::domain::kind::Kind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct State {
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    struct Recorder(&'static str);
    #[async_trait]
    impl Step<State> for Recorder {
        fn name(&self) -> &str {
            self.0
        }
        async fn execute(&self, ctx: &mut RequestContext<State>) -> Result<(), StigmerError> {
            ctx.new_state().order.lock().unwrap().push(self.0);
            Ok(())
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl Step<State> for AlwaysFails {
        fn name(&self) -> &str {
            "AlwaysFails"
        }
        async fn execute(&self, _ctx: &mut RequestContext<State>) -> Result<(), StigmerError> {
            Err(StigmerError::Internal("boom".into()))
        }
    }

    #[tokio::test]
    async fn steps_run_in_registration_order() {
        let state = State {
            order: Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        let pipeline = Pipeline::builder("test")
            .add_step(Box::new(Recorder("a")))
            .add_step(Box::new(Recorder("b")))
            .add_step(Box::new(Recorder("c")))
            .build();
        let mut ctx = RequestContext::new(OuterContext::new(Kind::Agent, "tester"), state.clone());
        pipeline.execute(&mut ctx).await.unwrap();
        assert_eq!(*state.order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failure_short_circuits_remaining_steps() {
        let state = State {
            order: Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        let pipeline = Pipeline::builder("test")
            .add_step(Box::new(Recorder("a")))
            .add_step(Box::new(AlwaysFails))
            .add_step(Box::new(Recorder("never")))
            .build();
        let mut ctx = RequestContext::new(OuterContext::new(Kind::Agent, "tester"), state.clone());
        let err = pipeline.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.step_name, "AlwaysFails");
        assert_eq!(*state.order.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn deep_clone_invariant_survives_mutation() {
        let counter = AtomicUsize::new(0);
        counter.fetch_add(1, Ordering::SeqCst);
        let state = State {
            order: Arc::new(std::sync::Mutex::new(vec!["seed"])),
        };
        let ctx = RequestContext::new(OuterContext::new(Kind::Agent, "t"), state.clone());
        // input() and new_state() observe the same starting contents, but are
        // independent clones: mutating one's interior through new_state does
        // not retroactively change what input() returned at construction time.
        assert_eq!(ctx.input().order.lock().unwrap().clone(), vec!["seed"]);
    }
}
