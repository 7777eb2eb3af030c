//! Base flow: the uniform wrapper around every business use-case
//!
//! A [`Flow`] composes a [`FlowStep`] (the business operation) with an
//! [`ExecutionBoundary`] (with or without a transaction) and a
//! [`FlowTracer`]. Every call opens one span, validates the input, runs the
//! step inside the boundary and closes the span exactly once.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Instrument};

use crate::application::boundary::{
    ExecutionBoundary, NoTransaction, NonTransactional, Transactional,
};
use crate::application::startup::panic_message;
use crate::domain::context::{FlowExecutionContext, Invocation};
use crate::domain::telemetry::{FlowTracer, SpanGuard, SpanOutcome};
use crate::domain::transaction::TransactionProvider;
use crate::domain::validation::Validate;
use crate::error::FlowError;
use crate::types::{FlowName, Principal};

/// The business operation a flow executes.
///
/// `Scope` is what the flow's boundary hands over: [`NoTransaction`] for
/// non-transactional flows, the provider's transaction handle otherwise.
/// Authorization against `context.principal()` is the step's job.
#[async_trait]
pub trait FlowStep<Scope: Send = NoTransaction>: Send + Sync {
    /// Input payload, validated before `execute` runs
    type Input: Validate + Send + 'static;

    /// Output payload
    type Output: Send + 'static;

    /// Perform the operation
    async fn execute(
        &self,
        input: Self::Input,
        context: &FlowExecutionContext,
        scope: &mut Scope,
    ) -> Result<Self::Output, FlowError>;
}

/// Object-safe execute contract for callers that hold flows behind `dyn`
#[async_trait]
pub trait ExecuteFlow<I, O>: Send + Sync {
    /// Name of the underlying flow
    fn flow_name(&self) -> &FlowName;

    /// Execute the flow for one invocation
    async fn execute_flow(&self, input: I, invocation: Invocation) -> Result<O, FlowError>;
}

/// A named, traced business use-case
pub struct Flow<S, B = NonTransactional> {
    name: FlowName,
    tracer: Arc<dyn FlowTracer>,
    step: S,
    boundary: B,
}

impl<S, B> std::fmt::Debug for Flow<S, B>
where
    B: ExecutionBoundary,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("boundary", &self.boundary.label())
            .finish()
    }
}

impl<S, B> Flow<S, B>
where
    B: ExecutionBoundary,
    S: FlowStep<B::Scope>,
{
    /// Name assigned at construction
    pub fn name(&self) -> &FlowName {
        &self.name
    }

    /// Execute on behalf of `principal` in a new conversation
    pub async fn execute(
        &self,
        input: S::Input,
        principal: Principal,
    ) -> Result<S::Output, FlowError> {
        self.execute_with(input, Invocation::new(principal)).await
    }

    /// Execute with an explicit conversation id and/or cancellation token
    pub async fn execute_with(
        &self,
        input: S::Input,
        invocation: Invocation,
    ) -> Result<S::Output, FlowError> {
        let conversation_id = invocation
            .conversation_id
            .unwrap_or_else(|| self.tracer.new_conversation_id());
        let context = FlowExecutionContext::new(
            self.name.clone(),
            conversation_id,
            invocation.principal,
            invocation.cancellation.unwrap_or_default(),
        );

        let span = SpanGuard::open(self.tracer.as_ref(), &self.name, &conversation_id);
        let tracing_span = span.tracing_span();
        let started = Instant::now();

        // A panicking step still closes its span before the panic resumes
        let result = match AssertUnwindSafe(self.run(input, &context))
            .catch_unwind()
            .instrument(tracing_span.clone())
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                tracing_span.in_scope(|| {
                    error!(
                        flow = %self.name,
                        conversation_id = %conversation_id,
                        boundary = self.boundary.label(),
                        panic = %panic_message(panic.as_ref()),
                        "Flow step panicked"
                    )
                });
                span.finish(SpanOutcome::Panicked);
                std::panic::resume_unwind(panic);
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        tracing_span.in_scope(|| match &result {
            Ok(_) => info!(
                flow = %self.name,
                conversation_id = %conversation_id,
                boundary = self.boundary.label(),
                elapsed_ms,
                "Flow succeeded"
            ),
            Err(err) => error!(
                flow = %self.name,
                conversation_id = %conversation_id,
                boundary = self.boundary.label(),
                failure_kind = %err.kind(),
                error = %err,
                elapsed_ms,
                "Flow failed"
            ),
        });
        span.finish(match &result {
            Ok(_) => SpanOutcome::Succeeded,
            Err(err) => SpanOutcome::Failed(err.kind()),
        });

        result
    }

    async fn run(
        &self,
        input: S::Input,
        context: &FlowExecutionContext,
    ) -> Result<S::Output, FlowError> {
        if context.is_cancelled() {
            return Err(FlowError::Cancelled);
        }

        input.validate()?;

        let mut scope = self.boundary.open(context).await?;

        let outcome = tokio::select! {
            biased;
            _ = context.cancellation().cancelled() => Err(FlowError::Cancelled),
            result = self.step.execute(input, context, &mut scope) => result,
        };

        match outcome {
            Ok(output) => {
                self.boundary.complete(scope, context).await?;
                Ok(output)
            }
            Err(err) => {
                self.boundary.abort(scope, context, &err).await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<S, B> ExecuteFlow<S::Input, S::Output> for Flow<S, B>
where
    B: ExecutionBoundary + 'static,
    S: FlowStep<B::Scope> + 'static,
{
    fn flow_name(&self) -> &FlowName {
        &self.name
    }

    async fn execute_flow(
        &self,
        input: S::Input,
        invocation: Invocation,
    ) -> Result<S::Output, FlowError> {
        self.execute_with(input, invocation).await
    }
}

/// Assembles a [`Flow`], checking its configuration and collaborators
pub struct FlowBuilder<S, B = NonTransactional> {
    name: String,
    tracer: Option<Arc<dyn FlowTracer>>,
    step: Option<S>,
    boundary: B,
}

impl<S> FlowBuilder<S, NonTransactional> {
    /// Start building a non-transactional flow called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracer: None,
            step: None,
            boundary: NonTransactional,
        }
    }
}

impl<S, B> FlowBuilder<S, B> {
    /// Tracing sink for spans and conversation ids (required)
    pub fn tracer(mut self, tracer: Arc<dyn FlowTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Business step (required)
    pub fn step(mut self, step: S) -> Self {
        self.step = Some(step);
        self
    }

    /// Run the step inside transactions begun by `provider`
    pub fn transactional<P: TransactionProvider>(
        self,
        provider: Arc<P>,
    ) -> FlowBuilder<S, Transactional<P>> {
        self.with_boundary(Transactional::new(provider))
    }

    /// Run the step with no ambient transaction
    pub fn non_transactional(self) -> FlowBuilder<S, NonTransactional> {
        self.with_boundary(NonTransactional)
    }

    /// Use a custom execution boundary
    pub fn with_boundary<B2: ExecutionBoundary>(self, boundary: B2) -> FlowBuilder<S, B2> {
        FlowBuilder {
            name: self.name,
            tracer: self.tracer,
            step: self.step,
            boundary,
        }
    }

    /// Validate the configuration and produce the flow
    pub fn build(self) -> Result<Flow<S, B>, FlowError>
    where
        B: ExecutionBoundary,
        S: FlowStep<B::Scope>,
    {
        let name = FlowName::new(self.name)?;
        let tracer = self.tracer.ok_or(FlowError::MissingDependency("tracer"))?;
        let step = self.step.ok_or(FlowError::MissingDependency("step"))?;

        Ok(Flow {
            name,
            tracer,
            step,
            boundary: self.boundary,
        })
    }
}
