use async_trait::async_trait;
use std::sync::Arc;
use todoflow_core::{
    FlowBuilder, FlowError, FlowExecutionContext, FlowStep, NoTransaction, Principal,
};
use todoflow_monitoring::{init_test_tracing, TracingFlowTracer};
use tracing::Span;

struct Greet;

#[async_trait]
impl FlowStep for Greet {
    type Input = ();
    type Output = String;

    async fn execute(
        &self,
        _input: (),
        context: &FlowExecutionContext,
        _scope: &mut NoTransaction,
    ) -> Result<String, FlowError> {
        Ok(format!(
            "hello {}",
            context.principal().subject().unwrap_or("anonymous")
        ))
    }
}

#[tokio::test]
async fn flow_runs_under_tracing_tracer() {
    init_test_tracing();

    let flow = FlowBuilder::new("Demo/Greet")
        .tracer(Arc::new(TracingFlowTracer::new("todoflow-test")))
        .step(Greet)
        .build()
        .unwrap();

    let greeting = flow.execute((), Principal::new("ada")).await.unwrap();

    assert_eq!(greeting, "hello ada");
}

/// Reports the span the step body runs in
struct CurrentSpan;

#[async_trait]
impl FlowStep for CurrentSpan {
    type Input = ();
    type Output = Option<&'static str>;

    async fn execute(
        &self,
        _input: (),
        _context: &FlowExecutionContext,
        _scope: &mut NoTransaction,
    ) -> Result<Self::Output, FlowError> {
        Ok(Span::current().metadata().map(|metadata| metadata.name()))
    }
}

#[tokio::test]
async fn step_runs_inside_its_flow_span() {
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());

    let flow = FlowBuilder::new("Demo/CurrentSpan")
        .tracer(Arc::new(TracingFlowTracer::new("todoflow-test")))
        .step(CurrentSpan)
        .build()
        .unwrap();

    let name = flow.execute((), Principal::new("ada")).await.unwrap();

    assert_eq!(name, Some("flow"));
    assert!(Span::current().metadata().is_none());
}
