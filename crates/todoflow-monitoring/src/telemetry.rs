//! Flow tracing backed by the `tracing` crate.
//!
//! Every flow invocation becomes an `info`-level span named `flow`. The
//! outcome fields are declared empty on open and recorded on completion, so
//! subscribers see them on the span close event. The flow runs its step
//! inside the span, so step logs and child spans nest under it.

use std::time::Instant;

use todoflow_core::domain::telemetry::{ATTR_CONVERSATION_ID, ATTR_FAILURE_KIND};
use todoflow_core::{FlowName, FlowSpan, FlowTracer, SpanAttributes, SpanOutcome};
use tracing::field::Empty;
use tracing::{debug, info_span, Span};

/// [`FlowTracer`] that opens `tracing` spans
#[derive(Debug, Clone)]
pub struct TracingFlowTracer {
    service_name: String,
}

impl TracingFlowTracer {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Default for TracingFlowTracer {
    fn default() -> Self {
        Self::new("todoflow")
    }
}

impl FlowTracer for TracingFlowTracer {
    fn open_span(&self, name: &FlowName, attributes: &SpanAttributes) -> Box<dyn FlowSpan> {
        let conversation_id = attributes
            .get(ATTR_CONVERSATION_ID)
            .map(String::as_str)
            .unwrap_or_default();

        let span = info_span!(
            "flow",
            service.name = %self.service_name,
            flow.name = %name,
            conversation.id = %conversation_id,
            outcome = Empty,
            failure.kind = Empty,
            elapsed_ms = Empty,
        );

        Box::new(TracingFlowSpan {
            span,
            started: Instant::now(),
        })
    }
}

struct TracingFlowSpan {
    span: Span,
    started: Instant,
}

impl FlowSpan for TracingFlowSpan {
    fn complete(self: Box<Self>, outcome: SpanOutcome, attributes: &SpanAttributes) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;

        self.span.record("outcome", outcome.as_label());
        if let Some(kind) = attributes.get(ATTR_FAILURE_KIND) {
            self.span.record("failure.kind", kind.as_str());
        }
        self.span.record("elapsed_ms", elapsed_ms);

        debug!(parent: &self.span, outcome = outcome.as_label(), "Flow span closed");
    }

    fn tracing_span(&self) -> Span {
        self.span.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use todoflow_core::{ConversationId, FailureKind, SpanGuard};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::registry::LookupSpan;

    type Fields = BTreeMap<String, String>;

    struct FieldVisitor<'a>(&'a mut Fields);

    impl Visit for FieldVisitor<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_u64(&mut self, field: &Field, value: u64) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    #[derive(Clone, Default)]
    struct CaptureLayer {
        open: Arc<Mutex<HashMap<u64, Fields>>>,
        closed: Arc<Mutex<Vec<Fields>>>,
    }

    impl<S> Layer<S> for CaptureLayer
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
            let mut fields = Fields::new();
            attrs.record(&mut FieldVisitor(&mut fields));
            self.open.lock().unwrap().insert(id.into_u64(), fields);
        }

        fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
            if let Some(fields) = self.open.lock().unwrap().get_mut(&id.into_u64()) {
                values.record(&mut FieldVisitor(fields));
            }
        }

        fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
            if let Some(fields) = self.open.lock().unwrap().remove(&id.into_u64()) {
                self.closed.lock().unwrap().push(fields);
            }
        }
    }

    fn capture<F: FnOnce()>(f: F) -> Vec<Fields> {
        let layer = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(layer.clone());
        tracing::subscriber::with_default(subscriber, f);
        let closed = layer.closed.lock().unwrap().clone();
        closed
    }

    #[test]
    fn test_success_records_outcome_on_close() {
        let tracer = TracingFlowTracer::new("todoflow-test");
        let name = FlowName::new("Todo/GetTodoItems").unwrap();
        let conversation_id = ConversationId::new();

        let closed = capture(|| {
            SpanGuard::open(&tracer, &name, &conversation_id).finish(SpanOutcome::Succeeded);
        });

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0]["flow.name"], "Todo/GetTodoItems");
        assert_eq!(closed[0]["conversation.id"], conversation_id.to_string());
        assert_eq!(closed[0]["service.name"], "todoflow-test");
        assert_eq!(closed[0]["outcome"], "succeeded");
        assert!(!closed[0].contains_key("failure.kind"));
        assert!(closed[0].contains_key("elapsed_ms"));
    }

    #[test]
    fn test_failure_records_kind() {
        let tracer = TracingFlowTracer::default();
        let name = FlowName::new("Security/GenerateJwt").unwrap();

        let closed = capture(|| {
            SpanGuard::open(&tracer, &name, &ConversationId::new())
                .finish(SpanOutcome::Failed(FailureKind::StepFailure));
        });

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0]["outcome"], "failed");
        assert_eq!(closed[0]["failure.kind"], "step_failure");
    }

    #[test]
    fn test_dropped_guard_closes_as_cancelled() {
        let tracer = TracingFlowTracer::default();
        let name = FlowName::new("Todo/AddTodoItem").unwrap();

        let closed = capture(|| {
            let _guard = SpanGuard::open(&tracer, &name, &ConversationId::new());
        });

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0]["failure.kind"], "cancelled");
    }

    #[test]
    fn test_guard_exposes_flow_span_for_instrumentation() {
        let tracer = TracingFlowTracer::default();
        let name = FlowName::new("Todo/GetTodoItem").unwrap();

        let closed = capture(|| {
            let guard = SpanGuard::open(&tracer, &name, &ConversationId::new());
            let span = guard.tracing_span();
            assert_eq!(span.metadata().map(|m| m.name()), Some("flow"));
            span.in_scope(|| debug!("inside"));
            guard.finish(SpanOutcome::Succeeded);
        });

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0]["outcome"], "succeeded");
    }
}
