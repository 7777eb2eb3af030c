//! Tracing sink contract consumed by flows
//!
//! The framework never talks to a tracing backend directly. Each flow is
//! handed a [`FlowTracer`] at construction; the tracer opens one
//! [`FlowSpan`] per invocation and the flow completes it exactly once through
//! a [`SpanGuard`].

use std::collections::BTreeMap;
use tracing::Span;

use crate::error::FailureKind;
use crate::types::{ConversationId, FlowName};

/// Span attribute carrying the flow name
pub const ATTR_FLOW_NAME: &str = "flow.name";
/// Span attribute carrying the conversation id
pub const ATTR_CONVERSATION_ID: &str = "conversation.id";
/// Span attribute carrying the terminal outcome
pub const ATTR_OUTCOME: &str = "outcome";
/// Span attribute carrying the failure kind label
pub const ATTR_FAILURE_KIND: &str = "failure.kind";

/// Key/value attributes attached to a span
pub type SpanAttributes = BTreeMap<String, String>;

/// Terminal outcome recorded on a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanOutcome {
    /// Invocation returned an output
    Succeeded,
    /// Invocation failed with the given kind
    Failed(FailureKind),
    /// The step panicked; the panic is propagated to the caller
    Panicked,
}

impl SpanOutcome {
    /// `succeeded`, `failed` or `panicked`
    pub fn as_label(&self) -> &'static str {
        match self {
            SpanOutcome::Succeeded => "succeeded",
            SpanOutcome::Failed(_) => "failed",
            SpanOutcome::Panicked => "panicked",
        }
    }

    /// Failure kind, if any
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SpanOutcome::Failed(kind) => Some(*kind),
            SpanOutcome::Succeeded | SpanOutcome::Panicked => None,
        }
    }

    /// Completion attributes for this outcome
    pub fn attributes(&self) -> SpanAttributes {
        let mut attributes = SpanAttributes::new();
        attributes.insert(ATTR_OUTCOME.to_string(), self.as_label().to_string());
        if let Some(kind) = self.failure_kind() {
            attributes.insert(ATTR_FAILURE_KIND.to_string(), kind.as_label().to_string());
        }
        attributes
    }
}

/// A span bounding one flow invocation
pub trait FlowSpan: Send {
    /// Close the span. Called exactly once.
    fn complete(self: Box<Self>, outcome: SpanOutcome, attributes: &SpanAttributes);

    /// `tracing` span the invocation runs inside, so step logs and child
    /// spans nest under it. Sinks without one return [`Span::none`].
    fn tracing_span(&self) -> Span {
        Span::none()
    }
}

/// Provider of spans and conversation ids
pub trait FlowTracer: Send + Sync {
    /// Open a span for a flow invocation
    fn open_span(&self, name: &FlowName, attributes: &SpanAttributes) -> Box<dyn FlowSpan>;

    /// Generate a conversation id for invocations that arrive without one
    fn new_conversation_id(&self) -> ConversationId {
        ConversationId::new()
    }
}

/// Owns an open span and guarantees it is completed exactly once.
///
/// If the guard is dropped without an explicit outcome the span is completed
/// as cancelled (the invocation future was dropped mid-flight), or as
/// panicked when the drop happens during unwinding.
pub struct SpanGuard {
    span: Option<Box<dyn FlowSpan>>,
}

impl SpanGuard {
    /// Open a span tagged with the flow name and conversation id
    pub fn open(tracer: &dyn FlowTracer, name: &FlowName, conversation_id: &ConversationId) -> Self {
        let mut attributes = SpanAttributes::new();
        attributes.insert(ATTR_FLOW_NAME.to_string(), name.to_string());
        attributes.insert(ATTR_CONVERSATION_ID.to_string(), conversation_id.to_string());

        Self {
            span: Some(tracer.open_span(name, &attributes)),
        }
    }

    /// The sink's `tracing` span, [`Span::none`] once closed
    pub fn tracing_span(&self) -> Span {
        self.span
            .as_ref()
            .map(|span| span.tracing_span())
            .unwrap_or_else(Span::none)
    }

    /// Complete the span with `outcome`
    pub fn finish(mut self, outcome: SpanOutcome) {
        self.close(outcome);
    }

    fn close(&mut self, outcome: SpanOutcome) {
        if let Some(span) = self.span.take() {
            let attributes = outcome.attributes();
            span.complete(outcome, &attributes);
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.close(SpanOutcome::Panicked);
        } else {
            self.close(SpanOutcome::Failed(FailureKind::Cancelled));
        }
    }
}
