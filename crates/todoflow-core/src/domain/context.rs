use tokio_util::sync::CancellationToken;

use crate::types::{ConversationId, FlowName, Principal};

/// What a caller hands to a flow besides the input payload
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Identity initiating the flow
    pub principal: Principal,
    /// Conversation to join; a new one is generated when absent
    pub conversation_id: Option<ConversationId>,
    /// Token the caller cancels to abort the invocation
    pub cancellation: Option<CancellationToken>,
}

impl Invocation {
    /// Invocation on behalf of `principal` with a fresh conversation
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            conversation_id: None,
            cancellation: None,
        }
    }

    /// Join an existing conversation
    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Make the invocation cancellable through `token`
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl From<Principal> for Invocation {
    fn from(principal: Principal) -> Self {
        Self::new(principal)
    }
}

/// Per-invocation bundle handed to a flow step.
///
/// Created fresh for every call and never shared between invocations.
#[derive(Debug, Clone)]
pub struct FlowExecutionContext {
    flow_name: FlowName,
    conversation_id: ConversationId,
    principal: Principal,
    cancellation: CancellationToken,
}

impl FlowExecutionContext {
    pub fn new(
        flow_name: FlowName,
        conversation_id: ConversationId,
        principal: Principal,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            flow_name,
            conversation_id,
            principal,
            cancellation,
        }
    }

    pub fn flow_name(&self) -> &FlowName {
        &self.flow_name
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Token tripped when the caller cancels the invocation
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
