use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::FlowError;

/// Identifier of a flow, e.g. `Security/GenerateJwt`.
///
/// Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FlowName(String);

impl FlowName {
    /// Create a flow name, rejecting empty or whitespace-only values
    pub fn new(name: impl Into<String>) -> Result<Self, FlowError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FlowError::InvalidConfiguration(
                "flow name must not be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Borrow the name as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FlowName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Correlation identifier shared by every flow triggered by one external request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Generate a fresh random conversation id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// The authenticated identity on whose behalf a flow executes.
///
/// Supplied by the caller; flows never construct one for themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject: Option<String>,
    display_name: Option<String>,
    roles: BTreeSet<String>,
    scopes: BTreeSet<String>,
}

impl Principal {
    /// Principal for an authenticated subject
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            display_name: None,
            roles: BTreeSet::new(),
            scopes: BTreeSet::new(),
        }
    }

    /// Principal carrying no identity
    pub fn anonymous() -> Self {
        Self {
            subject: None,
            display_name: None,
            roles: BTreeSet::new(),
            scopes: BTreeSet::new(),
        }
    }

    /// Attach a display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Attach a role claim
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Attach a scope claim
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    /// Subject id, `None` when anonymous
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Display name if one was asserted
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Whether a subject was asserted
    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_name_rejects_blank() {
        for name in ["", "   ", "\t\n"] {
            let err = FlowName::new(name).unwrap_err();
            assert!(matches!(err, FlowError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_flow_name_keeps_value() {
        let name = FlowName::new("Security/GenerateJwt").unwrap();
        assert_eq!(name.as_str(), "Security/GenerateJwt");
        assert_eq!(name.to_string(), "Security/GenerateJwt");
    }

    #[test]
    fn test_conversation_id_parse() {
        let id = ConversationId::new();
        let parsed: ConversationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ConversationId>().is_err());
    }

    #[test]
    fn test_conversation_ids_are_unique() {
        assert_ne!(ConversationId::new(), ConversationId::new());
    }

    #[test]
    fn test_principal_claims() {
        let principal = Principal::new("user-1")
            .with_display_name("Ada")
            .with_role("admin")
            .with_scope("todo:write");

        assert!(principal.is_authenticated());
        assert_eq!(principal.subject(), Some("user-1"));
        assert_eq!(principal.display_name(), Some("Ada"));
        assert!(principal.has_role("admin"));
        assert!(!principal.has_role("owner"));
        assert!(principal.has_scope("todo:write"));
        assert_eq!(principal.roles().collect::<Vec<_>>(), vec!["admin"]);
    }

    #[test]
    fn test_anonymous_principal() {
        let principal = Principal::anonymous();
        assert!(!principal.is_authenticated());
        assert_eq!(principal.subject(), None);
    }
}
