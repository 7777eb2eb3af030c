//! Credential checks and JWT issuing
//!
//! [`UserDirectory`] and [`TokenIssuer`] are the collaborators of the
//! `Security/GenerateJwt` flow. The in-memory directory and the HS256
//! issuer are the implementations wired by the server.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use todoflow_core::Principal;

use crate::model::IssuedToken;

#[cfg(test)]
use mockall::automock;

/// Errors raised while issuing or verifying tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("failed to encode token: {0}")]
    Encode(String),

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Looks up users by credentials
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The principal for `username` if `password` matches
    async fn authenticate(&self, username: &str, password: &str) -> Option<Principal>;
}

/// Turns an authenticated principal into a bearer token
#[cfg_attr(test, automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, TokenError>;
}

struct UserRecord {
    password: String,
    principal: Principal,
}

/// Fixed set of users held in memory
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user; the principal's subject is the username
    pub fn with_user(mut self, username: &str, password: &str, roles: &[&str]) -> Self {
        let principal = roles
            .iter()
            .fold(Principal::new(username).with_display_name(username), |p, role| {
                p.with_role(*role)
            });
        self.users.insert(
            username.to_string(),
            UserRecord {
                password: password.to_string(),
                principal,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl fmt::Debug for InMemoryUserDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryUserDirectory")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Option<Principal> {
        self.users
            .get(username)
            .filter(|record| record.password == password)
            .map(|record| record.principal.clone())
    }
}

/// JWT claims carried by issued tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 token issuer
pub struct JwtTokenIssuer {
    secret: String,
    issuer: String,
    audience: String,
    expiry_seconds: u64,
}

impl JwtTokenIssuer {
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiry_seconds: u64,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            expiry_seconds,
        }
    }

    /// Decode `token` and rebuild the principal it was issued for
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        let claims = data.claims;
        let mut principal = Principal::new(claims.sub);
        if let Some(name) = claims.name {
            principal = principal.with_display_name(name);
        }
        principal = claims
            .roles
            .into_iter()
            .fold(principal, |p, role| p.with_role(role));
        Ok(claims
            .scopes
            .into_iter()
            .fold(principal, |p, scope| p.with_scope(scope)))
    }
}

impl fmt::Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenIssuer")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, TokenError> {
        let subject = principal
            .subject()
            .ok_or_else(|| TokenError::Encode("principal has no subject".to_string()))?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            name: principal.display_name().map(str::to_string),
            roles: principal.roles().map(str::to_string).collect(),
            scopes: principal.scopes().map(str::to_string).collect(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.expiry_seconds as i64,
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encode(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.expiry_seconds,
        })
    }
}
