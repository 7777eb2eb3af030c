use async_trait::async_trait;
use std::sync::Arc;
use todoflow_core::{FlowError, FlowExecutionContext, FlowStep, NoTransaction, StepError};
use tracing::debug;

use crate::auth::{TokenIssuer, UserDirectory};
use crate::model::{Credentials, IssuedToken};

/// Exchanges credentials for a signed token
pub struct GenerateJwtStep {
    users: Arc<dyn UserDirectory>,
    issuer: Arc<dyn TokenIssuer>,
}

impl GenerateJwtStep {
    pub fn new(users: Arc<dyn UserDirectory>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self { users, issuer }
    }
}

#[async_trait]
impl FlowStep for GenerateJwtStep {
    type Input = Credentials;
    type Output = IssuedToken;

    async fn execute(
        &self,
        input: Credentials,
        _context: &FlowExecutionContext,
        _scope: &mut NoTransaction,
    ) -> Result<IssuedToken, FlowError> {
        let principal = self
            .users
            .authenticate(&input.username, &input.password)
            .await
            .ok_or_else(|| StepError::new("invalid_credentials", "username or password is incorrect"))?;

        let token = self
            .issuer
            .issue(&principal)
            .map_err(|e| StepError::new("token_issue_failed", e.to_string()))?;

        debug!(username = %input.username, "Issued access token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MockTokenIssuer, MockUserDirectory, TokenError};
    use crate::steps::test_context;
    use todoflow_core::Principal;

    fn context() -> FlowExecutionContext {
        test_context("Security/GenerateJwt", Principal::anonymous())
    }

    fn token() -> IssuedToken {
        IssuedToken {
            access_token: "signed".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 60,
        }
    }

    #[tokio::test]
    async fn test_valid_credentials_issue_token() {
        let mut users = MockUserDirectory::new();
        users
            .expect_authenticate()
            .withf(|username, password| username == "ada" && password == "lovelace")
            .times(1)
            .returning(|_, _| Some(Principal::new("ada")));
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_issue()
            .withf(|principal| principal.subject() == Some("ada"))
            .times(1)
            .returning(|_| Ok(token()));

        let step = GenerateJwtStep::new(Arc::new(users), Arc::new(issuer));
        let issued = step
            .execute(Credentials::new("ada", "lovelace"), &context(), &mut NoTransaction)
            .await
            .unwrap();

        assert_eq!(issued, token());
    }

    #[tokio::test]
    async fn test_unknown_user_is_invalid_credentials() {
        let mut users = MockUserDirectory::new();
        users.expect_authenticate().returning(|_, _| None);
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_issue().never();

        let step = GenerateJwtStep::new(Arc::new(users), Arc::new(issuer));
        let err = step
            .execute(Credentials::new("ada", "wrong"), &context(), &mut NoTransaction)
            .await
            .unwrap_err();

        match err {
            FlowError::Step(step_error) => assert_eq!(step_error.code, "invalid_credentials"),
            other => panic!("Expected step failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_issuer_failure_is_step_failure() {
        let mut users = MockUserDirectory::new();
        users
            .expect_authenticate()
            .returning(|_, _| Some(Principal::new("ada")));
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_issue()
            .returning(|_| Err(TokenError::Encode("key rejected".to_string())));

        let step = GenerateJwtStep::new(Arc::new(users), Arc::new(issuer));
        let err = step
            .execute(Credentials::new("ada", "lovelace"), &context(), &mut NoTransaction)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FlowError::Step(StepError::new(
                "token_issue_failed",
                "failed to encode token: key rejected"
            ))
        );
    }
}
