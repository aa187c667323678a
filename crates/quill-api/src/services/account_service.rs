//! Account registration, login, and lookup.

use std::sync::Arc;

use tracing::{debug, info};

use quill_core::{
    Account, AccountRepository, Error, LoginRequest, LoginResponse, NewAccount, RegisterRequest,
    Result,
};

use crate::auth::{issue_token, AuthConfig};

/// Thin service over the account store: hashes passwords on the way in,
/// verifies them and issues tokens on login.
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    auth: AuthConfig,
}

impl AccountService {
    pub fn new(accounts: Arc<dyn AccountRepository>, auth: AuthConfig) -> Self {
        Self { accounts, auth }
    }

    /// Register a new account. The password is bcrypt-hashed before it
    /// reaches the store.
    pub async fn register(&self, req: RegisterRequest) -> Result<i64> {
        if req.username.is_empty() || req.password.is_empty() {
            return Err(Error::InvalidInput(
                "username and password must not be empty".to_string(),
            ));
        }

        let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;

        let id = self
            .accounts
            .create(NewAccount {
                name: req.name,
                username: req.username.clone(),
                email: req.email,
                password_hash,
            })
            .await?;

        info!(
            subsystem = "service",
            component = "account_service",
            op = "register",
            account_id = id,
            "Account registered"
        );
        Ok(id)
    }

    /// Verify credentials and issue an access token.
    ///
    /// Unknown username and wrong password are indistinguishable to the
    /// caller.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse> {
        let account = self
            .accounts
            .find_by_username(&req.username)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => invalid_credentials(),
                other => other,
            })?;

        let valid = bcrypt::verify(&req.password, &account.password_hash)
            .map_err(|e| Error::Internal(format!("password verification failed: {}", e)))?;
        if !valid {
            debug!(
                subsystem = "service",
                component = "account_service",
                op = "login",
                account_id = account.id,
                "Password mismatch"
            );
            return Err(invalid_credentials());
        }

        let token = issue_token(account.id, &self.auth)?;
        Ok(LoginResponse {
            token,
            name: account.name,
            username: account.username,
            email: account.email,
        })
    }

    /// Fetch an account by id.
    pub async fn get(&self, account_id: i64) -> Result<Account> {
        self.accounts.find_by_id(account_id).await
    }
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("invalid username or password".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::decode_token;
    use crate::services::mem::MemAccountRepository;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemAccountRepository::default()),
            AuthConfig::new("test-secret".to_string()),
        )
    }

    fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            username: username.to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let svc = service();
        let id = svc.register(register_request("ada")).await.unwrap();

        let account = svc.get(id).await.unwrap();
        assert_ne!(account.password_hash, "hunter22");
        assert!(bcrypt::verify("hunter22", &account.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let svc = service();
        svc.register(register_request("ada")).await.unwrap();

        let err = svc.register(register_request("ada")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn test_login_issues_token_for_account() {
        let svc = service();
        let id = svc.register(register_request("ada")).await.unwrap();

        let resp = svc
            .login(LoginRequest {
                username: "ada".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        let decoded = decode_token(&resp.token, &AuthConfig::new("test-secret".to_string()));
        assert_eq!(decoded.unwrap(), id);
        assert_eq!(resp.username, "ada");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let svc = service();
        svc.register(register_request("ada")).await.unwrap();

        let err = svc
            .login(LoginRequest {
                username: "ada".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_indistinguishable() {
        let svc = service();
        let err = svc
            .login(LoginRequest {
                username: "nobody".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }
}
