use async_trait::async_trait;

use crate::AuthError;

/// Storage key of the account-less local dataset.
pub const LOCAL_ACCOUNT_KEY: &str = "local-user";

/// Display identity of the account-less local user.
pub const LOCAL_USER_EMAIL: &str = "Yerel Hesap";

/// Descriptor of the signed-in user. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub is_logged_in: bool,
}

impl User {
    #[must_use]
    pub fn local() -> Self {
        Self {
            email: LOCAL_USER_EMAIL.to_string(),
            is_logged_in: false,
        }
    }

    #[must_use]
    pub fn with_identifier(identifier: &str) -> Self {
        Self {
            email: identifier.to_string(),
            is_logged_in: true,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.email == LOCAL_USER_EMAIL
    }
}

impl Default for User {
    fn default() -> Self {
        Self::local()
    }
}

string_id!(AccountID);

/// Account issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudAccount {
    pub id: AccountID,
    pub email: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// The account of a still valid earlier sign-in, if any.
    async fn current_account(&self) -> Result<Option<CloudAccount>, AuthError>;
    async fn sign_in(&self) -> Result<CloudAccount, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}
