use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::AccountModel;

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    #[serde(default)]
    pub link: bool,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountSummary {
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AccountModel> for AccountSummary {
    fn from(account: &AccountModel) -> Self {
        Self {
            provider: account.provider.clone(),
            created_at: account.created_at,
        }
    }
}

/// Response for GET /api/users/me/accounts
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkedAccountsResponse {
    pub has_password: bool,
    pub accounts: Vec<AccountSummary>,
}
