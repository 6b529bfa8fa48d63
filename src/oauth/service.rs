use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::AccountModel,
    provider::OAuthProfile,
    repository::AccountRepository,
    types::{AccountSummary, LinkedAccountsResponse},
};
use crate::shared::AppError;
use crate::user::{models::UserModel, repository::UserRepository};

/// Outcome of signing in through a provider
#[derive(Debug)]
pub struct OAuthSignIn {
    pub user: UserModel,
    pub is_new_user: bool,
}

/// Outcome of linking a provider to an already signed-in user
#[derive(Debug, PartialEq)]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
}

/// Sign-in, linking and unlinking of provider accounts
pub struct AccountLinkService {
    account_repository: Arc<dyn AccountRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
}

impl AccountLinkService {
    pub fn new(
        account_repository: Arc<dyn AccountRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self {
            account_repository,
            user_repository,
        }
    }

    /// Resolves the provider identity to a user, creating one on first sign-in.
    /// An email that already belongs to another user is never linked implicitly.
    #[instrument(skip(self, profile), fields(provider_account_id = %profile.provider_account_id))]
    pub async fn sign_in(
        &self,
        provider: &str,
        profile: &OAuthProfile,
    ) -> Result<OAuthSignIn, AppError> {
        if let Some(account) = self
            .account_repository
            .find_by_provider_account(provider, &profile.provider_account_id)
            .await?
        {
            let user = self
                .user_repository
                .get_user(&account.user_id)
                .await?
                .ok_or_else(|| {
                    warn!(user_id = %account.user_id, "Linked account points at a missing user");
                    AppError::Internal
                })?;
            info!(user_id = %user.id, provider = %provider, "Signed in with linked account");
            return Ok(OAuthSignIn {
                user,
                is_new_user: false,
            });
        }

        let email = profile
            .email
            .clone()
            .unwrap_or_else(|| placeholder_email(provider, &profile.provider_account_id));

        if self.user_repository.get_user_by_email(&email).await?.is_some() {
            warn!(provider = %provider, "Provider email belongs to an existing user");
            return Err(AppError::Conflict(
                "このメールアドレスは既に別のログイン方法で登録されています。ログイン後、設定画面から連携してください".to_string(),
            ));
        }

        let name = profile
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "ユーザー".to_string());
        let mut user = UserModel::new(&email, name, &[]);
        user.image = profile.image.clone();
        self.user_repository.create_user(&user).await?;

        let account = AccountModel::new(&user.id, provider, &profile.provider_account_id);
        self.account_repository.create_account(&account).await?;

        info!(user_id = %user.id, provider = %provider, "Created user from provider sign-in");
        Ok(OAuthSignIn {
            user,
            is_new_user: true,
        })
    }

    /// Links a provider identity to `user_id`, refusing identities owned by someone else
    #[instrument(skip(self, profile))]
    pub async fn link(
        &self,
        user_id: &str,
        provider: &str,
        profile: &OAuthProfile,
    ) -> Result<LinkOutcome, AppError> {
        if let Some(existing) = self
            .account_repository
            .find_by_provider_account(provider, &profile.provider_account_id)
            .await?
        {
            if existing.user_id == user_id {
                info!(user_id = %user_id, provider = %provider, "Account already linked to this user");
                return Ok(LinkOutcome::AlreadyLinked);
            }
            warn!(
                user_id = %user_id,
                owner_id = %existing.user_id,
                provider = %provider,
                "Refusing to link an account owned by another user"
            );
            return Err(AppError::Conflict(
                "このアカウントは既に別のユーザーに連携されています".to_string(),
            ));
        }

        let accounts = self.account_repository.list_for_user(user_id).await?;
        if accounts.iter().any(|a| a.provider == provider) {
            return Err(AppError::Conflict(format!(
                "{provider}アカウントは既に連携されています"
            )));
        }

        let account = AccountModel::new(user_id, provider, &profile.provider_account_id);
        self.account_repository.create_account(&account).await?;

        info!(user_id = %user_id, provider = %provider, "Account linked");
        Ok(LinkOutcome::Linked)
    }

    pub async fn list_accounts(&self, user_id: &str) -> Result<LinkedAccountsResponse, AppError> {
        let user = self.require_user(user_id).await?;
        let accounts = self.account_repository.list_for_user(user_id).await?;

        Ok(LinkedAccountsResponse {
            has_password: user.has_password(),
            accounts: accounts.iter().map(AccountSummary::from).collect(),
        })
    }

    /// Removes a provider link. The last way to sign in can't be removed.
    #[instrument(skip(self))]
    pub async fn unlink(&self, user_id: &str, provider: &str) -> Result<(), AppError> {
        let user = self.require_user(user_id).await?;
        let accounts = self.account_repository.list_for_user(user_id).await?;

        if !accounts.iter().any(|a| a.provider == provider) {
            return Err(AppError::NotFound("連携が見つかりません".to_string()));
        }
        if !user.has_password() && accounts.len() <= 1 {
            warn!(user_id = %user_id, provider = %provider, "Refusing to unlink last login method");
            return Err(AppError::BadRequest(
                "最後のログイン方法は解除できません".to_string(),
            ));
        }

        self.account_repository
            .delete_for_user(user_id, provider)
            .await?;
        info!(user_id = %user_id, provider = %provider, "Account unlinked");
        Ok(())
    }

    async fn require_user(&self, user_id: &str) -> Result<UserModel, AppError> {
        self.user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("ユーザーが見つかりません".to_string()))
    }
}

/// Unique, undeliverable address for provider identities that share no email
fn placeholder_email(provider: &str, provider_account_id: &str) -> String {
    format!("{provider}-{provider_account_id}@users.noreply.invalid")
}
