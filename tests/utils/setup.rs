use axum::Router;
use std::sync::Arc;

use spacematch::{
    config::AppConfig,
    notification::RecordingEmailSender,
    oauth::{provider::StaticOAuthClient, OAuthProviders},
    router, AppState,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub state: AppState,
    pub emails: Arc<RecordingEmailSender>,
}

impl TestSetup {
    /// Grants administrator rights directly in the repository
    pub async fn make_admin(&self, user_id: &str) {
        let mut user = self
            .state
            .user_repository
            .get_user(user_id)
            .await
            .unwrap()
            .unwrap();
        user.is_admin = true;
        self.state.user_repository.update_user(&user).await.unwrap();
    }
}

pub struct TestSetupBuilder {
    providers: OAuthProviders,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            providers: OAuthProviders::new(),
        }
    }

    pub fn with_oauth_client(mut self, client: StaticOAuthClient) -> Self {
        self.providers.register(Arc::new(client));
        self
    }

    pub fn build(self) -> TestSetup {
        let emails = Arc::new(RecordingEmailSender::new());
        let state = AppState::in_memory(AppConfig::default(), emails.clone(), self.providers);
        TestSetup {
            app: router(state.clone()),
            state,
            emails,
        }
    }
}
