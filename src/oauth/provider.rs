use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::{AppConfig, OAuthProviderConfig};
use crate::shared::AppError;

/// Identity returned by a provider after a successful code exchange
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    pub provider_account_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// An OAuth 2.0 / OpenID Connect identity provider
#[async_trait]
pub trait OAuthClient: Send + Sync {
    fn name(&self) -> &str;

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError>;

    async fn exchange_code(&self, code: &str, redirect_uri: &str)
        -> Result<OAuthProfile, AppError>;
}

/// Registry of configured providers, keyed by provider name
#[derive(Default)]
pub struct OAuthProviders {
    clients: HashMap<String, Arc<dyn OAuthClient>>,
}

impl OAuthProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP clients for every provider with credentials in the config
    pub fn from_config(config: &AppConfig) -> Self {
        let http = reqwest::Client::new();
        let mut providers = Self::new();
        for provider in &config.oauth_providers {
            providers.register(Arc::new(HttpOAuthClient::new(provider.clone(), http.clone())));
        }
        providers
    }

    pub fn register(&mut self, client: Arc<dyn OAuthClient>) {
        self.clients.insert(client.name().to_string(), client);
    }

    pub fn get(&self, provider: &str) -> Result<Arc<dyn OAuthClient>, AppError> {
        self.clients.get(provider).cloned().ok_or_else(|| {
            AppError::NotFound(format!("ログインプロバイダ「{provider}」は利用できません"))
        })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OpenID Connect userinfo payload; Google and LINE both use these claim names
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Authorization-code flow against a real provider over HTTPS
pub struct HttpOAuthClient {
    config: OAuthProviderConfig,
    http: reqwest::Client,
}

impl HttpOAuthClient {
    pub fn new(config: OAuthProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

fn external(provider: &str) -> impl Fn(reqwest::Error) -> AppError + '_ {
    move |e| {
        warn!(provider = %provider, error = %e, "OAuth provider request failed");
        AppError::External(format!("{provider}: {e}"))
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
        let scope = self.config.scopes.join(" ");
        Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map(String::from)
        .map_err(|e| {
            warn!(provider = %self.config.name, error = %e, "Invalid authorize URL");
            AppError::Internal
        })
    }

    #[instrument(skip(self, code), fields(provider = %self.config.name))]
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthProfile, AppError> {
        let provider = self.config.name.as_str();

        let token: TokenResponse = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(external(provider))?
            .json()
            .await
            .map_err(external(provider))?;
        debug!("Exchanged authorization code for access token");

        let info: UserInfo = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(external(provider))?
            .json()
            .await
            .map_err(external(provider))?;

        Ok(OAuthProfile {
            provider_account_id: info.sub,
            email: info.email,
            name: info.name,
            image: info.picture,
        })
    }
}

/// Provider with canned profiles keyed by authorization code. Used by tests and
/// local development where no real provider is reachable.
pub struct StaticOAuthClient {
    name: String,
    profiles: HashMap<String, OAuthProfile>,
}

impl StaticOAuthClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            profiles: HashMap::new(),
        }
    }

    pub fn with_profile(mut self, code: &str, profile: OAuthProfile) -> Self {
        self.profiles.insert(code.to_string(), profile);
        self
    }
}

#[async_trait]
impl OAuthClient for StaticOAuthClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
        Url::parse_with_params(
            "https://provider.invalid/authorize",
            &[("state", state), ("redirect_uri", redirect_uri)],
        )
        .map(String::from)
        .map_err(|_| AppError::Internal)
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<OAuthProfile, AppError> {
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::External(format!("{}: unknown code", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google_config() -> OAuthProviderConfig {
        OAuthProviderConfig {
            name: "google".to_string(),
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            scopes: vec!["openid".to_string(), "email".to_string()],
        }
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let client = HttpOAuthClient::new(google_config(), reqwest::Client::new());
        let url = client
            .authorize_url("abc123", "http://localhost:3000/api/auth/oauth/google/callback")
            .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client id");
        assert_eq!(params["scope"], "openid email");
        assert_eq!(params["state"], "abc123");
        assert_eq!(params["response_type"], "code");
        assert!(url.contains("client+id") || url.contains("client%20id"));
    }

    #[test]
    fn test_registry_lookup() {
        let mut providers = OAuthProviders::new();
        providers.register(Arc::new(StaticOAuthClient::new("line")));

        assert!(providers.get("line").is_ok());
        assert!(matches!(providers.get("github"), Err(AppError::NotFound(_))));
        assert_eq!(providers.names(), vec!["line".to_string()]);
    }

    #[tokio::test]
    async fn test_static_client_exchange() {
        let profile = OAuthProfile {
            provider_account_id: "sub-1".to_string(),
            email: None,
            name: Some("LINE User".to_string()),
            image: None,
        };
        let client = StaticOAuthClient::new("line").with_profile("code-1", profile.clone());

        assert_eq!(client.exchange_code("code-1", "").await.unwrap(), profile);
        assert!(client.exchange_code("other", "").await.is_err());
    }
}
