use tracing::{info, warn};

/// Credentials and endpoints for one OAuth identity provider
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub session_expiration_days: i64,
    pub base_url: String,
    pub cookie_secure: bool,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub oauth_providers: Vec<OAuthProviderConfig>,
}

impl AppConfig {
    /// Loads configuration, reading a `.env` file first when one exists
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using development secret");
            "your-secret-key-change-in-production".to_string()
        });

        let session_expiration_days = std::env::var("SESSION_EXPIRATION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mut oauth_providers = Vec::new();
        if let Some(google) = Self::google_from_env() {
            oauth_providers.push(google);
        }
        if let Some(line) = Self::line_from_env() {
            oauth_providers.push(line);
        }

        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret,
            session_expiration_days,
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            resend_api_key: std::env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty()),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@spacematch.jp".to_string()),
            base_url,
            oauth_providers,
        }
    }

    fn google_from_env() -> Option<OAuthProviderConfig> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        Some(OAuthProviderConfig {
            name: "google".to_string(),
            client_id,
            client_secret,
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        })
    }

    fn line_from_env() -> Option<OAuthProviderConfig> {
        let client_id = std::env::var("LINE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("LINE_CLIENT_SECRET").ok()?;
        Some(OAuthProviderConfig {
            name: "line".to_string(),
            client_id,
            client_secret,
            authorize_url: "https://access.line.me/oauth2/v2.1/authorize".to_string(),
            token_url: "https://api.line.me/oauth2/v2.1/token".to_string(),
            userinfo_url: "https://api.line.me/oauth2/v2.1/userinfo".to_string(),
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
        })
    }

    /// Redirect URI registered with the provider for the OAuth callback
    pub fn oauth_callback_url(&self, provider: &str) -> String {
        format!(
            "{}/api/auth/oauth/{}/callback",
            self.base_url.trim_end_matches('/'),
            provider
        )
    }
}

impl Default for AppConfig {
    /// Development defaults: in-memory storage, logging email sender, no OAuth providers
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: "development-secret".to_string(),
            session_expiration_days: 30,
            base_url: "http://localhost:3000".to_string(),
            cookie_secure: false,
            resend_api_key: None,
            email_from: "noreply@example.com".to_string(),
            oauth_providers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_callback_url_strips_trailing_slash() {
        let mut config = AppConfig::default();
        config.base_url = "https://example.jp/".to_string();
        assert_eq!(
            config.oauth_callback_url("google"),
            "https://example.jp/api/auth/oauth/google/callback"
        );
    }
}
