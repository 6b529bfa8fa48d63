use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use rand::{distr::Alphanumeric, Rng};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    service::AccountLinkService,
    types::{AuthorizeQuery, CallbackQuery, LinkedAccountsResponse},
};
use crate::session::{
    cookies::{flow_cookie, removal_cookie, session_cookie, OAUTH_LINK_COOKIE, OAUTH_STATE_COOKIE},
    middleware::optional_claims,
    types::SessionClaims,
};
use crate::shared::{AppError, AppState};

const STATE_LENGTH: usize = 32;

fn link_service(state: &AppState) -> AccountLinkService {
    AccountLinkService::new(
        Arc::clone(&state.account_repository),
        Arc::clone(&state.user_repository),
    )
}

fn random_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// GET /api/auth/oauth/:provider
///
/// Redirects to the provider. With `?link=true` the signed-in caller is
/// remembered in a short-lived cookie so the callback links instead of signing in.
#[instrument(name = "oauth_authorize", skip(state, headers, jar))]
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<AuthorizeQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let client = state.oauth_providers.get(&provider)?;
    let secure = state.config.cookie_secure;

    let oauth_state = random_state();
    let url = client.authorize_url(&oauth_state, &state.config.oauth_callback_url(&provider))?;
    let mut jar = jar.add(flow_cookie(OAUTH_STATE_COOKIE, oauth_state, secure));

    if query.link {
        let claims = optional_claims(&state, &headers)
            .await
            .ok_or_else(AppError::unauthenticated)?;
        let link_token = state
            .token_config
            .create_link_token(&claims.user_id, &provider)?;
        jar = jar.add(flow_cookie(OAUTH_LINK_COOKIE, link_token, secure));
        info!(user_id = %claims.user_id, provider = %provider, "Starting account link");
    } else {
        jar = jar.remove(removal_cookie(OAUTH_LINK_COOKIE));
    }

    Ok((jar, Redirect::to(&url)))
}

enum CallbackOutcome {
    Linked,
    SignedIn { token: String, needs_onboarding: bool },
}

/// GET /api/auth/oauth/:provider/callback
#[instrument(name = "oauth_callback", skip(state, query, jar))]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), (CookieJar, AppError)> {
    // The flow cookies are single-use whatever the outcome
    let cleared = jar
        .clone()
        .remove(removal_cookie(OAUTH_STATE_COOKIE))
        .remove(removal_cookie(OAUTH_LINK_COOKIE));

    match complete_callback(&state, &provider, query, &jar).await {
        Ok(CallbackOutcome::Linked) => Ok((
            cleared,
            Redirect::to(&format!("/settings/accounts?linked={provider}")),
        )),
        Ok(CallbackOutcome::SignedIn {
            token,
            needs_onboarding,
        }) => {
            let target = if needs_onboarding {
                "/onboarding"
            } else {
                "/dashboard"
            };
            Ok((
                cleared.add(session_cookie(token, state.config.cookie_secure)),
                Redirect::to(target),
            ))
        }
        Err(e) => Err((cleared, e)),
    }
}

async fn complete_callback(
    state: &AppState,
    provider: &str,
    query: CallbackQuery,
    jar: &CookieJar,
) -> Result<CallbackOutcome, AppError> {
    if let Some(error) = query.error {
        warn!(provider = %provider, error = %error, "Provider returned an error");
        return Err(AppError::BadRequest(
            "認証がキャンセルされました".to_string(),
        ));
    }

    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Err(AppError::BadRequest("認証パラメータが不足しています".to_string()));
    };
    if expected_state.as_deref() != Some(returned_state.as_str()) {
        warn!(provider = %provider, "OAuth state mismatch");
        return Err(AppError::BadRequest("認証状態が一致しません".to_string()));
    }

    let client = state.oauth_providers.get(provider)?;
    let profile = client
        .exchange_code(&code, &state.config.oauth_callback_url(provider))
        .await?;
    let service = link_service(state);

    // A link cookie that no longer validates must not fall through to sign-in
    let link_claims = match jar.get(OAUTH_LINK_COOKIE).filter(|c| !c.value().is_empty()) {
        Some(cookie) => Some(
            state
                .token_config
                .validate_link_token(cookie.value())
                .map_err(|e| {
                    warn!(provider = %provider, error = %e, "Invalid account link token");
                    AppError::BadRequest(
                        "連携の有効期限が切れました。もう一度お試しください".to_string(),
                    )
                })?,
        ),
        None => None,
    };

    if let Some(link) = link_claims {
        if link.provider != provider {
            return Err(AppError::BadRequest("認証状態が一致しません".to_string()));
        }
        service.link(&link.user_id, provider, &profile).await?;
        return Ok(CallbackOutcome::Linked);
    }

    let signed_in = service.sign_in(provider, &profile).await?;
    let token = state
        .session_service
        .issue_session(&signed_in.user.id)
        .await?;

    Ok(CallbackOutcome::SignedIn {
        token,
        needs_onboarding: signed_in.user.roles().is_empty(),
    })
}

/// GET /api/users/me/accounts
#[instrument(name = "list_accounts", skip(state, claims))]
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<LinkedAccountsResponse>, AppError> {
    let accounts = link_service(&state).list_accounts(&claims.user_id).await?;
    Ok(Json(accounts))
}

/// DELETE /api/users/me/accounts/:provider
#[instrument(name = "unlink_account", skip(state, claims))]
pub async fn unlink_account(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(provider): Path<String>,
) -> Result<StatusCode, AppError> {
    link_service(&state)
        .unlink(&claims.user_id, &provider)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
