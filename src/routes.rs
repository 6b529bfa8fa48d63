use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shared::AppState;
use crate::{
    admin, booking, favorite, message, oauth, pre_registration, review, session, space, store,
    user, verification,
};

/// Builds the full HTTP API.
///
/// Routes under `protected` run behind `require_session`; the admin routes
/// additionally run behind `require_admin`.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(|| async { "spacematch API" }))
        .route("/health", get(|| async { "ok" }))
        .route("/api/auth/register", post(session::register))
        .route("/api/auth/login", post(session::login))
        .route("/api/auth/oauth/:provider", get(oauth::authorize))
        .route("/api/auth/oauth/:provider/callback", get(oauth::callback))
        .route("/api/spaces", get(space::list_spaces))
        .route("/api/spaces/:id", get(space::get_space))
        .route("/api/stores", get(store::list_stores))
        .route("/api/stores/:id", get(store::get_store))
        .route("/api/users/:id", get(user::get_public_user))
        .route("/api/users/:id/reviews", get(review::list_user_reviews))
        .route("/api/pre-registrations", post(pre_registration::pre_register));

    let admin = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/verifications", get(admin::list_verifications))
        .route(
            "/api/admin/verifications/:id",
            patch(admin::review_verification),
        )
        .route(
            "/api/admin/pre-registrations",
            get(admin::list_pre_registrations),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    let protected = Router::new()
        .route("/api/auth/logout", post(session::logout))
        .route("/api/auth/session", get(session::current_session))
        .route("/api/auth/password", put(session::change_password))
        .route("/api/users/me", get(user::get_me).patch(user::update_me))
        .route("/api/users/me/roles", put(user::update_roles))
        .route(
            "/api/users/me/profile",
            get(user::get_profile).put(user::update_profile),
        )
        .route("/api/users/me/accounts", get(oauth::list_accounts))
        .route(
            "/api/users/me/accounts/:provider",
            delete(oauth::unlink_account),
        )
        .route("/api/spaces", post(space::create_space))
        .route("/api/spaces/mine", get(space::list_my_spaces))
        .route(
            "/api/spaces/:id",
            patch(space::update_space).delete(space::delete_space),
        )
        .route("/api/stores", post(store::create_store))
        .route("/api/stores/mine", get(store::list_my_stores))
        .route(
            "/api/stores/:id",
            patch(store::update_store).delete(store::delete_store),
        )
        .route(
            "/api/bookings",
            get(booking::list_bookings).post(booking::create_booking),
        )
        .route(
            "/api/bookings/:id",
            get(booking::get_booking).patch(booking::update_booking),
        )
        .route(
            "/api/messages",
            get(message::list_conversations).post(message::send_message),
        )
        .route("/api/messages/unread-count", get(message::unread_count))
        .route("/api/messages/:user_id", get(message::get_thread))
        .route("/api/reviews", post(review::create_review))
        .route(
            "/api/favorites",
            get(favorite::list_favorites).post(favorite::add_favorite),
        )
        .route("/api/favorites/:space_id", delete(favorite::remove_favorite))
        .route(
            "/api/verification",
            get(verification::get_verification).post(verification::submit_verification),
        )
        .merge(admin)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    // Paths shared with `public` keep each method's own layers after the merge
    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
