use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

// ============================================================================
// HTTP helpers
// ============================================================================

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookies: Vec<String>,
    pub location: Option<String>,
}

impl TestResponse {
    /// Value of a cookie set by this response, if any
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies.iter().find_map(|c| {
            c.strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or("").to_string())
        })
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or("")
    }
}

/// Sends one request through the router. `token` becomes a Bearer header.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    send_with_cookies(app, method, uri, token, &[], body).await
}

pub async fn send_with_cookies(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    cookies: &[(&str, &str)],
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if !cookies.is_empty() {
        let cookie = cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        body,
        set_cookies,
        location,
    }
}

pub struct RegisteredUser {
    pub id: String,
    pub token: String,
}

/// Registers a user with a password and returns their id and session token
pub async fn register(app: &Router, email: &str, name: &str, roles: &[&str]) -> RegisteredUser {
    let response = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "password123",
            "name": name,
            "roles": roles,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

    RegisteredUser {
        id: response.body["user"]["id"].as_str().unwrap().to_string(),
        token: response.cookie("session").expect("session cookie"),
    }
}

/// Creates an active space owned by `owner` and returns its id
pub async fn create_space(app: &Router, owner: &RegisteredUser, title: &str, price: i32) -> String {
    let response = send(
        app,
        Method::POST,
        "/api/spaces",
        Some(&owner.token),
        Some(json!({
            "title": title,
            "address": "東京都渋谷区道玄坂1-1",
            "prefecture": "東京都",
            "price_per_day": price,
            "capacity": 2,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["id"].as_str().unwrap().to_string()
}
