use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateSpaceRequest {
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub prefecture: Option<String>,
    pub price_per_day: i32,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
}

fn default_capacity() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSpaceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub prefecture: Option<String>,
    pub price_per_day: Option<i32>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

/// Query string for GET /api/spaces
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SpaceQuery {
    pub prefecture: Option<String>,
    pub keyword: Option<String>,
    pub max_price: Option<i32>,
}
