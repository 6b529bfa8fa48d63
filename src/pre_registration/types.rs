use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PreRegisterRequest {
    pub email: String,
    pub name: Option<String>,
    pub user_type: String,
}
