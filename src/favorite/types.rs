use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub space_id: String,
}
