use serde::Deserialize;

use super::models::VerificationStatus;

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub document_type: String,
    pub document_url: String,
}

/// Body of PATCH /api/admin/verifications/:id
#[derive(Debug, Deserialize)]
pub struct ReviewVerificationRequest {
    pub status: VerificationStatus,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    pub status: Option<VerificationStatus>,
}
