use serde::{Deserialize, Serialize};

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AdminStats {
    pub users: i64,
    pub spaces: i64,
    pub stores: i64,
    pub bookings: i64,
    pub pending_verifications: i64,
}
