use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How stale `last_accessed` may get before an authenticated request refreshes it
pub const TOUCH_INTERVAL_MINUTES: i64 = 5;

/// Row of the sessions table. The id is carried in the token's `session_id` claim.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionModel {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl SessionModel {
    pub fn new(user_id: String, expiration_days: i64) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at: now + Duration::days(expiration_days),
            last_accessed: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Whether a request at `now` should record itself as the latest activity
    pub fn needs_touch(&self, now: DateTime<Utc>) -> bool {
        now - self.last_accessed >= Duration::minutes(TOUCH_INTERVAL_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_model() {
        let session = SessionModel::new("user-1".to_string(), 7);

        assert_eq!(session.user_id, "user-1");
        assert!(!session.id.is_empty());
        assert!(session.expires_at > session.created_at);
        assert!(!session.is_expired());
        assert_eq!(session.last_accessed, session.created_at);
    }

    #[test]
    fn test_negative_lifetime_is_expired() {
        let session = SessionModel::new("user-1".to_string(), -1);
        assert!(session.is_expired());
    }

    #[test]
    fn test_needs_touch_after_interval() {
        let session = SessionModel::new("user-1".to_string(), 7);
        let start = session.last_accessed;

        assert!(!session.needs_touch(start + Duration::minutes(1)));
        assert!(session.needs_touch(start + Duration::minutes(TOUCH_INTERVAL_MINUTES)));
    }
}
