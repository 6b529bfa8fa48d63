use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::roles::{decode_roles, encode_roles, UserRole};

/// Database model for users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserModel {
    pub id: String,
    pub email: String, // Stored lowercased
    pub name: String,
    pub image: Option<String>,
    pub password_hash: Option<String>, // None for OAuth-only users
    pub user_type: String,             // JSON array of roles, see roles::decode_roles
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModel {
    pub fn new(email: &str, name: String, roles: &[UserRole]) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name,
            image: None,
            password_hash: None,
            user_type: encode_roles(roles),
            is_admin: false,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn roles(&self) -> Vec<UserRole> {
        decode_roles(&self.user_type)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles().contains(&role)
    }

    pub fn set_roles(&mut self, roles: &[UserRole]) {
        self.user_type = encode_roles(roles);
        self.touch();
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Database model for profiles table (one row per user)
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, PartialEq)]
pub struct ProfileModel {
    pub user_id: String,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub prefecture: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileModel {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes_email_and_encodes_roles() {
        let user = UserModel::new(
            "  Taro@Example.JP ",
            "太郎".to_string(),
            &[UserRole::Owner, UserRole::Vendor],
        );
        assert_eq!(user.email, "taro@example.jp");
        assert_eq!(user.user_type, r#"["vendor","owner"]"#);
        assert!(user.has_role(UserRole::Vendor));
        assert!(user.has_role(UserRole::Owner));
        assert!(!user.has_password());
    }

    #[test]
    fn test_legacy_user_type_column() {
        let mut user = UserModel::new("a@b.jp", "a".to_string(), &[]);
        user.user_type = "owner".to_string();
        assert_eq!(user.roles(), vec![UserRole::Owner]);

        user.set_roles(&[UserRole::Vendor]);
        assert_eq!(user.user_type, r#"["vendor"]"#);
    }
}
