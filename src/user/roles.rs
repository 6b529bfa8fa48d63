use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Marketplace role a user can hold. A user may hold both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    /// 出店者
    Vendor,
    /// スペースオーナー
    Owner,
}

/// Encodes roles for the `users.user_type` column as a JSON array,
/// de-duplicated and in vendor-then-owner order.
pub fn encode_roles(roles: &[UserRole]) -> String {
    let mut roles = roles.to_vec();
    roles.sort();
    roles.dedup();
    serde_json::to_string(&roles).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes the `users.user_type` column.
///
/// Current rows hold a JSON array (`["vendor","owner"]`). Older rows hold a
/// single bare string: `vendor`, `owner`, or `both`, sometimes JSON-quoted.
/// Unknown entries are dropped.
pub fn decode_roles(raw: &str) -> Vec<UserRole> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut roles = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .filter_map(|s| UserRole::from_str(s).ok())
            .collect(),
        Ok(serde_json::Value::String(legacy)) => decode_legacy(&legacy),
        Ok(_) => Vec::new(),
        Err(_) => decode_legacy(raw),
    };

    roles.sort();
    roles.dedup();
    roles
}

fn decode_legacy(value: &str) -> Vec<UserRole> {
    match value.trim() {
        "both" => vec![UserRole::Vendor, UserRole::Owner],
        other => UserRole::from_str(other).map(|r| vec![r]).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"["vendor","owner"]"#, vec![UserRole::Vendor, UserRole::Owner])]
    #[case(r#"["owner","vendor","owner"]"#, vec![UserRole::Vendor, UserRole::Owner])]
    #[case(r#"["owner"]"#, vec![UserRole::Owner])]
    #[case(r#"["admin","vendor"]"#, vec![UserRole::Vendor])]
    #[case("[]", vec![])]
    #[case("vendor", vec![UserRole::Vendor])]
    #[case("owner", vec![UserRole::Owner])]
    #[case("both", vec![UserRole::Vendor, UserRole::Owner])]
    #[case(r#""owner""#, vec![UserRole::Owner])]
    #[case(r#""both""#, vec![UserRole::Vendor, UserRole::Owner])]
    #[case("", vec![])]
    #[case("null", vec![])]
    #[case("somebody", vec![])]
    fn test_decode_roles(#[case] raw: &str, #[case] expected: Vec<UserRole>) {
        assert_eq!(decode_roles(raw), expected);
    }

    #[test]
    fn test_encode_roles_is_canonical() {
        assert_eq!(
            encode_roles(&[UserRole::Owner, UserRole::Vendor, UserRole::Owner]),
            r#"["vendor","owner"]"#
        );
        assert_eq!(encode_roles(&[]), "[]");
    }

    #[test]
    fn test_encoded_roles_decode_back() {
        let encoded = encode_roles(&[UserRole::Owner]);
        assert_eq!(decode_roles(&encoded), vec![UserRole::Owner]);
    }
}
