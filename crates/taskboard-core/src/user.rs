use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, display_name: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            display_name,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Emails are compared trimmed and lower-cased everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_email_is_normalized() {
        let user = User::new("  Ada@Example.COM ", "Ada".to_string(), "hash".to_string());
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@b.c", "A".to_string(), "secret-hash".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
