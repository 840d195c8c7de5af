//! User account entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque unique identifier.
    pub id: String,

    /// Unique login name.
    pub username: String,

    /// Argon2 password hash. Never serialized into API output.
    #[serde(default, skip_serializing)]
    pub password_hash: String,

    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: "u1".to_string(),
            username: "adrien".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "adrien");
    }
}
