use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Public part of a user returned to clients. Never carries the password
/// hash or the stored refresh token.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            bio: u.bio,
            avatar_url: u.avatar_url,
            followers_count: u.followers_count,
            following_count: u.following_count,
            created_at: u.created_at,
        }
    }
}

/// Compact identity embedded in posts, comments and notifications.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            bio: "".into(),
            avatar_url: None,
            followers_count: 2,
            following_count: 1,
            refresh_token: Some("opaque".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn public_user_hides_credentials() {
        let public = PublicUser::from(sample_user());
        let json = serde_json::to_string(&public).expect("serialize");
        assert!(json.contains("\"username\":\"ada\""));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("refresh_token"));
        assert!(!json.contains("opaque"));
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let public = PublicUser::from(sample_user());
        let value: serde_json::Value =
            serde_json::to_value(&public).expect("serialize");
        assert_eq!(value["created_at"], "1970-01-01T00:00:00Z");
    }
}
