use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::comments::repo::CommentWithAuthor;
use crate::users::dto::UserSummary;

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub body: String,
    pub author: UserSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(c: CommentWithAuthor) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            body: c.body,
            author: UserSummary {
                id: c.user_id,
                username: c.author_username,
                avatar_url: c.author_avatar_url,
            },
            created_at: c.created_at,
        }
    }
}
