use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::repo::PostWithAuthor;
use crate::users::dto::UserSummary;

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: UserSummary,
    pub image_url: String,
    pub caption: String,
    pub likes_count: i64,
    pub comments_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<PostWithAuthor> for PostResponse {
    fn from(p: PostWithAuthor) -> Self {
        Self {
            id: p.id,
            author: UserSummary {
                id: p.author_id,
                username: p.author_username,
                avatar_url: p.author_avatar_url,
            },
            image_url: p.image_url,
            caption: p.caption,
            likes_count: p.likes_count,
            comments_count: p.comments_count,
            created_at: p.created_at,
        }
    }
}

/// Feed pagination: 1-indexed page, capped limit.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

impl FeedQuery {
    /// (limit, offset) with page floored at 1 and limit clamped to 1..=50.
    pub fn page_window(&self) -> (i64, i64) {
        let limit = self.limit.clamp(1, 50);
        let page = self.page.max(1);
        (limit, (page - 1) * limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_defaults() {
        let q: FeedQuery = serde_json::from_str("{}").expect("defaults");
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
        assert_eq!(q.page_window(), (10, 0));
    }

    #[test]
    fn page_window_offsets_from_one_indexed_page() {
        let q = FeedQuery { page: 3, limit: 10 };
        assert_eq!(q.page_window(), (10, 20));
    }

    #[test]
    fn page_window_clamps_hostile_input() {
        let q = FeedQuery { page: 0, limit: 0 };
        assert_eq!(q.page_window(), (1, 0));

        let q = FeedQuery {
            page: -5,
            limit: 10_000,
        };
        assert_eq!(q.page_window(), (50, 0));
    }
}
