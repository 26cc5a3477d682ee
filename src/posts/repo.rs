use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub image_url: String,
    pub caption: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: OffsetDateTime,
}

/// Post row joined with its author's public identity.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub author_id: Uuid,
    pub image_url: String,
    pub caption: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: OffsetDateTime,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
}

const POST_WITH_AUTHOR: &str = "p.id, p.author_id, p.image_url, p.caption, p.likes_count, \
     p.comments_count, p.created_at, \
     u.username AS author_username, u.avatar_url AS author_avatar_url";

pub async fn insert(
    db: &PgPool,
    author_id: Uuid,
    image_url: &str,
    caption: &str,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        "INSERT INTO posts (author_id, image_url, caption) \
         VALUES ($1, $2, $3) \
         RETURNING id, author_id, image_url, caption, likes_count, comments_count, created_at",
    )
    .bind(author_id)
    .bind(image_url)
    .bind(caption)
    .fetch_one(db)
    .await
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        "SELECT id, author_id, image_url, caption, likes_count, comments_count, created_at \
         FROM posts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn get_with_author(
    db: &PgPool,
    id: Uuid,
) -> Result<Option<PostWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, PostWithAuthor>(&format!(
        "SELECT {POST_WITH_AUTHOR} \
         FROM posts p JOIN users u ON u.id = p.author_id \
         WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_author(
    db: &PgPool,
    author_id: Uuid,
) -> Result<Vec<PostWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, PostWithAuthor>(&format!(
        "SELECT {POST_WITH_AUTHOR} \
         FROM posts p JOIN users u ON u.id = p.author_id \
         WHERE p.author_id = $1 \
         ORDER BY p.created_at DESC"
    ))
    .bind(author_id)
    .fetch_all(db)
    .await
}

/// Feed assembly: posts authored by the viewer or anyone the viewer
/// follows, newest first. Recomputed on every call; no cache.
pub async fn feed(
    db: &PgPool,
    viewer_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, PostWithAuthor>(&format!(
        "SELECT {POST_WITH_AUTHOR} \
         FROM posts p JOIN users u ON u.id = p.author_id \
         WHERE p.author_id = $1 \
            OR p.author_id IN (SELECT following_id FROM follows WHERE follower_id = $1) \
         ORDER BY p.created_at DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(viewer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}
