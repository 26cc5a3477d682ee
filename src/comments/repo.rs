use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
}

/// What delete authorization needs: the comment's author and the parent
/// post's author.
#[derive(Debug, Clone, FromRow)]
pub struct CommentOwnership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_author_id: Uuid,
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
    body: &str,
) -> Result<Comment, sqlx::Error> {
    let mut tx = db.begin().await?;

    let comment = sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (user_id, post_id, body) \
         VALUES ($1, $2, $3) \
         RETURNING id, user_id, post_id, body, created_at",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(body)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(comment)
}

pub async fn list_by_post(
    db: &PgPool,
    post_id: Uuid,
) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, CommentWithAuthor>(
        "SELECT c.id, c.user_id, c.post_id, c.body, c.created_at, \
                u.username AS author_username, u.avatar_url AS author_avatar_url \
         FROM comments c JOIN users u ON u.id = c.user_id \
         WHERE c.post_id = $1 \
         ORDER BY c.created_at ASC",
    )
    .bind(post_id)
    .fetch_all(db)
    .await
}

pub async fn get_ownership(
    db: &PgPool,
    comment_id: Uuid,
) -> Result<Option<CommentOwnership>, sqlx::Error> {
    sqlx::query_as::<_, CommentOwnership>(
        "SELECT c.id, c.user_id, p.author_id AS post_author_id \
         FROM comments c JOIN posts p ON p.id = c.post_id \
         WHERE c.id = $1",
    )
    .bind(comment_id)
    .fetch_optional(db)
    .await
}

const DELETE_COMMENT_SQL: &str =
    "WITH removed AS (DELETE FROM comments WHERE id = $1 RETURNING post_id) \
     UPDATE posts SET comments_count = GREATEST(comments_count - 1, 0) \
     WHERE id = (SELECT post_id FROM removed)";

/// Ledger delete and counter decrement in one statement. The decrement is
/// keyed to the row the DELETE actually removed, so the loser of a
/// concurrent delete race removes nothing and leaves the counter alone.
/// Returns false when the comment was already gone.
pub async fn delete(db: &PgPool, comment_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(DELETE_COMMENT_SQL)
        .bind(comment_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_counter_update_is_keyed_to_the_deleted_row() {
        // The counter may only move for a post whose comment this statement
        // itself removed; splitting the two writes reopens the drift race.
        assert!(DELETE_COMMENT_SQL.contains("RETURNING post_id"));
        assert!(DELETE_COMMENT_SQL.contains("WHERE id = (SELECT post_id FROM removed)"));
        assert!(DELETE_COMMENT_SQL.contains("GREATEST(comments_count - 1, 0)"));
    }
}
