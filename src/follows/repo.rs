use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Resolved identity on one side of a follow edge.
#[derive(Debug, Clone, FromRow)]
pub struct EdgeUser {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Edge insert plus both counter bumps in one transaction; a duplicate
/// edge surfaces the unique violation from `follows_pair_key` untranslated.
pub async fn follow(db: &PgPool, follower_id: Uuid, following_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)")
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET following_count = following_count + 1 WHERE id = $1")
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET followers_count = followers_count + 1 WHERE id = $1")
        .bind(following_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Returns false when no edge existed (nothing is written).
pub async fn unfollow(
    db: &PgPool,
    follower_id: Uuid,
    following_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE users SET following_count = GREATEST(following_count - 1, 0) WHERE id = $1")
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET followers_count = GREATEST(followers_count - 1, 0) WHERE id = $1")
        .bind(following_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn list_followers(db: &PgPool, user_id: Uuid) -> Result<Vec<EdgeUser>, sqlx::Error> {
    sqlx::query_as::<_, EdgeUser>(
        "SELECT u.id, u.username, u.avatar_url \
         FROM follows f JOIN users u ON u.id = f.follower_id \
         WHERE f.following_id = $1",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn list_following(db: &PgPool, user_id: Uuid) -> Result<Vec<EdgeUser>, sqlx::Error> {
    sqlx::query_as::<_, EdgeUser>(
        "SELECT u.id, u.username, u.avatar_url \
         FROM follows f JOIN users u ON u.id = f.following_id \
         WHERE f.follower_id = $1",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
