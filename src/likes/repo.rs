use sqlx::PgPool;
use uuid::Uuid;

/// Ledger insert and counter bump share one transaction; a duplicate pair
/// surfaces the unique violation from `likes_user_post_key` untranslated.
pub async fn like(db: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<i64, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("INSERT INTO likes (user_id, post_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    let (likes_count,): (i64,) = sqlx::query_as(
        "UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
    )
    .bind(post_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(likes_count)
}

/// Returns None when no like existed for the pair (nothing is written).
pub async fn unlike(
    db: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<Option<i64>, sqlx::Error> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Ok(None);
    }

    let (likes_count,): (i64,) = sqlx::query_as(
        "UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) \
         WHERE id = $1 RETURNING likes_count",
    )
    .bind(post_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(likes_count))
}
