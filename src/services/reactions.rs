use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppError;

/// Observable reaction state of one (post, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    None,
    Liked,
    Disliked,
}

/// Tri-state like toggle.
///
/// NONE -> LIKED, LIKED -> NONE, DISLIKED -> LIKED. The whole
/// read-decide-write sequence runs in one transaction, so a concurrent
/// observer never sees a like and a dislike row for the same pair.
pub async fn toggle_like(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
) -> Result<ReactionState, AppError> {
    let mut tx = pool.begin().await?;

    ensure_post_exists(&mut tx, post_id).await?;

    // 1. A standing dislike flips straight to a like.
    let removed_dislike =
        sqlx::query("DELETE FROM post_dislikes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    let state = if removed_dislike > 0 {
        insert_like(&mut tx, post_id, user_id).await?;
        ReactionState::Liked
    } else {
        // 2. A standing like toggles off; otherwise a new like is created.
        let removed_like = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed_like > 0 {
            ReactionState::None
        } else {
            insert_like(&mut tx, post_id, user_id).await?;
            ReactionState::Liked
        }
    };

    tx.commit().await?;

    Ok(state)
}

/// Tri-state dislike toggle, mirror of `toggle_like`.
///
/// NONE -> DISLIKED, DISLIKED -> NONE, LIKED -> DISLIKED.
pub async fn toggle_dislike(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
) -> Result<ReactionState, AppError> {
    let mut tx = pool.begin().await?;

    ensure_post_exists(&mut tx, post_id).await?;

    let removed_like = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let state = if removed_like > 0 {
        insert_dislike(&mut tx, post_id, user_id).await?;
        ReactionState::Disliked
    } else {
        let removed_dislike =
            sqlx::query("DELETE FROM post_dislikes WHERE post_id = ? AND user_id = ?")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        if removed_dislike > 0 {
            ReactionState::None
        } else {
            insert_dislike(&mut tx, post_id, user_id).await?;
            ReactionState::Disliked
        }
    };

    tx.commit().await?;

    Ok(state)
}

/// Current state of a (post, user) pair, read from the two reaction tables.
pub async fn reaction_state(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
) -> Result<ReactionState, AppError> {
    let (liked, disliked) = sqlx::query_as::<_, (bool, bool)>(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM post_likes WHERE post_id = ?1 AND user_id = ?2),
            EXISTS(SELECT 1 FROM post_dislikes WHERE post_id = ?1 AND user_id = ?2)
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(match (liked, disliked) {
        (true, _) => ReactionState::Liked,
        (_, true) => ReactionState::Disliked,
        _ => ReactionState::None,
    })
}

/// Like and dislike totals for a post, summed from the rows.
pub async fn reaction_counts(pool: &SqlitePool, post_id: i64) -> Result<(i64, i64), AppError> {
    let counts = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM post_likes WHERE post_id = ?1),
            (SELECT COUNT(*) FROM post_dislikes WHERE post_id = ?1)
        "#,
    )
    .bind(post_id)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}

async fn ensure_post_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    post_id: i64,
) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(())
}

// Insert-if-absent: a row that already exists (two toggles racing) is not
// an error, both requests converge on the same final state.
async fn insert_like(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    post_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO post_likes (post_id, user_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(post_id, user_id) DO NOTHING
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_dislike(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    post_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO post_dislikes (post_id, user_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(post_id, user_id) DO NOTHING
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
