use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::comment::{Comment, CommentResponse},
};

/// All comments of a post, newest first, id as the tie-breaker.
///
/// The result is flat; consumers wanting a tree group by `parent_id`
/// themselves.
pub async fn list_comments(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<CommentResponse>, AppError> {
    ensure_post_exists(pool, post_id).await?;

    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT c.id, c.post_id, c.user_id, u.username, c.parent_id, c.text, c.created_at
        FROM comments c
        JOIN users u ON c.user_id = u.id
        WHERE c.post_id = ?
        ORDER BY c.created_at DESC, c.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Creates a comment on a post, optionally as a reply.
///
/// A reply's parent must belong to the same post; a parent id pointing at
/// another post's comment is reported as not found.
pub async fn create_comment(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
    text: &str,
    parent_id: Option<i64>,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if let Some(pid) = parent_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = ? AND post_id = ?")
            .bind(pid)
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Parent comment not found".to_string()))?;
    }

    let new_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO comments (post_id, user_id, parent_id, text, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(parent_id)
    .bind(text)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(new_id)
}

/// Pre-filled draft for quoting a comment: the source text wrapped in
/// blockquote markup citing its author. Quoting is textual, the draft has
/// no structural link to the source, and the source row is not touched.
pub async fn quote_draft(
    pool: &SqlitePool,
    post_id: i64,
    comment_id: i64,
) -> Result<String, AppError> {
    let (text, author) = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT c.text, u.username
        FROM comments c
        JOIN users u ON c.user_id = u.id
        WHERE c.id = ? AND c.post_id = ?
        "#,
    )
    .bind(comment_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(format!(
        "<blockquote class=\"blockquote\"><p> {} </p> <cite> {}</cite></blockquote>",
        text, author
    ))
}

/// Single comment row, for ownership checks before deletion.
pub async fn get_comment(pool: &SqlitePool, comment_id: i64) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(
        "SELECT id, post_id, user_id, parent_id, text, created_at FROM comments WHERE id = ?",
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// Deletes one comment. Children are orphaned, not cascaded: their
/// parent reference is cleared and they become top-level comments.
pub async fn delete_comment(pool: &SqlitePool, comment_id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = ?")
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    sqlx::query("UPDATE comments SET parent_id = NULL WHERE parent_id = ?")
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

async fn ensure_post_exists(pool: &SqlitePool, post_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(())
}
