use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::post::POST_QUERY,
    models::post::{PostListParams, PostResponse},
    utils::jwt::Claims,
};

/// Follow an author. Idempotent: following twice is a no-op.
/// Following yourself is rejected.
pub async fn follow(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if author_id == claims.user_id() {
        return Err(AppError::BadRequest(
            "You cannot follow yourself".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO follows (user_id, author_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, author_id) DO NOTHING
        "#,
    )
    .bind(claims.user_id())
    .bind(author_id)
    .bind(Utc::now())
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({ "following": true })))
}

/// Unfollow an author.
pub async fn unfollow(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let removed = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
        .bind(claims.user_id())
        .bind(author_id)
        .execute(&pool)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::NotFound(
            "You are not following this user".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Posts from authors the current user follows, recent first.
pub async fn feed(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        r#"
        {POST_QUERY}
        WHERE p.user_id IN (SELECT author_id FROM follows WHERE user_id = ?)
          AND (? IS NULL OR p.created_at < ?)
        ORDER BY p.created_at DESC
        LIMIT ?
        "#
    );

    let posts = sqlx::query_as::<_, PostResponse>(&sql)
        .bind(claims.user_id())
        .bind(params.cursor)
        .bind(params.cursor)
        .bind(params.limit())
        .fetch_all(&pool)
        .await?;

    Ok(Json(posts))
}
