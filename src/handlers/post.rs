use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{CreatePostRequest, Post, PostListParams, PostResponse, UpdatePostRequest},
    utils::{html::clean_html, jwt::Claims},
};

/// Shared SELECT for post payloads: author/group info joined in, reaction
/// and comment totals summed from their tables at read time.
pub(crate) const POST_QUERY: &str = r#"
    SELECT
        p.id, p.user_id, u.username AS author_username,
        p.group_id, g.slug AS group_slug, g.title AS group_title,
        p.text, p.image, p.created_at, p.updated_at,
        (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM post_dislikes pd WHERE pd.post_id = p.id) AS dislike_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON p.user_id = u.id
    LEFT JOIN groups g ON p.group_id = g.id
"#;

/// Raw post row, for ownership checks before mutations.
async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Post, AppError> {
    sqlx::query_as::<_, Post>(
        "SELECT id, user_id, group_id, text, image, created_at, updated_at FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))
}

/// Authorization predicate for author-only operations (admins override).
/// Invoked before any mutation runs.
fn ensure_author(claims: &Claims, owner_id: i64) -> Result<(), AppError> {
    if claims.user_id() != owner_id && !claims.is_admin() {
        return Err(AppError::AuthError(
            "You are not the author of this post".to_string(),
        ));
    }
    Ok(())
}

/// Create a new post.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    if let Some(group_id) = payload.group_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::BadRequest("Group not found".to_string()))?;
    }

    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, group_id, text, image, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(payload.group_id)
    .bind(clean_html(&payload.text))
    .bind(&payload.image)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": post_id})),
    ))
}

/// List posts (Recent first).
/// Supports cursor-based pagination and an optional text filter.
pub async fn list_posts(
    State(pool): State<SqlitePool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.q.as_ref().map(|k| format!("%{}%", k));

    let sql = format!(
        r#"
        {POST_QUERY}
        WHERE (? IS NULL OR p.created_at < ?)
          AND (? IS NULL OR p.text LIKE ?)
        ORDER BY p.created_at DESC
        LIMIT ?
        "#
    );

    let posts = sqlx::query_as::<_, PostResponse>(&sql)
        .bind(params.cursor)
        .bind(params.cursor)
        .bind(pattern.clone())
        .bind(pattern)
        .bind(params.limit())
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(posts))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{POST_QUERY} WHERE p.id = ?");

    let post = sqlx::query_as::<_, PostResponse>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Edit a post. Author only.
pub async fn update_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let post = fetch_post(&pool, id).await?;

    ensure_author(&claims, post.user_id)?;

    if let Some(text) = &payload.text {
        sqlx::query("UPDATE posts SET text = ? WHERE id = ?")
            .bind(clean_html(text))
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(group_id) = payload.group_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::BadRequest("Group not found".to_string()))?;

        sqlx::query("UPDATE posts SET group_id = ? WHERE id = ?")
            .bind(group_id)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(image) = &payload.image {
        sqlx::query("UPDATE posts SET image = ? WHERE id = ?")
            .bind(image)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    sqlx::query("UPDATE posts SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a post. Author only.
/// Comments, likes and dislikes go with it.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, id).await?;

    ensure_author(&claims, post.user_id)?;

    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
