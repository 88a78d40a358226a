use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    handlers::post::POST_QUERY,
    models::{
        post::{PostListParams, PostResponse},
        user::{MeResponse, ProfileResponse},
    },
    utils::jwt::{Claims, optional_claims},
};

/// Get current user's profile and statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    // Subqueries over the indexed join tables; totals are summed on read.
    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT
            u.id, u.username, u.role, u.created_at,
            (SELECT COUNT(*) FROM posts WHERE user_id = u.id) AS posts_count,
            (SELECT COUNT(*) FROM follows WHERE author_id = u.id) AS followers_count,
            (SELECT COUNT(*) FROM follows WHERE user_id = u.id) AS following_count,
            (SELECT COUNT(*) FROM post_likes pl JOIN posts p ON pl.post_id = p.id
                WHERE p.user_id = u.id) AS likes_received,
            (SELECT COUNT(*) FROM post_dislikes pd JOIN posts p ON pd.post_id = p.id
                WHERE p.user_id = u.id) AS dislikes_received
        FROM users u
        WHERE u.id = ?
        "#,
    )
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(me))
}

/// Public profile of an author.
///
/// When the request carries a valid bearer token, `following` reflects
/// whether the requesting user follows this author.
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let following = match optional_claims(&headers, &config.jwt_secret) {
        Some(claims) => sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(claims.user_id())
        .bind(author_id)
        .fetch_one(&pool)
        .await?,
        None => false,
    };

    let profile = sqlx::query_as::<_, ProfileResponse>(
        r#"
        SELECT
            u.id, u.username, u.created_at,
            (SELECT COUNT(*) FROM posts WHERE user_id = u.id) AS posts_count,
            (SELECT COUNT(*) FROM follows WHERE author_id = u.id) AS followers_count,
            (SELECT COUNT(*) FROM post_likes pl JOIN posts p ON pl.post_id = p.id
                WHERE p.user_id = u.id) AS likes_received,
            (SELECT COUNT(*) FROM post_dislikes pd JOIN posts p ON pd.post_id = p.id
                WHERE p.user_id = u.id) AS dislikes_received,
            ? AS following
        FROM users u
        WHERE u.id = ?
        "#,
    )
    .bind(following)
    .bind(author_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(profile))
}

/// List posts created by an author, recent first.
pub async fn list_user_posts(
    State(pool): State<SqlitePool>,
    Path(username): Path<String>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let sql = format!(
        r#"
        {POST_QUERY}
        WHERE p.user_id = ?
          AND (? IS NULL OR p.created_at < ?)
        ORDER BY p.created_at DESC
        LIMIT ?
        "#
    );

    let posts = sqlx::query_as::<_, PostResponse>(&sql)
        .bind(author_id)
        .bind(params.cursor)
        .bind(params.cursor)
        .bind(params.limit())
        .fetch_all(&pool)
        .await?;

    Ok(Json(posts))
}
