use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::post::POST_QUERY,
    models::{
        group::{Group, GroupSummary},
        post::{PostListParams, PostResponse},
    },
};

/// Lists all groups with their post counts.
pub async fn list_groups(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let groups = sqlx::query_as::<_, GroupSummary>(
        r#"
        SELECT
            g.id, g.title, g.slug, g.description,
            (SELECT COUNT(*) FROM posts p WHERE p.group_id = g.id) AS posts_count
        FROM groups g
        ORDER BY g.id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(groups))
}

/// A group and its posts (recent first, cursor-paginated), looked up by slug.
pub async fn group_posts(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let group = sqlx::query_as::<_, Group>(
        "SELECT id, title, slug, description FROM groups WHERE slug = ?",
    )
    .bind(&slug)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Group not found".to_string()))?;

    let sql = format!(
        r#"
        {POST_QUERY}
        WHERE p.group_id = ?
          AND (? IS NULL OR p.created_at < ?)
        ORDER BY p.created_at DESC
        LIMIT ?
        "#
    );

    let posts = sqlx::query_as::<_, PostResponse>(&sql)
        .bind(group.id)
        .bind(params.cursor)
        .bind(params.cursor)
        .bind(params.limit())
        .fetch_all(&pool)
        .await?;

    Ok(Json(serde_json::json!({
        "group": group,
        "posts": posts,
    })))
}
