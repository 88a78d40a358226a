use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::post::POST_QUERY,
    models::{group::Group, post::PostResponse, user::AuthorSummary},
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Substring search across posts (text), groups (title) and authors
/// (username). An empty query returns empty result sets.
pub async fn search(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(query) = params.q.filter(|q| !q.trim().is_empty()) else {
        return Ok(Json(serde_json::json!({
            "posts": [],
            "groups": [],
            "authors": [],
        })));
    };

    let pattern = format!("%{}%", query.trim());

    let sql = format!("{POST_QUERY} WHERE p.text LIKE ? ORDER BY p.created_at DESC");
    let posts = sqlx::query_as::<_, PostResponse>(&sql)
        .bind(&pattern)
        .fetch_all(&pool)
        .await?;

    let groups = sqlx::query_as::<_, Group>(
        "SELECT id, title, slug, description FROM groups WHERE title LIKE ? ORDER BY id",
    )
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    let authors = sqlx::query_as::<_, AuthorSummary>(
        "SELECT id, username, created_at FROM users WHERE username LIKE ? ORDER BY username",
    )
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "posts": posts,
        "groups": groups,
        "authors": authors,
    })))
}
