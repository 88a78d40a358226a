use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{error::AppError, services::reactions, utils::jwt::Claims};

/// Toggle Like on a post.
///
/// No reaction -> liked, liked -> no reaction, disliked -> liked.
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = reactions::toggle_like(&pool, post_id, claims.user_id()).await?;
    let (like_count, dislike_count) = reactions::reaction_counts(&pool, post_id).await?;

    Ok(Json(serde_json::json!({
        "state": state,
        "like_count": like_count,
        "dislike_count": dislike_count,
    })))
}

/// Toggle Dislike on a post.
///
/// No reaction -> disliked, disliked -> no reaction, liked -> disliked.
pub async fn toggle_dislike(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = reactions::toggle_dislike(&pool, post_id, claims.user_id()).await?;
    let (like_count, dislike_count) = reactions::reaction_counts(&pool, post_id).await?;

    Ok(Json(serde_json::json!({
        "state": state,
        "like_count": like_count,
        "dislike_count": dislike_count,
    })))
}
