use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::CreateCommentRequest,
    services::comments,
    utils::{html::clean_html, jwt::Claims},
};

/// List all comments for a post, newest first.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comments = comments::list_comments(&pool, post_id).await?;

    Ok(Json(comments))
}

/// Create a new comment, optionally as a reply to another comment
/// on the same post.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let new_id = comments::create_comment(
        &pool,
        post_id,
        claims.user_id(),
        &clean_html(&payload.text),
        payload.parent_id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": new_id })),
    ))
}

/// Quote a comment: returns a draft with the quoted text and cited author
/// pre-filled, ready for the composer. Submitting the draft goes through
/// the ordinary comment creation path as the submitting user.
pub async fn quote_comment(
    State(pool): State<SqlitePool>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let draft = comments::quote_draft(&pool, post_id, comment_id).await?;

    Ok(Json(serde_json::json!({ "draft": draft })))
}

/// Delete a comment. Comment author only (admins override).
/// Replies to the deleted comment survive as top-level comments.
pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comment = comments::get_comment(&pool, comment_id).await?;

    if comment.user_id != claims.user_id() && !claims.is_admin() {
        return Err(AppError::AuthError(
            "You are not the author of this comment".to_string(),
        ));
    }

    comments::delete_comment(&pool, comment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
