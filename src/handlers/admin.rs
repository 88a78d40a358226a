// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{group::CreateGroupRequest, user::User},
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Creates a new group.
/// Admin only.
pub async fn create_group(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO groups (title, slug, description)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.slug)
    .bind(&payload.description)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict(format!("Group slug '{}' already exists", payload.slug))
        } else {
            tracing::error!("Failed to create group: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Deletes a group. Posts in the group stay, without a group.
/// Admin only.
pub async fn delete_group(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let removed = sqlx::query("DELETE FROM groups WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::NotFound("Group not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
