use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'groups' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    /// URL-friendly unique identifier.
    pub slug: String,
    pub description: String,
}

/// Group with its post count, for listings.
#[derive(Debug, Serialize, FromRow)]
pub struct GroupSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub posts_count: i64,
}

/// DTO for creating a new group (admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Slug length must be between 1 and 255 characters"
    ))]
    pub slug: String,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Description length must be between 1 and 2000 characters"
    ))]
    pub description: String,
}
