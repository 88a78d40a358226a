use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::{Validate, ValidationError};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub group_id: Option<i64>,
    pub text: String,
    /// Optional illustration, stored as a URL.
    pub image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for displaying a post with author/group info and reaction totals.
/// Counts are summed from the reaction and comment tables at read time.
#[derive(Debug, Serialize, FromRow)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub text: String,
    pub image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Text length must be between 1 and 10000 chars"
    ))]
    pub text: String,

    /// Optional: the group the post belongs to.
    pub group_id: Option<i64>,

    #[validate(custom(function = validate_image_url))]
    pub image: Option<String>,
}

/// DTO for editing a post. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Text length must be between 1 and 10000 chars"
    ))]
    pub text: Option<String>,

    pub group_id: Option<i64>,

    #[validate(custom(function = validate_image_url))]
    pub image: Option<String>,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Cursor for pagination: the created_at timestamp of the last post in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    /// Search keyword for text match.
    pub q: Option<String>,
}

impl PostListParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).min(100)
    }
}

fn validate_image_url(value: &str) -> Result<(), ValidationError> {
    Url::parse(value).map_err(|_| ValidationError::new("invalid_image_url"))?;
    Ok(())
}
