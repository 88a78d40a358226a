// tests/api_tests.rs

use std::str::FromStr;

use inkstream::utils::hash::hash_password;
use inkstream::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Helper function to spawn the app on a random port for testing.
/// Each call gets its own in-memory database; the returned pool is a
/// handle to the same database the server uses.
async fn spawn_app() -> (String, SqlitePool) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // One connection kept alive for the lifetime of the pool: the
    // in-memory database exists only as long as it does.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a user and returns their bearer token.
async fn register_and_login(client: &reqwest::Client, address: &str, username: &str) -> String {
    let password = "password123";

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

async fn create_post(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    text: &str,
) -> i64 {
    let response = client
        .post(format!("{}/api/posts", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .expect("Create post failed");
    assert_eq!(response.status().as_u16(), 201);

    response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_validation_and_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    // Too short a username is rejected
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": "yo", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // First registration works
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Same username again conflicts
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Wrong password fails login
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn post_lifecycle_author_only() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let author = unique_name("author");
    let other = unique_name("other");
    let token_author = register_and_login(&client, &address, &author).await;
    let token_other = register_and_login(&client, &address, &other).await;

    // Unauthenticated creation is rejected
    let response = client
        .post(format!("{}/api/posts", address))
        .json(&serde_json::json!({ "text": "anonymous" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let post_id = create_post(&client, &address, &token_author, "hello world").await;

    // Fresh post: zero reactions, zero comments, author attached
    let post: serde_json::Value = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["author_username"], author.as_str());
    assert_eq!(post["like_count"], 0);
    assert_eq!(post["dislike_count"], 0);
    assert_eq!(post["comment_count"], 0);

    // Only the author may edit
    let response = client
        .put(format!("{}/api/posts/{}", address, post_id))
        .header("Authorization", format!("Bearer {}", token_other))
        .json(&serde_json::json!({ "text": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .put(format!("{}/api/posts/{}", address, post_id))
        .header("Authorization", format!("Bearer {}", token_author))
        .json(&serde_json::json!({ "text": "hello, edited world" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // Only the author may delete
    let response = client
        .delete(format!("{}/api/posts/{}", address, post_id))
        .header("Authorization", format!("Bearer {}", token_other))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .delete(format!("{}/api/posts/{}", address, post_id))
        .header("Authorization", format!("Bearer {}", token_author))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn comment_and_reaction_flow() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let author = unique_name("author");
    let reader = unique_name("reader");
    let token_author = register_and_login(&client, &address, &author).await;
    let token_reader = register_and_login(&client, &address, &reader).await;

    let post_id = create_post(&client, &address, &token_author, "react to me").await;

    // Reader comments, author replies to that comment
    let response = client
        .post(format!("{}/api/posts/{}/comments", address, post_id))
        .header("Authorization", format!("Bearer {}", token_reader))
        .json(&serde_json::json!({ "text": "nice post" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let comment_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = client
        .post(format!("{}/api/posts/{}/comments", address, post_id))
        .header("Authorization", format!("Bearer {}", token_author))
        .json(&serde_json::json!({ "text": "thanks", "parent_id": comment_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let reply_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let comments: Vec<serde_json::Value> = client
        .get(format!("{}/api/posts/{}/comments", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.len(), 2);
    let reply = comments
        .iter()
        .find(|c| c["id"].as_i64() == Some(reply_id))
        .unwrap();
    assert_eq!(reply["parent_id"].as_i64(), Some(comment_id));
    assert_eq!(reply["username"], author.as_str());

    // Quote draft cites the original author and leaves the source alone
    let draft: serde_json::Value = client
        .get(format!(
            "{}/api/posts/{}/comments/{}/quote",
            address, post_id, comment_id
        ))
        .header("Authorization", format!("Bearer {}", token_author))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let draft_text = draft["draft"].as_str().unwrap();
    assert!(draft_text.contains("nice post"));
    assert!(draft_text.contains(reader.as_str()));

    // Reaction toggle: like, unlike, dislike, like again
    let reaction: serde_json::Value = client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .header("Authorization", format!("Bearer {}", token_reader))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reaction["state"], "liked");
    assert_eq!(reaction["like_count"], 1);

    let reaction: serde_json::Value = client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .header("Authorization", format!("Bearer {}", token_reader))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reaction["state"], "none");
    assert_eq!(reaction["like_count"], 0);

    let reaction: serde_json::Value = client
        .post(format!("{}/api/posts/{}/dislike", address, post_id))
        .header("Authorization", format!("Bearer {}", token_reader))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reaction["state"], "disliked");
    assert_eq!(reaction["dislike_count"], 1);

    let reaction: serde_json::Value = client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .header("Authorization", format!("Bearer {}", token_reader))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reaction["state"], "liked");
    assert_eq!(reaction["like_count"], 1);
    assert_eq!(reaction["dislike_count"], 0);

    // Only the comment author may delete it
    let response = client
        .delete(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", token_author))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .delete(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", token_reader))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // The reply survives as a top-level comment
    let comments: Vec<serde_json::Value> = client
        .get(format!("{}/api/posts/{}/comments", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["id"].as_i64(), Some(reply_id));
    assert!(comments[0]["parent_id"].is_null());

    // Deleting the post takes comments and reactions with it
    let response = client
        .delete(format!("{}/api/posts/{}", address, post_id))
        .header("Authorization", format!("Bearer {}", token_author))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let leftovers = sqlx::query_scalar::<_, i64>(
        "SELECT (SELECT COUNT(*) FROM comments) + (SELECT COUNT(*) FROM post_likes) + (SELECT COUNT(*) FROM post_dislikes)",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn follow_flow() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let author = unique_name("author");
    let fan = unique_name("fan");
    let token_author = register_and_login(&client, &address, &author).await;
    let token_fan = register_and_login(&client, &address, &fan).await;

    create_post(&client, &address, &token_author, "from the author").await;

    // Following yourself is rejected
    let response = client
        .post(format!("{}/api/users/{}/follow", address, fan))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Follow works and is idempotent
    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/users/{}/follow", address, author))
            .header("Authorization", format!("Bearer {}", token_fan))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // The feed carries the followed author's post
    let feed: Vec<serde_json::Value> = client
        .get(format!("{}/api/feed", address))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["author_username"], author.as_str());

    // Profile reflects the relationship for the authenticated viewer
    let profile: serde_json::Value = client
        .get(format!("{}/api/users/{}", address, author))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["followers_count"], 1);
    assert_eq!(profile["following"], true);
    assert_eq!(profile["posts_count"], 1);

    // Anonymous viewers always see following = false
    let profile: serde_json::Value = client
        .get(format!("{}/api/users/{}", address, author))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["following"], false);

    // Unfollow once works, twice is gone
    let response = client
        .delete(format!("{}/api/users/{}/follow", address, author))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .delete(format!("{}/api/users/{}/follow", address, author))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let feed: Vec<serde_json::Value> = client
        .get(format!("{}/api/feed", address))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(feed.is_empty());
}

#[tokio::test]
async fn group_and_admin_flow() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin = unique_name("admin");
    let user = unique_name("user");
    let token_user = register_and_login(&client, &address, &user).await;

    // Seed an admin account directly
    let hashed = hash_password("adminpass123").unwrap();
    sqlx::query("INSERT INTO users (username, password, role, created_at) VALUES (?, ?, 'admin', ?)")
        .bind(&admin)
        .bind(&hashed)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": admin, "password": "adminpass123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token_admin = login["token"].as_str().unwrap().to_string();

    // Ordinary users cannot manage groups
    let response = client
        .post(format!("{}/api/admin/groups", address))
        .header("Authorization", format!("Bearer {}", token_user))
        .json(&serde_json::json!({
            "title": "Rustaceans",
            "slug": "rustaceans",
            "description": "All things crab"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Admin creates the group; duplicate slug conflicts
    let response = client
        .post(format!("{}/api/admin/groups", address))
        .header("Authorization", format!("Bearer {}", token_admin))
        .json(&serde_json::json!({
            "title": "Rustaceans",
            "slug": "rustaceans",
            "description": "All things crab"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let group_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = client
        .post(format!("{}/api/admin/groups", address))
        .header("Authorization", format!("Bearer {}", token_admin))
        .json(&serde_json::json!({
            "title": "Other",
            "slug": "rustaceans",
            "description": "duplicate slug"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // A post published into the group shows up under its slug
    let response = client
        .post(format!("{}/api/posts", address))
        .header("Authorization", format!("Bearer {}", token_user))
        .json(&serde_json::json!({ "text": "group post", "group_id": group_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let post_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let listing: serde_json::Value = client
        .get(format!("{}/api/groups/rustaceans", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["group"]["title"], "Rustaceans");
    assert_eq!(listing["posts"].as_array().unwrap().len(), 1);

    let groups: Vec<serde_json::Value> = client
        .get(format!("{}/api/groups", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["posts_count"], 1);

    // Deleting the group leaves the post, groupless
    let response = client
        .delete(format!("{}/api/admin/groups/{}", address, group_id))
        .header("Authorization", format!("Bearer {}", token_admin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let post: serde_json::Value = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(post["group_id"].is_null());

    // Admin user listing is gated and never leaks password hashes
    let response = client
        .get(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token_user))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let users: Vec<serde_json::Value> = client
        .get(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token_admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn search_and_pagination() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let author = unique_name("searchable");
    let token = register_and_login(&client, &address, &author).await;

    for i in 1..=3 {
        create_post(&client, &address, &token, &format!("post number {}", i)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    create_post(&client, &address, &token, "something else entirely").await;

    // Text filter on the listing
    let posts: Vec<serde_json::Value> = client
        .get(format!("{}/api/posts?q=number", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 3);

    // Limit caps the page size, newest first
    let posts: Vec<serde_json::Value> = client
        .get(format!("{}/api/posts?limit=2", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["text"], "something else entirely");

    // Cursor continues past the previous page
    let cursor = posts[1]["created_at"].as_str().unwrap();
    let next: Vec<serde_json::Value> = client
        .get(format!("{}/api/posts?limit=10&cursor={}", address, cursor))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(next.len(), 2);

    // Cross-entity search
    let results: serde_json::Value = client
        .get(format!("{}/api/search?q=number", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results["posts"].as_array().unwrap().len(), 3);
    assert!(results["groups"].as_array().unwrap().is_empty());

    let results: serde_json::Value = client
        .get(format!("{}/api/search?q={}", address, author))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results["authors"].as_array().unwrap().len(), 1);

    // Empty query returns empty result sets
    let results: serde_json::Value = client
        .get(format!("{}/api/search", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results["posts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn profile_me_aggregates() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let author = unique_name("author");
    let fan = unique_name("fan");
    let token_author = register_and_login(&client, &address, &author).await;
    let token_fan = register_and_login(&client, &address, &fan).await;

    let post_id = create_post(&client, &address, &token_author, "count me").await;

    client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/users/{}/follow", address, author))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap();

    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token_author))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(me["username"], author.as_str());
    assert_eq!(me["posts_count"], 1);
    assert_eq!(me["followers_count"], 1);
    assert_eq!(me["following_count"], 0);
    assert_eq!(me["likes_received"], 1);
    assert_eq!(me["dislikes_received"], 0);

    let me_fan: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token_fan))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me_fan["following_count"], 1);
    assert_eq!(me_fan["likes_received"], 0);

    // The author's post listing is reachable by username
    let posts: Vec<serde_json::Value> = client
        .get(format!("{}/api/users/{}/posts", address, author))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["like_count"], 1);
}
