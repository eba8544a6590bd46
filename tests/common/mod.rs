#![allow(dead_code)]

use axum_test::TestServer;
use axum_test::http::HeaderName;
use chrono::{DateTime, Utc};
use courier::core::{AppState, ChatPolicy, JwtVerifier, ManualClock};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

pub const ALICE: i32 = 1;
pub const BOB: i32 = 2;
pub const CHARLIE: i32 = 3;
pub const DAVE: i32 = 4;

/// Starting instant of the test clock
pub fn test_start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).expect("valid timestamp")
}

/// State, manual clock and HTTP server shared by one test
pub struct TestApp {
    pub pool: SqlitePool,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub server: TestServer,
}

/// Builds a test AppState with the default policy
///
/// # Arguments
/// * `pool` - SQLite connection pool (already migrated by `#[sqlx::test]`)
pub fn create_test_app(pool: SqlitePool) -> TestApp {
    create_test_app_with_policy(pool, ChatPolicy::default())
}

pub fn create_test_app_with_policy(pool: SqlitePool, policy: ChatPolicy) -> TestApp {
    let clock = Arc::new(ManualClock::new(test_start()));
    let state = Arc::new(
        AppState::new(pool.clone(), Arc::new(JwtVerifier::new(JWT_SECRET)), policy)
            .with_clock(clock.clone()),
    );
    let server = create_test_server(state.clone());
    TestApp {
        pool,
        state,
        clock,
        server,
    }
}

/// Builds a TestServer around the router
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = courier::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Mints a JWT for tests
///
/// # Arguments
/// * `user_id` - Identity the token is issued for
/// * `username` - Username claim
/// * `jwt_secret` - Signing secret
///
/// # Returns
/// A JWT valid for 24 hours
pub fn create_test_jwt(user_id: i32, username: &str, jwt_secret: &str) -> String {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Claims {
        id: i32,
        username: String,
        exp: usize,
        iat: usize,
    }

    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        id: user_id,
        username: username.to_string(),
        exp: expiration,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("Failed to create JWT token")
}

pub fn token_for(user_id: i32) -> String {
    let username = match user_id {
        ALICE => "alice",
        BOB => "bob",
        CHARLIE => "charlie",
        DAVE => "dave",
        _ => "ghost",
    };
    create_test_jwt(user_id, username, JWT_SECRET)
}

pub fn authorization() -> HeaderName {
    HeaderName::from_static("authorization")
}

/// `Bearer <token>` value for the given user
pub fn bearer(user_id: i32) -> String {
    format!("Bearer {}", token_for(user_id))
}

/// Personal chat between `a` and `b`
pub async fn personal_chat(state: &AppState, a: i32, b: i32) -> i32 {
    courier::services::chat::create_personal_chat(state, a, b)
        .await
        .expect("personal chat")
        .chat_id
}

/// Group created by `creator` with the given members
pub async fn group_chat(state: &AppState, creator: i32, members: &[i32]) -> i32 {
    courier::services::chat::create_group_chat(
        state,
        creator,
        Some("team".to_string()),
        None,
        members.to_vec(),
    )
    .await
    .expect("group chat")
    .chat_id
}

pub async fn send(state: &AppState, chat_id: i32, author: i32, content: &str) -> i32 {
    courier::services::message::send_message(state, chat_id, author, content.to_string(), None)
        .await
        .expect("message sent")
        .message_id
}
