//! Integration tests for the chat endpoints
//!
//! These tests use `#[sqlx::test]`, which creates a fresh SQLite database for
//! each test, applies the migrations and loads the listed fixtures.

mod common;

#[cfg(test)]
mod chat_tests {
    use super::common::*;
    use axum_test::http::StatusCode;
    use courier::core::{BlockPolicy, ChatPolicy, ErrorKind};
    use courier::services::chat as chat_service;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    // ============================================================
    // Authentication
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_health_check_needs_no_token(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        app.server.get("/").await.assert_status_ok();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_get_chats_without_token(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let response = app.server.get("/chats").await;
        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["code"], "AUTH_ERROR");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_get_chats_with_invalid_token(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        app.server
            .get("/chats")
            .add_header(authorization(), "Bearer invalid_token_here")
            .await
            .assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_token_for_unknown_identity_is_rejected(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        app.server
            .get("/chats")
            .add_header(authorization(), bearer(99))
            .await
            .assert_status_unauthorized();
        Ok(())
    }

    // ============================================================
    // Personal chats
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_personal_chat_is_unique_in_both_directions(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);

        let response = app
            .server
            .post("/chats/personal")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": BOB }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let chat: Value = response.json();
        assert_eq!(chat["kind"], "personal");
        assert!(chat["name"].is_null());

        let response = app
            .server
            .post("/chats/personal")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": BOB }))
            .await;
        response.assert_status_conflict();

        // same pair, opposite order
        let response = app
            .server
            .post("/chats/personal")
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "target_user_id": ALICE }))
            .await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["code"], "CONFLICT");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_personal_chat_creates_both_members(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;

        let members: Vec<Value> = app
            .server
            .get(&format!("/chats/{}/members", chat_id))
            .add_header(authorization(), bearer(BOB))
            .await
            .json();
        let ids: Vec<i64> = members.iter().map(|m| m["user_id"].as_i64().unwrap()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&1) && ids.contains(&2));
        assert!(members.iter().all(|m| m["is_admin"] == false));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_personal_chat_with_unknown_user(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let response = app
            .server
            .post("/chats/personal")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": 42 }))
            .await;
        response.assert_status_not_found();

        // nothing half-created
        let chats: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(chats, 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_personal_chat_with_oneself(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        app.server
            .post("/chats/personal")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": ALICE }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    // ============================================================
    // Group chats
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_group_creator_is_sole_admin(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let response = app
            .server
            .post("/chats/group")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "name": "Team", "description": "all of us", "member_ids": [2, 3, 2] }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let chat: Value = response.json();
        assert_eq!(chat["kind"], "group");
        assert_eq!(chat["name"], "Team");
        let chat_id = chat["chat_id"].as_i64().unwrap();

        let details: Value = app
            .server
            .get(&format!("/chats/{}", chat_id))
            .add_header(authorization(), bearer(CHARLIE))
            .await
            .json();
        let members = details["members"].as_array().unwrap();
        assert_eq!(members.len(), 3);
        let admins: Vec<i64> = members
            .iter()
            .filter(|m| m["is_admin"] == true)
            .map(|m| m["user_id"].as_i64().unwrap())
            .collect();
        assert_eq!(admins, vec![1]);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_group_needs_another_participant(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);

        app.server
            .post("/chats/group")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "member_ids": [] }))
            .await
            .assert_status_bad_request();

        // only the creator listed
        app.server
            .post("/chats/group")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "member_ids": [1] }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_group_with_unknown_member_creates_nothing(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        app.server
            .post("/chats/group")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "member_ids": [2, 77] }))
            .await
            .assert_status_not_found();

        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_members")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(members, 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_group_name_too_long(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        app.server
            .post("/chats/group")
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "name": "x".repeat(101), "member_ids": [2] }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    // ============================================================
    // Reading chats
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_list_chats_returns_only_own_chats(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        personal_chat(&app.state, ALICE, BOB).await;
        group_chat(&app.state, ALICE, &[CHARLIE]).await;
        personal_chat(&app.state, CHARLIE, DAVE).await;

        let chats: Vec<Value> = app
            .server
            .get("/chats")
            .add_header(authorization(), bearer(ALICE))
            .await
            .json();
        assert_eq!(chats.len(), 2);

        let chats: Vec<Value> = app
            .server
            .get("/chats")
            .add_header(authorization(), bearer(BOB))
            .await
            .json();
        assert_eq!(chats.len(), 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_get_chat_requires_membership(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;

        let response = app
            .server
            .get(&format!("/chats/{}", chat_id))
            .add_header(authorization(), bearer(CHARLIE))
            .await;
        response.assert_status_forbidden();
        let body: Value = response.json();
        assert_eq!(body["code"], "FORBIDDEN");

        app.server
            .get("/chats/999")
            .add_header(authorization(), bearer(ALICE))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Blocks
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_and_unblock_flow(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;

        let response = app
            .server
            .post(&format!("/chats/{}/block", chat_id))
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": BOB }))
            .await;
        response.assert_status_ok();
        let ack: Value = response.json();
        assert_eq!(ack["blocked"], true);
        assert_eq!(ack["already_blocked"], false);

        // repeated block is acknowledged without a second entry
        let ack: Value = app
            .server
            .post(&format!("/chats/{}/block", chat_id))
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": BOB }))
            .await
            .json();
        assert_eq!(ack["already_blocked"], true);

        let blocked: Vec<Value> = app
            .server
            .get(&format!("/chats/{}/blocked", chat_id))
            .add_header(authorization(), bearer(BOB))
            .await
            .json();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0]["user_id"], 2);
        assert_eq!(blocked[0]["blocked_by"], 1);
        assert!(chat_service::is_blocked(&app.state, chat_id, BOB).await.unwrap());

        // the blocked party cannot lift the block
        app.server
            .delete(&format!("/chats/{}/block/{}", chat_id, BOB))
            .add_header(authorization(), bearer(BOB))
            .await
            .assert_status_forbidden();

        app.server
            .delete(&format!("/chats/{}/block/{}", chat_id, BOB))
            .add_header(authorization(), bearer(ALICE))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(!chat_service::is_blocked(&app.state, chat_id, BOB).await.unwrap());

        // nothing left to unblock
        app.server
            .delete(&format!("/chats/{}/block/{}", chat_id, BOB))
            .add_header(authorization(), bearer(ALICE))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_in_group_is_invalid_operation(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = group_chat(&app.state, ALICE, &[BOB]).await;

        let response = app
            .server
            .post(&format!("/chats/{}/block", chat_id))
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "target_user_id": BOB }))
            .await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_OPERATION");

        let err = chat_service::unblock_user(&app.state, chat_id, BOB, ALICE)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_target_must_be_in_chat(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;

        let err = chat_service::block_user(&app.state, chat_id, CHARLIE, ALICE)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // outsiders cannot block anyone
        let err = chat_service::block_user(&app.state, chat_id, BOB, CHARLIE)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_membership_queries(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;

        assert!(chat_service::is_member(&app.state, chat_id, ALICE).await.unwrap());
        assert!(!chat_service::is_member(&app.state, chat_id, CHARLIE).await.unwrap());
        assert_eq!(
            chat_service::is_member(&app.state, 999, ALICE)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_symmetric_policy_gates_the_blocker_too(pool: SqlitePool) -> sqlx::Result<()> {
        let policy = ChatPolicy {
            block_policy: BlockPolicy::Symmetric,
            ..ChatPolicy::default()
        };
        let app = create_test_app_with_policy(pool, policy);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;

        chat_service::block_user(&app.state, chat_id, BOB, ALICE)
            .await
            .unwrap();
        assert!(chat_service::is_blocked(&app.state, chat_id, BOB).await.unwrap());
        assert!(chat_service::is_blocked(&app.state, chat_id, ALICE).await.unwrap());
        Ok(())
    }

    // ============================================================
    // Concurrent creation
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_concurrent_personal_chat_creation_has_one_winner(
        pool: SqlitePool,
    ) -> sqlx::Result<()> {
        let app = create_test_app(pool);

        let mut handles = Vec::new();
        for i in 0..8 {
            let state = app.state.clone();
            let (a, b) = if i % 2 == 0 { (ALICE, BOB) } else { (BOB, ALICE) };
            handles.push(tokio::spawn(async move {
                chat_service::create_personal_chat(&state, a, b).await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {}", err);
                    conflicts += 1;
                }
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_concurrent_group_creations_all_succeed(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let state = app.state.clone();
            handles.push(tokio::spawn(async move {
                chat_service::create_group_chat(&state, ALICE, None, None, vec![BOB, CHARLIE])
                    .await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "group creation failed: {:?}", result.err());
        }

        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_members")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(members, 30);
        Ok(())
    }
}
