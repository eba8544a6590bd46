//! Integration tests for reactions and pinned messages

mod common;

#[cfg(test)]
mod reaction_tests {
    use super::common::*;
    use axum_test::http::StatusCode;
    use courier::core::ErrorKind;
    use courier::services::{message as message_service, reaction as reaction_service};
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    // ============================================================
    // Reactions
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_add_and_list_reactions(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = group_chat(&app.state, ALICE, &[BOB, CHARLIE]).await;
        let message_id = send(&app.state, chat_id, ALICE, "party tonight").await;

        let response = app
            .server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "🎉" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let reaction: Value = response.json();
        assert_eq!(reaction["emoji"], "🎉");
        assert_eq!(reaction["user_id"], 2);
        assert_eq!(reaction["message_id"], message_id);

        // same user, different emoji
        app.server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "👍" }))
            .await
            .assert_status(StatusCode::CREATED);

        // different user, same emoji
        app.server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(CHARLIE))
            .json(&json!({ "emoji": "🎉" }))
            .await
            .assert_status(StatusCode::CREATED);

        let reactions: Vec<Value> = app
            .server
            .get(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(ALICE))
            .await
            .json();
        assert_eq!(reactions.len(), 3);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_duplicate_reaction_is_conflict(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;
        let message_id = send(&app.state, chat_id, ALICE, "hi").await;

        reaction_service::add_reaction(&app.state, message_id, BOB, "❤️")
            .await
            .unwrap();

        let response = app
            .server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "❤️" }))
            .await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["code"], "CONFLICT");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reactions")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_concurrent_identical_reactions_have_one_winner(
        pool: SqlitePool,
    ) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;
        let message_id = send(&app.state, chat_id, ALICE, "hi").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = app.state.clone();
            handles.push(tokio::spawn(async move {
                reaction_service::add_reaction(&state, message_id, BOB, "🔥").await
            }));
        }

        let mut added = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => added += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {}", err),
            }
        }
        assert_eq!(added, 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reactions")
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_remove_reaction(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;
        let message_id = send(&app.state, chat_id, ALICE, "hi").await;
        reaction_service::add_reaction(&app.state, message_id, BOB, "👍")
            .await
            .unwrap();

        // only the reacting user's own reaction is addressed
        app.server
            .delete(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(ALICE))
            .json(&json!({ "emoji": "👍" }))
            .await
            .assert_status_not_found();

        app.server
            .delete(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "👍" }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let err = reaction_service::remove_reaction(&app.state, message_id, BOB, "👍")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_reaction_validation_and_access(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;
        let message_id = send(&app.state, chat_id, ALICE, "hi").await;

        app.server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "" }))
            .await
            .assert_status_bad_request();

        app.server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "👍".repeat(6) }))
            .await
            .assert_status_bad_request();

        app.server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(CHARLIE))
            .json(&json!({ "emoji": "👍" }))
            .await
            .assert_status_forbidden();

        app.server
            .get(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(CHARLIE))
            .await
            .assert_status_forbidden();

        message_service::delete_message(&app.state, message_id, ALICE)
            .await
            .unwrap();
        app.server
            .post(&format!("/messages/{}/reactions", message_id))
            .add_header(authorization(), bearer(BOB))
            .json(&json!({ "emoji": "👍" }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Pinned messages
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_pin_is_admin_only_and_hidden_after_delete(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = group_chat(&app.state, ALICE, &[BOB, CHARLIE]).await;
        let message_id = send(&app.state, chat_id, CHARLIE, "house rules").await;

        let response = app
            .server
            .post(&format!("/messages/{}/pin", message_id))
            .add_header(authorization(), bearer(BOB))
            .await;
        response.assert_status_forbidden();

        let response = app
            .server
            .post(&format!("/messages/{}/pin", message_id))
            .add_header(authorization(), bearer(ALICE))
            .await;
        response.assert_status_ok();
        let message: Value = response.json();
        assert_eq!(message["is_pinned"], true);

        let pinned: Vec<Value> = app
            .server
            .get(&format!("/chats/{}/pinned", chat_id))
            .add_header(authorization(), bearer(BOB))
            .await
            .json();
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0]["message_id"], message_id);

        message_service::delete_message(&app.state, message_id, ALICE)
            .await
            .unwrap();

        let pinned: Vec<Value> = app
            .server
            .get(&format!("/chats/{}/pinned", chat_id))
            .add_header(authorization(), bearer(BOB))
            .await
            .json();
        assert!(pinned.is_empty());

        // the flag itself was never cleared
        let flag: i64 = sqlx::query_scalar("SELECT is_pinned FROM messages WHERE message_id = ?")
            .bind(message_id)
            .fetch_one(&app.pool)
            .await?;
        assert_eq!(flag, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_unpin(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = group_chat(&app.state, ALICE, &[BOB]).await;
        let message_id = send(&app.state, chat_id, BOB, "pin me").await;
        reaction_service::pin_message(&app.state, message_id, ALICE)
            .await
            .unwrap();

        let message: Value = app
            .server
            .delete(&format!("/messages/{}/pin", message_id))
            .add_header(authorization(), bearer(ALICE))
            .await
            .json();
        assert_eq!(message["is_pinned"], false);

        let pinned = reaction_service::list_pinned(&app.state, chat_id, BOB)
            .await
            .unwrap();
        assert!(pinned.is_empty());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_pin_deleted_message_is_invalid_operation(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = group_chat(&app.state, ALICE, &[BOB]).await;
        let message_id = send(&app.state, chat_id, BOB, "gone soon").await;
        message_service::delete_message(&app.state, message_id, BOB)
            .await
            .unwrap();

        let response = app
            .server
            .post(&format!("/messages/{}/pin", message_id))
            .add_header(authorization(), bearer(ALICE))
            .await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_OPERATION");

        app.server
            .post("/messages/4242/pin")
            .add_header(authorization(), bearer(ALICE))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_personal_chat_has_no_admin_to_pin(pool: SqlitePool) -> sqlx::Result<()> {
        let app = create_test_app(pool);
        let chat_id = personal_chat(&app.state, ALICE, BOB).await;
        let message_id = send(&app.state, chat_id, ALICE, "hi").await;

        let err = reaction_service::pin_message(&app.state, message_id, ALICE)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        Ok(())
    }
}
