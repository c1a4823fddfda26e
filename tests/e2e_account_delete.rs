//! E2E tests for account self-deletion

mod common;

use common::TestServer;

#[tokio::test]
async fn test_delete_requires_authentication() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/v1/accounts/delete"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_delete_rejects_unknown_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/v1/accounts/delete"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_self_delete_runs_cascade_in_background() {
    let server = TestServer::new().await;
    let alice = server.create_local_user("alice", false).await;
    let remote = server.create_remote_account("bob", "remote.example").await;

    server.create_follow(&alice.account, &remote).await;
    server.create_follow(&remote, &alice.account).await;
    for _ in 0..3 {
        server.create_status(&alice.account).await;
    }

    let response = server
        .client
        .post(server.url("/api/v1/accounts/delete"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let db = server.state.db.clone();
    let account_id = alice.account.id.clone();
    let finished = server
        .wait_until(|| {
            let db = db.clone();
            let account_id = account_id.clone();
            async move {
                let suspended = db
                    .get_account_by_id(&account_id)
                    .await
                    .map(|account| account.is_suspended())
                    .unwrap_or(false);
                let statuses = db.count_account_statuses(&account_id).await.unwrap_or(-1);
                suspended && statuses == 0
            }
        })
        .await;
    assert!(finished, "deletion cascade did not finish");

    let account = server.state.db.get_account_by_id(&alice.account.id).await.unwrap();
    assert_eq!(account.suspension_origin.as_deref(), Some(alice.account.id.as_str()));
    assert_eq!(account.display_name, None);

    assert!(
        server
            .state
            .db
            .get_account_follows(&alice.account.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        server
            .state
            .db
            .get_account_followers(&alice.account.id)
            .await
            .unwrap()
            .is_empty()
    );

    let outbox = server.state.db.get_outbox_activities().await.unwrap();
    let count = |activity: &str, object: &str| {
        outbox
            .iter()
            .filter(|a| a.activity_type == activity && a.object_type == object)
            .count()
    };
    assert_eq!(count("Delete", "Person"), 1);
    assert_eq!(count("Undo", "Follow"), 1);
    assert_eq!(count("Delete", "Note"), 3);
}

#[tokio::test]
async fn test_token_is_revoked_by_deletion() {
    let server = TestServer::new().await;
    let alice = server.create_local_user("alice", false).await;

    let response = server
        .client
        .post(server.url("/api/v1/accounts/delete"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let db = server.state.db.clone();
    let user_id = alice.user.id.clone();
    let revoked = server
        .wait_until(|| {
            let db = db.clone();
            let user_id = user_id.clone();
            async move {
                db.get_tokens_by_user_id(&user_id)
                    .await
                    .map(|tokens| tokens.is_empty())
                    .unwrap_or(false)
            }
        })
        .await;
    assert!(revoked, "tokens were not removed");

    let response = server
        .client
        .post(server.url("/api/v1/accounts/delete"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}
