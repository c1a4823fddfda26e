//! Row builders shared by unit tests

use chrono::Utc;
use sqlx::types::Json;
use tempfile::TempDir;

use super::*;

/// Helper to create a test database
pub(crate) async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

pub(crate) fn local_account(username: &str) -> Account {
    account(username, "", &format!("http://localhost/users/{username}"))
}

pub(crate) fn remote_account(username: &str, domain: &str) -> Account {
    account(username, domain, &format!("https://{domain}/users/{username}"))
}

fn account(username: &str, domain: &str, uri: &str) -> Account {
    let now = Utc::now();
    Account {
        id: EntityId::new().0,
        username: username.to_string(),
        domain: domain.to_string(),
        uri: uri.to_string(),
        inbox_uri: Some(format!("{uri}/inbox")),
        display_name: Some(format!("{username} display")),
        note: Some("<p>hello</p>".to_string()),
        note_raw: Some("hello".to_string()),
        avatar_media_attachment_id: None,
        avatar_remote_url: None,
        header_media_attachment_id: None,
        header_remote_url: None,
        emojis: Json(vec![]),
        fields: Json(vec![AccountField {
            name: "site".to_string(),
            value: "https://example.org".to_string(),
        }]),
        memorial: false,
        also_known_as: None,
        moved_to_account_id: None,
        reason: Some("let me in".to_string()),
        discoverable: true,
        status_content_type: Some("text/markdown".to_string()),
        custom_css: Some("body {}".to_string()),
        hide_collections: false,
        enable_rss: true,
        fetched_at: None,
        suspended_at: None,
        suspension_origin: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn user_for(account: &Account) -> User {
    let now = Utc::now();
    User {
        id: EntityId::new().0,
        account_id: account.id.clone(),
        email: format!("{}@example.org", account.username),
        admin: false,
        encrypted_password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        sign_up_ip: Some("192.0.2.1".to_string()),
        current_sign_in_at: Some(now),
        current_sign_in_ip: Some("192.0.2.1".to_string()),
        last_sign_in_at: Some(now),
        last_sign_in_ip: Some("192.0.2.2".to_string()),
        sign_in_count: 3,
        locale: Some("en".to_string()),
        created_by_application_id: None,
        last_emailed_at: None,
        confirmation_token: Some("confirm".to_string()),
        confirmation_sent_at: Some(now),
        reset_password_token: Some("reset".to_string()),
        reset_password_sent_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn status_by(account: &Account) -> Status {
    let now = Utc::now();
    let id = EntityId::new().0;
    Status {
        uri: format!("{}/statuses/{id}", account.uri),
        id,
        account_id: account.id.clone(),
        content: "<p>post</p>".to_string(),
        visibility: "public".to_string(),
        local: account.is_local(),
        in_reply_to_id: None,
        boost_of_id: None,
        boost_of_account_id: None,
        created_at: now,
        updated_at: now,
        account: None,
    }
}

pub(crate) fn boost_of(booster: &Account, original: &Status) -> Status {
    let mut boost = status_by(booster);
    boost.content = String::new();
    boost.boost_of_id = Some(original.id.clone());
    boost.boost_of_account_id = Some(original.account_id.clone());
    boost
}

pub(crate) fn follow(from: &Account, to: &Account) -> Follow {
    let now = Utc::now();
    let id = EntityId::new().0;
    Follow {
        uri: format!("{}/follows/{id}", from.uri),
        id,
        account_id: from.id.clone(),
        target_account_id: to.id.clone(),
        created_at: now,
        updated_at: now,
        account: None,
        target_account: None,
    }
}

pub(crate) fn follow_request(from: &Account, to: &Account) -> FollowRequest {
    let follow = follow(from, to);
    FollowRequest {
        id: follow.id,
        uri: follow.uri,
        account_id: follow.account_id,
        target_account_id: follow.target_account_id,
        created_at: follow.created_at,
        updated_at: follow.updated_at,
        account: None,
        target_account: None,
    }
}

pub(crate) fn media_for(account: &Account) -> MediaAttachment {
    let now = Utc::now();
    let id = EntityId::new().0;
    MediaAttachment {
        url: Some(format!("http://localhost/media/{id}.webp")),
        file_path: Some(format!("{}/attachment/original/{id}.webp", account.id)),
        thumbnail_path: Some(format!("{}/attachment/small/{id}.webp", account.id)),
        id,
        status_id: None,
        account_id: account.id.clone(),
        remote_url: None,
        content_type: "image/webp".to_string(),
        file_size: 1024,
        description: None,
        blurhash: None,
        avatar: false,
        header: false,
        cached: true,
        created_at: now,
        updated_at: now,
    }
}
