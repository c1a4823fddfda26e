//! Common test utilities for E2E tests

#![allow(dead_code)]

use chrono::Utc;
use sqlx::types::Json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tombstone::data::{Account, Client, EntityId, Follow, Status, Token, User};
use tombstone::{AppState, config};

/// Test server instance with a running client API worker
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub cancel: CancellationToken,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A local account with its user and an access token
pub struct TestUser {
    pub account: Account,
    pub user: User,
    pub token: String,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            cache: config::CacheConfig {
                account_max_items: 100,
                media_max_items: 100,
                ttl_seconds: 60,
            },
            media: config::MediaConfig {
                storage_path: temp_dir.path().join("media"),
                remote_cache_days: 30,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let cancel = CancellationToken::new();
        let (state, receiver) = AppState::new(config, cancel.clone()).await.unwrap();
        tokio::spawn(
            state
                .client_api_processor
                .clone()
                .run(receiver, cancel.clone()),
        );

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = tombstone::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            cancel,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Store a remote account
    pub async fn create_remote_account(&self, username: &str, domain: &str) -> Account {
        let account = account_row(username, domain, &format!("https://{domain}/users/{username}"));
        self.state.accounts.put_account(&account).await.unwrap();
        account
    }

    /// Create a local account, its user, and a bearer token
    pub async fn create_local_user(&self, username: &str, admin: bool) -> TestUser {
        let now = Utc::now();
        let account = account_row(
            username,
            "",
            &format!("https://test.example.com/users/{username}"),
        );
        self.state.accounts.put_account(&account).await.unwrap();

        let user = User {
            id: EntityId::new().0,
            account_id: account.id.clone(),
            email: format!("{username}@test.example.com"),
            admin,
            encrypted_password: "not-a-real-hash".to_string(),
            sign_up_ip: None,
            current_sign_in_at: None,
            current_sign_in_ip: None,
            last_sign_in_at: None,
            last_sign_in_ip: None,
            sign_in_count: 0,
            locale: Some("en".to_string()),
            created_by_application_id: None,
            last_emailed_at: None,
            confirmation_token: None,
            confirmation_sent_at: None,
            reset_password_token: None,
            reset_password_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.state.db.insert_user(&user).await.unwrap();

        let client = Client {
            id: EntityId::new().0,
            secret: EntityId::new().0,
            domain: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            user_id: Some(user.id.clone()),
            created_at: now,
        };
        self.state.db.insert_client(&client).await.unwrap();

        let token = Token {
            id: EntityId::new().0,
            client_id: client.id.clone(),
            user_id: user.id.clone(),
            access: format!("token-{}", EntityId::new().0),
            scope: "read write".to_string(),
            created_at: now,
        };
        self.state.db.insert_token(&token).await.unwrap();

        TestUser {
            account,
            user,
            token: token.access,
        }
    }

    /// Store a public status by `account`
    pub async fn create_status(&self, account: &Account) -> Status {
        let now = Utc::now();
        let id = EntityId::new().0;
        let status = Status {
            uri: format!("{}/statuses/{id}", account.uri),
            id,
            account_id: account.id.clone(),
            content: "<p>hello</p>".to_string(),
            visibility: "public".to_string(),
            local: account.domain.is_empty(),
            in_reply_to_id: None,
            boost_of_id: None,
            boost_of_account_id: None,
            created_at: now,
            updated_at: now,
            account: None,
        };
        self.state.db.insert_status(&status).await.unwrap();
        status
    }

    /// Store a follow from `from` to `to`
    pub async fn create_follow(&self, from: &Account, to: &Account) -> Follow {
        let now = Utc::now();
        let id = EntityId::new().0;
        let follow = Follow {
            uri: format!("{}/follows/{id}", from.uri),
            id,
            account_id: from.id.clone(),
            target_account_id: to.id.clone(),
            created_at: now,
            updated_at: now,
            account: None,
            target_account: None,
        };
        self.state.db.insert_follow(&follow).await.unwrap();
        follow
    }

    /// Poll `check` until it holds or a few seconds pass
    pub async fn wait_until<F, Fut>(&self, mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if check().await {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        false
    }
}

fn account_row(username: &str, domain: &str, uri: &str) -> Account {
    let now = Utc::now();
    Account {
        id: EntityId::new().0,
        username: username.to_string(),
        domain: domain.to_string(),
        uri: uri.to_string(),
        inbox_uri: Some(format!("{uri}/inbox")),
        display_name: Some(username.to_string()),
        note: Some("<p>bio</p>".to_string()),
        note_raw: Some("bio".to_string()),
        avatar_media_attachment_id: None,
        avatar_remote_url: None,
        header_media_attachment_id: None,
        header_remote_url: None,
        emojis: Json(vec![]),
        fields: Json(vec![]),
        memorial: false,
        also_known_as: None,
        moved_to_account_id: None,
        reason: None,
        discoverable: true,
        status_content_type: None,
        custom_css: None,
        hide_collections: false,
        enable_rss: false,
        fetched_at: None,
        suspended_at: None,
        suspension_origin: None,
        created_at: now,
        updated_at: now,
    }
}
