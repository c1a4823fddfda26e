//! Data models
//!
//! Rust structs representing database entities and cache items.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account
// =============================================================================

/// A local or remote actor
///
/// An empty `domain` means the account lives on this instance.
/// Rows are never removed: deletion turns them into suspended stubs
/// so remote references to the id and URI stay valid.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// Empty for local accounts
    pub domain: String,
    /// ActivityPub actor URI
    pub uri: String,
    pub inbox_uri: Option<String>,
    pub display_name: Option<String>,
    /// Rendered bio (HTML)
    pub note: Option<String>,
    /// Bio as typed by the user
    pub note_raw: Option<String>,
    pub avatar_media_attachment_id: Option<String>,
    pub avatar_remote_url: Option<String>,
    pub header_media_attachment_id: Option<String>,
    pub header_remote_url: Option<String>,
    /// Custom emoji IDs used in the profile
    pub emojis: Json<Vec<String>>,
    /// Profile metadata fields
    pub fields: Json<Vec<AccountField>>,
    pub memorial: bool,
    pub also_known_as: Option<String>,
    pub moved_to_account_id: Option<String>,
    /// Sign-up reason given to moderators
    pub reason: Option<String>,
    pub discoverable: bool,
    pub status_content_type: Option<String>,
    pub custom_css: Option<String>,
    pub hide_collections: bool,
    pub enable_rss: bool,
    /// When a remote account was last dereferenced
    pub fetched_at: Option<DateTime<Utc>>,
    pub suspended_at: Option<DateTime<Utc>>,
    /// Account ID or domain block ID that caused the suspension
    pub suspension_origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether this account lives on this instance
    pub fn is_local(&self) -> bool {
        self.domain.is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

/// A name/value pair shown on a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountField {
    pub name: String,
    pub value: String,
}

/// Persistable account columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountColumn {
    InboxUri,
    DisplayName,
    Note,
    NoteRaw,
    AvatarMediaAttachmentId,
    AvatarRemoteUrl,
    HeaderMediaAttachmentId,
    HeaderRemoteUrl,
    Emojis,
    Fields,
    Memorial,
    AlsoKnownAs,
    MovedToAccountId,
    Reason,
    Discoverable,
    StatusContentType,
    CustomCss,
    HideCollections,
    EnableRss,
    FetchedAt,
    SuspendedAt,
    SuspensionOrigin,
    UpdatedAt,
}

impl AccountColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InboxUri => "inbox_uri",
            Self::DisplayName => "display_name",
            Self::Note => "note",
            Self::NoteRaw => "note_raw",
            Self::AvatarMediaAttachmentId => "avatar_media_attachment_id",
            Self::AvatarRemoteUrl => "avatar_remote_url",
            Self::HeaderMediaAttachmentId => "header_media_attachment_id",
            Self::HeaderRemoteUrl => "header_remote_url",
            Self::Emojis => "emojis",
            Self::Fields => "fields",
            Self::Memorial => "memorial",
            Self::AlsoKnownAs => "also_known_as",
            Self::MovedToAccountId => "moved_to_account_id",
            Self::Reason => "reason",
            Self::Discoverable => "discoverable",
            Self::StatusContentType => "status_content_type",
            Self::CustomCss => "custom_css",
            Self::HideCollections => "hide_collections",
            Self::EnableRss => "enable_rss",
            Self::FetchedAt => "fetched_at",
            Self::SuspendedAt => "suspended_at",
            Self::SuspensionOrigin => "suspension_origin",
            Self::UpdatedAt => "updated_at",
        }
    }
}

// =============================================================================
// User and OAuth
// =============================================================================

/// Credentials and session metadata for a local account
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub account_id: String,
    /// Kept after deletion so the address cannot sign up again
    pub email: String,
    pub admin: bool,
    pub encrypted_password: String,
    pub sign_up_ip: Option<String>,
    pub current_sign_in_at: Option<DateTime<Utc>>,
    pub current_sign_in_ip: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub last_sign_in_ip: Option<String>,
    pub sign_in_count: i64,
    pub locale: Option<String>,
    pub created_by_application_id: Option<String>,
    pub last_emailed_at: Option<DateTime<Utc>>,
    pub confirmation_token: Option<String>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub reset_password_token: Option<String>,
    pub reset_password_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistable user columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserColumn {
    EncryptedPassword,
    SignUpIp,
    CurrentSignInAt,
    CurrentSignInIp,
    LastSignInAt,
    LastSignInIp,
    SignInCount,
    Locale,
    CreatedByApplicationId,
    LastEmailedAt,
    ConfirmationToken,
    ConfirmationSentAt,
    ResetPasswordToken,
    ResetPasswordSentAt,
    UpdatedAt,
}

impl UserColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EncryptedPassword => "encrypted_password",
            Self::SignUpIp => "sign_up_ip",
            Self::CurrentSignInAt => "current_sign_in_at",
            Self::CurrentSignInIp => "current_sign_in_ip",
            Self::LastSignInAt => "last_sign_in_at",
            Self::LastSignInIp => "last_sign_in_ip",
            Self::SignInCount => "sign_in_count",
            Self::Locale => "locale",
            Self::CreatedByApplicationId => "created_by_application_id",
            Self::LastEmailedAt => "last_emailed_at",
            Self::ConfirmationToken => "confirmation_token",
            Self::ConfirmationSentAt => "confirmation_sent_at",
            Self::ResetPasswordToken => "reset_password_token",
            Self::ResetPasswordSentAt => "reset_password_sent_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// OAuth application registration
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub created_at: DateTime<Utc>,
}

/// OAuth client
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Client {
    pub id: String,
    pub secret: String,
    pub domain: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// OAuth access token issued to a user through a client
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Token {
    pub id: String,
    pub client_id: String,
    pub user_id: String,
    pub access: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Social graph
// =============================================================================

/// An accepted follow from `account_id` to `target_account_id`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Follow {
    pub id: String,
    /// ActivityPub Follow activity URI
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub account: Option<Account>,
    #[sqlx(skip)]
    pub target_account: Option<Account>,
}

/// A follow awaiting approval by the target
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowRequest {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub account: Option<Account>,
    #[sqlx(skip)]
    pub target_account: Option<Account>,
}

impl FollowRequest {
    /// Follow-shaped view of this request. Never persisted.
    pub fn as_follow(&self) -> Follow {
        Follow {
            id: self.id.clone(),
            uri: self.uri.clone(),
            account_id: self.account_id.clone(),
            target_account_id: self.target_account_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            account: self.account.clone(),
            target_account: self.target_account.clone(),
        }
    }
}

/// An account block
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Block {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Content
// =============================================================================

/// A post, or a reblog of one when `boost_of_id` is set
///
/// For reblogs `account_id` is the booster, not the original author.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Status {
    pub id: String,
    /// ActivityPub URI (globally unique)
    pub uri: String,
    pub account_id: String,
    /// HTML content
    pub content: String,
    /// Visibility: public, unlisted, private, direct
    pub visibility: String,
    pub local: bool,
    pub in_reply_to_id: Option<String>,
    pub boost_of_id: Option<String>,
    pub boost_of_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub account: Option<Account>,
}

/// Notification for user interactions
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    /// Type: mention, favourite, reblog, follow, follow_request
    pub notification_type: String,
    pub origin_account_id: String,
    pub target_account_id: String,
    pub status_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Bookmark of a status
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusBookmark {
    pub id: String,
    /// Who bookmarked
    pub account_id: String,
    /// Author of the bookmarked status
    pub target_account_id: String,
    pub status_id: String,
    pub created_at: DateTime<Utc>,
}

/// Favourite (like) of a status
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusFave {
    pub id: String,
    pub uri: String,
    /// Who faved
    pub account_id: String,
    /// Author of the faved status
    pub target_account_id: String,
    pub status_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Media
// =============================================================================

/// Media file metadata
///
/// Blobs live in media storage; this record holds their paths.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MediaAttachment {
    pub id: String,
    /// Associated status ID (null if not yet attached)
    pub status_id: Option<String>,
    /// Owning account
    pub account_id: String,
    /// Local URL the media is served from
    pub url: Option<String>,
    /// Origin URL for remote media
    pub remote_url: Option<String>,
    /// Blob path of the full-size file
    pub file_path: Option<String>,
    /// Blob path of the thumbnail
    pub thumbnail_path: Option<String>,
    /// MIME type (e.g., "image/webp")
    pub content_type: String,
    /// File size in bytes
    pub file_size: i64,
    /// Alt text description
    pub description: Option<String>,
    /// Blurhash for placeholder
    pub blurhash: Option<String>,
    pub avatar: bool,
    pub header: bool,
    /// Whether the blob is currently held in media storage
    pub cached: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistable media attachment columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaColumn {
    StatusId,
    Url,
    RemoteUrl,
    FilePath,
    ThumbnailPath,
    ContentType,
    FileSize,
    Description,
    Blurhash,
    Avatar,
    Header,
    Cached,
    UpdatedAt,
}

impl MediaColumn {
    pub const ALL: [MediaColumn; 13] = [
        Self::StatusId,
        Self::Url,
        Self::RemoteUrl,
        Self::FilePath,
        Self::ThumbnailPath,
        Self::ContentType,
        Self::FileSize,
        Self::Description,
        Self::Blurhash,
        Self::Avatar,
        Self::Header,
        Self::Cached,
        Self::UpdatedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusId => "status_id",
            Self::Url => "url",
            Self::RemoteUrl => "remote_url",
            Self::FilePath => "file_path",
            Self::ThumbnailPath => "thumbnail_path",
            Self::ContentType => "content_type",
            Self::FileSize => "file_size",
            Self::Description => "description",
            Self::Blurhash => "blurhash",
            Self::Avatar => "avatar",
            Self::Header => "header",
            Self::Cached => "cached",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Custom emoji
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Emoji {
    pub id: String,
    pub shortcode: String,
    /// Empty for local emojis
    pub domain: String,
    pub image_remote_url: Option<String>,
    pub image_path: Option<String>,
    pub cached: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Federation outbox
// =============================================================================

/// An activity waiting for the delivery transport
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutboxActivity {
    pub id: String,
    pub activity_type: String,
    pub object_type: String,
    pub actor_uri: String,
    pub target_uri: Option<String>,
    /// ActivityStreams JSON
    pub payload: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
