//! Share Nextcloud files into Nextcloud Talk conversations.
//!
//! This crate provides:
//! - Public link shares, with a WebDAV-backed fallback when the sharing API
//!   answers without a share record
//! - Conversation shares announced with a chat message
//! - Decoding of the loosely-typed OCS and WebDAV responses
//!
//! # Example
//!
//! ```rust,ignore
//! use talk_share::{FileShareOperation, TalkConfig, TalkSession};
//!
//! let session = TalkSession::new(TalkConfig::from_env()?)?;
//! let sharer = FileShareOperation::new(session);
//!
//! let url = sharer.share_as_public_link("/Talk/cat.png").await?;
//! let file_id = sharer.share_to_conversation("/Talk/cat.png", "a1b2c3d4").await?;
//! ```
//!
//! # Configuration
//!
//! Required environment variables for `TalkConfig::from_env`:
//! - `NEXTCLOUD_URL` - Base URL of the instance
//! - `NEXTCLOUD_USER` - Login name
//! - `NEXTCLOUD_APP_PASSWORD` - App password
//!
//! Optional:
//! - `NEXTCLOUD_TIMEOUT_SECS` - Request timeout

pub mod chat;
pub mod config;
pub mod error;
pub mod http_client;
pub mod ocs;
pub mod session;
pub mod share;
pub mod webdav;

// Re-export main types
pub use chat::ChatMessage;
pub use config::TalkConfig;
pub use error::{ShareError, ShareResult};
pub use ocs::{OcsEnvelope, ShareData, ShareObject};
pub use session::TalkSession;
pub use share::{FileShareOperation, ShareMode, ShareRequest, ShareTarget, SharedFile};
pub use webdav::{FileProperties, ResourceType};
