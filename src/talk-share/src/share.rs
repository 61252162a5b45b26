//! Sharing a file into a conversation.
//!
//! Two modes are supported:
//! - public link: create a read-only link share and return its URL
//! - conversation: share the file with a Talk room and post a chat message
//!   that references it
//!
//! Each call is a single linear attempt. The only recovery path is the
//! public-link fallback: when the server answers with no share record, the
//! file is looked up over WebDAV and the share request is issued once more
//! to obtain a token.

use reqwest::{Method, StatusCode};
use tracing::{info, warn};

use crate::chat::{ChatMessage, send_chat_message};
use crate::error::{ShareError, ShareResult};
use crate::ocs::OcsEnvelope;
use crate::session::TalkSession;
use crate::webdav::{FileProperties, propfind};

/// `shareType` of a public link share.
pub const SHARE_TYPE_PUBLIC_LINK: u8 = 3;

/// `shareType` of a share with a Talk conversation.
pub const SHARE_TYPE_ROOM: u8 = 10;

/// Read-only permission bit.
pub const PERMISSION_READ: u8 = 1;

/// Who a share is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareTarget {
    /// Anyone holding the link.
    PublicLink,
    /// Members of the conversation with this token.
    Conversation(String),
}

/// Parameters of one share-creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub path: String,
    pub target: ShareTarget,
}

impl ShareRequest {
    /// A read-only public link without expiry or public upload.
    pub fn public_link(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: ShareTarget::PublicLink,
        }
    }

    /// A share with a Talk conversation.
    pub fn conversation(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: ShareTarget::Conversation(token.into()),
        }
    }

    /// The OCS `shareType` for this request.
    pub fn share_type(&self) -> u8 {
        match self.target {
            ShareTarget::PublicLink => SHARE_TYPE_PUBLIC_LINK,
            ShareTarget::Conversation(_) => SHARE_TYPE_ROOM,
        }
    }

    /// Form parameters sent to the sharing endpoint.
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("shareType", self.share_type().to_string()),
            ("path", self.path.clone()),
        ];
        match &self.target {
            ShareTarget::PublicLink => {
                params.push(("permissions", PERMISSION_READ.to_string()));
                params.push(("expireDate", String::new()));
                params.push(("publicUpload", "false".to_string()));
            }
            ShareTarget::Conversation(token) => {
                params.push(("shareWith", token.clone()));
            }
        }
        params
    }
}

/// Which of the two sharing flows to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareMode {
    ShareAsPublicLink,
    ShareToConversation { token: String },
}

/// Result of a share operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedFile {
    /// URL of a public link share.
    PublicUrl(String),
    /// Identifier of the file shared into a conversation.
    FileId(String),
}

impl SharedFile {
    /// The URL or identifier as a plain string.
    pub fn as_str(&self) -> &str {
        match self {
            SharedFile::PublicUrl(value) | SharedFile::FileId(value) => value,
        }
    }
}

/// Shares files through one authenticated session.
#[derive(Debug, Clone)]
pub struct FileShareOperation {
    session: TalkSession,
}

impl FileShareOperation {
    pub fn new(session: TalkSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &TalkSession {
        &self.session
    }

    /// Run the flow selected by `mode`.
    pub async fn share(&self, path: &str, mode: &ShareMode) -> ShareResult<SharedFile> {
        match mode {
            ShareMode::ShareAsPublicLink => self
                .share_as_public_link(path)
                .await
                .map(SharedFile::PublicUrl),
            ShareMode::ShareToConversation { token } => self
                .share_to_conversation(path, token)
                .await
                .map(SharedFile::FileId),
        }
    }

    /// Create a public link for `path` and return its URL.
    pub async fn share_as_public_link(&self, path: &str) -> ShareResult<String> {
        let request = ShareRequest::public_link(require_path(path)?);
        let envelope = self.create_share(&request).await?;

        if let Some(url) = envelope.public_url()? {
            info!("Shared {} as {}", path, url);
            return Ok(url.to_string());
        }

        info!("Share response for {} carried no data, resolving via WebDAV", path);
        self.resolve_public_url(&request).await
    }

    /// Share `path` with a conversation, announce it in the chat and return
    /// the file identifier.
    pub async fn share_to_conversation(&self, path: &str, token: &str) -> ShareResult<String> {
        if token.is_empty() {
            return Err(ShareError::Config("Conversation token is empty".to_string()));
        }

        let request = ShareRequest::conversation(require_path(path)?, token);
        let envelope = self.create_share(&request).await?;
        let file_id = envelope.id()?.to_string();

        let message = ChatMessage::file_reference(&file_id, self.session.config().user(), token);
        send_chat_message(&self.session, token, &message).await?;

        info!("Shared {} into conversation {} as {}", path, token, file_id);
        Ok(file_id)
    }

    /// Look up the WebDAV properties of `path`.
    pub async fn file_properties(&self, path: &str) -> ShareResult<FileProperties> {
        propfind(&self.session, require_path(path)?).await
    }

    /// Confirm the file exists, re-issue the share request and build the
    /// URL from the returned token.
    async fn resolve_public_url(&self, request: &ShareRequest) -> ShareResult<String> {
        propfind(&self.session, &request.path).await?;

        let envelope = self.create_share(request).await?;
        let token = envelope.token()?;

        let url = self.session.public_share_url(token);
        info!("Shared {} as {} via token fallback", request.path, url);
        Ok(url)
    }

    async fn create_share(&self, request: &ShareRequest) -> ShareResult<OcsEnvelope> {
        let url = self.session.shares_url()?;
        let http_request = self
            .session
            .ocs_request(Method::POST, url)
            .form(&request.form_params());
        let response = self.session.send("share POST", http_request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                "Share creation for {} failed with status {}",
                request.path, status
            );
            return Err(ShareError::ShareCreation {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        OcsEnvelope::parse(&body)
    }
}

fn require_path(path: &str) -> ShareResult<&str> {
    if path.trim_matches('/').is_empty() {
        return Err(ShareError::Config(format!("Invalid file path {:?}", path)));
    }
    Ok(path)
}
