//! Authenticated access to a Nextcloud instance.
//!
//! `TalkSession` owns the HTTP client and knows how to address the OCS
//! sharing API, the Talk chat API and the WebDAV file tree. It holds no
//! mutable state, so clones can be used from concurrent tasks.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, warn};
use url::Url;

use crate::config::TalkConfig;
use crate::error::{ShareError, ShareResult};
use crate::http_client::create_client_with_timeout;

/// Header the OCS API requires on every call, otherwise it answers 401/CSRF.
pub const OCS_API_REQUEST_HEADER: &str = "OCS-APIRequest";

/// Path of the files_sharing OCS endpoint, relative to the instance root.
const SHARES_PATH: [&str; 7] = [
    "ocs",
    "v2.php",
    "apps",
    "files_sharing",
    "api",
    "v1",
    "shares",
];

/// Path of the Talk chat endpoint; the conversation token is appended.
const CHAT_PATH: [&str; 7] = ["ocs", "v2.php", "apps", "spreed", "api", "v1", "chat"];

/// Path of a user's WebDAV home; user and file path are appended.
const DAV_FILES_PATH: [&str; 3] = ["remote.php", "dav", "files"];

/// Authenticated session against one Nextcloud instance.
#[derive(Clone, Debug)]
pub struct TalkSession {
    config: TalkConfig,
    client: Client,
}

impl TalkSession {
    /// Create a session, validating the configuration and building a client
    /// with the configured timeout.
    pub fn new(config: TalkConfig) -> ShareResult<Self> {
        config.validate()?;
        let client = create_client_with_timeout(config.timeout())?;
        Ok(Self { config, client })
    }

    /// Create a session that reuses an existing client.
    pub fn with_client(config: TalkConfig, client: Client) -> ShareResult<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    /// Connection settings.
    pub fn config(&self) -> &TalkConfig {
        &self.config
    }

    /// URL of the share-creation endpoint.
    pub fn shares_url(&self) -> ShareResult<Url> {
        self.endpoint(SHARES_PATH)
    }

    /// URL of a conversation's chat endpoint.
    pub fn chat_url(&self, conversation_token: &str) -> ShareResult<Url> {
        if conversation_token.is_empty() {
            return Err(ShareError::Config(
                "Conversation token is empty".to_string(),
            ));
        }
        self.endpoint(CHAT_PATH.into_iter().chain([conversation_token]))
    }

    /// WebDAV URL of a file in the configured user's home.
    ///
    /// `path` is storage-relative; a missing leading slash is tolerated and
    /// each segment is percent-encoded.
    pub fn dav_file_url(&self, path: &str) -> ShareResult<Url> {
        let segments = DAV_FILES_PATH
            .into_iter()
            .chain([self.config.user()])
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    /// Public URL of a link share, built from the base URL's scheme and
    /// authority only.
    pub fn public_share_url(&self, token: &str) -> String {
        let base = self.config.base_url();
        let host = base.host_str().unwrap_or_default();
        match base.port() {
            Some(port) => format!("{}://{}:{}/index.php/s/{}", base.scheme(), host, port, token),
            None => format!("{}://{}/index.php/s/{}", base.scheme(), host, token),
        }
    }

    /// Start an OCS request: basic auth, `OCS-APIRequest` and a JSON `Accept`.
    pub(crate) fn ocs_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(self.config.user(), Some(self.config.app_password()))
            .header(OCS_API_REQUEST_HEADER, "true")
            .header(ACCEPT, "application/json")
    }

    /// Start a WebDAV request with an XML body.
    pub(crate) fn dav_request(&self, method: Method, url: Url, body: &'static str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(self.config.user(), Some(self.config.app_password()))
            .header(OCS_API_REQUEST_HEADER, "true")
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(body)
    }

    /// Send a request, logging at the interface boundary.
    pub(crate) async fn send(&self, what: &str, request: RequestBuilder) -> ShareResult<Response> {
        debug!("Issuing {} request", what);

        let response = request.send().await.map_err(|e| {
            warn!("{} request failed: {}", what, e);
            ShareError::from(e)
        })?;

        debug!("{} request returned {}", what, response.status());
        Ok(response)
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> ShareResult<Url> {
        let mut url = self.config.base_url().clone();
        url.path_segments_mut()
            .map_err(|_| {
                ShareError::Config(format!(
                    "Base URL {} cannot carry a path",
                    self.config.base_url()
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
