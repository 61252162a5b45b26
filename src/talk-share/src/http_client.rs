//! HTTP client factory for Nextcloud requests.
//!
//! All clients include: User-Agent, tcp_nodelay, and a read timeout so a
//! truncated WebDAV body cannot hang the call.

use reqwest::Client;
use std::time::Duration;

use crate::error::{ShareError, ShareResult};

/// User-Agent string for all HTTP requests
pub const USER_AGENT: &str = concat!("talk-share/", env!("CARGO_PKG_VERSION"));

/// Default timeout for API requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection pool idle timeout so DNS is re-resolved periodically.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates an HTTP client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> ShareResult<Client> {
    let read_timeout = timeout.min(Duration::from_secs(60));

    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .read_timeout(read_timeout)
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| ShareError::Config(format!("Failed to build HTTP client: {e}")))
}
