//! Blocking HTTP GET access to a remote `.git` directory.
//!
//! Each call is a single GET; the client keeps a connection pool so many
//! worker threads can share one `HttpObjectStore`.

use std::io::Read;
use std::time::Duration;

use git_hash::ObjectAddress;
use reqwest::blocking::Client;
use reqwest::Url;
use tracing::debug;

use crate::{FetchError, ObjectStore, RemoteUrl, TransportError};

/// Browser user agent; some servers refuse obvious tool agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Whole-request timeout, body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound on idle pooled connections per host.
    pub pool_max_idle_per_host: usize,
    /// Largest response body accepted, in bytes.
    pub max_body_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 32,
            max_body_size: 1 << 30,
        }
    }
}

/// Object store backed by plain HTTP GETs.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base: RemoteUrl,
    max_body_size: u64,
}

impl HttpObjectStore {
    pub fn new(base: RemoteUrl, config: &HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base,
            max_body_size: config.max_body_size,
        })
    }

    pub fn base(&self) -> &RemoteUrl {
        &self.base
    }

    /// GET `<base>/index`.
    pub fn fetch_index(&self) -> Result<Vec<u8>, FetchError> {
        let url = self
            .base
            .index_url()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        self.get(url)
    }

    fn get(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::Transport(describe(&e)))?;

        let status = response.status().as_u16();
        if let Some(err) = FetchError::from_status(status) {
            debug!(%url, status, "GET failed");
            return Err(err);
        }

        let limit = self.max_body_size;
        if response.content_length().is_some_and(|len| len > limit) {
            debug!(%url, limit, "response too large");
            return Err(FetchError::TooLarge { limit });
        }

        // Content-Length may be absent or wrong; never read past the limit.
        let mut body = Vec::new();
        response
            .take(limit.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if body.len() as u64 > limit {
            return Err(FetchError::TooLarge { limit });
        }
        debug!(%url, len = body.len(), "GET ok");
        Ok(body)
    }
}

impl ObjectStore for HttpObjectStore {
    fn fetch(&self, address: &ObjectAddress) -> Result<Vec<u8>, FetchError> {
        let url = self
            .base
            .object_url(address)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        self.get(url)
    }
}

/// Flatten a reqwest error and its causes into one line.
fn describe(err: &reqwest::Error) -> String {
    use std::error::Error as _;

    let mut msg = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
