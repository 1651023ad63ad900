//! Authenticated JSON client for the GitHub REST API.
//!
//! Shared by the CI client and the release host. A single `ureq` agent with
//! a global timeout serves every request; failures are mapped so that an
//! explicit 404 stays distinguishable from authentication and transport
//! problems.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Network timeout applied to every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Public GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Public GitHub asset upload endpoint.
pub const DEFAULT_UPLOADS_BASE: &str = "https://uploads.github.com";

const USER_AGENT: &str = concat!("release-gate/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Errors arising from remote API calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// The resource does not exist (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The token was rejected or lacks permission (HTTP 401/403).
    #[error("authentication failed for {url} (HTTP {status})")]
    Unauthorized {
        /// The URL that was requested.
        url: String,
        /// The HTTP status returned.
        status: u16,
    },

    /// Any other non-success status.
    #[error("request to {url} failed with HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status returned.
        status: u16,
    },

    /// The request never produced a response.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The configured base cannot carry a request path.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidUrl {
        /// The configured base.
        url: String,
        /// The parser diagnostic.
        reason: String,
    },

    /// The response body was not the expected JSON.
    #[error("unexpected response from {url}: {reason}")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// The decoder diagnostic.
        reason: String,
    },
}

impl HttpError {
    /// `true` for an explicit 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Bearer token for the remote host.
///
/// `Debug` is redacted so the token never reaches logs or reports.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(***)")
    }
}

/// A GitHub REST endpoint plus credentials.
#[derive(Debug, Clone)]
pub struct GithubApi {
    api_base: String,
    token: Token,
}

impl GithubApi {
    /// Target `api_base` (e.g. `https://api.github.com`) with `token`.
    #[must_use]
    pub fn new(api_base: &str, token: Token) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_owned(),
            token,
        }
    }

    /// Append `segments` to the API base path, percent-encoding each one.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] when the base is not an absolute
    /// hierarchical URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<String, HttpError> {
        let invalid = |reason: String| HttpError::InvalidUrl {
            url: self.api_base.clone(),
            reason,
        };
        let mut url = Url::parse(&self.api_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base".to_owned()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on any non-success status, transport failure,
    /// or undecodable body.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        let mut request = http_agent()
            .get(url)
            .header("Authorization", &self.token.bearer())
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request.call().map_err(|e| map_ureq_error(url, &e))?;
        decode(url, response)
    }

    /// `POST` a JSON body and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on any non-success status, transport failure,
    /// or undecodable body.
    pub fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let payload = serde_json::to_vec(body).map_err(|e| HttpError::Decode {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let response = http_agent()
            .post(url)
            .header("Authorization", &self.token.bearer())
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .send(&payload[..])
            .map_err(|e| map_ureq_error(url, &e))?;
        decode(url, response)
    }

    /// `POST` raw bytes and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on any non-success status, transport failure,
    /// or undecodable body.
    pub fn post_bytes<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bytes: &[u8],
    ) -> Result<T, HttpError> {
        let mut request = http_agent()
            .post(url)
            .header("Authorization", &self.token.bearer())
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("Content-Type", "application/octet-stream");
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request.send(bytes).map_err(|e| map_ureq_error(url, &e))?;
        decode(url, response)
    }
}

fn decode<T: DeserializeOwned>(
    url: &str,
    response: ureq::http::Response<ureq::Body>,
) -> Result<T, HttpError> {
    let text = response
        .into_body()
        .read_to_string()
        .map_err(|e| HttpError::Transport {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    serde_json::from_str(&text).map_err(|e| HttpError::Decode {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to an [`HttpError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> HttpError {
    match err {
        ureq::Error::StatusCode(404) => HttpError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status @ (401 | 403)) => HttpError::Unauthorized {
            url: url.to_owned(),
            status: *status,
        },
        ureq::Error::StatusCode(status) => HttpError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => HttpError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
