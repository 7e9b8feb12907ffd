//! Client configuration parsed from environment variables.

use crate::navigation::DEFAULT_LOGIN_ROUTE;

pub const DEFAULT_API_URL: &str = "/api";
pub const DEFAULT_API_ORIGIN: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute API base, e.g. `http://127.0.0.1:3000/api`.
    pub base_url: String,
    pub login_route: String,
    pub timeouts: ClientTimeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `TPM_API_URL` (or legacy `REACT_APP_API_URL`): default `/api`
    /// - `TPM_API_ORIGIN`: prefix for a relative API URL, default `http://127.0.0.1:3000`
    /// - `TPM_LOGIN_ROUTE`: default `/login`
    /// - `TPM_REQUEST_TIMEOUT_SECS`: default 30
    /// - `TPM_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        let api_url = env_non_empty("TPM_API_URL")
            .or_else(|| env_non_empty("REACT_APP_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let origin = env_non_empty("TPM_API_ORIGIN").unwrap_or_else(|| DEFAULT_API_ORIGIN.to_owned());
        let login_route = env_non_empty("TPM_LOGIN_ROUTE").unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_owned());
        let timeouts = ClientTimeouts {
            request_secs: env_parse_u64("TPM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("TPM_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Self { base_url: resolve_base_url(&origin, &api_url), login_route, timeouts }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: resolve_base_url(DEFAULT_API_ORIGIN, DEFAULT_API_URL),
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            timeouts: ClientTimeouts::default(),
        }
    }
}

/// Absolute API URLs are used as-is; relative ones hang off `origin`.
pub(crate) fn resolve_base_url(origin: &str, api_url: &str) -> String {
    let api_url = api_url.trim_end_matches('/');
    if api_url.starts_with("http://") || api_url.starts_with("https://") {
        return api_url.to_owned();
    }
    format!("{}/{}", origin.trim_end_matches('/'), api_url.trim_start_matches('/'))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
