//! Authenticated API client.
//!
//! ARCHITECTURE
//! ============
//! Every call goes through `execute`, which runs two stages around the
//! transport:
//!
//! - Outbound: attach the stored bearer token and, when it is about to
//!   expire, refresh it first. A failed proactive refresh is logged and the
//!   request goes out with the old token.
//! - Inbound: a 401 triggers one refresh-and-retry. Concurrent 401s share a
//!   single refresh call through `RefreshGate`, proactive or reactive. The
//!   retry carries the refreshed token directly. If the request has no refresh
//!   token or was already retried, the session is torn down and the user is
//!   sent to the login route. The same happens when the refresh fails.
//!
//! The refresh call itself bypasses both stages.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{extract_access_token, extract_refresh_token};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::jwt;
use crate::navigation::{DEFAULT_LOGIN_ROUTE, Navigator};
use crate::refresh::{self, RefreshGate, Ticket};
use crate::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, SessionStore, TOKEN_KEY};
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

pub const REFRESH_PATH: &str = "/auth/refresh-token";

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    pub(crate) store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    refresh: RefreshGate,
}

impl ApiClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { transport, store, navigator, login_route: DEFAULT_LOGIN_ROUTE.to_owned(), refresh: RefreshGate::new() }
    }

    /// Build a client talking to `config.base_url` over `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config.base_url, config.timeouts)?;
        tracing::debug!(base_url = %transport.base_url(), "api client configured");
        Ok(Self::new(Arc::new(transport), store, navigator).with_login_route(&config.login_route))
    }

    #[must_use]
    pub fn with_login_route(mut self, route: &str) -> Self {
        route.clone_into(&mut self.login_route);
        self
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Whether a refresh call is outstanding right now.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    // =========================================================================
    // REQUEST PIPELINE
    // =========================================================================

    /// Send `request` with auth handling and return its 2xx response.
    ///
    /// # Errors
    ///
    /// - `Transport` when no response was obtained.
    /// - `Status` for non-2xx responses, including a 401 that could not be
    ///   recovered (the session is torn down first).
    /// - The refresh failure when the 401 recovery refresh failed.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        loop {
            if !request.is_retry() {
                self.authorize(&mut request).await;
            }
            let response = self.transport.send(&request).await?;
            if response.status != 401 {
                if response.is_success() {
                    return Ok(response);
                }
                return Err(ClientError::Status { status: response.status, body: response.body });
            }
            self.recover(&mut request, response).await?;
        }
    }

    /// Attach the bearer token, refreshing it first when it is about to expire.
    async fn authorize(&self, request: &mut ApiRequest) {
        let Some(token) = self.stored(TOKEN_KEY).or_else(|| self.stored(ACCESS_TOKEN_KEY)) else {
            return;
        };
        request.set_bearer(&token);

        let Some(refresh_token) = self.stored(REFRESH_TOKEN_KEY) else {
            return;
        };
        if !jwt::expires_soon(&token) {
            return;
        }
        let Some(lease) = self.refresh.try_lead() else {
            return;
        };

        match self.request_new_token(&refresh_token).await {
            Ok(new_token) => {
                request.set_bearer(&new_token);
                lease.finish(Ok(new_token));
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %request.path,
                    "proactive token refresh failed; sending current token"
                );
                lease.finish(Err(e.to_string()));
            }
        }
    }

    /// Handle a 401. `Ok` means `request` carries a fresh token and should be
    /// sent again as is; the retry skips `authorize`.
    async fn recover(&self, request: &mut ApiRequest, response: ApiResponse) -> Result<(), ClientError> {
        let unauthorized = ClientError::Status { status: response.status, body: response.body };

        let refresh_token = if request.is_retry() { None } else { self.stored(REFRESH_TOKEN_KEY) };
        let Some(refresh_token) = refresh_token else {
            tracing::warn!(path = %request.path, retried = request.is_retry(), "unauthorized; ending session");
            self.end_session(request);
            return Err(unauthorized);
        };
        request.mark_retry();

        let token = match self.refresh.join() {
            Ticket::Wait(rx) => match refresh::wait_for(rx).await {
                Ok(token) => token,
                Err(reason) => {
                    tracing::warn!(%reason, path = %request.path, "shared token refresh failed; ending session");
                    self.end_session(request);
                    return Err(ClientError::RefreshFailed(reason));
                }
            },
            Ticket::Lead(lease) => match self.request_new_token(&refresh_token).await {
                Ok(token) => {
                    lease.finish(Ok(token.clone()));
                    token
                }
                Err(e) => {
                    lease.finish(Err(e.to_string()));
                    tracing::warn!(error = %e, path = %request.path, "token refresh failed; ending session");
                    self.end_session(request);
                    return Err(e);
                }
            },
        };

        request.set_bearer(&token);
        Ok(())
    }

    /// Exchange `refresh_token` for a new access token and persist it.
    async fn request_new_token(&self, refresh_token: &str) -> Result<String, ClientError> {
        let request = ApiRequest::post(REFRESH_PATH, serde_json::json!({ "refreshToken": refresh_token }));
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(ClientError::Status { status: response.status, body: response.body });
        }

        let token = extract_access_token(&response.body).ok_or(ClientError::MissingAccessToken)?;
        self.persist(TOKEN_KEY, token);
        self.persist(ACCESS_TOKEN_KEY, token);
        if let Some(rotated) = extract_refresh_token(&response.body) {
            self.persist(REFRESH_TOKEN_KEY, rotated);
        }
        tracing::info!("access token refreshed");
        Ok(token.to_owned())
    }

    // =========================================================================
    // SESSION STATE
    // =========================================================================

    /// Remove every session key. Storage failures are logged, never returned.
    pub fn clear_session(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(error = %e, key, "failed to clear session key");
            }
        }
    }

    /// Clear the session and, unless pointless, send the user to login.
    fn end_session(&self, request: &ApiRequest) {
        self.clear_session();
        if request.is_auth_endpoint() || self.navigator.current_route() == self.login_route {
            return;
        }
        self.navigator.navigate(&self.login_route);
    }

    pub(crate) fn stored(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to read session key");
                None
            }
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(error = %e, key, "failed to persist session key");
        }
    }

    // =========================================================================
    // REST HELPERS
    // =========================================================================

    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        Ok(self.execute(ApiRequest::get(path)).await?.body)
    }

    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        Ok(self.execute(ApiRequest::post(path, body)).await?.body)
    }

    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn put(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        Ok(self.execute(ApiRequest::put(path, body)).await?.body)
    }

    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn patch(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        Ok(self.execute(ApiRequest::patch(path, body)).await?.body)
    }

    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        Ok(self.execute(ApiRequest::delete(path)).await?.body)
    }

    /// `GET` and deserialize the body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`]; also `Json` when the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Send `request` and deserialize the body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`]; also `Json` when the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.execute(request).await?;
        Ok(serde_json::from_value(response.body)?)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
