//! Login, logout, and the persisted session.
//!
//! SYSTEM CONTEXT
//! ==============
//! UI collaborators call these to start and end a session and to ask who is
//! signed in. Token extraction lives here so the login and refresh paths
//! agree on which response fields carry tokens.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::storage::{ACCESS_TOKEN_KEY, IS_AUTHENTICATED_KEY, REFRESH_TOKEN_KEY, TOKEN_KEY, USER_KEY};
use crate::transport::ApiRequest;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Access-token fields in precedence order.
const ACCESS_TOKEN_POINTERS: [&str; 3] = ["/token", "/accessToken", "/data/tokens/accessToken"];
/// Refresh-token fields in precedence order.
const REFRESH_TOKEN_POINTERS: [&str; 3] = ["/data/tokens/refreshToken", "/data/refreshToken", "/refreshToken"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Value,
    pub is_authenticated: bool,
}

/// Access token from a login or refresh response body.
#[must_use]
pub fn extract_access_token(body: &Value) -> Option<&str> {
    first_string(body, &ACCESS_TOKEN_POINTERS)
}

/// Refresh token from a login or refresh response body.
#[must_use]
pub fn extract_refresh_token(body: &Value) -> Option<&str> {
    first_string(body, &REFRESH_TOKEN_POINTERS)
}

fn first_string<'a>(body: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

impl ApiClient {
    /// Sign in with email and password and persist the new session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLoginResponse` if the response lacks a token or user,
    /// `Storage` if the session cannot be persisted, or any request error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = self
            .post(LOGIN_PATH, serde_json::json!({ "email": email, "password": password }))
            .await?;

        let access_token = extract_access_token(&body)
            .ok_or(ClientError::InvalidLoginResponse)?
            .to_owned();
        let user = body
            .pointer("/data/user")
            .filter(|user| !user.is_null())
            .cloned()
            .ok_or(ClientError::InvalidLoginResponse)?;
        let refresh_token = extract_refresh_token(&body).map(str::to_owned);

        self.store.set(TOKEN_KEY, &access_token)?;
        self.store.set(ACCESS_TOKEN_KEY, &access_token)?;
        if let Some(refresh_token) = &refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh_token)?;
        } else {
            tracing::warn!("login response carried no refresh token; session will end on first 401");
        }
        self.store.set(IS_AUTHENTICATED_KEY, "true")?;
        self.store.set(USER_KEY, &serde_json::to_string(&user)?)?;

        tracing::info!("signed in");
        Ok(Session { access_token, refresh_token, user, is_authenticated: true })
    }

    /// Tell the server the session is over, then clear it locally.
    ///
    /// Local state is cleared whatever the server says; calling this with no
    /// session is harmless.
    pub async fn logout(&self) {
        if let Err(e) = self.execute(ApiRequest::new(Method::POST, LOGOUT_PATH)).await {
            tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
        }
        self.clear_session();
    }

    /// The persisted session, if an access token is stored.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        let access_token = self
            .stored(TOKEN_KEY)
            .or_else(|| self.stored(ACCESS_TOKEN_KEY))?;
        Some(Session {
            access_token,
            refresh_token: self.stored(REFRESH_TOKEN_KEY),
            user: self.current_user().unwrap_or(Value::Null),
            is_authenticated: self.stored(IS_AUTHENTICATED_KEY).as_deref() == Some("true"),
        })
    }

    /// The stored user profile.
    #[must_use]
    pub fn current_user(&self) -> Option<Value> {
        let raw = self.stored(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "stored user profile is not valid JSON");
                None
            }
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some_and(|session| session.is_authenticated)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
