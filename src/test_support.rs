//! Shared fakes for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::client::ApiClient;
use crate::navigation::RouteTracker;
use crate::storage::MemoryStore;
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

pub fn jwt_with_payload(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

pub fn jwt_with_exp(exp: u64) -> String {
    jwt_with_payload(&serde_json::json!({ "sub": "user-1", "exp": exp }))
}

/// Token expiring `secs` seconds from the real clock.
pub fn jwt_expiring_in(secs: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let exp = now.checked_add_signed(secs).unwrap();
    jwt_with_exp(exp)
}

pub enum Reply {
    Respond(ApiResponse),
    After(Duration, ApiResponse),
    Fail(TransportError),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::Respond(ApiResponse::new(status, body))
    }

    pub fn unauthorized() -> Self {
        Self::json(401, serde_json::json!({ "success": false, "error": "Unauthorized" }))
    }
}

type Handler = Box<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// Transport answering from a closure and recording every request it saw.
pub struct ScriptedTransport {
    handler: Handler,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self { handler: Box::new(handler), seen: Mutex::new(Vec::new()) })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        let reply = (self.handler)(request);
        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::After(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Reply::Fail(error) => Err(error),
        }
    }
}

pub struct Harness {
    pub client: Arc<ApiClient>,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RouteTracker>,
}

/// Fresh client on `route` whose store is seeded with `entries`.
pub fn harness(transport: Arc<ScriptedTransport>, route: &str, entries: &[(&str, &str)]) -> Harness {
    use crate::storage::SessionStore;

    let store = Arc::new(MemoryStore::new());
    for (key, value) in entries {
        store.set(key, value).unwrap();
    }
    let navigator = Arc::new(RouteTracker::new(route));
    let client = Arc::new(ApiClient::new(transport.clone(), store.clone(), navigator.clone()));
    Harness { client, transport, store, navigator }
}
