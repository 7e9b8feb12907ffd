//! Authenticated REST client for the trade-promotion management backend.
//!
//! ARCHITECTURE
//! ============
//! `ApiClient` sits between UI collaborators and the backend. It owns the
//! bearer-token lifecycle (proactive refresh, single-flight 401 recovery,
//! session teardown) and delegates everything environmental to three seams:
//!
//! - [`Transport`] moves requests (`reqwest` in production)
//! - [`SessionStore`] persists the five session keys
//! - [`Navigator`] performs the forced login redirect

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod navigation;
pub mod refresh;
pub mod resources;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use auth::{Session, extract_access_token};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, status_message};
pub use navigation::{Navigator, RouteTracker};
pub use resources::{ApiEnvelope, Resource};
pub use storage::{FileStore, MemoryStore, SessionStore};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
