//! CRUD wrappers for the REST collections.
//!
//! Each backend collection answers with `{ success, data, error? }`. A
//! `Resource` is a path prefix plus the five calls every dashboard makes;
//! the business meaning of the payloads stays with the caller.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::transport::ApiRequest;

pub const BUDGETS: &str = "budgets";
pub const PROMOTIONS: &str = "promotions";
pub const TRADE_SPENDS: &str = "trade-spends";
pub const TRADING_TERMS: &str = "trading-terms";
pub const CUSTOMERS: &str = "customers";
pub const PRODUCTS: &str = "products";
pub const VENDORS: &str = "vendors";
pub const PRICING: &str = "pricing";
pub const APPROVALS: &str = "approvals";
pub const ACTIVITIES: &str = "activities";
pub const AUDIT_LOGS: &str = "audit-logs";
pub const ANALYTICS: &str = "analytics";

pub const COLLECTIONS: [&str; 12] = [
    BUDGETS,
    PROMOTIONS,
    TRADE_SPENDS,
    TRADING_TERMS,
    CUSTOMERS,
    PRODUCTS,
    VENDORS,
    PRICING,
    APPROVALS,
    ACTIVITIES,
    AUDIT_LOGS,
    ANALYTICS,
];

/// Standard response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// `data` on success, the server's error text otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Api` when `success` is false.
    pub fn into_result(self) -> Result<Option<T>, ClientError> {
        if self.success {
            return Ok(self.data);
        }
        let message = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "request was not successful".to_owned());
        Err(ClientError::Api(message))
    }
}

/// Handle on one REST collection, e.g. `/budgets`.
#[derive(Clone, Copy)]
pub struct Resource<'a> {
    client: &'a ApiClient,
    collection: &'a str,
}

impl ApiClient {
    #[must_use]
    pub fn resource<'a>(&'a self, collection: &'a str) -> Resource<'a> {
        Resource { client: self, collection: collection.trim_matches('/') }
    }
}

impl Resource<'_> {
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.collection)
    }

    #[must_use]
    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{id}", self.collection)
    }

    /// `GET /{collection}` with optional query filters.
    ///
    /// # Errors
    ///
    /// Request failures, `Api` for `success: false`, or `Json` for bad payloads.
    pub async fn list<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<Vec<T>, ClientError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(self.path()), |req, (key, value)| req.with_query(*key, *value));
        Ok(self.send::<Vec<T>>(request).await?.unwrap_or_default())
    }

    /// `GET /{collection}/{id}`.
    ///
    /// # Errors
    ///
    /// Request failures, `Api` for `success: false`, or `Json` for bad payloads.
    pub async fn read<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, ClientError> {
        self.send(ApiRequest::get(self.item_path(id))).await
    }

    /// `POST /{collection}`.
    ///
    /// # Errors
    ///
    /// Request failures, `Api` for `success: false`, or `Json` for bad payloads.
    pub async fn create<T: DeserializeOwned>(&self, body: Value) -> Result<Option<T>, ClientError> {
        self.send(ApiRequest::post(self.path(), body)).await
    }

    /// `PUT /{collection}/{id}`.
    ///
    /// # Errors
    ///
    /// Request failures, `Api` for `success: false`, or `Json` for bad payloads.
    pub async fn update<T: DeserializeOwned>(&self, id: &str, body: Value) -> Result<Option<T>, ClientError> {
        self.send(ApiRequest::put(self.item_path(id), body)).await
    }

    /// `DELETE /{collection}/{id}`.
    ///
    /// # Errors
    ///
    /// Request failures or `Api` for `success: false`.
    pub async fn remove(&self, id: &str) -> Result<(), ClientError> {
        self.send::<Value>(ApiRequest::delete(self.item_path(id)))
            .await
            .map(|_| ())
    }

    async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Option<T>, ClientError> {
        let response = self.client.execute(request).await?;
        if response.body.is_null() {
            return Ok(None);
        }
        let envelope: ApiEnvelope<T> = serde_json::from_value(response.body)?;
        envelope.into_result()
    }
}

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;
