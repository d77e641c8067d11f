use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use storefront_core::config::ShopifyConfig;
use storefront_core::{CatalogError, CatalogSource, Order, OrderId, OrderSource, Product};
use thiserror::Error;
use tracing::{debug, warn};

use crate::wire::{OrderEnvelope, OrdersEnvelope, ProductsEnvelope};

pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Admin REST client. Every call is attempted exactly once.
#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    admin_base_url: String,
    access_token: SecretString,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient").field("admin_base_url", &self.admin_base_url).finish()
    }
}

impl AdminClient {
    pub fn new(config: &ShopifyConfig) -> Result<Self, ClientError> {
        Self::with_base_url(
            config.admin_base_url(),
            config.access_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_base_url(
        admin_base_url: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            admin_base_url: admin_base_url.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn admin_base_url(&self) -> &str {
        &self.admin_base_url
    }

    /// GETs `path` under the admin base URL. A 404 yields `Ok(None)`.
    async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, CatalogError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.admin_base_url, path);
        debug!(event_name = "shopify.request", path, "calling admin api");

        let response = self
            .http
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "shopify.request_failed",
                    path,
                    error = %error,
                    "admin api request failed"
                );
                CatalogError::Unavailable(format!("request to {path} failed: {error}"))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(
                event_name = "shopify.request_rejected",
                path,
                status = status.as_u16(),
                "admin api returned an error status"
            );
            return Err(CatalogError::Unavailable(format!("{path} returned {status}")));
        }

        let body = response.bytes().await.map_err(|error| {
            CatalogError::Unavailable(format!("reading {path} response failed: {error}"))
        })?;
        serde_json::from_slice::<T>(&body)
            .map(Some)
            .map_err(|error| CatalogError::Malformed(format!("{path}: {error}")))
    }
}

#[async_trait]
impl CatalogSource for AdminClient {
    async fn fetch_catalog(&self) -> Result<Vec<Product>, CatalogError> {
        let envelope = self
            .get_json::<ProductsEnvelope>("products.json", &[])
            .await?
            .ok_or_else(|| CatalogError::Unavailable("products.json returned 404".to_string()))?;

        Ok(envelope.products.unwrap_or_default().into_iter().map(Product::from).collect())
    }
}

#[async_trait]
impl OrderSource for AdminClient {
    async fn list_orders(&self) -> Result<Vec<Order>, CatalogError> {
        let envelope = self
            .get_json::<OrdersEnvelope>("orders.json", &[("status", "any")])
            .await?
            .ok_or_else(|| CatalogError::Unavailable("orders.json returned 404".to_string()))?;

        Ok(envelope.orders.unwrap_or_default().into_iter().map(Order::from).collect())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, CatalogError> {
        let path = format!("orders/{id}.json");
        let envelope = self.get_json::<OrderEnvelope>(&path, &[]).await?;
        Ok(envelope.map(|envelope| Order::from(envelope.order)))
    }
}
