use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DeliveryStore, StatusPatch, StoreError};
use crate::config::StoreConfig;
use crate::types::{DeliveryId, DeliveryRecord};

const ALL_DELIVERIES_KEY: &str = "deliveries:all";

/// REST client for the delivery backend with rate limiting and short-lived
/// caching of list responses
#[derive(Debug, Clone)]
pub struct HttpDeliveryStore {
    client: Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, Vec<DeliveryRecord>>,
}

impl HttpDeliveryStore {
    /// Create a new client from the store configuration
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let quota = Quota::per_second(NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(config.burst_capacity).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| StoreError::NetworkUnavailable(format!("failed to build HTTP client: {e}")))?;

        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter,
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn deliveries_url(&self) -> String {
        format!("{}/api/delivery", self.base_url)
    }

    /// Drop cached list responses, e.g. after a write
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        debug!("Delivery list cache cleared");
    }

    async fn cached_list(
        &self,
        cache_key: String,
        request: RequestBuilder,
    ) -> Result<Vec<DeliveryRecord>, StoreError> {
        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!(key = %cache_key, "Cache hit for delivery list");
            return Ok(cached);
        }

        let records: Vec<DeliveryRecord> = self.send(request).await?;
        self.cache.insert(cache_key, records.clone()).await;
        Ok(records)
    }

    /// Execute a request with rate limiting; only success statuses get through
    async fn execute(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_status(status, message));
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn status_url(&self, id: &DeliveryId) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.deliveries_url())
            .map_err(|e| StoreError::NetworkUnavailable(format!("invalid store URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::NetworkUnavailable(format!("store URL {} cannot take a path", self.base_url)))?
            .push(id.as_str())
            .push("status");
        Ok(url)
    }
}

fn classify_transport_error(error: reqwest::Error) -> StoreError {
    if error.is_decode() {
        StoreError::InvalidResponse(error.to_string())
    } else {
        StoreError::NetworkUnavailable(error.to_string())
    }
}

fn classify_status(status: StatusCode, message: String) -> StoreError {
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        warn!(status = %status, "Delivery store temporarily unavailable");
        StoreError::NetworkUnavailable(format!("HTTP {}", status.as_u16()))
    } else {
        StoreError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl DeliveryStore for HttpDeliveryStore {
    async fn list(&self) -> Result<Vec<DeliveryRecord>, StoreError> {
        let request = self.client.get(self.deliveries_url());
        self.cached_list(ALL_DELIVERIES_KEY.to_string(), request).await
    }

    async fn get_by_agent(&self, agent: &str) -> Result<Vec<DeliveryRecord>, StoreError> {
        let request = self
            .client
            .get(self.deliveries_url())
            .query(&[("agent", agent)]);
        self.cached_list(format!("deliveries:agent:{}", agent), request)
            .await
    }

    async fn patch_status(
        &self,
        id: &DeliveryId,
        patch: &StatusPatch,
    ) -> Result<Option<DeliveryRecord>, StoreError> {
        let url = self.status_url(id)?;
        let response = self.execute(self.client.patch(url).json(patch)).await?;
        self.clear_cache();
        info!(delivery_id = %id, status = %patch.status, "Delivery status patched");

        // the status alone confirms the update; the body is a bonus
        let record = match response.bytes().await {
            Ok(body) => match serde_json::from_slice::<DeliveryRecord>(&body) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(delivery_id = %id, error = %e, "Patch response carried no record");
                    None
                }
            },
            Err(e) => {
                debug!(delivery_id = %id, error = %e, "Patch response body unreadable");
                None
            }
        };
        Ok(record)
    }
}
