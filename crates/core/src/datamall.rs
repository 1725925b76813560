//! DataMall HTTP access: the reqwest-backed [`DataFetcher`] and offset pagination.

use std::future::Future;
use std::pin::Pin;

use half_ryd_transit::{DataFetcher, Dataset, Query, TransitError};
use reqwest::{Url, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::DataMallConfig;
use crate::error::{Error, Result};

/// Account-key authenticated DataMall client
#[derive(Clone, Debug)]
pub struct DataMallClient {
    http: reqwest::Client,
    config: DataMallConfig,
}

impl DataMallClient {
    pub fn new(config: DataMallConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("half-ryd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransitError::Network {
                endpoint: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DataMallConfig {
        &self.config
    }

    fn url(&self, endpoint: &str, query: &Query<'_>) -> half_ryd_transit::Result<Url> {
        Url::parse_with_params(
            &self.config.endpoint_url(endpoint),
            query.iter().map(|(k, v)| (*k, v.as_str())),
        )
        .map_err(|e| TransitError::InvalidData(format!("bad URL for {endpoint}: {e}")))
    }
}

impl DataFetcher for DataMallClient {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a Query<'a>,
    ) -> Pin<Box<dyn Future<Output = half_ryd_transit::Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.url(endpoint, query)?;
            debug!(%url, "GET");

            let network_error = |e: reqwest::Error| TransitError::Network {
                endpoint: endpoint.to_owned(),
                message: e.to_string(),
            };

            let response = self
                .http
                .get(url)
                .header("AccountKey", self.config.api_key.as_str())
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(network_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransitError::HttpStatus {
                    endpoint: endpoint.to_owned(),
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(network_error)?;
            Ok(body.to_vec())
        })
    }
}

/// One page of a paginated DataMall response.
///
/// A missing `value` field marks the end of the stream.
#[derive(Debug, Deserialize)]
struct Page<T> {
    value: Option<Vec<T>>,
}

/// Retrieves complete datasets by walking the `$skip` offset.
pub struct PagedFetcher<F> {
    fetcher: F,
    page_size: usize,
}

impl<F: DataFetcher> PagedFetcher<F> {
    pub fn new(fetcher: F, page_size: usize) -> Self {
        Self {
            fetcher,
            page_size: page_size.max(1),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub async fn fetch_all<T: Dataset + DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.fetch_endpoint(T::ENDPOINT).await
    }

    /// Request pages until one comes back short (or without data).
    ///
    /// The first failing page aborts the whole fetch; nothing is retried.
    pub async fn fetch_endpoint<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let mut records = Vec::new();
        let mut skip = 0usize;

        loop {
            let query = [("$skip", skip.to_string())];
            let body = self.fetcher.fetch(endpoint, &query).await?;

            let page: Page<T> = serde_json::from_slice(&body).map_err(|e| {
                Error::Fetch(TransitError::SerializationError(format!(
                    "{endpoint} page at $skip={skip}: {e}"
                )))
            })?;

            let Some(values) = page.value else {
                debug!(endpoint, skip, "Response has no value field, treating as end of data");
                break;
            };

            let len = values.len();
            records.extend(values);
            if len < self.page_size {
                break;
            }

            debug!(endpoint, skip, "Retrieved full page");
            skip += self.page_size;
        }

        info!(endpoint, records = records.len(), "Fetched dataset");
        Ok(records)
    }
}
