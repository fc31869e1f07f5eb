use super::{RequestOptions, RequestParameters};
use crate::config::HttpConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_USER_AGENT: &str = "scholar-retriever/0.1 (Academic Profile Retriever)";

/// A single GET attempt returning the raw document body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        endpoint: &Url,
        params: &RequestParameters,
        options: RequestOptions,
    ) -> Result<String>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
    proxied_clients: RwLock<HashMap<String, Client>>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Self::build_client(config, config.proxy.as_deref())?;

        info!(
            "Initialized HTTP transport (timeout {}s, proxy: {})",
            config.timeout_secs,
            config.proxy.as_deref().unwrap_or("none")
        );

        Ok(Self {
            client,
            config: config.clone(),
            proxied_clients: RwLock::new(HashMap::new()),
        })
    }

    fn build_client(config: &HttpConfig, proxy: Option<&str>) -> Result<Client> {
        let mut client_builder = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .user_agent(DEFAULT_USER_AGENT);

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| Error::InvalidConfig {
                field: "proxy".to_string(),
                reason: format!("Invalid proxy URL: {e}"),
            })?;
            client_builder = client_builder.proxy(proxy);
        }

        Ok(client_builder.build()?)
    }

    /// Client for a per-attempt proxy, built once and reused
    async fn client_for(&self, proxy: Option<&str>) -> Result<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.client.clone());
        };

        if let Some(client) = self.proxied_clients.read().await.get(proxy) {
            return Ok(client.clone());
        }

        let client = Self::build_client(&self.config, Some(proxy))?;
        self.proxied_clients
            .write()
            .await
            .insert(proxy.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        endpoint: &Url,
        params: &RequestParameters,
        options: RequestOptions,
    ) -> Result<String> {
        let client = self.client_for(options.proxy.as_deref()).await?;

        info!("Sending request to {} with {:?}", endpoint, params);

        let mut request = client.get(endpoint.clone()).query(&params.to_query_pairs());
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", endpoint, e);
            if e.is_timeout() {
                Error::Timeout {
                    timeout: options.timeout.unwrap_or_else(|| self.config.timeout()),
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP {} from {}", status, response.url());
            return Err(match status.as_u16() {
                429 => Error::RateLimitExceeded {
                    retry_after: retry_after(&response).unwrap_or(Duration::from_secs(60)),
                },
                code => Error::HttpStatus {
                    code,
                    url: response.url().to_string(),
                },
            });
        }

        let body = response.text().await?;
        debug!("Received {} bytes from {}", body.len(), endpoint);
        Ok(body)
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
