use crate::core::fetcher::FetcherSettings;
use crate::domain::model::QueryParameters;
use crate::domain::ports::{HttpReply, HttpTransport, Sleeper};
use crate::utils::error::FetchError;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

/// reqwest-backed transport. One client, reused for every attempt.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(settings: &FetcherSettings) -> Result<Self, FetchError> {
        let user_agent = HeaderValue::from_str(&settings.user_agent).map_err(FetchError::network)?;
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(FetchError::network)?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, params: &QueryParameters) -> Result<HttpReply, FetchError> {
        let query: Vec<(&str, &str)> = params.pairs().collect();
        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(FetchError::network)?;

        let status = response.status().as_u16();
        tracing::debug!("API response status: {}", status);

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // 讀取 body 時斷線也算網路錯誤，交給重試邏輯處理
        let body = response.text().await.map_err(FetchError::network)?;

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
