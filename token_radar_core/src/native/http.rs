// Native HTTP client implementation using reqwest

use crate::error::CoreError;
use crate::limiter::RequestGate;
use crate::settings::Settings;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Shared reqwest client. Every request passes through the caller's
/// [`RequestGate`] and reports its outcome to that gate's breaker.
pub struct NativeHttpClient {
    client: Client,
}

impl NativeHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| CoreError::Init(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// 404 maps to `NotFound` and does not count against the breaker; 5xx,
    /// 429 and transport errors do.
    pub async fn get_json(
        &self,
        gate: &RequestGate,
        url: &str,
        query: &[(&str, String)],
        headers: HeaderMap,
    ) -> Result<Value, CoreError> {
        gate.acquire().await?;
        debug!("GET {} {:?}", url, query);

        let response = match self.client.get(url).query(query).headers(headers).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                gate.breaker().record_failure();
                return Err(e.into());
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            gate.breaker().record_success();
            return Err(CoreError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                gate.breaker().record_failure();
            } else {
                gate.breaker().record_success();
            }
            warn!("{} returned HTTP {}", url, status);
            return Err(CoreError::UpstreamStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                gate.breaker().record_failure();
                return Err(e.into());
            }
        };
        gate.breaker().record_success();

        serde_json::from_str(&text).map_err(|e| {
            CoreError::InvalidResponse(format!("{} returned a non-JSON body: {}", url, e))
        })
    }
}
