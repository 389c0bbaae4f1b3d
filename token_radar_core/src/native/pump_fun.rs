// pump.fun listing client

use super::http::NativeHttpClient;
use crate::error::CoreError;
use crate::limiter::RequestGate;
use crate::models::RawTokenRecord;
use crate::settings::Settings;
use crate::source::{ListingQuery, TokenSource};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, ORIGIN, REFERER};
use serde_json::Value;
use std::sync::Arc;

pub struct PumpFunClient {
    http: Arc<NativeHttpClient>,
    gate: Arc<RequestGate>,
    base_url: String,
    headers: HeaderMap,
}

impl PumpFunClient {
    pub fn new(
        http: Arc<NativeHttpClient>,
        gate: Arc<RequestGate>,
        settings: &Settings,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            http,
            gate,
            base_url: settings.pump_api_base_url.trim_end_matches('/').to_string(),
            headers: browser_headers(settings)?,
        })
    }
}

/// The listing API rejects requests that don't look like they came from the
/// pump.fun web app.
pub fn browser_headers(settings: &Settings) -> Result<HeaderMap, CoreError> {
    let origin = settings.origin.trim_end_matches('/');
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ORIGIN, header_value("origin", origin)?);
    headers.insert(REFERER, header_value("origin", &format!("{}/", origin))?);
    if let Some(cookie) = settings.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
        headers.insert(COOKIE, header_value("cookie", cookie.trim())?);
    }
    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, CoreError> {
    HeaderValue::from_str(value)
        .map_err(|e| CoreError::Validation(format!("{} is not a valid header value: {}", name, e)))
}

/// The listing body must be a JSON array. Entries that cannot be read as a
/// token (no mint) are dropped.
pub fn parse_listing(body: Value) -> Result<Vec<RawTokenRecord>, CoreError> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(CoreError::InvalidResponse(format!(
                "expected a JSON array of coins, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = items.len();
    let records: Vec<RawTokenRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawTokenRecord>(item).ok())
        .filter(|r| !r.mint.trim().is_empty())
        .collect();
    if records.len() < total {
        warn!("Dropped {} unreadable listing entries", total - records.len());
    }
    Ok(records)
}

pub fn parse_coin(mint: &str, body: Value) -> Result<RawTokenRecord, CoreError> {
    match body {
        Value::Object(_) => {
            let record: RawTokenRecord = serde_json::from_value(body)
                .map_err(|e| CoreError::InvalidResponse(format!("unreadable coin {}: {}", mint, e)))?;
            Ok(record)
        }
        Value::Null => Err(CoreError::NotFound(format!("token {}", mint))),
        other => Err(CoreError::InvalidResponse(format!(
            "expected a coin object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl TokenSource for PumpFunClient {
    async fn fetch_listing(&self, query: &ListingQuery) -> Result<Vec<RawTokenRecord>, CoreError> {
        let url = format!("{}/coins", self.base_url);
        let body = self
            .http
            .get_json(&self.gate, &url, &query.to_params(), self.headers.clone())
            .await?;
        let records = parse_listing(body)?;
        debug!(
            "Fetched {} coins (sort={}, complete_only={})",
            records.len(),
            query.sort.as_str(),
            query.complete_only
        );
        Ok(records)
    }

    async fn fetch_token(&self, mint: &str) -> Result<RawTokenRecord, CoreError> {
        let url = format!("{}/coins/{}", self.base_url, mint);
        let body = match self
            .http
            .get_json(&self.gate, &url, &[], self.headers.clone())
            .await
        {
            Err(CoreError::NotFound(_)) => return Err(CoreError::NotFound(format!("token {}", mint))),
            other => other?,
        };
        parse_coin(mint, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PumpFunClient {
        let settings = Settings {
            pump_api_base_url: format!("{}/", server.uri()),
            cookie: Some("session=abc".to_string()),
            request_timeout_secs: 5,
            ..Settings::default()
        };
        let http = Arc::new(NativeHttpClient::new(&settings).unwrap());
        let gate = Arc::new(RequestGate::new("pump.fun", 1000, 3, Duration::from_secs(60)));
        PumpFunClient::new(http, gate, &settings).unwrap()
    }

    #[tokio::test]
    async fn bonded_listing_sends_browser_headers_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins"))
            .and(query_param("complete", "true"))
            .and(query_param("sort", "last_trade_timestamp"))
            .and(query_param("limit", "2"))
            .and(header("origin", "https://pump.fun"))
            .and(header("referer", "https://pump.fun/"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"mint": "A", "usd_market_cap": "70123.5", "complete": true},
                {"mint": "B", "usd_market_cap": null, "complete": true}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let records = client_for(&server)
            .fetch_listing(&ListingQuery::bonded(2))
            .await
            .unwrap();
        let mints: Vec<&str> = records.iter().map(|r| r.mint.as_str()).collect();
        assert_eq!(mints, vec!["A", "B"]);
        assert_eq!(records[0].usd_market_cap, Some(70123.5));
    }

    #[tokio::test]
    async fn listing_error_status_is_a_total_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!([{"mint": "A"}])))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_listing(&ListingQuery::recent(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UpstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn unknown_coin_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/Gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/Here"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mint": "Here", "symbol": "HR"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_token("Gone").await.unwrap_err();
        match err {
            CoreError::NotFound(what) => assert_eq!(what, "token Gone"),
            other => panic!("unexpected error: {:?}", other),
        }
        let record = client.fetch_token("Here").await.unwrap();
        assert_eq!(record.symbol.as_deref(), Some("HR"));
    }

    #[test]
    fn non_array_listing_is_rejected() {
        let err = parse_listing(json!({"error": "rate limited"})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidResponse(_)));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn listing_drops_entries_without_mint() {
        let records = parse_listing(json!([
            {"mint": "A", "usd_market_cap": 1200.0, "complete": false},
            {"name": "no mint here"},
            {"mint": "", "name": "blank"},
            "garbage",
            {"mint": "B", "complete": true, "raydium_pool": "Pool"}
        ]))
        .unwrap();
        let mints: Vec<&str> = records.iter().map(|r| r.mint.as_str()).collect();
        assert_eq!(mints, vec!["A", "B"]);
    }

    #[test]
    fn null_coin_is_not_found() {
        assert!(matches!(parse_coin("X", Value::Null), Err(CoreError::NotFound(_))));
        let record = parse_coin("X", json!({"mint": "X", "symbol": "XX"})).unwrap();
        assert_eq!(record.symbol.as_deref(), Some("XX"));
    }

    #[test]
    fn browser_headers_include_cookie_when_configured() {
        let mut settings = Settings::default();
        let headers = browser_headers(&settings).unwrap();
        assert!(headers.get(COOKIE).is_none());
        assert_eq!(headers.get(ORIGIN).unwrap(), "https://pump.fun");
        assert_eq!(headers.get(REFERER).unwrap(), "https://pump.fun/");

        settings.cookie = Some("session=abc".to_string());
        let headers = browser_headers(&settings).unwrap();
        assert_eq!(headers.get(COOKIE).unwrap(), "session=abc");

        settings.cookie = Some("bad\nvalue".to_string());
        assert!(browser_headers(&settings).is_err());
    }
}
