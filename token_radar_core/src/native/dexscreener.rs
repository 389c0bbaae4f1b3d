// DexScreener quote client

use super::http::NativeHttpClient;
use crate::error::CoreError;
use crate::limiter::RequestGate;
use crate::models::DexQuote;
use crate::settings::Settings;
use crate::source::QuoteSource;
use async_trait::async_trait;
use log::debug;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const SOLANA_CHAIN_ID: &str = "solana";

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<PairResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairResponse {
    #[serde(default)]
    chain_id: Option<String>,
    #[serde(default)]
    dex_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    pair_address: Option<String>,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<AmountUsd>,
    #[serde(default)]
    volume: Option<Volume>,
    #[serde(default)]
    fdv: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AmountUsd {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(default)]
    h24: Option<f64>,
}

impl PairResponse {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    fn into_quote(self) -> Option<DexQuote> {
        let liquidity_usd = self.liquidity.as_ref().and_then(|l| l.usd);
        Some(DexQuote {
            pair_address: self.pair_address.filter(|p| !p.is_empty())?,
            dex_id: self.dex_id,
            price_usd: self.price_usd.and_then(|p| p.trim().parse::<f64>().ok()),
            liquidity_usd,
            volume_24h_usd: self.volume.and_then(|v| v.h24),
            fdv: self.fdv,
            url: self.url,
        })
    }
}

/// Reduce a `/latest/dex/tokens` body to the most liquid Solana pair.
pub fn pick_best_pair(body: Value) -> Result<Option<DexQuote>, CoreError> {
    if !body.is_object() {
        return Err(CoreError::InvalidResponse(
            "DexScreener body is not an object".to_string(),
        ));
    }
    let response: TokenPairsResponse = serde_json::from_value(body)
        .map_err(|e| CoreError::InvalidResponse(format!("unreadable DexScreener pairs: {}", e)))?;

    let best = response
        .pairs
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.chain_id.as_deref().map_or(true, |c| c == SOLANA_CHAIN_ID))
        .filter(|p| p.pair_address.as_deref().is_some_and(|a| !a.is_empty()))
        .max_by(|a, b| a.liquidity_usd().total_cmp(&b.liquidity_usd()));

    Ok(best.and_then(PairResponse::into_quote))
}

pub struct DexScreenerClient {
    http: Arc<NativeHttpClient>,
    gate: Arc<RequestGate>,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(http: Arc<NativeHttpClient>, gate: Arc<RequestGate>, settings: &Settings) -> Self {
        Self {
            http,
            gate,
            base_url: settings.dexscreener_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl QuoteSource for DexScreenerClient {
    async fn fetch_quote(&self, address: &str) -> Result<Option<DexQuote>, CoreError> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, address);
        let body = match self.http.get_json(&self.gate, &url, &[], HeaderMap::new()).await {
            Err(CoreError::NotFound(_)) => return Ok(None),
            other => other?,
        };
        let quote = pick_best_pair(body)?;
        debug!(
            "DexScreener quote for {}: {}",
            address,
            quote.as_ref().map_or("no pairs", |q| q.pair_address.as_str())
        );
        Ok(quote)
    }
}
