// In-memory upstreams for handler and monitor tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use token_radar_core::{
    CoreError, DexQuote, ListingQuery, ListingSort, QuoteSource, RawTokenRecord, Settings,
    TokenPipeline, TokenSource,
};

pub const MINT: &str = "So11111111111111111111111111111111111111112";

pub fn record(mint: &str, cap: f64, created_s: i64, complete: bool) -> RawTokenRecord {
    RawTokenRecord {
        mint: mint.to_string(),
        name: Some(format!("{} coin", mint)),
        symbol: Some(mint.chars().take(4).collect::<String>().to_uppercase()),
        usd_market_cap: Some(cap),
        created_timestamp: Some(created_s),
        complete: Some(complete),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub recent: Mutex<Vec<RawTokenRecord>>,
    pub bonded: Mutex<Vec<RawTokenRecord>>,
    pub by_cap: Mutex<Vec<RawTokenRecord>>,
    pub fail: AtomicBool,
    /// Never answer listing calls.
    pub hang: AtomicBool,
}

impl FakeSource {
    pub fn set_bonded(&self, records: Vec<RawTokenRecord>) {
        *self.bonded.lock().unwrap() = records;
    }

    pub fn set_recent(&self, records: Vec<RawTokenRecord>) {
        *self.recent.lock().unwrap() = records;
    }

    pub fn set_by_cap(&self, records: Vec<RawTokenRecord>) {
        *self.by_cap.lock().unwrap() = records;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenSource for FakeSource {
    async fn fetch_listing(&self, query: &ListingQuery) -> Result<Vec<RawTokenRecord>, CoreError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Http("connection refused".to_string()));
        }
        let list = if query.complete_only {
            self.bonded.lock().unwrap()
        } else if query.sort == ListingSort::MarketCap {
            self.by_cap.lock().unwrap()
        } else {
            self.recent.lock().unwrap()
        };
        Ok(list.iter().take(query.limit).cloned().collect())
    }

    async fn fetch_token(&self, mint: &str) -> Result<RawTokenRecord, CoreError> {
        let recent = self.recent.lock().unwrap().clone();
        let bonded = self.bonded.lock().unwrap().clone();
        recent
            .into_iter()
            .chain(bonded)
            .find(|r| r.mint == mint)
            .ok_or_else(|| CoreError::NotFound(format!("token {}", mint)))
    }
}

#[derive(Default)]
pub struct FakeQuotes;

#[async_trait]
impl QuoteSource for FakeQuotes {
    async fn fetch_quote(&self, address: &str) -> Result<Option<DexQuote>, CoreError> {
        Ok(Some(DexQuote {
            pair_address: format!("pair-{}", address),
            dex_id: Some("raydium".to_string()),
            price_usd: Some(0.0005),
            liquidity_usd: Some(12_000.0),
            volume_24h_usd: Some(3_000.0),
            fdv: None,
            url: None,
        }))
    }
}

pub fn test_pipeline(settings: &Settings) -> (Arc<FakeSource>, Arc<TokenPipeline>) {
    let source = Arc::new(FakeSource::default());
    let pipeline = Arc::new(TokenPipeline::new(
        source.clone(),
        Arc::new(FakeQuotes),
        settings,
    ));
    (source, pipeline)
}
