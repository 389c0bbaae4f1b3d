// Fetch -> classify -> dedup/sort, once per view.

use crate::cache::QuoteCache;
use crate::classifier::classify_all;
use crate::dedup::{merge_and_sort, SortKey};
use crate::error::CoreError;
use crate::models::{validate_mint, ClassifiedToken, DexQuote, DisplayToken};
use crate::settings::Settings;
use crate::source::{ListingQuery, QuoteSource, TokenSource};
use crate::transform::to_display;
use chrono::Utc;
use futures_util::future::{join, try_join};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Filters for the bonded view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondedQuery {
    pub search: Option<String>,
    pub limit: usize,
    /// Only tokens active within the last N minutes.
    pub minutes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetail {
    pub token: DisplayToken,
    pub quote: Option<DexQuote>,
}

pub struct TokenPipeline {
    source: Arc<dyn TokenSource>,
    quotes: Arc<dyn QuoteSource>,
    quote_cache: Mutex<QuoteCache>,
    threshold_usd: f64,
    fetch_limit: usize,
    include_nsfw: bool,
}

impl TokenPipeline {
    pub fn new(
        source: Arc<dyn TokenSource>,
        quotes: Arc<dyn QuoteSource>,
        settings: &Settings,
    ) -> Self {
        let capacity = NonZeroUsize::new(settings.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            quotes,
            quote_cache: Mutex::new(QuoteCache::new(
                capacity,
                Duration::from_secs(settings.quote_cache_ttl_secs),
            )),
            threshold_usd: settings.bonding_threshold_usd,
            fetch_limit: settings.upstream_fetch_limit,
            include_nsfw: settings.include_nsfw,
        }
    }

    pub fn threshold_usd(&self) -> f64 {
        self.threshold_usd
    }

    fn upstream_limit(&self, limit: usize) -> usize {
        limit.max(self.fetch_limit)
    }

    async fn fetch_classified(&self, query: ListingQuery) -> Result<Vec<ClassifiedToken>, CoreError> {
        let records = self
            .source
            .fetch_listing(&query.with_nsfw(self.include_nsfw))
            .await?;
        Ok(classify_all(records, self.threshold_usd))
    }

    /// Newest tokens, any status.
    pub async fn recent_tokens(&self, limit: usize) -> Result<Vec<ClassifiedToken>, CoreError> {
        let recent = self
            .fetch_classified(ListingQuery::recent(self.upstream_limit(limit)))
            .await?;
        let mut tokens = merge_and_sort([recent], SortKey::Recent);
        tokens.truncate(limit);
        debug!("recent_tokens: returning {}", tokens.len());
        Ok(tokens)
    }

    pub async fn bonded_tokens(&self, query: &BondedQuery) -> Result<Vec<ClassifiedToken>, CoreError> {
        self.bonded_tokens_at(query, Utc::now().timestamp_millis()).await
    }

    /// Bonded view evaluated against a fixed clock, in epoch milliseconds.
    pub async fn bonded_tokens_at(
        &self,
        query: &BondedQuery,
        now_ms: i64,
    ) -> Result<Vec<ClassifiedToken>, CoreError> {
        let upstream = self.upstream_limit(query.limit);
        let (bonded, recent) = try_join(
            self.fetch_classified(ListingQuery::bonded(upstream)),
            self.fetch_classified(ListingQuery::recent(upstream)),
        )
        .await?;

        let cutoff_ms = query.minutes.map(|m| {
            let window_ms = i64::try_from(m).unwrap_or(i64::MAX).saturating_mul(60_000);
            now_ms.saturating_sub(window_ms)
        });
        let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut tokens: Vec<ClassifiedToken> = merge_and_sort([bonded, recent], SortKey::Recent)
            .into_iter()
            .filter(ClassifiedToken::is_bonded)
            .filter(|t| search.map_or(true, |s| t.record.matches_search(s)))
            .filter(|t| match cutoff_ms {
                Some(cutoff) => t.record.activity_ms().is_some_and(|ts| ts >= cutoff),
                None => true,
            })
            .collect();
        tokens.truncate(query.limit);
        debug!("bonded_tokens: returning {}", tokens.len());
        Ok(tokens)
    }

    /// Tokens still on the curve, closest to bonding first.
    pub async fn trending_tokens(&self, limit: usize) -> Result<Vec<ClassifiedToken>, CoreError> {
        let upstream = self.upstream_limit(limit);
        let (by_cap, bonded) = try_join(
            self.fetch_classified(ListingQuery::by_market_cap(upstream)),
            self.fetch_classified(ListingQuery::bonded(upstream)),
        )
        .await?;

        // Bonded list goes first so a stale unbonded copy of the same mint loses.
        let mut tokens: Vec<ClassifiedToken> = merge_and_sort([bonded, by_cap], SortKey::Bonding)
            .into_iter()
            .filter(|t| !t.is_bonded())
            .collect();
        tokens.truncate(limit);
        debug!("trending_tokens: returning {}", tokens.len());
        Ok(tokens)
    }

    /// Single token plus its best DexScreener pair. A failed quote lookup
    /// degrades to `quote: None`.
    pub async fn token_detail(&self, mint: &str) -> Result<TokenDetail, CoreError> {
        let mint = mint.trim();
        validate_mint(mint).map_err(CoreError::InvalidInput)?;

        let (record, quote) = join(self.source.fetch_token(mint), self.quote(mint)).await;
        let token = classify_all(vec![record?], self.threshold_usd)
            .pop()
            .ok_or_else(|| CoreError::NotFound(format!("token {}", mint)))?;

        let quote = match quote {
            Ok(q) => q,
            Err(e) => {
                warn!("Quote lookup for {} failed: {}", mint, e);
                None
            }
        };
        Ok(TokenDetail {
            token: to_display(&token),
            quote,
        })
    }

    /// Cached DexScreener lookup. "No pairs" is cached too; errors are not.
    pub async fn quote(&self, address: &str) -> Result<Option<DexQuote>, CoreError> {
        {
            let mut cache = self.quote_cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(address) {
                debug!("Quote cache hit for {}", address);
                return Ok(hit);
            }
        }

        let quote = self.quotes.fetch_quote(address).await?;
        if quote.is_none() {
            info!("No DexScreener pairs for {}", address);
        }
        self.quote_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.to_string(), quote.clone());
        Ok(quote)
    }
}
