// Upstream data source traits
// The pipeline only talks to these; native/ holds the reqwest implementations.

use crate::error::CoreError;
use crate::models::{DexQuote, RawTokenRecord};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSort {
    CreatedTimestamp,
    LastTradeTimestamp,
    MarketCap,
}

impl ListingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSort::CreatedTimestamp => "created_timestamp",
            ListingSort::LastTradeTimestamp => "last_trade_timestamp",
            ListingSort::MarketCap => "market_cap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parameters for one call to the coin listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub offset: usize,
    pub limit: usize,
    pub sort: ListingSort,
    pub order: SortOrder,
    pub include_nsfw: bool,
    /// Adds `complete=true` so only finished curves come back.
    pub complete_only: bool,
}

impl ListingQuery {
    /// Newest tokens first.
    pub fn recent(limit: usize) -> Self {
        Self {
            offset: 0,
            limit,
            sort: ListingSort::CreatedTimestamp,
            order: SortOrder::Desc,
            include_nsfw: false,
            complete_only: false,
        }
    }

    /// Completed curves, most recently traded first.
    pub fn bonded(limit: usize) -> Self {
        Self {
            sort: ListingSort::LastTradeTimestamp,
            complete_only: true,
            ..Self::recent(limit)
        }
    }

    /// Largest market caps first.
    pub fn by_market_cap(limit: usize) -> Self {
        Self {
            sort: ListingSort::MarketCap,
            ..Self::recent(limit)
        }
    }

    pub fn with_nsfw(mut self, include_nsfw: bool) -> Self {
        self.include_nsfw = include_nsfw;
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("includeNsfw", self.include_nsfw.to_string()),
            ("order", self.order.as_str().to_string()),
        ];
        if self.complete_only {
            params.push(("complete", "true".to_string()));
        }
        params
    }
}

/// Token listing provider (pump.fun in production).
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// All-or-nothing: any HTTP or shape error fails the whole call.
    async fn fetch_listing(&self, query: &ListingQuery) -> Result<Vec<RawTokenRecord>, CoreError>;

    /// Single token by mint; `CoreError::NotFound` if the upstream has no such token.
    async fn fetch_token(&self, mint: &str) -> Result<RawTokenRecord, CoreError>;
}

/// Market quote provider (DexScreener in production).
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// `Ok(None)` when the address has no trading pairs.
    async fn fetch_quote(&self, address: &str) -> Result<Option<DexQuote>, CoreError>;
}
