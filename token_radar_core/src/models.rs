use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Timestamps above this are taken to be in milliseconds, anything at or
/// below it in seconds.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Token record as returned by the pump.fun listing API.
///
/// The upstream enforces nothing: apart from `mint` every field may be
/// missing or null, and numeric fields occasionally arrive as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTokenRecord {
    pub mint: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub bonding_curve: Option<String>,
    /// Market cap in USD.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd_market_cap: Option<f64>,
    /// Market cap in SOL.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    /// Seconds or milliseconds, depending on the endpoint.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub created_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_trade_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub king_of_the_hill_timestamp: Option<i64>,
    #[serde(default)]
    pub complete: Option<bool>,
    #[serde(default)]
    pub raydium_pool: Option<String>,
    #[serde(default)]
    pub pump_swap_pool: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub reply_count: Option<i64>,
    #[serde(default)]
    pub nsfw: Option<bool>,
}

impl RawTokenRecord {
    pub fn is_complete(&self) -> bool {
        self.complete.unwrap_or(false)
    }

    /// First non-empty pool address, if the token has migrated anywhere.
    pub fn pool_address(&self) -> Option<&str> {
        [self.raydium_pool.as_deref(), self.pump_swap_pool.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|p| !p.is_empty())
    }

    pub fn market_cap_usd(&self) -> f64 {
        self.usd_market_cap
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn created_ms(&self) -> Option<i64> {
        self.created_timestamp.map(normalize_timestamp_ms)
    }

    /// Most recent activity we know of: last trade, else creation.
    pub fn activity_ms(&self) -> Option<i64> {
        self.last_trade_timestamp
            .or(self.created_timestamp)
            .map(normalize_timestamp_ms)
    }

    /// Case-insensitive substring match over name, symbol and mint.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [Some(self.mint.as_str()), self.name.as_deref(), self.symbol.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A mint is a base58-encoded 32-byte public key.
pub fn validate_mint(mint: &str) -> Result<(), String> {
    let trimmed = mint.trim();
    if trimmed.is_empty() {
        return Err("mint address is empty".to_string());
    }
    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| format!("mint address is not base58: {}", e))?;
    if bytes.len() != 32 {
        return Err(format!("mint address decodes to {} bytes, expected 32", bytes.len()));
    }
    Ok(())
}

/// Disambiguate a seconds-or-milliseconds timestamp into milliseconds.
pub fn normalize_timestamp_ms(ts: i64) -> i64 {
    if ts > MILLIS_THRESHOLD {
        ts
    } else {
        ts.saturating_mul(1000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BondingStatus {
    Bonded,
    NearBonded,
    Bonding,
}

impl BondingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondingStatus::Bonded => "BONDED",
            BondingStatus::NearBonded => "NEAR_BONDED",
            BondingStatus::Bonding => "BONDING",
        }
    }
}

/// A raw record plus its derived bonding state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedToken {
    #[serde(flatten)]
    pub record: RawTokenRecord,
    pub bonding_percentage: u8,
    pub status: BondingStatus,
}

impl ClassifiedToken {
    pub fn mint(&self) -> &str {
        &self.record.mint
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondingStatus::Bonded
    }
}

/// UI-facing shape: numbers already rendered as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayToken {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    pub image_uri: Option<String>,
    pub creator: Option<String>,
    pub market_cap: String,
    pub market_cap_usd: f64,
    pub bonding_percentage: u8,
    pub status: BondingStatus,
    pub created_at: String,
    pub created_timestamp_ms: Option<i64>,
    pub pool_address: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
    pub reply_count: Option<i64>,
}

/// Summary of the most liquid DexScreener pair for a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexQuote {
    pub pair_address: String,
    pub dex_id: Option<String>,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub fdv: Option<f64>,
    pub url: Option<String>,
}

/// Emitted by the bonding monitor the first time a mint is seen bonded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondingEvent {
    pub mint: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub usd_market_cap: f64,
    pub pool_address: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl BondingEvent {
    pub fn from_token(token: &ClassifiedToken, detected_at: DateTime<Utc>) -> Self {
        Self {
            mint: token.record.mint.clone(),
            name: token.record.name.clone(),
            symbol: token.record.symbol.clone(),
            usd_market_cap: token.record.market_cap_usd(),
            pool_address: token.record.pool_address().map(str::to_string),
            detected_at,
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite()))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}
