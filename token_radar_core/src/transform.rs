// Display formatting for classified tokens

use crate::models::{normalize_timestamp_ms, ClassifiedToken, DisplayToken};
use chrono::DateTime;

const UNKNOWN: &str = "Unknown";

/// `$1.23M` / `$4.56K` / `$7.89`
pub fn format_market_cap(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "$0.00".to_string();
    }
    if value >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.2}K", value / 1_000.0)
    } else {
        format!("${:.2}", value)
    }
}

/// `MM/DD/YYYY` in UTC for a seconds-or-milliseconds timestamp.
pub fn format_date(ts: i64) -> String {
    DateTime::from_timestamp_millis(normalize_timestamp_ms(ts))
        .map(|dt| dt.format("%m/%d/%Y").to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn to_display(token: &ClassifiedToken) -> DisplayToken {
    let record = &token.record;
    let market_cap_usd = record.market_cap_usd().max(0.0);
    DisplayToken {
        mint: record.mint.clone(),
        name: record.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        symbol: record.symbol.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        description: record.description.clone(),
        image_uri: record.image_uri.clone(),
        creator: record.creator.clone(),
        market_cap: format_market_cap(market_cap_usd),
        market_cap_usd,
        bonding_percentage: token.bonding_percentage,
        status: token.status,
        created_at: record
            .created_timestamp
            .map(format_date)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        created_timestamp_ms: record.created_ms(),
        pool_address: record.pool_address().map(str::to_string),
        twitter: record.twitter.clone(),
        telegram: record.telegram.clone(),
        website: record.website.clone(),
        reply_count: record.reply_count,
    }
}

pub fn to_display_all(tokens: &[ClassifiedToken]) -> Vec<DisplayToken> {
    tokens.iter().map(to_display).collect()
}
