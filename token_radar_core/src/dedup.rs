// Merge overlapping result lists and order them for display.

use crate::models::ClassifiedToken;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Newest creation timestamp first; tokens without one go last.
    Recent,
    /// Highest bonding percentage first, ties by USD market cap.
    Bonding,
}

/// Concatenate `lists` keeping only the first occurrence of each mint.
/// Survivors keep their relative order.
pub fn merge_unique<I>(lists: I) -> Vec<ClassifiedToken>
where
    I: IntoIterator<Item = Vec<ClassifiedToken>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for token in list {
            if seen.insert(token.record.mint.clone()) {
                merged.push(token);
            }
        }
    }
    merged
}

/// Stable sort, so equal keys keep their merge order.
pub fn sort_tokens(tokens: &mut [ClassifiedToken], key: SortKey) {
    match key {
        SortKey::Recent => {
            tokens.sort_by(|a, b| b.record.created_ms().cmp(&a.record.created_ms()));
        }
        SortKey::Bonding => {
            tokens.sort_by(|a, b| {
                b.bonding_percentage.cmp(&a.bonding_percentage).then_with(|| {
                    b.record
                        .market_cap_usd()
                        .partial_cmp(&a.record.market_cap_usd())
                        .unwrap_or(Ordering::Equal)
                })
            });
        }
    }
}

pub fn merge_and_sort<I>(lists: I, key: SortKey) -> Vec<ClassifiedToken>
where
    I: IntoIterator<Item = Vec<ClassifiedToken>>,
{
    let mut merged = merge_unique(lists);
    sort_tokens(&mut merged, key);
    merged
}
