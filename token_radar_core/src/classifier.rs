// Bonding classifier: how far along its curve a token is.

use crate::models::{BondingStatus, ClassifiedToken, RawTokenRecord};

/// USD market cap at which a pump.fun curve is treated as complete.
pub const DEFAULT_BONDING_THRESHOLD_USD: f64 = 69_000.0;

/// Percentage at which a still-bonding token is reported as near bonded.
pub const NEAR_BONDED_PERCENT: u8 = 90;

/// Ceiling for tokens the upstream has not marked complete.
pub const MAX_UNBONDED_PERCENT: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub bonding_percentage: u8,
    pub status: BondingStatus,
}

/// Linear approximation of curve progress, clamped to `0..=99`.
///
/// 100 is reserved for tokens whose completion the upstream confirms, so a
/// market cap at or above the threshold still reports 99.
pub fn bonding_percentage(market_cap_usd: f64, threshold_usd: f64) -> u8 {
    if !market_cap_usd.is_finite() || !threshold_usd.is_finite() || threshold_usd <= 0.0 {
        return 0;
    }
    let pct = (market_cap_usd / threshold_usd * 100.0).round();
    if pct <= 0.0 {
        0
    } else if pct >= MAX_UNBONDED_PERCENT as f64 {
        MAX_UNBONDED_PERCENT
    } else {
        pct as u8
    }
}

pub fn classify(record: &RawTokenRecord, threshold_usd: f64) -> Classification {
    if record.is_complete() || record.pool_address().is_some() {
        return Classification {
            bonding_percentage: 100,
            status: BondingStatus::Bonded,
        };
    }

    let pct = bonding_percentage(record.market_cap_usd(), threshold_usd);
    let status = if pct >= NEAR_BONDED_PERCENT {
        BondingStatus::NearBonded
    } else {
        BondingStatus::Bonding
    };
    Classification {
        bonding_percentage: pct,
        status,
    }
}

pub fn classify_record(record: RawTokenRecord, threshold_usd: f64) -> ClassifiedToken {
    let Classification {
        bonding_percentage,
        status,
    } = classify(&record, threshold_usd);
    ClassifiedToken {
        record,
        bonding_percentage,
        status,
    }
}

pub fn classify_all(records: Vec<RawTokenRecord>, threshold_usd: f64) -> Vec<ClassifiedToken> {
    records
        .into_iter()
        .map(|r| classify_record(r, threshold_usd))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(market_cap: f64, complete: bool) -> RawTokenRecord {
        RawTokenRecord {
            mint: "Mint".to_string(),
            usd_market_cap: Some(market_cap),
            complete: Some(complete),
            ..Default::default()
        }
    }

    fn run(market_cap: f64, complete: bool) -> Classification {
        classify(&record(market_cap, complete), DEFAULT_BONDING_THRESHOLD_USD)
    }

    #[test]
    fn complete_flag_means_bonded() {
        for mc in [0.0, 12_000.0, 69_000.0, 5_000_000.0] {
            let c = run(mc, true);
            assert_eq!(c.bonding_percentage, 100);
            assert_eq!(c.status, BondingStatus::Bonded);
        }
    }

    #[test]
    fn pool_address_means_bonded() {
        let mut r = record(10_000.0, false);
        r.raydium_pool = Some("Pool111".to_string());
        let c = classify(&r, DEFAULT_BONDING_THRESHOLD_USD);
        assert_eq!(c.bonding_percentage, 100);
        assert_eq!(c.status, BondingStatus::Bonded);
    }

    #[test]
    fn zero_market_cap_is_zero_percent() {
        let c = run(0.0, false);
        assert_eq!(c.bonding_percentage, 0);
        assert_eq!(c.status, BondingStatus::Bonding);

        let missing = RawTokenRecord {
            mint: "Mint".to_string(),
            ..Default::default()
        };
        assert_eq!(classify(&missing, DEFAULT_BONDING_THRESHOLD_USD).bonding_percentage, 0);
    }

    #[test]
    fn threshold_market_cap_clamps_to_99() {
        let c = run(69_000.0, false);
        assert_eq!(c.bonding_percentage, 99);
        assert_eq!(c.status, BondingStatus::NearBonded);
        assert_eq!(run(1_000_000.0, false).bonding_percentage, 99);
    }

    #[test]
    fn halfway_is_bonding() {
        let c = run(34_500.0, false);
        assert_eq!(c.bonding_percentage, 50);
        assert_eq!(c.status, BondingStatus::Bonding);
    }

    #[test]
    fn above_ninety_is_near_bonded() {
        let c = run(65_000.0, false);
        assert_eq!(c.bonding_percentage, 94);
        assert_eq!(c.status, BondingStatus::NearBonded);

        assert_eq!(run(62_500.0, false).status, BondingStatus::NearBonded);
        assert_eq!(run(61_000.0, false).status, BondingStatus::Bonding);
    }

    #[test]
    fn negative_or_invalid_inputs_floor_at_zero() {
        assert_eq!(bonding_percentage(-500.0, DEFAULT_BONDING_THRESHOLD_USD), 0);
        assert_eq!(bonding_percentage(f64::NAN, DEFAULT_BONDING_THRESHOLD_USD), 0);
        assert_eq!(bonding_percentage(1_000.0, 0.0), 0);
    }

    #[test]
    fn threshold_is_configurable() {
        assert_eq!(bonding_percentage(50_000.0, 100_000.0), 50);
        assert_eq!(bonding_percentage(50_000.0, DEFAULT_BONDING_THRESHOLD_USD), 72);
    }

    #[test]
    fn bonded_always_reports_full_percentage() {
        let tokens = classify_all(
            vec![record(100.0, true), record(68_000.0, false), record(1.0, false)],
            DEFAULT_BONDING_THRESHOLD_USD,
        );
        for t in tokens {
            if t.is_bonded() {
                assert_eq!(t.bonding_percentage, 100);
            } else {
                assert!(t.bonding_percentage <= MAX_UNBONDED_PERCENT);
            }
        }
    }
}
