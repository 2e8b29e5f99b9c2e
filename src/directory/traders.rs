//! Public trader profiles.

use serde::{Deserialize, Serialize};

use crate::core::errors::TradenomixResult;
use crate::core::ids::TraderId;

/// One point of a trader's equity curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Display label of the date.
    pub date: String,
    /// Account value.
    pub value: f64,
}

/// A trader's public profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderProfile {
    /// Trader identifier.
    pub id: TraderId,
    /// Display name.
    pub name: String,
    /// Public handle, `@`-prefixed.
    pub handle: String,
    /// Short biography.
    pub bio: String,
    /// Verified badge.
    pub is_verified: bool,
    /// Profit and loss, in percent.
    pub pnl: f64,
    /// Winning trades, in percent.
    pub win_rate: f64,
    /// Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Equity curve samples, oldest first.
    pub equity_curve_data: Vec<EquityPoint>,
    /// Follower count.
    pub followers: u32,
    /// Following count.
    pub following: u32,
}

struct Seed {
    id: &'static str,
    name: &'static str,
    handle: &'static str,
    bio: &'static str,
    is_verified: bool,
    pnl: f64,
    win_rate: f64,
    sharpe_ratio: f64,
    curve: &'static [(&'static str, f64)],
    followers: u32,
    following: u32,
}

const SEED: &[Seed] = &[
    Seed {
        id: "1",
        name: "Alex 'The Algo' Turner",
        handle: "@TheAlgoTrader",
        bio: "Quant analyst and prop trader. Specializing in high-frequency algorithmic strategies. Sharing insights and performance.",
        is_verified: true,
        pnl: 27.34,
        win_rate: 72.1,
        sharpe_ratio: 2.15,
        curve: &[
            ("Jan 7", 900.0),
            ("Jan 21", 950.0),
            ("Feb 4", 1050.0),
            ("Feb 18", 1150.0),
            ("Mar 11", 1273.4),
        ],
        followers: 1200,
        following: 150,
    },
    Seed {
        id: "2",
        name: "Sophia Quant",
        handle: "@SQTrades",
        bio: "Options trader focusing on volatility strategies. Sharing charts & alpha.",
        is_verified: false,
        pnl: 18.7,
        win_rate: 65.3,
        sharpe_ratio: 1.72,
        curve: &[("Jan 7", 1000.0), ("Feb 1", 1100.0), ("Mar 1", 1187.0)],
        followers: 890,
        following: 200,
    },
    Seed {
        id: "3",
        name: "Marcus 'Pips' Lee",
        handle: "@PipHunter",
        bio: "Forex day trader. Scalping EUR/USD since 2016.",
        is_verified: true,
        pnl: 45.2,
        win_rate: 78.9,
        sharpe_ratio: 2.83,
        curve: &[("Jan 7", 800.0), ("Feb 7", 970.0), ("Mar 7", 1160.0)],
        followers: 2500,
        following: 310,
    },
];

/// All trader profiles, in directory order.
///
/// # Errors
/// Returns an error if a seed identifier fails validation.
pub fn fetch_all_traders() -> TradenomixResult<Vec<TraderProfile>> {
    SEED.iter()
        .map(|seed| {
            Ok(TraderProfile {
                id: TraderId::new(seed.id)?,
                name: seed.name.to_string(),
                handle: seed.handle.to_string(),
                bio: seed.bio.to_string(),
                is_verified: seed.is_verified,
                pnl: seed.pnl,
                win_rate: seed.win_rate,
                sharpe_ratio: seed.sharpe_ratio,
                equity_curve_data: seed
                    .curve
                    .iter()
                    .map(|(date, value)| EquityPoint {
                        date: (*date).to_string(),
                        value: *value,
                    })
                    .collect(),
                followers: seed.followers,
                following: seed.following,
            })
        })
        .collect()
}

/// The profile with `id`, if any.
///
/// # Errors
/// Returns an error if the directory cannot be built.
pub fn fetch_trader_by_id(id: &TraderId) -> TradenomixResult<Option<TraderProfile>> {
    Ok(fetch_all_traders()?.into_iter().find(|t| &t.id == id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_lookup() {
        assert_eq!(fetch_all_traders().unwrap().len(), 3);

        let marcus = fetch_trader_by_id(&TraderId::new("3").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(marcus.handle, "@PipHunter");
        assert_eq!(marcus.equity_curve_data.len(), 3);

        assert!(
            fetch_trader_by_id(&TraderId::new("404").unwrap())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_profile_serializes_camel_case() {
        let alex = fetch_all_traders().unwrap().remove(0);
        let json = serde_json::to_value(&alex).unwrap();
        assert_eq!(json["isVerified"], true);
        assert_eq!(json["equityCurveData"][4]["value"], 1273.4);
    }
}
