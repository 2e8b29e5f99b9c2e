//! Leaderboard ranked by PnL.

use serde::Serialize;

use crate::core::errors::TradenomixResult;
use crate::core::ids::TraderId;

/// A ranked leaderboard row.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    /// Trader identifier.
    pub id: TraderId,
    /// Display name.
    pub name: String,
    /// Public handle.
    pub handle: String,
    /// Verified badge.
    pub is_verified: bool,
    /// Profit and loss, in percent.
    pub pnl: f64,
    /// Winning trades, in percent.
    pub win_rate: f64,
    /// Sharpe ratio.
    pub sharpe_ratio: f64,
}

/// (id, name, handle, verified, pnl, win rate, sharpe)
const SEED: &[(&str, &str, &str, bool, f64, f64, f64)] = &[
    ("1", "Alex 'The Algo' Turner", "@TheAlgoTrader", true, 27.34, 72.1, 2.15),
    ("2", "MariaFX", "@pipsqueen", true, 22.1, 68.5, 1.9),
    ("3", "J. Rivers", "@quantRivers", false, 18.9, 66.4, 1.7),
    ("4", "Daniel Kim", "@macro_dan", false, 15.7, 64.2, 1.5),
    ("5", "Elena Li", "@elli_trade", true, 12.5, 70.0, 1.8),
    ("6", "Omar Patel", "@scalper_omar", false, 10.9, 62.3, 1.4),
    ("7", "Sophia Grant", "@grantsignals", true, 9.6, 65.1, 1.3),
    ("8", "Liam Chen", "@liam_fx", false, 8.2, 60.4, 1.2),
    ("9", "Nina Rossi", "@rossi_quant", true, 7.1, 59.8, 1.1),
    ("10", "Victor Hugo", "@victortrades", false, 5.3, 55.2, 1.0),
];

/// Traders ranked by PnL, highest first. Ties keep seed order.
///
/// # Errors
/// Returns an error if a seed identifier fails validation.
pub fn leaderboard() -> TradenomixResult<Vec<LeaderboardEntry>> {
    let mut rows = SEED
        .iter()
        .map(|&(id, name, handle, is_verified, pnl, win_rate, sharpe_ratio)| {
            Ok(LeaderboardEntry {
                rank: 0,
                id: TraderId::new(id)?,
                name: name.to_string(),
                handle: handle.to_string(),
                is_verified,
                pnl,
                win_rate,
                sharpe_ratio,
            })
        })
        .collect::<TradenomixResult<Vec<_>>>()?;

    rows.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_sorted_by_pnl_desc() {
        let board = leaderboard().unwrap();
        assert_eq!(board.len(), 10);
        assert!(board.windows(2).all(|w| w[0].pnl >= w[1].pnl));
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].handle, "@TheAlgoTrader");
        assert_eq!(board[9].rank, 10);
    }
}
