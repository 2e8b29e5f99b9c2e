//! Trader directory: public profiles and the PnL leaderboard.

pub mod leaderboard;
pub mod traders;

pub use leaderboard::{LeaderboardEntry, leaderboard};
pub use traders::{EquityPoint, TraderProfile, fetch_all_traders, fetch_trader_by_id};
