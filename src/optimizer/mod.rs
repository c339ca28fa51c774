//! Hyperparameter search
//!
//! Every model family is searched independently:
//! - an empty search space means a single fit with default hyperparameters
//! - a space with at most `grid_limit` combinations is searched exhaustively
//! - anything larger (or containing a distribution) is sampled with a seeded RNG
//!
//! Candidates are ranked by mean k-fold R² on the training split. The winner
//! of each family is refit on the full training split and scored on the
//! held-out split; that held-out score is what the [`Leaderboard`] reports.

mod config;
mod leaderboard;
mod search;
mod search_space;

pub use config::{SearchConfig, SearchStrategy};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use search::{SearchEngine, SearchOutcome};
pub use search_space::{format_params, Distribution, ParamCandidates, ParamSet, ParamValue, SearchSpace};
