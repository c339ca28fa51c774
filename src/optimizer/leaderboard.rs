//! Per-run ranking of model families

use super::config::SearchStrategy;
use super::search_space::{format_params, ParamSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Result of searching one model family
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry<E> {
    pub family: String,
    /// R² of the refit estimator on the held-out split
    pub score: f64,
    /// Mean cross-validated R² of the chosen parameters; `None` for a direct fit
    pub cv_score: Option<f64>,
    pub params: ParamSet,
    pub strategy: SearchStrategy,
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub estimator: E,
}

/// Held-out scores of every family in one training run, in evaluation order
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard<E> {
    entries: Vec<LeaderboardEntry<E>>,
}

impl<E> Leaderboard<E> {
    pub(crate) fn new(entries: Vec<LeaderboardEntry<E>>) -> Self {
        Self { entries }
    }

    /// Entries in evaluation order
    pub fn entries(&self) -> &[LeaderboardEntry<E>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, family: &str) -> Option<&LeaderboardEntry<E>> {
        self.entries.iter().find(|e| e.family == family)
    }

    /// Held-out score of `family`
    pub fn score(&self, family: &str) -> Option<f64> {
        self.get(family).map(|e| e.score)
    }

    /// Family → held-out score
    pub fn scores(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.family.clone(), e.score))
            .collect()
    }

    /// Family → chosen hyperparameters
    pub fn best_params_by_family(&self) -> BTreeMap<String, ParamSet> {
        self.entries
            .iter()
            .map(|e| (e.family.clone(), e.params.clone()))
            .collect()
    }

    /// Index of the winner: highest held-out score, earliest entry on ties.
    /// NaN never wins against a real score.
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            let score = rank_key(entry.score);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub fn best(&self) -> Option<&LeaderboardEntry<E>> {
        self.best_index().map(|idx| &self.entries[idx])
    }

    /// Entries sorted by held-out score, best first; ties keep evaluation order
    pub fn ranked(&self) -> Vec<&LeaderboardEntry<E>> {
        let mut ranked: Vec<&LeaderboardEntry<E>> = self.entries.iter().collect();
        ranked.sort_by(|a, b| rank_key(b.score).total_cmp(&rank_key(a.score)));
        ranked
    }
}

fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

impl<E> fmt::Display for Leaderboard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|e| e.family.len())
            .max()
            .unwrap_or(6)
            .max(6);

        writeln!(
            f,
            "{:>4}  {:<width$}  {:>9}  {:>9}  {:<12}  {}",
            "Rank", "Family", "Held-out", "CV", "Search", "Params",
            width = width
        )?;
        for (rank, entry) in self.ranked().into_iter().enumerate() {
            let cv = entry
                .cv_score
                .map(|s| format!("{:.4}", s))
                .unwrap_or_else(|| "-".to_string());
            let search = match entry.strategy {
                SearchStrategy::DirectFit => "fit".to_string(),
                other => format!("{} ({})", other.label(), other.n_candidates()),
            };
            writeln!(
                f,
                "{:>4}  {:<width$}  {:>9.4}  {:>9}  {:<12}  {}",
                rank + 1,
                entry.family,
                entry.score,
                cv,
                search,
                format_params(&entry.params),
                width = width
            )?;
        }
        Ok(())
    }
}
