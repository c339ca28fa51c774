//! Search engine: fit every model family, pick the best by held-out R²

use super::config::{SearchConfig, SearchStrategy};
use super::leaderboard::{Leaderboard, LeaderboardEntry};
use super::search_space::{format_params, ParamSet, SearchSpace};
use crate::error::{Result, ScoreError};
use crate::training::{CrossValidator, Estimator};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a training run learns from the search
#[derive(Debug, Clone)]
pub struct SearchOutcome<E> {
    pub leaderboard: Leaderboard<E>,
    pub best_family: String,
    /// Winner refit on the full training split
    pub best_estimator: E,
    pub best_params: BTreeMap<String, ParamSet>,
}

impl<E> SearchOutcome<E> {
    /// Held-out R² of the winning family
    pub fn best_score(&self) -> f64 {
        self.leaderboard
            .score(&self.best_family)
            .unwrap_or(f64::NAN)
    }
}

/// Training and held-out matrices shared by every family
struct Splits<'a> {
    x_train: &'a Array2<f64>,
    y_train: &'a Array1<f64>,
    x_held: &'a Array2<f64>,
    y_held: &'a Array1<f64>,
}

/// Runs the per-family search
#[derive(Debug, Clone)]
pub struct SearchEngine {
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Choose the strategy for `space` and produce its candidate parameter sets.
    ///
    /// A direct fit has a single empty candidate.
    pub fn plan(&self, space: &SearchSpace) -> Result<(SearchStrategy, Vec<ParamSet>)> {
        space.validate()?;
        let strategy = self.config.strategy_for(
            space.combinations(),
            space.is_empty(),
            space.is_enumerable(),
        );
        let candidates = match strategy {
            SearchStrategy::DirectFit => vec![ParamSet::new()],
            SearchStrategy::Exhaustive { .. } => space.grid()?,
            SearchStrategy::Randomized { n_iter, .. } => {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
                space.sample(n_iter, &mut rng)
            }
        };
        Ok((strategy, candidates))
    }

    /// Search every family in `estimators` order.
    ///
    /// Families missing from `spaces` get a direct fit. The first failing
    /// family aborts the run with [`ScoreError::SearchFailure`].
    pub fn evaluate<E: Estimator>(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_held: &Array2<f64>,
        y_held: &Array1<f64>,
        estimators: &[(String, E)],
        spaces: &BTreeMap<String, SearchSpace>,
    ) -> Result<SearchOutcome<E>> {
        check_splits(x_train, y_train, x_held, y_held)?;
        if estimators.is_empty() {
            return Err(ScoreError::ConfigError("no model families to evaluate".to_string()));
        }
        let mut seen = HashSet::new();
        for (family, _) in estimators {
            if !seen.insert(family.as_str()) {
                return Err(ScoreError::ConfigError(format!(
                    "model family '{}' is listed twice",
                    family
                )));
            }
        }
        for family in spaces.keys() {
            if !seen.contains(family.as_str()) {
                warn!(family = %family, "Search space has no matching model family, ignoring");
            }
        }

        let splits = Splits {
            x_train,
            y_train,
            x_held,
            y_held,
        };
        let empty = SearchSpace::new();
        let start = Instant::now();
        info!(
            families = estimators.len(),
            n_train = x_train.nrows(),
            n_held_out = x_held.nrows(),
            n_features = x_train.ncols(),
            "Starting model search"
        );

        let mut entries = Vec::with_capacity(estimators.len());
        for (family, template) in estimators {
            let space = spaces.get(family).unwrap_or(&empty);
            let entry = self
                .search_family(family, template, space, &splits)
                .map_err(|e| ScoreError::search_failure(family.clone(), e))?;
            entries.push(entry);
        }

        let leaderboard = Leaderboard::new(entries);
        let best_idx = leaderboard
            .best_index()
            .ok_or_else(|| ScoreError::ComputationError("empty leaderboard".to_string()))?;
        let best = &leaderboard.entries()[best_idx];
        let best_family = best.family.clone();
        let best_estimator = best.estimator.clone();
        let best_params = leaderboard.best_params_by_family();

        info!(
            best_family = %best_family,
            score = best.score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model search complete"
        );

        Ok(SearchOutcome {
            leaderboard,
            best_family,
            best_estimator,
            best_params,
        })
    }

    fn search_family<E: Estimator>(
        &self,
        family: &str,
        template: &E,
        space: &SearchSpace,
        splits: &Splits<'_>,
    ) -> Result<LeaderboardEntry<E>> {
        let start = Instant::now();
        let (strategy, candidates) = self.plan(space)?;
        info!(
            family = %family,
            strategy = strategy.label(),
            candidates = candidates.len(),
            "Searching model family"
        );

        let (params, cv_score) = match strategy {
            SearchStrategy::DirectFit => (ParamSet::new(), None),
            _ => {
                let cv = CrossValidator::k_fold(self.config.cv_folds);
                let scores: Vec<f64> = candidates
                    .par_iter()
                    .map(|params| {
                        let model = configure(template, params)?;
                        let results = cv.cross_validate(&model, splits.x_train, splits.y_train)?;
                        Ok(results.mean_score)
                    })
                    .collect::<Result<Vec<f64>>>()?;

                let best = best_candidate(&scores).ok_or_else(|| {
                    ScoreError::ComputationError("no candidates were scored".to_string())
                })?;
                debug!(
                    family = %family,
                    cv_score = scores[best],
                    params = %format_params(&candidates[best]),
                    "Best cross-validated candidate"
                );
                (candidates[best].clone(), Some(scores[best]))
            }
        };

        let mut estimator = configure(template, &params)?;
        estimator.fit(splits.x_train, splits.y_train)?;
        let score = estimator.score(splits.x_held, splits.y_held)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            family = %family,
            score,
            cv_score = cv_score.unwrap_or(f64::NAN),
            params = %format_params(&params),
            elapsed_ms,
            "Model family done"
        );

        Ok(LeaderboardEntry {
            family: family.to_string(),
            score,
            cv_score,
            params,
            strategy,
            elapsed_ms,
            estimator,
        })
    }
}

/// Clone `template` and apply `params` to the copy
fn configure<E: Estimator>(template: &E, params: &ParamSet) -> Result<E> {
    let mut model = template.clone();
    for (name, value) in params {
        model.set_param(name, value)?;
    }
    Ok(model)
}

/// First index holding the maximum score; NaN only wins if nothing else exists
fn best_candidate(scores: &[f64]) -> Option<usize> {
    let key = |s: f64| if s.is_nan() { f64::NEG_INFINITY } else { s };
    let mut best: Option<usize> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some(b) if key(score) <= key(scores[b]) => {}
            _ => best = Some(idx),
        }
    }
    best
}

fn check_splits(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_held: &Array2<f64>,
    y_held: &Array1<f64>,
) -> Result<()> {
    if x_train.nrows() != y_train.len() || x_held.nrows() != y_held.len() {
        return Err(ScoreError::DataShapeError(format!(
            "feature/target row mismatch: train {}x{} vs {}, held-out {}x{} vs {}",
            x_train.nrows(),
            x_train.ncols(),
            y_train.len(),
            x_held.nrows(),
            x_held.ncols(),
            y_held.len()
        )));
    }
    if x_train.ncols() != x_held.ncols() {
        return Err(ScoreError::DataShapeError(format!(
            "train has {} features but held-out has {}",
            x_train.ncols(),
            x_held.ncols()
        )));
    }
    if x_train.nrows() == 0 || x_held.nrows() == 0 {
        return Err(ScoreError::DataShapeError(
            "train and held-out splits must both be non-empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{Distribution, ParamValue};
    use crate::training::{LinearRegression, RidgeRegression};
    use ndarray::Array;

    fn data() -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
        let x = Array::from_shape_fn((40, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = x.map_axis(ndarray::Axis(1), |r| 3.0 * r[0] - 2.0 * r[1] + 5.0);
        let xh = Array::from_shape_fn((10, 2), |(i, j)| ((i * 5 + j) % 9) as f64);
        let yh = xh.map_axis(ndarray::Axis(1), |r| 3.0 * r[0] - 2.0 * r[1] + 5.0);
        (x, y, xh, yh)
    }

    #[test]
    fn test_plan_direct_fit_for_empty_space() {
        let engine = SearchEngine::new(SearchConfig::default()).unwrap();
        let (strategy, candidates) = engine.plan(&SearchSpace::new()).unwrap();
        assert_eq!(strategy, SearchStrategy::DirectFit);
        assert_eq!(candidates, vec![ParamSet::new()]);
    }

    #[test]
    fn test_plan_exhaustive_scores_every_combination() {
        let engine = SearchEngine::new(SearchConfig::default().with_grid_limit(6)).unwrap();
        let space = SearchSpace::new()
            .values("a", vec![1i64, 2, 3])
            .values("b", vec![true, false]);
        let (strategy, candidates) = engine.plan(&space).unwrap();
        assert_eq!(strategy, SearchStrategy::Exhaustive { combinations: 6 });
        assert_eq!(candidates.len(), 6);
    }

    #[test]
    fn test_plan_randomized_is_seeded() {
        let config = SearchConfig::default().with_grid_limit(10).with_iter_bounds(4, 8);
        let engine = SearchEngine::new(config).unwrap();
        let space = SearchSpace::new()
            .values("a", (0..5i64).collect())
            .values("b", (0..5i64).collect());
        let (strategy, first) = engine.plan(&space).unwrap();
        let (_, second) = engine.plan(&space).unwrap();
        assert_eq!(strategy, SearchStrategy::Randomized { combinations: 25, n_iter: 8 });
        assert_eq!(first.len(), 8);
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_distribution_goes_random() {
        let engine = SearchEngine::new(SearchConfig::default()).unwrap();
        let space = SearchSpace::new().distribution("alpha", Distribution::log_float(1e-3, 10.0));
        let (strategy, candidates) = engine.plan(&space).unwrap();
        assert_eq!(strategy, SearchStrategy::Randomized { combinations: 1, n_iter: 15 });
        assert_eq!(candidates.len(), 15);
    }

    #[test]
    fn test_evaluate_picks_best_and_never_touches_template() {
        let (x, y, xh, yh) = data();
        let engine = SearchEngine::new(SearchConfig::default()).unwrap();
        let template = RidgeRegression::new(1.0);
        let estimators = vec![
            ("Ridge".to_string(), template.clone()),
            ("Ridge Strong".to_string(), RidgeRegression::new(500.0)),
        ];
        let mut spaces = BTreeMap::new();
        spaces.insert(
            "Ridge".to_string(),
            SearchSpace::new().values("alpha", vec![0.001, 1.0, 100.0]),
        );

        let outcome = engine.evaluate(&x, &y, &xh, &yh, &estimators, &spaces).unwrap();
        assert_eq!(outcome.best_family, "Ridge");
        assert_eq!(outcome.best_params["Ridge"]["alpha"], ParamValue::Float(0.001));
        assert!(outcome.best_params["Ridge Strong"].is_empty());
        assert!(outcome.best_score() > 0.99);
        assert_eq!(estimators[0].1.alpha, template.alpha);

        let ridge = outcome.leaderboard.get("Ridge").unwrap();
        assert!(ridge.cv_score.is_some());
        assert_eq!(ridge.strategy, SearchStrategy::Exhaustive { combinations: 3 });
        assert!(outcome.leaderboard.get("Ridge Strong").unwrap().cv_score.is_none());
    }

    #[test]
    fn test_tie_goes_to_first_family() {
        let (x, y, xh, yh) = data();
        let engine = SearchEngine::new(SearchConfig::default()).unwrap();
        let estimators = vec![
            ("first".to_string(), LinearRegression::new()),
            ("second".to_string(), LinearRegression::new()),
        ];
        let outcome = engine
            .evaluate(&x, &y, &xh, &yh, &estimators, &BTreeMap::new())
            .unwrap();
        assert_eq!(outcome.best_family, "first");
    }

    #[test]
    fn test_failure_aborts_run() {
        let (x, y, xh, yh) = data();
        let engine = SearchEngine::new(SearchConfig::default()).unwrap();
        let estimators = vec![
            ("Linear".to_string(), LinearRegression::new()),
            ("Broken".to_string(), LinearRegression::new()),
        ];
        let mut spaces = BTreeMap::new();
        spaces.insert(
            "Broken".to_string(),
            SearchSpace::new().values("no_such_param", vec![1i64]),
        );

        let err = engine
            .evaluate(&x, &y, &xh, &yh, &estimators, &spaces)
            .unwrap_err();
        match err {
            ScoreError::SearchFailure { family, .. } => assert_eq!(family, "Broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_duplicate_families_and_bad_shapes() {
        let (x, y, xh, yh) = data();
        let engine = SearchEngine::new(SearchConfig::default()).unwrap();
        let dup = vec![
            ("a".to_string(), LinearRegression::new()),
            ("a".to_string(), LinearRegression::new()),
        ];
        assert!(matches!(
            engine.evaluate(&x, &y, &xh, &yh, &dup, &BTreeMap::new()),
            Err(ScoreError::ConfigError(_))
        ));

        let one = vec![("a".to_string(), LinearRegression::new())];
        let short = y.slice(ndarray::s![..10]).to_owned();
        assert!(matches!(
            engine.evaluate(&x, &short, &xh, &yh, &one, &BTreeMap::new()),
            Err(ScoreError::DataShapeError(_))
        ));
    }

    #[test]
    fn test_best_candidate_skips_nan() {
        assert_eq!(best_candidate(&[f64::NAN, 0.2, 0.5, 0.5]), Some(2));
        assert_eq!(best_candidate(&[]), None);
    }
}
