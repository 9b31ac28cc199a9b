//! Allocations and their realized metrics.
//!
//! Solver output is post-processed before it is reported: negative noise is
//! clipped, the vector is renormalized, rounded to the configured precision,
//! and the rounding residual is moved onto the largest weight that can absorb
//! it without breaking a bound. Realized return, volatility and Sharpe ratio
//! are re-evaluated on the final weights.

use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::objective::{Objective, Problem};
use crate::solver::ProjectedGradient;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A weight vector with realized metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Objective this allocation solves; `None` for the equal-weight reference.
    pub objective: Option<Objective>,
    /// Weights in asset order, non-negative and summing to one.
    pub weights: Vec<f64>,
    /// wᵀμ
    pub expected_return: f64,
    /// sqrt(wᵀΣw)
    pub volatility: f64,
    /// (wᵀμ - rf) / volatility; NaN at zero volatility.
    pub sharpe_ratio: f64,
    /// Solver iterations (0 for the equal-weight reference).
    pub iterations: usize,
}

impl Allocation {
    fn evaluate(
        problem: &Problem,
        objective: Option<Objective>,
        weights: Vec<f64>,
        iterations: usize,
    ) -> Self {
        let w = ArrayView1::from(&weights[..]);
        let expected_return = problem.portfolio_return(w);
        let volatility = problem.portfolio_variance(w).max(0.0).sqrt();
        let sharpe_ratio = problem.sharpe_ratio(w);
        Self {
            objective,
            weights,
            expected_return,
            volatility,
            sharpe_ratio,
            iterations,
        }
    }

    /// Label used in tables and exports.
    pub fn label(&self) -> &'static str {
        self.objective.map_or("equal_weight", Objective::name)
    }
}

/// The three optimized allocations. Each objective succeeds or fails on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    /// Maximum expected return.
    pub max_return: Result<Allocation>,
    /// Minimum variance.
    pub min_risk: Result<Allocation>,
    /// Maximum Sharpe ratio.
    pub max_sharpe: Result<Allocation>,
}

impl AllocationResult {
    /// Result for `objective`.
    pub const fn get(&self, objective: Objective) -> &Result<Allocation> {
        match objective {
            Objective::MaxReturn => &self.max_return,
            Objective::MinRisk => &self.min_risk,
            Objective::MaxSharpe => &self.max_sharpe,
        }
    }

    /// Iterate `(objective, result)` in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Objective, &Result<Allocation>)> {
        Objective::ALL.into_iter().map(move |o| (o, self.get(o)))
    }

    /// Successful allocations, in reporting order.
    pub fn successes(&self) -> impl Iterator<Item = &Allocation> {
        self.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Whether every objective converged.
    pub const fn all_converged(&self) -> bool {
        self.max_return.is_ok() && self.min_risk.is_ok() && self.max_sharpe.is_ok()
    }

    /// `(max_return, min_risk, max_sharpe)` weight vectors, failing on the first
    /// objective that did not converge.
    ///
    /// # Errors
    /// The first failed objective's error.
    pub fn into_tuple(self) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
        Ok((
            self.max_return?.weights,
            self.min_risk?.weights,
            self.max_sharpe?.weights,
        ))
    }
}

fn round_to(x: f64, scale: f64) -> f64 {
    (x * scale).round() / scale
}

/// Clip, renormalize and round raw solver weights.
pub(crate) fn finalize_weights(
    raw: ArrayView1<'_, f64>,
    upper_bound: f64,
    precision: u32,
) -> Vec<f64> {
    let clipped: Vec<f64> = raw.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clipped.iter().sum();
    if total <= 0.0 {
        return clipped;
    }

    let scale = 10_f64.powi(precision as i32);
    let mut weights: Vec<f64> = clipped.iter().map(|w| round_to(w / total, scale)).collect();

    let residual = round_to(1.0 - weights.iter().sum::<f64>(), scale);
    if residual != 0.0 {
        // Largest weight that can absorb the residual, preferring one that stays
        // under the cap. Ties go to the first asset.
        let largest = |within_cap: bool| {
            weights
                .iter()
                .enumerate()
                .filter(|(_, w)| {
                    let adjusted = *w + residual;
                    adjusted >= 0.0 && (!within_cap || adjusted <= upper_bound + 0.5 / scale)
                })
                .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
                .map(|(i, _)| i)
        };
        if let Some(i) = largest(true).or_else(|| largest(false)) {
            weights[i] = round_to(weights[i] + residual, scale);
        }
    }
    weights
}

/// Long-only optimizer over the capped simplex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimizer {
    config: OptimizerConfig,
    solver: ProjectedGradient,
}

impl Optimizer {
    /// Create an optimizer.
    ///
    /// # Errors
    /// Returns [`crate::OptimizeError::InvalidConfig`] for out-of-range settings.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            solver: ProjectedGradient::from_config(&config),
        })
    }

    /// Settings in use.
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn problem(
        &self,
        expected_returns: ArrayView1<'_, f64>,
        covariance: ArrayView2<'_, f64>,
        risk_free_rate: f64,
    ) -> Result<Problem> {
        let problem = Problem::new(expected_returns, covariance, risk_free_rate)?;
        self.config.check_feasible(problem.n_assets())?;
        Ok(problem)
    }

    /// Solve one objective and post-process the weights.
    ///
    /// # Errors
    /// [`crate::OptimizeError::OptimizationFailed`] if the solver does not converge.
    pub fn solve(&self, problem: &Problem, objective: Objective) -> Result<Allocation> {
        let solution = self.solver.solve(problem, objective)?;
        let weights = finalize_weights(
            solution.weights.view(),
            self.config.upper_bound,
            self.config.precision,
        );
        Ok(Allocation::evaluate(
            problem,
            Some(objective),
            weights,
            solution.iterations,
        ))
    }

    /// Solve all three objectives.
    ///
    /// # Errors
    /// Fails only on invalid or infeasible input; convergence failures are
    /// reported per objective inside [`AllocationResult`].
    pub fn optimize(
        &self,
        expected_returns: ArrayView1<'_, f64>,
        covariance: ArrayView2<'_, f64>,
        risk_free_rate: f64,
    ) -> Result<AllocationResult> {
        let problem = self.problem(expected_returns, covariance, risk_free_rate)?;
        let solve = |objective| {
            let result = self.solve(&problem, objective);
            if let Err(e) = &result {
                tracing::warn!(%objective, error = %e, "objective failed");
            }
            result
        };

        Ok(AllocationResult {
            max_return: solve(Objective::MaxReturn),
            min_risk: solve(Objective::MinRisk),
            max_sharpe: solve(Objective::MaxSharpe),
        })
    }

    /// The equal-weight reference allocation.
    ///
    /// # Errors
    /// Fails on invalid or infeasible input.
    pub fn equal_weight(
        &self,
        expected_returns: ArrayView1<'_, f64>,
        covariance: ArrayView2<'_, f64>,
        risk_free_rate: f64,
    ) -> Result<Allocation> {
        let problem = self.problem(expected_returns, covariance, risk_free_rate)?;
        let n = problem.n_assets();
        let raw = Array1::from_elem(n, 1.0 / n as f64);
        let weights = finalize_weights(raw.view(), self.config.upper_bound, self.config.precision);
        Ok(Allocation::evaluate(&problem, None, weights, 0))
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        let config = OptimizerConfig::default();
        Self {
            config,
            solver: ProjectedGradient::from_config(&config),
        }
    }
}

/// Solve all three objectives with default settings.
///
/// # Errors
/// See [`Optimizer::optimize`].
pub fn optimize(
    expected_returns: ArrayView1<'_, f64>,
    covariance: ArrayView2<'_, f64>,
    risk_free_rate: f64,
) -> Result<AllocationResult> {
    Optimizer::default().optimize(expected_returns, covariance, risk_free_rate)
}

/// The equal-weight reference allocation with default settings.
///
/// # Errors
/// See [`Optimizer::equal_weight`].
pub fn equal_weight(
    expected_returns: ArrayView1<'_, f64>,
    covariance: ArrayView2<'_, f64>,
    risk_free_rate: f64,
) -> Result<Allocation> {
    Optimizer::default().equal_weight(expected_returns, covariance, risk_free_rate)
}
