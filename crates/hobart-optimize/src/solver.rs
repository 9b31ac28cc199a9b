//! Projected gradient solver over the capped simplex.
//!
//! Each iteration takes a step `w - t·∇f(w)`, projects it back onto the
//! feasible set, and accepts it once the sufficient-decrease test
//!
//! ```text
//! f(w⁺) ≤ f(w) + ∇f(w)ᵀ(w⁺ - w) + ‖w⁺ - w‖² / (2t)
//! ```
//!
//! holds, halving `t` otherwise. The next trial step is the Barzilai-Borwein
//! length `sᵀs / sᵀy`, or double the accepted step when the curvature is not
//! positive (linear objectives).
//!
//! Convergence is measured by the scale-free residual
//! `‖w - P(w - ∇f(w) / ‖∇f(w)‖∞)‖∞`, which is zero exactly at a KKT point.

use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, Result};
use crate::objective::{Objective, Problem};
use crate::projection::project_capped_simplex;
use ndarray::{Array1, ArrayView1};

const MIN_STEP: f64 = 1e-20;
const MAX_STEP: f64 = 1e20;
/// Relative slack in the decrease test that absorbs rounding near the optimum.
const DECREASE_SLACK: f64 = 1e-13;

/// Weights found by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Raw feasible weights, before display rounding.
    pub weights: Array1<f64>,
    /// Objective value at `weights`.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Final projected-gradient residual.
    pub residual: f64,
}

/// Projected gradient descent with Barzilai-Borwein steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedGradient {
    upper_bound: f64,
    max_iterations: usize,
    tolerance: f64,
}

impl ProjectedGradient {
    /// Create a solver.
    pub const fn new(upper_bound: f64, max_iterations: usize, tolerance: f64) -> Self {
        Self {
            upper_bound,
            max_iterations,
            tolerance,
        }
    }

    /// Create a solver from optimizer settings.
    pub const fn from_config(config: &OptimizerConfig) -> Self {
        Self::new(config.upper_bound, config.max_iterations, config.tolerance)
    }

    /// Scale-free stationarity measure at `w` with gradient `g`.
    pub fn residual(&self, w: ArrayView1<'_, f64>, g: ArrayView1<'_, f64>) -> f64 {
        let scale = g.fold(0.0_f64, |m, x| m.max(x.abs()));
        if scale == 0.0 {
            return 0.0;
        }
        let target = &w - &(&g / scale);
        let projected = project_capped_simplex(target.view(), self.upper_bound);
        w.iter()
            .zip(projected.iter())
            .fold(0.0_f64, |m, (a, b)| m.max((a - b).abs()))
    }

    /// Minimize `objective` over the capped simplex, starting from equal weights.
    ///
    /// # Errors
    /// Returns [`OptimizeError::OptimizationFailed`] if the start or a gradient
    /// is not finite, the line search cannot make progress, or the iteration
    /// budget runs out.
    pub fn solve(&self, problem: &Problem, objective: Objective) -> Result<Solution> {
        let n = problem.n_assets();
        let failed = |iterations: usize, residual: f64| OptimizeError::OptimizationFailed {
            objective,
            iterations,
            residual,
        };

        let mut w = Array1::from_elem(n, 1.0 / n as f64);
        let mut f = problem.value(objective, w.view());
        let mut g = problem.gradient(objective, w.view());
        if !f.is_finite() || g.iter().any(|x| !x.is_finite()) {
            tracing::debug!(%objective, value = f, "objective not finite at equal weights");
            return Err(failed(0, f64::NAN));
        }

        let scale = g.fold(0.0_f64, |m, x| m.max(x.abs()));
        let mut step = if scale > 0.0 { 1.0 / scale } else { 1.0 };

        for iteration in 0..self.max_iterations {
            let residual = self.residual(w.view(), g.view());
            if residual < self.tolerance {
                tracing::debug!(%objective, iterations = iteration, residual, value = f, "converged");
                return Ok(Solution {
                    weights: w,
                    value: f,
                    iterations: iteration,
                    residual,
                });
            }

            let mut t = step;
            let (w_next, f_next) = loop {
                let trial = &w - &(&g * t);
                let candidate = project_capped_simplex(trial.view(), self.upper_bound);
                let d = &candidate - &w;
                let f_candidate = problem.value(objective, candidate.view());
                let bound = f + g.dot(&d) + d.dot(&d) / (2.0 * t) + DECREASE_SLACK * (1.0 + f.abs());
                if f_candidate <= bound {
                    break (candidate, f_candidate);
                }
                t *= 0.5;
                if t < MIN_STEP {
                    tracing::debug!(%objective, iteration, residual, "line search stalled");
                    return Err(failed(iteration, residual));
                }
            };

            let g_next = problem.gradient(objective, w_next.view());
            if g_next.iter().any(|x| !x.is_finite()) {
                return Err(failed(iteration + 1, f64::NAN));
            }

            let s = &w_next - &w;
            let y = &g_next - &g;
            let curvature = s.dot(&y);
            step = if curvature > 0.0 {
                s.dot(&s) / curvature
            } else {
                2.0 * t
            }
            .clamp(MIN_STEP, MAX_STEP);

            w = w_next;
            f = f_next;
            g = g_next;
        }

        let residual = self.residual(w.view(), g.view());
        if residual < self.tolerance {
            return Ok(Solution {
                weights: w,
                value: f,
                iterations: self.max_iterations,
                residual,
            });
        }
        tracing::debug!(%objective, residual, "iteration budget exhausted");
        Err(failed(self.max_iterations, residual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn solver(upper: f64) -> ProjectedGradient {
        ProjectedGradient::new(upper, 10_000, 1e-10)
    }

    #[test]
    fn test_linear_objective_hits_vertex() {
        let mu = array![0.10, 0.05];
        let cov = Array2::<f64>::zeros((2, 2));
        let problem = Problem::new(mu.view(), cov.view(), 0.0).unwrap();

        let unconstrained = solver(1.0).solve(&problem, Objective::MaxReturn).unwrap();
        assert_relative_eq!(unconstrained.weights[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(unconstrained.weights[1], 0.0, epsilon = 1e-12);

        let capped = solver(0.6).solve(&problem, Objective::MaxReturn).unwrap();
        assert_relative_eq!(capped.weights[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(capped.weights[1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_min_variance_two_assets() {
        // Closed form for uncorrelated assets: w1 = σ2² / (σ1² + σ2²)
        let mu = array![0.1, 0.1];
        let cov = array![[0.04, 0.0], [0.0, 0.01]];
        let problem = Problem::new(mu.view(), cov.view(), 0.0).unwrap();
        let solution = solver(1.0).solve(&problem, Objective::MinRisk).unwrap();
        assert_relative_eq!(solution.weights[0], 0.2, epsilon = 1e-8);
        assert_relative_eq!(solution.weights[1], 0.8, epsilon = 1e-8);
        assert!(solution.residual < 1e-10);
    }

    #[test]
    fn test_max_sharpe_tangency() {
        // Uncorrelated: tangency weights ∝ (μ - rf) / σ²
        let mu = array![0.12, 0.08];
        let cov = array![[0.04, 0.0], [0.0, 0.02]];
        let problem = Problem::new(mu.view(), cov.view(), 0.02).unwrap();
        let solution = solver(1.0).solve(&problem, Objective::MaxSharpe).unwrap();

        let raw = [0.10 / 0.04, 0.06 / 0.02];
        let total = raw[0] + raw[1];
        assert_relative_eq!(solution.weights[0], raw[0] / total, epsilon = 1e-7);
        assert_relative_eq!(solution.weights[1], raw[1] / total, epsilon = 1e-7);
    }

    #[test]
    fn test_zero_covariance_sharpe_fails() {
        let mu = array![0.1, 0.2];
        let cov = Array2::<f64>::zeros((2, 2));
        let problem = Problem::new(mu.view(), cov.view(), 0.0).unwrap();
        let err = solver(1.0).solve(&problem, Objective::MaxSharpe).unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::OptimizationFailed {
                objective: Objective::MaxSharpe,
                iterations: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_budget_exhaustion_is_reported() {
        let mu = array![0.12, 0.08, 0.05];
        let cov = array![[0.04, 0.006, 0.0], [0.006, 0.0225, 0.003], [0.0, 0.003, 0.01]];
        let problem = Problem::new(mu.view(), cov.view(), 0.0).unwrap();
        let err = ProjectedGradient::new(1.0, 1, 1e-300)
            .solve(&problem, Objective::MinRisk)
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::OptimizationFailed {
                objective: Objective::MinRisk,
                iterations: 1,
                ..
            }
        ));
    }
}
