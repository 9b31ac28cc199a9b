//! Euclidean projection onto the capped simplex.
//!
//! The projection of `v` onto `{ w : Σw = 1, 0 ≤ wᵢ ≤ u }` has the form
//! `wᵢ = clip(vᵢ - τ, 0, u)` for a scalar shift τ. The total is monotone in τ,
//! so τ is bracketed by bisection and then solved exactly on the set of
//! coordinates left strictly inside the bounds.

use ndarray::{Array1, ArrayView1};

const BISECTION_STEPS: usize = 200;

fn clipped_sum(v: ArrayView1<'_, f64>, tau: f64, upper: f64) -> f64 {
    v.iter().map(|x| (x - tau).clamp(0.0, upper)).sum()
}

/// Project `v` onto `{ w : Σw = 1, 0 ≤ wᵢ ≤ upper }`.
///
/// The caller guarantees feasibility (`v.len() * upper ≥ 1`). Non-finite
/// entries of `v` propagate into the result.
pub fn project_capped_simplex(v: ArrayView1<'_, f64>, upper: f64) -> Array1<f64> {
    if v.is_empty() {
        return Array1::zeros(0);
    }

    let max = v.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
    let min = v.fold(f64::INFINITY, |m, &x| m.min(x));

    // At lo every coordinate sits at the cap, at hi every coordinate is zero.
    let mut lo = min - upper;
    let mut hi = max;
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if clipped_sum(v, mid, upper) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let mut tau = 0.5 * (lo + hi);

    // Solve Σ_free (vᵢ - τ) + n_capped * upper = 1 on the active partition.
    let mut free_sum = 0.0;
    let mut n_free = 0usize;
    let mut n_capped = 0usize;
    for &x in v {
        let shifted = x - tau;
        if shifted >= upper {
            n_capped += 1;
        } else if shifted > 0.0 {
            free_sum += x;
            n_free += 1;
        }
    }
    if n_free > 0 {
        let exact = (free_sum + n_capped as f64 * upper - 1.0) / n_free as f64;
        if exact.is_finite() {
            tau = exact;
        }
    }

    v.mapv(|x| (x - tau).clamp(0.0, upper))
}
