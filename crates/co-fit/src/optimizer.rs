//! Scalar function minimization.
//!
//! Thin wrapper around argmin's L-BFGS with a More-Thuente line search,
//! specialized to the one-parameter bounded objectives used by the
//! background fit.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use co_core::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Configuration for the L-BFGS minimizer.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    /// Maximum number of iterations.
    pub max_iter: u64,
    /// Convergence tolerance for the gradient norm.
    pub tol: f64,
    /// Number of corrections to approximate the inverse Hessian.
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_iter: 200, tol: 1e-8, m: 5 }
    }
}

/// Result of a scalar minimization.
#[derive(Debug, Clone)]
pub struct ScalarMinimum {
    /// Location of the minimum.
    pub x: f64,
    /// Function value at the minimum.
    pub fval: f64,
    /// Number of iterations.
    pub n_iter: u64,
    /// Number of objective evaluations.
    pub n_fev: usize,
    /// Number of gradient evaluations.
    pub n_gev: usize,
    /// Convergence status.
    pub converged: bool,
    /// Termination message.
    pub message: String,
}

impl fmt::Display for ScalarMinimum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScalarMinimum(x={:.6}, fval={:.6}, n_iter={}, n_fev={}, n_gev={}, converged={}, {})",
            self.x, self.fval, self.n_iter, self.n_fev, self.n_gev, self.converged, self.message
        )
    }
}

/// One-parameter objective function.
pub trait ScalarObjective: Send + Sync {
    /// Evaluate the objective at `x`.
    fn eval(&self, x: f64) -> Result<f64>;

    /// Gradient at `x` (central difference if not overridden).
    fn gradient(&self, x: f64) -> Result<f64> {
        let eps = 1e-8 * x.abs().max(1.0);
        let f_plus = self.eval(x + eps)?;
        let f_minus = self.eval(x - eps)?;
        Ok((f_plus - f_minus) / (2.0 * eps))
    }
}

#[derive(Default)]
struct FuncCounts {
    cost: AtomicUsize,
    grad: AtomicUsize,
}

/// Wrapper making a [`ScalarObjective`] compatible with argmin.
struct ArgminProblem<'a> {
    objective: &'a dyn ScalarObjective,
    bounds: (f64, f64),
    counts: Arc<FuncCounts>,
}

fn clamp(x: f64, (lo, hi): (f64, f64)) -> f64 {
    x.clamp(lo, hi)
}

impl<'a> CostFunction for ArgminProblem<'a> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        self.counts.cost.fetch_add(1, Ordering::Relaxed);
        let x = clamp(params[0], self.bounds);
        self.objective.eval(x).map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

impl<'a> Gradient for ArgminProblem<'a> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(
        &self,
        params: &Self::Param,
    ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        self.counts.grad.fetch_add(1, Ordering::Relaxed);
        let x = clamp(params[0], self.bounds);
        let mut g =
            self.objective.gradient(x).map_err(|e| argmin::core::Error::msg(e.to_string()))?;

        // Projected gradient at an active bound: zero the component that
        // would push further outside, so the line search does not step into
        // the flat clamped region.
        const EPS: f64 = 1e-12;
        let (lo, hi) = self.bounds;
        if (x <= lo + EPS && g > 0.0) || (x >= hi - EPS && g < 0.0) {
            g = 0.0;
        }

        Ok(vec![g])
    }
}

/// L-BFGS minimizer for bounded scalar objectives.
pub struct ScalarMinimizer {
    config: OptimizerConfig,
}

impl ScalarMinimizer {
    /// Create a minimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` over `[bounds.0, bounds.1]` starting from `init`.
    pub fn minimize(
        &self,
        objective: &dyn ScalarObjective,
        init: f64,
        bounds: (f64, f64),
    ) -> Result<ScalarMinimum> {
        let (lo, hi) = bounds;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(Error::Validation(format!("invalid bounds: ({lo}, {hi})")));
        }

        let counts = Arc::new(FuncCounts::default());
        let problem = ArgminProblem { objective, bounds, counts: counts.clone() };

        let linesearch = MoreThuenteLineSearch::new();
        // Argmin's default cost tolerance is ~machine epsilon, stricter than
        // the mean-NLL scale warrants; relax it relative to the gradient
        // tolerance to avoid spurious max-iter terminations.
        let tol_cost = if self.config.tol == 0.0 { 0.0 } else { (0.1 * self.config.tol).max(1e-12) };
        let solver = LBFGS::new(linesearch, self.config.m)
            .with_tolerance_grad(self.config.tol)
            .map_err(|e| Error::Validation(format!("invalid optimizer tolerance: {e}")))?
            .with_tolerance_cost(tol_cost)
            .map_err(|e| Error::Validation(format!("invalid optimizer cost tolerance: {e}")))?;

        let res = Executor::new(problem, solver)
            .configure(|state| {
                state.param(vec![clamp(init, bounds)]).max_iters(self.config.max_iter)
            })
            .run()
            .map_err(|e| Error::Computation(format!("optimization failed: {e}")))?;

        let state = res.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| Error::Computation("no best parameter found".to_string()))?;
        let x = clamp(best[0], bounds);
        let termination = state.get_termination_status();
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );

        Ok(ScalarMinimum {
            x,
            fval: state.get_best_cost(),
            n_iter: state.get_iter(),
            n_fev: counts.cost.load(Ordering::Relaxed),
            n_gev: counts.grad.load(Ordering::Relaxed),
            converged,
            message: termination.to_string(),
        })
    }
}

impl Default for ScalarMinimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}
