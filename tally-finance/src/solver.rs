//! Bisection root finding shared by the IRR, YTM and TVM rate solvers.
//!
//! The search starts from a caller-supplied guess rather than the bracket
//! midpoint and narrows by the sign of the residual. The caller states
//! whether the objective rises or falls with the unknown, so no endpoint
//! evaluations are needed. With several roots inside the bracket, the one
//! found depends on the bracket and the guess.

use tally_core::{CalcError, CalcResult, ExhaustionPolicy, Number};
use tracing::{debug, warn};

/// Default absolute residual tolerance (1e-10)
pub fn default_tolerance() -> Number {
    Number::from_scientific(1, -10)
}

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone)]
pub struct BisectionConfig {
    /// Stop once |f(x)| falls below this
    pub tolerance: Number,
    pub max_iterations: usize,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl BisectionConfig {
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Number) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Search interval for the unknown
#[derive(Debug, Clone)]
pub struct Bracket {
    pub low: Number,
    pub high: Number,
}

impl Bracket {
    pub fn new(low: Number, high: Number) -> Self {
        Self { low, high }
    }
}

/// How the objective moves as the unknown grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    /// Positive residual means the guess is too high
    Increasing,
    /// Positive residual means the guess is too low
    Decreasing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootOutcome {
    Converged {
        root: Number,
        iterations: usize,
    },
    /// Iteration budget spent; `estimate` is the last midpoint
    Exhausted {
        estimate: Number,
        residual: Number,
        iterations: usize,
    },
}

impl RootOutcome {
    pub fn value(&self) -> &Number {
        match self {
            RootOutcome::Converged { root, .. } => root,
            RootOutcome::Exhausted { estimate, .. } => estimate,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, RootOutcome::Converged { .. })
    }

    /// Apply an exhaustion policy. `what` names the solve in logs and errors.
    pub fn resolve(self, policy: ExhaustionPolicy, what: &str) -> CalcResult<Number> {
        match self {
            RootOutcome::Converged { root, .. } => Ok(root),
            RootOutcome::Exhausted { estimate, residual, iterations } => match policy {
                ExhaustionPolicy::BestEstimate => {
                    warn!(
                        solver = what,
                        iterations,
                        estimate = %estimate.as_decimal(12),
                        residual = %residual.as_decimal(12),
                        "bisection exhausted, returning best estimate"
                    );
                    Ok(estimate)
                }
                ExhaustionPolicy::Fail => Err(CalcError::convergence(
                    what,
                    &estimate.as_decimal(12),
                    iterations,
                )),
            },
        }
    }
}

/// Find x in `bracket` with |f(x)| < tolerance, starting at `initial_guess`.
///
/// Errors raised by `f` abort the search.
pub fn bisect<F>(
    mut f: F,
    bracket: Bracket,
    initial_guess: Number,
    slope: Slope,
    config: &BisectionConfig,
) -> CalcResult<RootOutcome>
where
    F: FnMut(&Number) -> CalcResult<Number>,
{
    let Bracket { mut low, mut high } = bracket;
    let two = Number::from_i64(2);
    let mut guess = initial_guess;

    for iteration in 0..config.max_iterations {
        let residual = f(&guess)?;
        if residual.abs() < config.tolerance {
            debug!(iterations = iteration + 1, root = %guess.as_decimal(12), "bisection converged");
            return Ok(RootOutcome::Converged {
                root: guess,
                iterations: iteration + 1,
            });
        }

        match (slope, residual.is_positive()) {
            (Slope::Increasing, true) | (Slope::Decreasing, false) => high = guess,
            (Slope::Increasing, false) | (Slope::Decreasing, true) => low = guess,
        }
        guess = low.add(&high).checked_div(&two)?;
    }

    let residual = f(&guess)?;
    Ok(RootOutcome::Exhausted {
        estimate: guess,
        residual,
        iterations: config.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::codes;

    fn n(s: &str) -> Number {
        Number::from_str(s).unwrap()
    }

    fn square_minus_two(x: &Number) -> CalcResult<Number> {
        Ok(x.mul(x).sub(&Number::from_i64(2)))
    }

    #[test]
    fn test_converges_to_sqrt2() {
        let outcome = bisect(
            square_minus_two,
            Bracket::new(n("1"), n("2")),
            n("1.5"),
            Slope::Increasing,
            &BisectionConfig::default(),
        )
        .unwrap();

        assert!(outcome.is_converged());
        assert_eq!(outcome.value().as_decimal(9), "1.414213562");
    }

    #[test]
    fn test_decreasing_slope() {
        // f(x) = 2 - x², falling on [1, 2]
        let outcome = bisect(
            |x: &Number| Ok(Number::from_i64(2).sub(&x.mul(x))),
            Bracket::new(n("1"), n("2")),
            n("1.5"),
            Slope::Decreasing,
            &BisectionConfig::default(),
        )
        .unwrap();
        assert_eq!(outcome.value().as_decimal(9), "1.414213562");
    }

    #[test]
    fn test_exact_initial_guess() {
        let outcome = bisect(
            |x: &Number| Ok(x.sub(&n("0.1"))),
            Bracket::new(n("-0.999"), n("10")),
            n("0.1"),
            Slope::Increasing,
            &BisectionConfig::default(),
        )
        .unwrap();
        assert_eq!(outcome, RootOutcome::Converged { root: n("0.1"), iterations: 1 });
    }

    #[test]
    fn test_exhausted_without_root() {
        // Always positive: the bracket collapses onto its lower end
        let outcome = bisect(
            |x: &Number| Ok(x.mul(x).add(&Number::one())),
            Bracket::new(n("0"), n("1")),
            n("0.5"),
            Slope::Increasing,
            &BisectionConfig::default(),
        )
        .unwrap();

        match &outcome {
            RootOutcome::Exhausted { estimate, residual, iterations } => {
                assert_eq!(*iterations, DEFAULT_MAX_ITERATIONS);
                assert!(estimate < &n("1e-20"));
                assert!(residual > &Number::zero());
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_policies() {
        let exhausted = RootOutcome::Exhausted {
            estimate: n("0.25"),
            residual: n("3"),
            iterations: 100,
        };

        let lenient = exhausted.clone().resolve(ExhaustionPolicy::BestEstimate, "test").unwrap();
        assert_eq!(lenient, n("0.25"));

        let err = exhausted.resolve(ExhaustionPolicy::Fail, "test").unwrap_err();
        assert_eq!(err.code, codes::CONVERGENCE);
        assert!(err.message.contains("0.25"));
    }

    #[test]
    fn test_custom_config() {
        let config = BisectionConfig::default()
            .with_tolerance(n("0.01"))
            .with_max_iterations(3);
        let outcome = bisect(
            square_minus_two,
            Bracket::new(n("1"), n("2")),
            n("1"),
            Slope::Increasing,
            &config,
        )
        .unwrap();
        // 1 → 1.5 → 1.25: three evaluations, none within 0.01
        assert!(!outcome.is_converged());
    }

    #[test]
    fn test_objective_error_propagates() {
        let result = bisect(
            |_x: &Number| Err(CalcError::div_zero()),
            Bracket::new(n("0"), n("1")),
            n("0.5"),
            Slope::Increasing,
            &BisectionConfig::default(),
        );
        assert_eq!(result.unwrap_err().code, codes::DIV_ZERO);
    }
}
