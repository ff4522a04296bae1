//! Exhaustive tautology search.
//!
//! A formula is a tautology in a model when it holds under every valuation of
//! the variables it mentions. The search evaluates the formula, steps to the
//! next valuation and repeats until the formula fails or every valuation has
//! been visited. Free variables join the valuation the first time evaluation
//! reads them, so the enumeration grows as the formula is explored.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{EvalError, EvalResult};
use crate::eval::Evaluator;
use crate::interpret::Valuation;
use crate::model::FiniteModel;

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The formula held under all `valuations` valuations.
    Tautology { valuations: u64 },
    /// The formula failed under `counterexample`, the `valuations`-th
    /// valuation visited.
    Falsified {
        valuations: u64,
        counterexample: Valuation,
    },
}

impl SearchOutcome {
    pub fn is_tautology(&self) -> bool {
        matches!(self, Self::Tautology { .. })
    }

    pub fn valuations(&self) -> u64 {
        match self {
            Self::Tautology { valuations } | Self::Falsified { valuations, .. } => *valuations,
        }
    }

    pub fn counterexample(&self) -> Option<&Valuation> {
        match self {
            Self::Tautology { .. } => None,
            Self::Falsified { counterexample, .. } => Some(counterexample),
        }
    }
}

/// Drives an [`Evaluator`] through every valuation.
pub struct TautologySearch<'a> {
    evaluator: Evaluator<'a>,
    max_iterations: Option<u64>,
}

impl<'a> TautologySearch<'a> {
    pub fn new(evaluator: Evaluator<'a>) -> Self {
        Self {
            evaluator,
            max_iterations: None,
        }
    }

    /// Give up with [`EvalError::IterationLimitExceeded`] after `limit`
    /// valuations. `None` searches without bound.
    pub fn with_max_iterations(mut self, limit: Option<u64>) -> Self {
        self.max_iterations = limit;
        self
    }

    pub fn evaluator(&self) -> &Evaluator<'a> {
        &self.evaluator
    }

    /// Search every valuation of `formula`.
    ///
    /// Variable state is cleared before and after, whatever the outcome, so
    /// one search may run many formulas.
    pub fn run(&mut self, formula: &Element) -> EvalResult<SearchOutcome> {
        self.evaluator.clear();
        let outcome = self.enumerate(formula);
        self.evaluator.clear();
        outcome
    }

    pub fn is_tautology(&mut self, formula: &Element) -> EvalResult<bool> {
        self.run(formula).map(|outcome| outcome.is_tautology())
    }

    fn enumerate(&mut self, formula: &Element) -> EvalResult<SearchOutcome> {
        let model = self.evaluator.model().name().to_string();
        let mut valuations = 0u64;
        loop {
            if let Some(limit) = self.max_iterations {
                if valuations >= limit {
                    tracing::warn!(%model, limit, "iteration limit reached");
                    return Err(EvalError::IterationLimitExceeded { limit });
                }
            }
            valuations += 1;

            if !self.evaluator.evaluate_formula(formula)? {
                let counterexample = self.evaluator.valuation();
                tracing::debug!(%model, valuations, %counterexample, "formula falsified");
                return Ok(SearchOutcome::Falsified {
                    valuations,
                    counterexample,
                });
            }
            if !self.evaluator.next_valuation() {
                tracing::debug!(%model, valuations, "formula is a tautology");
                return Ok(SearchOutcome::Tautology { valuations });
            }
        }
    }
}

/// Whether `formula` holds under every valuation in `model`, without
/// resolving constants from documents.
pub fn is_tautology(model: &dyn FiniteModel, formula: &Element) -> EvalResult<bool> {
    TautologySearch::new(Evaluator::new(model)).is_tautology(formula)
}
