//! Checking every proposition of a document in every configured model.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CheckerConfig;
use crate::document::{DocumentLibrary, Proposition};
use crate::element::Element;
use crate::error::EvalError;
use crate::eval::{DynamicResolver, Evaluator};
use crate::interpret::Valuation;
use crate::model::{DynamicModel, ModelKind};
use crate::search::{SearchOutcome, TautologySearch};

/// What one model says about one formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Tautology {
        valuations: u64,
    },
    Falsified {
        valuations: u64,
        counterexample: Valuation,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
}

impl Verdict {
    fn from_search(result: Result<SearchOutcome, EvalError>) -> Self {
        match result {
            Ok(SearchOutcome::Tautology { valuations }) => Self::Tautology { valuations },
            Ok(SearchOutcome::Falsified {
                valuations,
                counterexample,
            }) => Self::Falsified {
                valuations,
                counterexample,
            },
            Err(e) => Self::Error {
                location: e.location().map(ToString::to_string),
                message: e.to_string(),
            },
        }
    }

    pub fn is_tautology(&self) -> bool {
        matches!(self, Self::Tautology { .. })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tautology { valuations } => write!(f, "tautology ({valuations} valuations)"),
            Self::Falsified { counterexample, .. } => write!(f, "falsified by {counterexample}"),
            Self::Error { message, .. } => write!(f, "error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub model: ModelKind,
    #[serde(flatten)]
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropositionReport {
    pub label: String,
    pub formula: String,
    pub results: Vec<ModelVerdict>,
}

impl PropositionReport {
    /// Holds in every model that was checked.
    pub fn is_tautology(&self) -> bool {
        self.results.iter().all(|r| r.verdict.is_tautology())
    }
}

/// Results for every proposition of a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub document: String,
    pub propositions: Vec<PropositionReport>,
}

impl CheckReport {
    pub fn falsified_count(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Falsified { .. }))
    }

    pub fn error_count(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Error { .. }))
    }

    /// No proposition was falsified or failed to evaluate.
    pub fn is_clean(&self) -> bool {
        self.propositions.iter().all(PropositionReport::is_tautology)
    }

    fn count(&self, predicate: impl Fn(&Verdict) -> bool) -> usize {
        self.propositions
            .iter()
            .flat_map(|p| &p.results)
            .filter(|r| predicate(&r.verdict))
            .count()
    }
}

/// Check every proposition of the library's root document.
///
/// Each configured model gets one [`DynamicModel`], shared by all
/// propositions, so a derived constant is resolved once per model.
pub fn check_document(library: &DocumentLibrary, config: &CheckerConfig) -> CheckReport {
    let root = library.root();
    let models: Vec<(ModelKind, DynamicModel)> = config
        .models
        .iter()
        .map(|&kind| (kind, DynamicModel::from_kind(kind)))
        .collect();
    let resolvers: Vec<(ModelKind, DynamicResolver<'_>)> = models
        .iter()
        .map(|(kind, model)| {
            (
                *kind,
                DynamicResolver::new(model, library).with_root(root.label()),
            )
        })
        .collect();

    let check = |proposition: &Proposition| {
        let results = resolvers
            .iter()
            .map(|(kind, resolver)| ModelVerdict {
                model: *kind,
                verdict: run(resolver.evaluator(), &proposition.formula, config),
            })
            .collect();
        let report = PropositionReport {
            label: proposition.label.clone(),
            formula: proposition.formula.to_string(),
            results,
        };
        tracing::info!(
            proposition = %report.label,
            tautology = report.is_tautology(),
            "checked proposition"
        );
        report
    };

    let propositions: Vec<PropositionReport> = if config.parallel {
        root.propositions().par_iter().map(check).collect()
    } else {
        root.propositions().iter().map(check).collect()
    };

    for (kind, resolver) in &resolvers {
        tracing::debug!(
            model = %kind,
            hits = resolver.cache_hits(),
            misses = resolver.cache_misses(),
            registered = resolver.model().registered_predicate_count()
                + resolver.model().registered_function_count(),
            "derived constant cache"
        );
    }

    CheckReport {
        document: root.label().to_string(),
        propositions,
    }
}

/// Check a standalone formula in each configured model, using built-in
/// constants only.
pub fn check_formula(formula: &Element, config: &CheckerConfig) -> Vec<ModelVerdict> {
    config
        .models
        .iter()
        .map(|&kind| {
            let model = kind.build();
            ModelVerdict {
                model: kind,
                verdict: run(Evaluator::new(&model), formula, config),
            }
        })
        .collect()
}

fn run(evaluator: Evaluator<'_>, formula: &Element, config: &CheckerConfig) -> Verdict {
    let evaluator = evaluator.with_max_definition_depth(config.max_definition_depth);
    let mut search = TautologySearch::new(evaluator).with_max_iterations(config.max_iterations);
    Verdict::from_search(search.run(formula))
}
