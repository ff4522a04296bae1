//! Predicates: finite-model semantics for predicate variables and constants.

use std::sync::Arc;

use crate::document::Definition;
use crate::error::{EvalError, EvalResult};
use crate::eval::CallContext;
use crate::model::Entity;

/// Upper arity bound for predicates accepting any number of arguments.
pub const UNBOUNDED: usize = usize::MAX;

type PredicateFn = dyn Fn(&[Entity]) -> bool + Send + Sync;

#[derive(Clone)]
enum Semantics {
    Builtin(Arc<PredicateFn>),
    Negation(Arc<Predicate>),
    Conjunction(Arc<Predicate>, Arc<Predicate>),
    Disjunction(Arc<Predicate>, Arc<Predicate>),
    /// Evaluates a definition formula with its variables bound to the arguments.
    Defined(Arc<Definition>),
}

/// A map from entity tuples to truth values.
///
/// Cloning is cheap; the semantics are shared.
#[derive(Clone)]
pub struct Predicate {
    symbol: Arc<str>,
    description: Arc<str>,
    min_arity: usize,
    max_arity: usize,
    semantics: Semantics,
}

impl Predicate {
    pub fn new(
        symbol: &str,
        description: &str,
        min_arity: usize,
        max_arity: usize,
        f: impl Fn(&[Entity]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
            min_arity,
            max_arity,
            semantics: Semantics::Builtin(Arc::new(f)),
        }
    }

    /// Always `value`, for any number of arguments.
    pub fn constant(value: bool) -> Self {
        if value {
            Self::new("TRUE", "always true", 0, UNBOUNDED, |_| true)
        } else {
            Self::new("FALSE", "always false", 0, UNBOUNDED, |_| false)
        }
    }

    /// Unary: the argument is `entity`.
    pub fn equals_entity(entity: Entity) -> Self {
        Self::new(
            &format!("={}", entity.id()),
            &format!("argument is entity {}", entity.id()),
            1,
            1,
            move |args| args[0] == entity,
        )
    }

    /// All arguments are the same entity.
    pub fn equal() -> Self {
        Self::new("=", "all arguments are equal", 2, UNBOUNDED, |args| {
            args.windows(2).all(|w| w[0] == w[1])
        })
    }

    /// Arguments are strictly ascending by entity id.
    pub fn less() -> Self {
        Self::new("<", "arguments strictly ascend", 2, UNBOUNDED, |args| {
            args.windows(2).all(|w| w[0] < w[1])
        })
    }

    /// Arguments are strictly descending by entity id.
    pub fn greater() -> Self {
        Self::new(">", "arguments strictly descend", 2, UNBOUNDED, |args| {
            args.windows(2).all(|w| w[0] > w[1])
        })
    }

    /// A predicate backed by a definition; its arity is the number of
    /// variables the definition binds.
    pub fn defined(symbol: &str, definition: Arc<Definition>) -> Self {
        let arity = definition.arity();
        Self {
            symbol: symbol.into(),
            description: format!("defined as {}", definition.body).into(),
            min_arity: arity,
            max_arity: arity,
            semantics: Semantics::Defined(definition),
        }
    }

    pub fn negate(&self) -> Self {
        Self {
            symbol: format!("¬{}", self.symbol).into(),
            description: format!("not ({})", self.description).into(),
            min_arity: self.min_arity,
            max_arity: self.max_arity,
            semantics: Semantics::Negation(Arc::new(self.clone())),
        }
    }

    pub fn and(&self, other: &Predicate) -> Self {
        Self {
            symbol: format!("({} ∧ {})", self.symbol, other.symbol).into(),
            description: format!("({}) and ({})", self.description, other.description).into(),
            min_arity: self.min_arity.max(other.min_arity),
            max_arity: self.max_arity.min(other.max_arity),
            semantics: Semantics::Conjunction(Arc::new(self.clone()), Arc::new(other.clone())),
        }
    }

    pub fn or(&self, other: &Predicate) -> Self {
        Self {
            symbol: format!("({} ∨ {})", self.symbol, other.symbol).into(),
            description: format!("({}) or ({})", self.description, other.description).into(),
            min_arity: self.min_arity.max(other.min_arity),
            max_arity: self.max_arity.min(other.max_arity),
            semantics: Semantics::Disjunction(Arc::new(self.clone()), Arc::new(other.clone())),
        }
    }

    /// Replace the display symbol and description, keeping the semantics.
    pub fn with_symbol(mut self, symbol: &str, description: &str) -> Self {
        self.symbol = symbol.into();
        self.description = description.into();
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn min_arity(&self) -> usize {
        self.min_arity
    }

    pub fn max_arity(&self) -> usize {
        self.max_arity
    }

    pub fn accepts(&self, arity: usize) -> bool {
        self.min_arity <= arity && arity <= self.max_arity
    }

    pub fn is_defined(&self) -> bool {
        matches!(self.semantics, Semantics::Defined(_))
    }

    /// Apply the predicate to `args`.
    pub fn calculate(&self, ctx: &CallContext<'_>, args: &[Entity]) -> EvalResult<bool> {
        if !self.accepts(args.len()) {
            return Err(EvalError::ArityMismatch {
                symbol: self.symbol.to_string(),
                min: self.min_arity,
                max: self.max_arity,
                actual: args.len(),
                location: ctx.location.clone(),
            });
        }
        match &self.semantics {
            Semantics::Builtin(f) => Ok(f(args)),
            Semantics::Negation(inner) => Ok(!inner.calculate(ctx, args)?),
            Semantics::Conjunction(a, b) => Ok(a.calculate(ctx, args)? && b.calculate(ctx, args)?),
            Semantics::Disjunction(a, b) => Ok(a.calculate(ctx, args)? || b.calculate(ctx, args)?),
            Semantics::Defined(definition) => ctx.evaluate_formula_definition(definition, args),
        }
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("symbol", &self.symbol)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .finish()
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
