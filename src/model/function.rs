//! Functions: finite-model semantics for function variables and constants.

use std::sync::Arc;

use crate::document::Definition;
use crate::error::{EvalError, EvalResult};
use crate::eval::CallContext;
use crate::model::predicate::UNBOUNDED;
use crate::model::Entity;

type FunctionFn = dyn Fn(&[Entity]) -> Entity + Send + Sync;

#[derive(Clone)]
enum Semantics {
    Builtin(Arc<FunctionFn>),
    /// Evaluates a definition term with its variables bound to the arguments.
    Defined(Arc<Definition>),
}

/// A map from entity tuples to an entity.
#[derive(Clone)]
pub struct Function {
    symbol: Arc<str>,
    description: Arc<str>,
    min_arity: usize,
    max_arity: usize,
    semantics: Semantics,
}

impl Function {
    pub fn new(
        symbol: &str,
        description: &str,
        min_arity: usize,
        max_arity: usize,
        f: impl Fn(&[Entity]) -> Entity + Send + Sync + 'static,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
            min_arity,
            max_arity,
            semantics: Semantics::Builtin(Arc::new(f)),
        }
    }

    /// Always `entity`, for any number of arguments.
    pub fn constant(entity: Entity) -> Self {
        Self::new(
            &entity.id().to_string(),
            &format!("always entity {}", entity.id()),
            0,
            UNBOUNDED,
            move |_| entity,
        )
    }

    /// The first argument.
    pub fn projection() -> Self {
        Self::new("π1", "first argument", 1, UNBOUNDED, |args| args[0])
    }

    /// Unary: the next entity, wrapping around after the last of `entity_count`.
    pub fn successor(entity_count: usize) -> Self {
        let count = entity_count.max(1) as u32;
        Self::new("succ", "next entity, wrapping around", 1, 1, move |args| {
            Entity::new((args[0].id() + 1) % count)
        })
    }

    /// The argument with the greatest id.
    pub fn maximum() -> Self {
        Self::new("max", "greatest argument", 1, UNBOUNDED, |args| {
            args[1..].iter().copied().fold(args[0], Ord::max)
        })
    }

    /// The argument with the least id.
    pub fn minimum() -> Self {
        Self::new("min", "least argument", 2, UNBOUNDED, |args| {
            args[1..].iter().copied().fold(args[0], Ord::min)
        })
    }

    /// A function backed by a definition term.
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

    /// Apply the function to `args`.
    pub fn map(&self, ctx: &CallContext<'_>, args: &[Entity]) -> EvalResult<Entity> {
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
            Semantics::Defined(definition) => ctx.evaluate_term_definition(definition, args),
        }
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("symbol", &self.symbol)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .finish()
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    fn e(id: u32) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn successor_wraps_around() {
        let model = ModelKind::Three.build();
        let ctx = CallContext::detached(&model);
        let succ = Function::successor(3);
        assert_eq!(succ.map(&ctx, &[e(1)]).unwrap(), e(2));
        assert_eq!(succ.map(&ctx, &[e(2)]).unwrap(), e(0));
    }

    #[test]
    fn extrema_and_projection() {
        let model = ModelKind::Three.build();
        let ctx = CallContext::detached(&model);
        assert_eq!(Function::maximum().map(&ctx, &[e(0), e(2), e(1)]).unwrap(), e(2));
        assert_eq!(Function::minimum().map(&ctx, &[e(2), e(1)]).unwrap(), e(1));
        assert_eq!(Function::maximum().map(&ctx, &[e(1)]).unwrap(), e(1));
        assert_eq!(Function::minimum().map(&ctx, &[e(0), e(2), e(1)]).unwrap(), e(0));
        assert_eq!(Function::projection().map(&ctx, &[e(1), e(0)]).unwrap(), e(1));
        assert_eq!(Function::constant(e(2)).map(&ctx, &[]).unwrap(), e(2));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let model = ModelKind::Three.build();
        let ctx = CallContext::detached(&model);
        let err = Function::successor(3).map(&ctx, &[e(0), e(1)]).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { max: 1, actual: 2, .. }));
    }
}
