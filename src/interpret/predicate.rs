//! Predicate variables range over the model's predicate pool of their arity.

use crate::error::BindingError;
use crate::interpret::BindingStack;
use crate::model::{FiniteModel, Predicate};
use crate::variable::PredicateVariable;

pub struct PredicateVariableInterpreter<'a> {
    model: &'a dyn FiniteModel,
    stack: BindingStack<PredicateVariable>,
}

impl<'a> PredicateVariableInterpreter<'a> {
    pub fn new(model: &'a dyn FiniteModel) -> Self {
        Self {
            model,
            stack: BindingStack::new(),
        }
    }

    /// Bind `variable` to the first candidate of its arity.
    pub fn bind(&mut self, variable: PredicateVariable) -> Result<(), BindingError> {
        self.stack.bind(variable, 0)
    }

    pub fn unbind(&mut self, variable: &PredicateVariable) -> Result<(), BindingError> {
        self.stack.unbind(variable)
    }

    pub fn lookup(&self, variable: &PredicateVariable) -> Option<Predicate> {
        self.stack
            .index_of(variable)
            .and_then(|index| self.model.predicate_candidate(variable.arity, index))
    }

    /// The predicate bound to `variable`, registering it as free if needed.
    pub fn value(&mut self, variable: &PredicateVariable) -> Result<Predicate, BindingError> {
        let index = self.stack.register(variable);
        self.model
            .predicate_candidate(variable.arity, index)
            .ok_or_else(|| BindingError::NoCandidates {
                variable: variable.to_string(),
            })
    }

    pub fn advance(&mut self, variable: &PredicateVariable) -> bool {
        let candidates = self.model.predicate_pool_size(variable.arity);
        self.stack.advance(variable, candidates)
    }

    pub fn next(&mut self) -> bool {
        let model = self.model;
        self.stack.next(|v| model.predicate_pool_size(v.arity))
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Variables read without a quantifier binding them.
    pub fn free_variables(&self) -> impl Iterator<Item = &PredicateVariable> {
        self.stack.free()
    }

    /// Current bindings as `(variable, candidate symbol)`, outermost first.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.stack
            .iter()
            .map(|(variable, index, _)| {
                let value = self
                    .model
                    .predicate_candidate(variable.arity, index)
                    .map(|p| p.symbol().to_string())
                    .unwrap_or_else(|| format!("#{index}"));
                (variable.to_string(), value)
            })
            .collect()
    }
}
