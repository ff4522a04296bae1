//! Variable interpreters: the valuation of subject, predicate and function
//! variables.
//!
//! Each interpreter keeps a stack of bindings, every binding holding an index
//! into the variable's candidate list (entities for subject variables, the
//! arity-matched pool for predicate and function variables). Quantifiers push
//! and pop bindings in LIFO order. Variables that occur free are registered
//! lazily on first read and stay on the stack until [`clear`].
//!
//! [`next`] steps the whole stack like an odometer: the innermost binding
//! advances first, and a binding that runs past its last candidate resets to
//! zero and carries into the next-outer one.
//!
//! [`clear`]: BindingStack::clear
//! [`next`]: BindingStack::next

pub mod function;
pub mod predicate;
pub mod subject;

use serde::{Deserialize, Serialize};

use crate::error::BindingError;

pub use function::FunctionVariableInterpreter;
pub use predicate::PredicateVariableInterpreter;
pub use subject::SubjectVariableInterpreter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding<V> {
    variable: V,
    index: usize,
    /// Pushed by a quantifier (as opposed to registered as a free variable).
    quantified: bool,
}

/// Ordered bindings of one kind of variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingStack<V> {
    bindings: Vec<Binding<V>>,
}

impl<V> Default for BindingStack<V> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<V: Clone + Eq + std::fmt::Display> BindingStack<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, variable: &V) -> Option<usize> {
        self.bindings.iter().rposition(|b| &b.variable == variable)
    }

    /// Current candidate index of `variable`, if it is on the stack.
    pub fn index_of(&self, variable: &V) -> Option<usize> {
        self.position(variable).map(|p| self.bindings[p].index)
    }

    pub fn contains(&self, variable: &V) -> bool {
        self.position(variable).is_some()
    }

    /// Push a quantified binding at candidate `index`.
    ///
    /// A free registration of the same variable is hidden until the binding
    /// is popped. Fails if a quantifier already binds `variable`.
    pub fn bind(&mut self, variable: V, index: usize) -> Result<(), BindingError> {
        if self
            .bindings
            .iter()
            .any(|b| b.quantified && b.variable == variable)
        {
            return Err(BindingError::AlreadyBound {
                variable: variable.to_string(),
            });
        }
        self.bindings.push(Binding {
            variable,
            index,
            quantified: true,
        });
        Ok(())
    }

    /// Candidate index of `variable`, registering it as free at index 0 when
    /// it is not yet on the stack.
    pub fn register(&mut self, variable: &V) -> usize {
        match self.position(variable) {
            Some(p) => self.bindings[p].index,
            None => {
                self.bindings.push(Binding {
                    variable: variable.clone(),
                    index: 0,
                    quantified: false,
                });
                0
            }
        }
    }

    /// Pop the innermost quantified binding, which must be `variable`.
    pub fn unbind(&mut self, variable: &V) -> Result<(), BindingError> {
        let Some(p) = self.bindings.iter().rposition(|b| b.quantified) else {
            return Err(BindingError::NotBound {
                variable: variable.to_string(),
            });
        };
        if &self.bindings[p].variable != variable {
            return Err(BindingError::NotInnermost {
                variable: variable.to_string(),
                innermost: self.bindings[p].variable.to_string(),
            });
        }
        self.bindings.remove(p);
        Ok(())
    }

    /// Move `variable` to its next candidate. Returns `false`, leaving the
    /// index unchanged, when it already sits on the last of `candidates`.
    pub fn advance(&mut self, variable: &V, candidates: usize) -> bool {
        match self.position(variable) {
            Some(p) if self.bindings[p].index + 1 < candidates => {
                self.bindings[p].index += 1;
                true
            }
            _ => false,
        }
    }

    /// Odometer step over every binding, innermost first.
    ///
    /// Returns `false` once every binding has wrapped back to zero, i.e. every
    /// combination has been visited.
    pub fn next(&mut self, candidates: impl Fn(&V) -> usize) -> bool {
        for binding in self.bindings.iter_mut().rev() {
            if binding.index + 1 < candidates(&binding.variable) {
                binding.index += 1;
                return true;
            }
            binding.index = 0;
        }
        false
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Variables registered as free, outermost first.
    pub fn free(&self) -> impl Iterator<Item = &V> {
        self.bindings
            .iter()
            .filter(|b| !b.quantified)
            .map(|b| &b.variable)
    }

    /// `(variable, index, quantified)` from outermost to innermost.
    pub fn iter(&self) -> impl Iterator<Item = (&V, usize, bool)> {
        self.bindings
            .iter()
            .map(|b| (&b.variable, b.index, b.quantified))
    }
}

// ---------------------------------------------------------------------------
// Valuation snapshot
// ---------------------------------------------------------------------------

/// A readable snapshot of every variable binding at one instant.
///
/// Values are display names: entity names for subject variables, candidate
/// symbols for predicate and function variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub subjects: Vec<(String, String)>,
    pub predicates: Vec<(String, String)>,
    pub functions: Vec<(String, String)>,
}

impl Valuation {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.predicates.is_empty() && self.functions.is_empty()
    }
}

impl std::fmt::Display for Valuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .subjects
            .iter()
            .chain(&self.predicates)
            .chain(&self.functions)
            .map(|(variable, value)| format!("{variable} = {value}"))
            .collect();
        if parts.is_empty() {
            write!(f, "(no variables)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
