//! Recursive evaluation of formulas and terms in a finite model.
//!
//! The [`Evaluator`] walks an [`Element`] tree depth-first. Formulas produce a
//! truth value and terms produce an [`Entity`]. Variables are read from the
//! three variable interpreters, and constants from the model or, when the
//! model does not know them, from an optional [`ConstantResolver`].
//!
//! Quantifiers and class terms bind their variable through a
//! [`QuantifierScope`] guard, which releases the binding when dropped. An
//! early `?` return therefore never leaves a stale binding behind.

pub mod resolve;

use std::ops::{Deref, DerefMut};

use crate::document::Definition;
use crate::element::{Element, ElementList, Operator};
use crate::error::{BindingError, EvalError, EvalResult};
use crate::interpret::{
    FunctionVariableInterpreter, PredicateVariableInterpreter, SubjectVariableInterpreter,
    Valuation,
};
use crate::location::{Location, PathSegment};
use crate::model::{Entity, FiniteModel, Function, FunctionKey, Predicate, PredicateKey};
use crate::variable::{FunctionVariable, PredicateVariable, SubjectVariable};

pub use resolve::{ConstantResolver, DynamicResolver};

/// Default bound on nested derived-constant evaluation.
pub const DEFAULT_MAX_DEFINITION_DEPTH: usize = 64;

static ROOT_LOCATION: Location = Location::root();

// ---------------------------------------------------------------------------
// Call context
// ---------------------------------------------------------------------------

/// What a predicate or function needs to apply itself.
///
/// Built-in semantics ignore it. Derived constants use it to evaluate their
/// definition in a private evaluator over the same model.
#[derive(Clone, Copy)]
pub struct CallContext<'c> {
    pub model: &'c dyn FiniteModel,
    pub resolver: Option<&'c dyn ConstantResolver>,
    pub location: &'c Location,
    pub depth: usize,
    pub max_depth: usize,
}

impl<'c> CallContext<'c> {
    /// A context outside any evaluation, rooted at `/`.
    pub fn detached(model: &'c dyn FiniteModel) -> Self {
        Self {
            model,
            resolver: None,
            location: &ROOT_LOCATION,
            depth: 0,
            max_depth: DEFAULT_MAX_DEFINITION_DEPTH,
        }
    }

    pub fn with_resolver(mut self, resolver: &'c dyn ConstantResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub(crate) fn evaluate_formula_definition(
        &self,
        definition: &Definition,
        args: &[Entity],
    ) -> EvalResult<bool> {
        let mut evaluator = self.definition_evaluator(definition, args)?;
        let holds = evaluator.formula(&definition.body)?;
        evaluator.ensure_closed(definition)?;
        Ok(holds)
    }

    pub(crate) fn evaluate_term_definition(
        &self,
        definition: &Definition,
        args: &[Entity],
    ) -> EvalResult<Entity> {
        let mut evaluator = self.definition_evaluator(definition, args)?;
        let value = evaluator.term(&definition.body)?;
        evaluator.ensure_closed(definition)?;
        Ok(value)
    }

    /// A fresh evaluator with the definition's variables bound to `args`.
    fn definition_evaluator(
        &self,
        definition: &Definition,
        args: &[Entity],
    ) -> EvalResult<Evaluator<'c>> {
        if self.depth >= self.max_depth {
            return Err(EvalError::DefinitionDepthExceeded {
                max_depth: self.max_depth,
                location: self.location.clone(),
            });
        }
        let mut location = self.location.clone();
        location.push(PathSegment::Definition {
            constant: format!("{}/{}", definition.qualified_name(), definition.arity()),
        });
        if definition.arity() != args.len() {
            return Err(EvalError::ArityMismatch {
                symbol: definition.qualified_name(),
                min: definition.arity(),
                max: definition.arity(),
                actual: args.len(),
                location,
            });
        }

        let mut evaluator = Evaluator::new(self.model);
        evaluator.resolver = self.resolver;
        evaluator.scope = definition.document.clone();
        evaluator.depth = self.depth + 1;
        evaluator.max_depth = self.max_depth;
        evaluator.location = location;
        for (variable, &entity) in definition.variables.iter().zip(args) {
            evaluator
                .subjects
                .bind_to(variable.clone(), entity)
                .map_err(|source| evaluator.binding_error(source))?;
        }
        Ok(evaluator)
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluates formulas and terms under the current valuation.
pub struct Evaluator<'a> {
    model: &'a dyn FiniteModel,
    resolver: Option<&'a dyn ConstantResolver>,
    /// Document whose definitions unknown constants are looked up in.
    scope: Option<String>,
    depth: usize,
    max_depth: usize,
    subjects: SubjectVariableInterpreter<'a>,
    predicates: PredicateVariableInterpreter<'a>,
    functions: FunctionVariableInterpreter<'a>,
    location: Location,
}

impl<'a> Evaluator<'a> {
    pub fn new(model: &'a dyn FiniteModel) -> Self {
        Self {
            model,
            resolver: None,
            scope: None,
            depth: 0,
            max_depth: DEFAULT_MAX_DEFINITION_DEPTH,
            subjects: SubjectVariableInterpreter::new(model),
            predicates: PredicateVariableInterpreter::new(model),
            functions: FunctionVariableInterpreter::new(model),
            location: Location::root(),
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn ConstantResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_scope(mut self, document: impl Into<String>) -> Self {
        self.scope = Some(document.into());
        self
    }

    pub fn with_max_definition_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn model(&self) -> &'a dyn FiniteModel {
        self.model
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Breadcrumb of the node currently being evaluated.
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn subjects(&self) -> &SubjectVariableInterpreter<'a> {
        &self.subjects
    }

    pub fn predicates(&self) -> &PredicateVariableInterpreter<'a> {
        &self.predicates
    }

    pub fn functions(&self) -> &FunctionVariableInterpreter<'a> {
        &self.functions
    }

    /// Evaluate `element` as a formula under the current valuation.
    pub fn evaluate_formula(&mut self, element: &Element) -> EvalResult<bool> {
        self.location = Location::root();
        self.formula(element)
    }

    /// Evaluate `element` as a term under the current valuation.
    pub fn evaluate_term(&mut self, element: &Element) -> EvalResult<Entity> {
        self.location = Location::root();
        self.term(element)
    }

    /// Step to the next valuation: subject variables first, then predicate
    /// variables, then function variables. `false` once all are exhausted.
    pub fn next_valuation(&mut self) -> bool {
        self.subjects.next() || self.predicates.next() || self.functions.next()
    }

    /// Drop every binding of every interpreter.
    pub fn clear(&mut self) {
        self.subjects.clear();
        self.predicates.clear();
        self.functions.clear();
        self.location = Location::root();
    }

    pub fn valuation(&self) -> Valuation {
        Valuation {
            subjects: self.subjects.snapshot(),
            predicates: self.predicates.snapshot(),
            functions: self.functions.snapshot(),
        }
    }

    fn call_context(&self) -> CallContext<'_> {
        CallContext {
            model: self.model,
            resolver: self.resolver,
            location: &self.location,
            depth: self.depth,
            max_depth: self.max_depth,
        }
    }

    // -----------------------------------------------------------------------
    // Formulas
    // -----------------------------------------------------------------------

    fn formula(&mut self, element: &Element) -> EvalResult<bool> {
        let list = match element {
            Element::Atom(_) => {
                return Err(EvalError::WrongCallingConvention {
                    location: self.location.clone(),
                });
            }
            Element::List(list) => list,
        };
        let Some(operator) = Operator::from_tag(&list.operator) else {
            return Err(self.unknown_operator(list));
        };

        match operator {
            Operator::Conjunction => {
                let mut result = true;
                for i in 0..list.len() {
                    result &= self.child_formula(list, i)?;
                }
                Ok(result)
            }
            Operator::Disjunction => {
                let mut result = false;
                for i in 0..list.len() {
                    result |= self.child_formula(list, i)?;
                }
                Ok(result)
            }
            Operator::Equivalence => {
                self.expect_children(list, 1, usize::MAX)?;
                let first = self.child_formula(list, 0)?;
                let mut result = true;
                for i in 1..list.len() {
                    result &= self.child_formula(list, i)? == first;
                }
                Ok(result)
            }
            Operator::Implication => {
                self.expect_children(list, 1, usize::MAX)?;
                let last = list.len() - 1;
                let mut result = false;
                for i in 0..last {
                    result |= !self.child_formula(list, i)?;
                }
                result |= self.child_formula(list, last)?;
                Ok(result)
            }
            Operator::Negation => {
                self.expect_children(list, 1, usize::MAX)?;
                let mut result = true;
                for i in 0..list.len() {
                    result &= !self.child_formula(list, i)?;
                }
                Ok(result)
            }
            Operator::PredicateVariable => {
                let variable = PredicateVariable::new(self.name_of(list)?, list.len() - 1);
                let predicate = self
                    .predicates
                    .value(&variable)
                    .map_err(|source| self.binding_error(source))?;
                let args = self.arguments(list)?;
                predicate.calculate(&self.call_context(), &args)
            }
            Operator::PredicateConstant => {
                let key = PredicateKey::new(self.name_of(list)?, list.len() - 1);
                let predicate = self.predicate_constant(&key)?;
                let args = self.arguments(list)?;
                predicate.calculate(&self.call_context(), &args)
            }
            Operator::Universal => self.universal(list),
            Operator::Existential => self.existential(list),
            Operator::UniqueExistential => self.unique_existential(list),
            Operator::SubjectVariable
            | Operator::FunctionVariable
            | Operator::FunctionConstant
            | Operator::Class
            | Operator::ClassList => Err(self.unknown_operator(list)),
        }
    }

    fn child_formula(&mut self, list: &ElementList, index: usize) -> EvalResult<bool> {
        let child = self.child(list, index)?;
        self.location.push(PathSegment::Child(index));
        let result = self.formula(child);
        self.location.pop();
        result
    }

    /// `∀x body`, or `∀x (guard → body)` in the three-child form.
    fn universal(&mut self, list: &ElementList) -> EvalResult<bool> {
        let guarded = self.quantifier_form(list)?;
        let variable = self.quantified_variable(list)?;
        let mut scope = self.quantify(variable.clone())?;
        loop {
            let holds = if guarded {
                !scope.child_formula(list, 1)? || scope.child_formula(list, 2)?
            } else {
                scope.child_formula(list, 1)?
            };
            if !holds {
                return Ok(false);
            }
            if !scope.subjects.advance(&variable) {
                return Ok(true);
            }
        }
    }

    /// `∃x body`, or `∃x (guard ∧ body)` in the three-child form.
    fn existential(&mut self, list: &ElementList) -> EvalResult<bool> {
        let guarded = self.quantifier_form(list)?;
        let variable = self.quantified_variable(list)?;
        let mut scope = self.quantify(variable.clone())?;
        loop {
            if scope.witness(list, guarded)? {
                return Ok(true);
            }
            if !scope.subjects.advance(&variable) {
                return Ok(false);
            }
        }
    }

    /// Exactly one entity satisfies the (guarded) body.
    fn unique_existential(&mut self, list: &ElementList) -> EvalResult<bool> {
        let guarded = self.quantifier_form(list)?;
        let variable = self.quantified_variable(list)?;
        let mut scope = self.quantify(variable.clone())?;
        let mut found = false;
        loop {
            if scope.witness(list, guarded)? {
                if found {
                    return Ok(false);
                }
                found = true;
            }
            if !scope.subjects.advance(&variable) {
                return Ok(found);
            }
        }
    }

    fn witness(&mut self, list: &ElementList, guarded: bool) -> EvalResult<bool> {
        if guarded {
            Ok(self.child_formula(list, 1)? && self.child_formula(list, 2)?)
        } else {
            self.child_formula(list, 1)
        }
    }

    /// Whether a quantifier list uses the guarded three-child form.
    fn quantifier_form(&self, list: &ElementList) -> EvalResult<bool> {
        self.expect_children(list, 2, 3)?;
        Ok(list.len() == 3)
    }

    // -----------------------------------------------------------------------
    // Terms
    // -----------------------------------------------------------------------

    fn term(&mut self, element: &Element) -> EvalResult<Entity> {
        let list = match element {
            Element::Atom(_) => {
                return Err(EvalError::WrongCallingConvention {
                    location: self.location.clone(),
                });
            }
            Element::List(list) => list,
        };
        let Some(operator) = Operator::from_tag(&list.operator) else {
            return Err(self.unknown_term_operator(list));
        };

        match operator {
            Operator::SubjectVariable => {
                self.expect_children(list, 1, 1)?;
                let variable = SubjectVariable::new(self.name_of(list)?);
                self.subjects
                    .value(&variable)
                    .map_err(|source| self.binding_error(source))
            }
            Operator::FunctionVariable => {
                let variable = FunctionVariable::new(self.name_of(list)?, list.len() - 1);
                let function = self
                    .functions
                    .value(&variable)
                    .map_err(|source| self.binding_error(source))?;
                let args = self.arguments(list)?;
                function.map(&self.call_context(), &args)
            }
            Operator::FunctionConstant => {
                let key = FunctionKey::new(self.name_of(list)?, list.len() - 1);
                let function = self.function_constant(&key)?;
                let args = self.arguments(list)?;
                function.map(&self.call_context(), &args)
            }
            Operator::Class => self.class(list),
            Operator::ClassList => self.class_list(list),
            Operator::Conjunction
            | Operator::Disjunction
            | Operator::Implication
            | Operator::Equivalence
            | Operator::Negation
            | Operator::PredicateVariable
            | Operator::PredicateConstant
            | Operator::Universal
            | Operator::Existential
            | Operator::UniqueExistential => Err(self.unknown_term_operator(list)),
        }
    }

    fn child_term(&mut self, list: &ElementList, index: usize) -> EvalResult<Entity> {
        let child = self.child(list, index)?;
        self.location.push(PathSegment::Child(index));
        let result = self.term(child);
        self.location.pop();
        result
    }

    /// Terms 1..n of an application list; child 0 is the name.
    fn arguments(&mut self, list: &ElementList) -> EvalResult<Vec<Entity>> {
        (1..list.len()).map(|i| self.child_term(list, i)).collect()
    }

    /// `{x | formula}`: every set satisfying the formula, collapsed by the
    /// model's comprehension rule.
    fn class(&mut self, list: &ElementList) -> EvalResult<Entity> {
        self.expect_children(list, 2, 2)?;
        let is_set = self.is_set_predicate()?;
        let variable = self.quantified_variable(list)?;
        let mut members = Vec::new();
        {
            let mut scope = self.quantify(variable.clone())?;
            loop {
                let entity = scope
                    .subjects
                    .value(&variable)
                    .map_err(|source| scope.binding_error(source))?;
                let holds = scope.child_formula(list, 1)?;
                if holds && is_set.calculate(&scope.call_context(), &[entity])? {
                    members.push(entity);
                }
                if !scope.subjects.advance(&variable) {
                    break;
                }
            }
        }
        Ok(self.model.comprehension(&members))
    }

    /// `{t1, .., tn}`: the listed values that are sets.
    fn class_list(&mut self, list: &ElementList) -> EvalResult<Entity> {
        let is_set = self.is_set_predicate()?;
        let mut members: Vec<Entity> = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            let entity = self.child_term(list, i)?;
            if !members.contains(&entity) && is_set.calculate(&self.call_context(), &[entity])? {
                members.push(entity);
            }
        }
        Ok(self.model.comprehension(&members))
    }

    // -----------------------------------------------------------------------
    // Constants
    // -----------------------------------------------------------------------

    /// Model first (by full name, then by name without import prefix), then
    /// the resolver.
    fn lookup_predicate_constant(&self, key: &PredicateKey) -> Option<Predicate> {
        self.model
            .predicate_constant(key)
            .or_else(|| {
                let (_, base) = key.name.rsplit_once('.')?;
                self.model
                    .predicate_constant(&PredicateKey::new(base, key.arity))
            })
            .or_else(|| {
                self.resolver?
                    .resolve_predicate(self.scope.as_deref(), key)
            })
    }

    fn lookup_function_constant(&self, key: &FunctionKey) -> Option<Function> {
        self.model
            .function_constant(key)
            .or_else(|| {
                let (_, base) = key.name.rsplit_once('.')?;
                self.model.function_constant(&FunctionKey::new(base, key.arity))
            })
            .or_else(|| {
                self.resolver?
                    .resolve_function(self.scope.as_deref(), key)
            })
    }

    fn predicate_constant(&self, key: &PredicateKey) -> EvalResult<Predicate> {
        self.lookup_predicate_constant(key)
            .ok_or_else(|| EvalError::UnknownPredicateConstant {
                name: key.name.clone(),
                arity: key.arity,
                location: self.location.clone(),
            })
    }

    fn function_constant(&self, key: &FunctionKey) -> EvalResult<Function> {
        self.lookup_function_constant(key)
            .ok_or_else(|| EvalError::UnknownFunctionConstant {
                name: key.name.clone(),
                arity: key.arity,
                location: self.location.clone(),
            })
    }

    fn is_set_predicate(&self) -> EvalResult<Predicate> {
        self.lookup_predicate_constant(&PredicateKey::is_set())
            .ok_or_else(|| EvalError::MissingIsSetPredicate {
                location: self.location.clone(),
            })
    }

    // -----------------------------------------------------------------------
    // Shape helpers
    // -----------------------------------------------------------------------

    fn quantify(&mut self, variable: SubjectVariable) -> EvalResult<QuantifierScope<'_, 'a>> {
        QuantifierScope::enter(self, variable)
    }

    /// The variable of `(Q (VAR x) ..)` or `(CLASS (VAR x) ..)`.
    fn quantified_variable(&self, list: &ElementList) -> EvalResult<SubjectVariable> {
        let name = list
            .child(0)
            .and_then(Element::as_list)
            .filter(|head| head.operator == Operator::SubjectVariable.tag() && head.len() == 1)
            .and_then(|head| head.child(0))
            .and_then(Element::as_atom)
            .ok_or_else(|| {
                self.malformed(format!("{} must start with (VAR name)", list.operator))
            })?;
        Ok(SubjectVariable::new(name))
    }

    /// The name atom in child 0 of an application list.
    fn name_of<'e>(&self, list: &'e ElementList) -> EvalResult<&'e str> {
        list.child(0)
            .and_then(Element::as_atom)
            .ok_or_else(|| self.malformed(format!("{} must start with a name atom", list.operator)))
    }

    fn child<'e>(&self, list: &'e ElementList, index: usize) -> EvalResult<&'e Element> {
        list.child(index).ok_or_else(|| {
            self.malformed(format!("{} has no child {index}", list.operator))
        })
    }

    fn expect_children(&self, list: &ElementList, min: usize, max: usize) -> EvalResult<()> {
        if list.len() < min || list.len() > max {
            let expected = if max == usize::MAX {
                format!("at least {min}")
            } else if min == max {
                format!("exactly {min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(self.malformed(format!(
                "{} takes {expected} children, found {}",
                list.operator,
                list.len()
            )));
        }
        Ok(())
    }

    /// A definition body must not leave free registrations behind: the
    /// nested evaluator is discarded, so they would never be enumerated.
    fn ensure_closed(&self, definition: &Definition) -> EvalResult<()> {
        let free = self
            .subjects
            .free_variables()
            .map(ToString::to_string)
            .chain(self.predicates.free_variables().map(ToString::to_string))
            .chain(self.functions.free_variables().map(ToString::to_string))
            .next();
        match free {
            Some(variable) => Err(EvalError::OpenDefinition {
                constant: format!("{}/{}", definition.qualified_name(), definition.arity()),
                variable,
                location: self.location.clone(),
            }),
            None => Ok(()),
        }
    }

    fn malformed(&self, message: String) -> EvalError {
        EvalError::Malformed {
            message,
            location: self.location.clone(),
        }
    }

    fn binding_error(&self, source: BindingError) -> EvalError {
        EvalError::Binding {
            source,
            location: self.location.clone(),
        }
    }

    fn unknown_operator(&self, list: &ElementList) -> EvalError {
        EvalError::UnknownOperator {
            operator: list.operator.clone(),
            location: self.location.clone(),
        }
    }

    fn unknown_term_operator(&self, list: &ElementList) -> EvalError {
        EvalError::UnknownTermOperator {
            operator: list.operator.clone(),
            location: self.location.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Quantifier scope guard
// ---------------------------------------------------------------------------

/// Keeps a quantified subject variable bound while alive.
///
/// Dereferences to the evaluator, so the quantifier body is evaluated
/// through the guard.
pub struct QuantifierScope<'e, 'a> {
    evaluator: &'e mut Evaluator<'a>,
    variable: SubjectVariable,
}

impl<'e, 'a> QuantifierScope<'e, 'a> {
    fn enter(evaluator: &'e mut Evaluator<'a>, variable: SubjectVariable) -> EvalResult<Self> {
        evaluator
            .subjects
            .bind(variable.clone())
            .map_err(|source| evaluator.binding_error(source))?;
        Ok(Self {
            evaluator,
            variable,
        })
    }
}

impl<'a> Deref for QuantifierScope<'_, 'a> {
    type Target = Evaluator<'a>;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for QuantifierScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl Drop for QuantifierScope<'_, '_> {
    fn drop(&mut self) {
        if let Err(e) = self.evaluator.subjects.unbind(&self.variable) {
            tracing::warn!(
                variable = %self.variable,
                error = %e,
                "quantifier scope could not release its binding"
            );
        }
    }
}
