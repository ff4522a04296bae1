//! Models that learn constants at run time.
//!
//! A [`DynamicModel`] wraps a static [`Model`] and keeps a registry of derived
//! constants. Each derived constant closes over a definition; calling it binds
//! the definition's variables to the arguments in a private evaluator and
//! evaluates the definition body. Built-in constants of the wrapped model
//! always take precedence over registered ones.
//!
//! The registry uses `DashMap` so a model can be shared by concurrent checks
//! while definitions are being resolved.

use std::sync::Arc;

use dashmap::DashMap;

use crate::document::Definition;
use crate::element::Element;
use crate::error::DocumentError;
use crate::model::{
    Entity, EntityMeta, FiniteModel, Function, FunctionKey, Model, ModelKind, Predicate,
    PredicateKey,
};
use crate::variable::SubjectVariable;

/// A [`Model`] plus a registry of derived predicate and function constants.
pub struct DynamicModel {
    base: Model,
    predicates: DashMap<PredicateKey, Predicate>,
    functions: DashMap<FunctionKey, Function>,
}

impl DynamicModel {
    pub fn new(base: Model) -> Self {
        Self {
            base,
            predicates: DashMap::new(),
            functions: DashMap::new(),
        }
    }

    pub fn from_kind(kind: ModelKind) -> Self {
        Self::new(kind.build())
    }

    pub fn base(&self) -> &Model {
        &self.base
    }

    /// Register a predicate constant defined by `body` over `variables`.
    ///
    /// The definition is evaluated without a document scope, so constants it
    /// references must be built in or already registered. Fails if `body`
    /// uses a variable outside `variables` that it does not quantify.
    pub fn register_predicate_constant(
        &self,
        key: PredicateKey,
        variables: Vec<SubjectVariable>,
        body: Element,
    ) -> Result<Predicate, DocumentError> {
        let definition = Definition::closed(None, key.name.clone(), variables, body)?;
        Ok(self.register_predicate_definition(key, Arc::new(definition)))
    }

    pub fn register_predicate_definition(
        &self,
        key: PredicateKey,
        definition: Arc<Definition>,
    ) -> Predicate {
        let predicate = Predicate::defined(&key.name, definition);
        tracing::debug!(
            model = %self.base.name(),
            constant = %key,
            "registered derived predicate constant"
        );
        self.predicates.insert(key, predicate.clone());
        predicate
    }

    /// Register a function constant defined by the term `body` over `variables`.
    pub fn register_function_constant(
        &self,
        key: FunctionKey,
        variables: Vec<SubjectVariable>,
        body: Element,
    ) -> Result<Function, DocumentError> {
        let definition = Definition::closed(None, key.name.clone(), variables, body)?;
        Ok(self.register_function_definition(key, Arc::new(definition)))
    }

    pub fn register_function_definition(
        &self,
        key: FunctionKey,
        definition: Arc<Definition>,
    ) -> Function {
        let function = Function::defined(&key.name, definition);
        tracing::debug!(
            model = %self.base.name(),
            constant = %key,
            "registered derived function constant"
        );
        self.functions.insert(key, function.clone());
        function
    }

    /// A registered (not built-in) predicate constant.
    pub fn registered_predicate(&self, key: &PredicateKey) -> Option<Predicate> {
        self.predicates.get(key).map(|r| r.value().clone())
    }

    /// A registered (not built-in) function constant.
    pub fn registered_function(&self, key: &FunctionKey) -> Option<Function> {
        self.functions.get(key).map(|r| r.value().clone())
    }

    pub fn registered_predicate_count(&self) -> usize {
        self.predicates.len()
    }

    pub fn registered_function_count(&self) -> usize {
        self.functions.len()
    }

    /// Forget every registered constant, keeping the built-in ones.
    pub fn clear_registrations(&self) {
        self.predicates.clear();
        self.functions.clear();
    }
}

impl FiniteModel for DynamicModel {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn entity_count(&self) -> usize {
        self.base.entity_count()
    }

    fn entity_meta(&self, entity: Entity) -> Option<&EntityMeta> {
        self.base.entity_meta(entity)
    }

    fn predicate_pool_size(&self, arity: usize) -> usize {
        self.base.predicate_pool_size(arity)
    }

    fn predicate_candidate(&self, arity: usize, index: usize) -> Option<Predicate> {
        self.base.predicate_candidate(arity, index)
    }

    fn function_pool_size(&self, arity: usize) -> usize {
        self.base.function_pool_size(arity)
    }

    fn function_candidate(&self, arity: usize, index: usize) -> Option<Function> {
        self.base.function_candidate(arity, index)
    }

    fn predicate_constant(&self, key: &PredicateKey) -> Option<Predicate> {
        self.base
            .predicate_constant(key)
            .or_else(|| self.registered_predicate(key))
    }

    fn function_constant(&self, key: &FunctionKey) -> Option<Function> {
        self.base
            .function_constant(key)
            .or_else(|| self.registered_function(key))
    }

    fn comprehension(&self, members: &[Entity]) -> Entity {
        self.base.comprehension(members)
    }
}

impl std::fmt::Debug for DynamicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicModel")
            .field("base", &self.base)
            .field("predicates", &self.predicates.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::CallContext;

    fn e(id: u32) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn registered_predicate_evaluates_its_definition() {
        let model = DynamicModel::from_kind(ModelKind::Three);
        let body = Element::parse(
            "(FORALL (VAR z) (IMPL (PREDCON in (VAR z) (VAR x)) (PREDCON in (VAR z) (VAR y))))",
        )
        .unwrap();
        model.register_predicate_constant(
            PredicateKey::new("subclass", 2),
            vec![SubjectVariable::new("x"), SubjectVariable::new("y")],
            body,
        )
        .unwrap();

        let subclass = model
            .predicate_constant(&PredicateKey::new("subclass", 2))
            .unwrap();
        assert!(subclass.is_defined());
        let ctx = CallContext::detached(&model);
        assert!(subclass.calculate(&ctx, &[e(1), e(2)]).unwrap());
        assert!(!subclass.calculate(&ctx, &[e(2), e(1)]).unwrap());
        assert!(subclass.calculate(&ctx, &[e(0), e(0)]).unwrap());
    }

    #[test]
    fn registered_function_evaluates_its_definition() {
        let model = DynamicModel::from_kind(ModelKind::Three);
        // {x}: the class of sets equal to x.
        let body = Element::parse("(CLASS (VAR z) (PREDCON equal (VAR z) (VAR x)))").unwrap();
        model.register_function_constant(
            FunctionKey::new("singleton", 1),
            vec![SubjectVariable::new("x")],
            body,
        )
        .unwrap();
        let singleton = model
            .function_constant(&FunctionKey::new("singleton", 1))
            .unwrap();
        let ctx = CallContext::detached(&model);
        assert_eq!(singleton.map(&ctx, &[e(0)]).unwrap(), e(1));
        // {2} has no set members, so it is the empty class.
        assert_eq!(singleton.map(&ctx, &[e(2)]).unwrap(), e(0));
    }

    #[test]
    fn builtin_constants_win_over_registered_ones() {
        let model = DynamicModel::from_kind(ModelKind::Three);
        model.register_predicate_constant(
            PredicateKey::element_of(),
            vec![SubjectVariable::new("x"), SubjectVariable::new("y")],
            Element::parse("(PREDCON equal (VAR x) (VAR y))").unwrap(),
        )
        .unwrap();
        let element_of = model.predicate_constant(&PredicateKey::element_of()).unwrap();
        assert!(!element_of.is_defined());
        assert_eq!(model.registered_predicate_count(), 1);
        model.clear_registrations();
        assert_eq!(model.registered_predicate_count(), 0);
    }

    #[test]
    fn open_bodies_are_not_registered() {
        let model = DynamicModel::from_kind(ModelKind::Three);
        let err = model
            .register_predicate_constant(
                PredicateKey::new("p", 1),
                vec![SubjectVariable::new("x")],
                Element::parse("(PREDCON in (VAR x) (VAR y))").unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, DocumentError::OpenDefinition { variable, .. } if variable == "y"));

        let err = model
            .register_function_constant(
                FunctionKey::new("f", 1),
                vec![SubjectVariable::new("x")],
                Element::parse("(CLASS (VAR z) (PREDVAR A (VAR z) (VAR x)))").unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, DocumentError::OpenDefinition { variable, .. } if variable == "A/2"));
        assert_eq!(model.registered_predicate_count(), 0);
        assert_eq!(model.registered_function_count(), 0);
    }
}
