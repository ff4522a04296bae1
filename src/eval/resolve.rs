//! On-demand resolution of constants defined in documents.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::document::{DefinitionSource, qualify};
use crate::eval::Evaluator;
use crate::model::{DynamicModel, Function, FunctionKey, Predicate, PredicateKey};

/// Supplies constants the model does not know about.
///
/// `scope` is the label of the document the reference occurs in, or `None`
/// when it occurs outside any document.
pub trait ConstantResolver: Send + Sync {
    fn resolve_predicate(&self, scope: Option<&str>, key: &PredicateKey) -> Option<Predicate>;
    fn resolve_function(&self, scope: Option<&str>, key: &FunctionKey) -> Option<Function>;
}

/// Resolves constants from document definitions and caches them in a
/// [`DynamicModel`] under `document::name`.
///
/// A name is looked up in the referencing document first. A name of the form
/// `prefix.rest` is then looked up as `rest` in the document imported under
/// `prefix`.
pub struct DynamicResolver<'a> {
    model: &'a DynamicModel,
    source: &'a dyn DefinitionSource,
    root: Option<String>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Where a reference may be defined, most specific first.
struct Candidate<'n> {
    document: Option<String>,
    name: &'n str,
}

impl<'a> DynamicResolver<'a> {
    pub fn new(model: &'a DynamicModel, source: &'a dyn DefinitionSource) -> Self {
        Self {
            model,
            source,
            root: None,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Scope used for references made outside any document.
    pub fn with_root(mut self, document: impl Into<String>) -> Self {
        self.root = Some(document.into());
        self
    }

    pub fn model(&self) -> &'a DynamicModel {
        self.model
    }

    /// An evaluator over the dynamic model that resolves through `self`.
    pub fn evaluator(&self) -> Evaluator<'_> {
        let evaluator = Evaluator::new(self.model).with_resolver(self);
        match &self.root {
            Some(root) => evaluator.with_scope(root.clone()),
            None => evaluator,
        }
    }

    /// Lookups answered from the cache.
    pub fn cache_hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that had to consult the definition source.
    pub fn cache_misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    fn candidates<'n>(&self, scope: Option<&str>, name: &'n str) -> Vec<Candidate<'n>> {
        let scope = scope.or(self.root.as_deref());
        let mut candidates = vec![Candidate {
            document: scope.map(str::to_string),
            name,
        }];
        if let (Some(scope), Some((prefix, rest))) = (scope, name.split_once('.')) {
            if let Some(document) = self.source.import(scope, prefix) {
                candidates.push(Candidate {
                    document: Some(document),
                    name: rest,
                });
            }
        }
        candidates
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

impl ConstantResolver for DynamicResolver<'_> {
    fn resolve_predicate(&self, scope: Option<&str>, key: &PredicateKey) -> Option<Predicate> {
        let candidates = self.candidates(scope, &key.name);
        let cache_key = |c: &Candidate<'_>| {
            PredicateKey::new(qualify(c.document.as_deref(), c.name), key.arity)
        };

        if let Some(predicate) = candidates
            .iter()
            .find_map(|c| self.model.registered_predicate(&cache_key(c)))
        {
            tracing::trace!(constant = %key, "derived predicate cache hit");
            self.hit();
            return Some(predicate);
        }

        self.miss();
        candidates.iter().find_map(|c| {
            let definition =
                self.source
                    .predicate_definition(c.document.as_deref(), c.name, key.arity)?;
            Some(self.model.register_predicate_definition(cache_key(c), definition))
        })
    }

    fn resolve_function(&self, scope: Option<&str>, key: &FunctionKey) -> Option<Function> {
        let candidates = self.candidates(scope, &key.name);
        let cache_key = |c: &Candidate<'_>| {
            FunctionKey::new(qualify(c.document.as_deref(), c.name), key.arity)
        };

        if let Some(function) = candidates
            .iter()
            .find_map(|c| self.model.registered_function(&cache_key(c)))
        {
            tracing::trace!(constant = %key, "derived function cache hit");
            self.hit();
            return Some(function);
        }

        self.miss();
        candidates.iter().find_map(|c| {
            let definition =
                self.source
                    .function_definition(c.document.as_deref(), c.name, key.arity)?;
            Some(self.model.register_function_definition(cache_key(c), definition))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentLibrary};
    use crate::element::Element;
    use crate::error::EvalError;
    use crate::model::{Entity, ModelKind};

    fn sets_library() -> DocumentLibrary {
        let sets = Document::new("sets")
            .predicate(
                "subclass",
                &["x", "y"],
                "(FORALL (VAR z) (IMPL (PREDCON in (VAR z) (VAR x)) (PREDCON in (VAR z) (VAR y))))",
            )
            .unwrap()
            .function(
                "singleton",
                &["x"],
                "(CLASS (VAR z) (PREDCON equal (VAR z) (VAR x)))",
            )
            .unwrap();
        let root = Document::new("main")
            .import("s", "sets")
            .predicate(
                "selfSub",
                &["x"],
                "(PREDCON s.subclass (VAR x) (VAR x))",
            )
            .unwrap();
        let mut library = DocumentLibrary::new(root);
        library.insert(sets).unwrap();
        library
    }

    #[test]
    fn resolves_through_imports_and_caches() {
        let library = sets_library();
        let model = DynamicModel::from_kind(ModelKind::Three);
        let resolver = DynamicResolver::new(&model, &library).with_root("main");

        let formula = Element::parse("(PREDCON s.subclass (FUNCON emptySet) (VAR x))").unwrap();
        let mut evaluator = resolver.evaluator();
        assert!(evaluator.evaluate_formula(&formula).unwrap());
        assert_eq!(resolver.cache_misses(), 1);
        assert_eq!(model.registered_predicate_count(), 1);
        assert!(
            model
                .registered_predicate(&PredicateKey::new("sets::subclass", 2))
                .is_some()
        );

        assert!(evaluator.evaluate_formula(&formula).unwrap());
        assert_eq!(resolver.cache_hits(), 1);
        assert_eq!(model.registered_predicate_count(), 1);
    }

    #[test]
    fn definitions_resolve_in_their_own_document() {
        let library = sets_library();
        let model = DynamicModel::from_kind(ModelKind::Three);
        let resolver = DynamicResolver::new(&model, &library).with_root("main");
        let formula = Element::parse("(PREDCON selfSub (VAR x))").unwrap();
        assert!(resolver.evaluator().evaluate_formula(&formula).unwrap());
        assert_eq!(model.registered_predicate_count(), 2);
    }

    #[test]
    fn functions_resolve_too() {
        let library = sets_library();
        let model = DynamicModel::from_kind(ModelKind::Three);
        let resolver = DynamicResolver::new(&model, &library).with_root("main");
        let term = Element::parse("(FUNCON s.singleton (FUNCON emptySet))").unwrap();
        assert_eq!(
            resolver.evaluator().evaluate_term(&term).unwrap(),
            Entity::new(1)
        );
    }

    #[test]
    fn unresolved_names_stay_unknown() {
        let library = sets_library();
        let model = DynamicModel::from_kind(ModelKind::Three);
        let resolver = DynamicResolver::new(&model, &library).with_root("main");
        let formula = Element::parse("(PREDCON subclass (VAR x) (VAR y))").unwrap();
        let err = resolver.evaluator().evaluate_formula(&formula).unwrap_err();
        assert!(matches!(err, EvalError::UnknownPredicateConstant { .. }));
        assert_eq!(model.registered_predicate_count(), 0);
    }
}
