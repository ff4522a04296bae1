//! Finite models: the universes formulas are evaluated in.
//!
//! A model owns an ordered list of entities, candidate pools of anonymous
//! predicates and functions (the values predicate/function *variables* range
//! over), registries of named constants, and a model-specific comprehension
//! rule that collapses a collection of entities into one entity.
//!
//! The [`FiniteModel`] trait is what the evaluator consumes. [`Model`] is the
//! static implementation; [`DynamicModel`] adds run-time registration of
//! constants backed by definitions.

pub mod builtin;
pub mod dynamic;
pub mod function;
pub mod predicate;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub use builtin::ModelKind;
pub use dynamic::DynamicModel;
pub use function::Function;
pub use predicate::Predicate;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Identifier of one element of a model's universe.
///
/// The id is the entity's position in its model, so entities of one model
/// compare and hash by value without touching the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    pub fn new(id: u32) -> Self {
        Entity(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    /// Position of this entity in its model's entity list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display data for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub entity: Entity,
    /// Short display name, e.g. `"1"`.
    pub name: String,
    /// What the entity stands for, e.g. `"{0}"`.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Constant keys
// ---------------------------------------------------------------------------

/// Name and arity of a predicate constant, e.g. `in/2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredicateKey {
    pub name: String,
    pub arity: usize,
}

impl PredicateKey {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// The unary "is-a-set" constant class construction depends on.
    pub fn is_set() -> Self {
        Self::new("isSet", 1)
    }

    /// The binary membership constant.
    pub fn element_of() -> Self {
        Self::new("in", 2)
    }
}

impl std::fmt::Display for PredicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Name and arity of a function constant, e.g. `union/2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionKey {
    pub name: String,
    pub arity: usize,
}

impl FunctionKey {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

// ---------------------------------------------------------------------------
// Model contract
// ---------------------------------------------------------------------------

/// What the evaluator needs from a model.
///
/// Constants are returned by value; [`Predicate`] and [`Function`] are cheap
/// `Arc`-backed handles.
pub trait FiniteModel: Send + Sync {
    fn name(&self) -> &str;

    fn entity_count(&self) -> usize;

    fn entity_meta(&self, entity: Entity) -> Option<&EntityMeta>;

    /// Number of predicate candidates accepting `arity` arguments.
    fn predicate_pool_size(&self, arity: usize) -> usize;

    /// The `index`-th predicate candidate accepting `arity` arguments.
    fn predicate_candidate(&self, arity: usize, index: usize) -> Option<Predicate>;

    fn function_pool_size(&self, arity: usize) -> usize;

    fn function_candidate(&self, arity: usize, index: usize) -> Option<Function>;

    fn predicate_constant(&self, key: &PredicateKey) -> Option<Predicate>;

    fn function_constant(&self, key: &FunctionKey) -> Option<Function>;

    /// Collapse a collection of entities into the entity representing it.
    fn comprehension(&self, members: &[Entity]) -> Entity;

    fn entity(&self, index: usize) -> Option<Entity> {
        (index < self.entity_count()).then(|| Entity::new(index as u32))
    }

    /// Display name of an entity, falling back to its id.
    fn entity_name(&self, entity: Entity) -> String {
        self.entity_meta(entity)
            .map(|meta| meta.name.clone())
            .unwrap_or_else(|| entity.to_string())
    }
}

// ---------------------------------------------------------------------------
// Static model
// ---------------------------------------------------------------------------

type ComprehensionFn = dyn Fn(&[Entity]) -> Entity + Send + Sync;

/// A finite model with fixed semantics.
pub struct Model {
    name: String,
    entities: Vec<EntityMeta>,
    predicate_pool: Vec<Predicate>,
    function_pool: Vec<Function>,
    predicate_constants: HashMap<PredicateKey, Predicate>,
    function_constants: HashMap<FunctionKey, Function>,
    comprehension: Arc<ComprehensionFn>,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn entities(&self) -> &[EntityMeta] {
        &self.entities
    }

    /// All candidate predicates, regardless of arity.
    pub fn predicate_pool(&self) -> &[Predicate] {
        &self.predicate_pool
    }

    pub fn function_pool(&self) -> &[Function] {
        &self.function_pool
    }

    /// Registered predicate constants, sorted by key.
    pub fn predicate_constants(&self) -> Vec<(&PredicateKey, &Predicate)> {
        let mut constants: Vec<_> = self.predicate_constants.iter().collect();
        constants.sort_by(|a, b| a.0.cmp(b.0));
        constants
    }

    /// Registered function constants, sorted by key.
    pub fn function_constants(&self) -> Vec<(&FunctionKey, &Function)> {
        let mut constants: Vec<_> = self.function_constants.iter().collect();
        constants.sort_by(|a, b| a.0.cmp(b.0));
        constants
    }
}

impl FiniteModel for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn entity_meta(&self, entity: Entity) -> Option<&EntityMeta> {
        self.entities.get(entity.index())
    }

    fn predicate_pool_size(&self, arity: usize) -> usize {
        self.predicate_pool
            .iter()
            .filter(|p| p.accepts(arity))
            .count()
    }

    fn predicate_candidate(&self, arity: usize, index: usize) -> Option<Predicate> {
        self.predicate_pool
            .iter()
            .filter(|p| p.accepts(arity))
            .nth(index)
            .cloned()
    }

    fn function_pool_size(&self, arity: usize) -> usize {
        self.function_pool
            .iter()
            .filter(|f| f.accepts(arity))
            .count()
    }

    fn function_candidate(&self, arity: usize, index: usize) -> Option<Function> {
        self.function_pool
            .iter()
            .filter(|f| f.accepts(arity))
            .nth(index)
            .cloned()
    }

    fn predicate_constant(&self, key: &PredicateKey) -> Option<Predicate> {
        self.predicate_constants.get(key).cloned()
    }

    fn function_constant(&self, key: &FunctionKey) -> Option<Function> {
        self.function_constants.get(key).cloned()
    }

    fn comprehension(&self, members: &[Entity]) -> Entity {
        (self.comprehension)(members)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("entities", &self.entities.len())
            .field("predicate_pool", &self.predicate_pool.len())
            .field("function_pool", &self.function_pool.len())
            .field("predicate_constants", &self.predicate_constants.len())
            .field("function_constants", &self.function_constants.len())
            .finish()
    }
}

/// Incremental construction of a [`Model`].
///
/// Entities get sequential ids in the order they are added.
pub struct ModelBuilder {
    name: String,
    entities: Vec<EntityMeta>,
    predicate_pool: Vec<Predicate>,
    function_pool: Vec<Function>,
    predicate_constants: HashMap<PredicateKey, Predicate>,
    function_constants: HashMap<FunctionKey, Function>,
    comprehension: Option<Arc<ComprehensionFn>>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            predicate_pool: Vec::new(),
            function_pool: Vec::new(),
            predicate_constants: HashMap::new(),
            function_constants: HashMap::new(),
            comprehension: None,
        }
    }

    pub fn entity(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let entity = Entity::new(self.entities.len() as u32);
        self.entities.push(EntityMeta {
            entity,
            name: name.into(),
            description: description.into(),
        });
        self
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn predicate_candidate(mut self, predicate: Predicate) -> Self {
        self.predicate_pool.push(predicate);
        self
    }

    pub fn predicate_candidates(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicate_pool.extend(predicates);
        self
    }

    pub fn function_candidate(mut self, function: Function) -> Self {
        self.function_pool.push(function);
        self
    }

    pub fn function_candidates(mut self, functions: impl IntoIterator<Item = Function>) -> Self {
        self.function_pool.extend(functions);
        self
    }

    pub fn predicate_constant(mut self, key: PredicateKey, predicate: Predicate) -> Self {
        self.predicate_constants.insert(key, predicate);
        self
    }

    pub fn function_constant(mut self, key: FunctionKey, function: Function) -> Self {
        self.function_constants.insert(key, function);
        self
    }

    pub fn comprehension(
        mut self,
        rule: impl Fn(&[Entity]) -> Entity + Send + Sync + 'static,
    ) -> Self {
        self.comprehension = Some(Arc::new(rule));
        self
    }

    /// Finish the model. Without an explicit comprehension rule every
    /// collection collapses to the first entity.
    pub fn build(self) -> Result<Model, ModelError> {
        if self.entities.is_empty() {
            return Err(ModelError::NoEntities { name: self.name });
        }
        Ok(self.assemble())
    }

    /// Finish a model whose universe is known to be non-empty.
    pub(crate) fn assemble(self) -> Model {
        let comprehension = self
            .comprehension
            .unwrap_or_else(|| Arc::new(|_: &[Entity]| Entity::new(0)));
        Model {
            name: self.name,
            entities: self.entities,
            predicate_pool: self.predicate_pool,
            function_pool: self.function_pool,
            predicate_constants: self.predicate_constants,
            function_constants: self.function_constants,
            comprehension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_entity_model() -> Model {
        Model::builder("pair")
            .entity("a", "first")
            .entity("b", "second")
            .predicate_candidates([Predicate::constant(false), Predicate::constant(true)])
            .predicate_candidate(Predicate::equals_entity(Entity::new(0)))
            .function_candidate(Function::projection())
            .predicate_constant(PredicateKey::new("equal", 2), Predicate::equal())
            .build()
            .unwrap()
    }

    #[test]
    fn builder_assigns_sequential_ids() {
        let model = two_entity_model();
        assert_eq!(model.entity_count(), 2);
        assert_eq!(model.entity(1), Some(Entity::new(1)));
        assert_eq!(model.entity(2), None);
        assert_eq!(model.entity_name(Entity::new(1)), "b");
    }

    #[test]
    fn builder_rejects_empty_universe() {
        let err = Model::builder("empty").build().unwrap_err();
        assert!(matches!(err, ModelError::NoEntities { .. }));
    }

    #[test]
    fn pools_are_filtered_by_arity() {
        let model = two_entity_model();
        assert_eq!(model.predicate_pool_size(0), 2);
        assert_eq!(model.predicate_pool_size(1), 3);
        assert_eq!(model.function_pool_size(0), 0);
        assert_eq!(model.function_pool_size(3), 1);
        let third = model.predicate_candidate(1, 2).unwrap();
        assert_eq!(third.symbol(), "=0");
    }

    #[test]
    fn constants_are_looked_up_by_name_and_arity() {
        let model = two_entity_model();
        assert!(model.predicate_constant(&PredicateKey::new("equal", 2)).is_some());
        assert!(model.predicate_constant(&PredicateKey::new("equal", 3)).is_none());
        assert!(model.function_constant(&FunctionKey::new("equal", 2)).is_none());
    }

    #[test]
    fn default_comprehension_is_first_entity() {
        let model = two_entity_model();
        assert_eq!(model.comprehension(&[Entity::new(1)]), Entity::new(0));
    }
}
