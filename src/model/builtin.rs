//! The built-in finite models.
//!
//! Each model reads its entities as small pure sets, with membership realized
//! as `<` on entity ids: in the three-entity model `1 = {0}` and
//! `2 = {0, 1}`. Only entities that are members of something are sets, so the
//! last entity is always the universal (proper) class.
//!
//! A finite universe cannot represent every subset of itself. Each model
//! therefore carries a literal comprehension table mapping a collection of
//! members to the entity standing for it. The tables are lossy: in the
//! three-entity model `{1}` collapses onto `2`.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{Entity, Function, FunctionKey, Model, ModelBuilder, Predicate, PredicateKey};

/// Selector for one of the built-in models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// One entity: the empty set.
    Unary,
    /// Entities `0 = {}`, `1 = {0}`, `2 = {0, 1}`.
    Three,
    /// Entities `0 = {}`, `1 = {0}`, `2 = {0, 1}`, `3 = {0, 1, 2}`.
    Four,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [Self::Unary, Self::Three, Self::Four];

    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unary" | "one" | "1" => Some(Self::Unary),
            "three" | "3" => Some(Self::Three),
            "four" | "4" => Some(Self::Four),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        Self::from_label(s).ok_or_else(|| ModelError::UnknownModel {
            label: s.to_string(),
        })
    }

    pub fn build(self) -> Model {
        match self {
            Self::Unary => unary_model(),
            Self::Three => three_model(),
            Self::Four => four_model(),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unary => write!(f, "unary"),
            Self::Three => write!(f, "three"),
            Self::Four => write!(f, "four"),
        }
    }
}

/// Comprehension table of the three-entity model, indexed by member bitmask.
///
/// `{}→0, {0}→1, {1}→2, {0,1}→2`. Collections containing `2` give `2`.
pub const THREE_COMPREHENSION: [u32; 4] = [0, 1, 2, 2];

/// Comprehension table of the four-entity model, indexed by member bitmask.
///
/// `{}→0, {0}→1, {1}→2, {0,1}→2`, and every collection containing `2` but not
/// `3` gives `3`. Collections containing `3` give `3`.
pub const FOUR_COMPREHENSION: [u32; 8] = [0, 1, 2, 2, 3, 3, 3, 3];

fn member_mask(members: &[Entity]) -> usize {
    members
        .iter()
        .fold(0usize, |mask, e| mask | (1usize << e.index().min(usize::BITS as usize - 1)))
}

fn collapse(table: &[u32], members: &[Entity]) -> Entity {
    // Masks past the table contain the last entity, which collapses onto itself.
    let last = table.last().copied().unwrap_or(0);
    Entity::new(table.get(member_mask(members)).copied().unwrap_or(last))
}

/// Candidate predicates shared by all built-in models, in enumeration order.
pub fn standard_predicate_pool(entity_count: usize) -> Vec<Predicate> {
    let mut pool = vec![Predicate::constant(false), Predicate::constant(true)];
    let entities: Vec<Entity> = (0..entity_count as u32).map(Entity::new).collect();
    pool.extend(entities.iter().map(|&e| Predicate::equals_entity(e)));
    pool.extend(entities.iter().map(|&e| {
        Predicate::equals_entity(e).negate().with_symbol(
            &format!("≠{}", e.id()),
            &format!("argument is not entity {}", e.id()),
        )
    }));
    pool.push(Predicate::equal());
    pool.push(
        Predicate::equal()
            .negate()
            .with_symbol("≠", "arguments are not all equal"),
    );
    pool.push(Predicate::less());
    pool.push(
        Predicate::less()
            .negate()
            .with_symbol("≥", "arguments do not strictly ascend"),
    );
    pool.push(Predicate::greater());
    pool.push(
        Predicate::greater()
            .negate()
            .with_symbol("≤", "arguments do not strictly descend"),
    );
    pool
}

/// Candidate functions shared by all built-in models, in enumeration order.
pub fn standard_function_pool(entity_count: usize) -> Vec<Function> {
    let mut pool: Vec<Function> = (0..entity_count as u32)
        .map(|id| Function::constant(Entity::new(id)))
        .collect();
    pool.push(Function::projection());
    pool.push(Function::successor(entity_count));
    pool.push(Function::maximum());
    pool.push(Function::minimum());
    pool
}

/// Entities, pools and the constants every model shares. `in` is `<` and
/// `isSet` holds below the last entity.
fn set_model(name: &str, descriptions: &[&str]) -> ModelBuilder {
    let count = descriptions.len();
    let last = Entity::new(count as u32 - 1);
    let builder = descriptions
        .iter()
        .enumerate()
        .fold(Model::builder(name), |builder, (id, description)| {
            builder.entity(id.to_string(), *description)
        });
    builder
        .predicate_candidates(standard_predicate_pool(count))
        .function_candidates(standard_function_pool(count))
        .predicate_constant(PredicateKey::element_of(), Predicate::less())
        .predicate_constant(
            PredicateKey::is_set(),
            Predicate::new("isSet", "member of the universal class", 1, 1, move |args| {
                args[0] < last
            }),
        )
        .predicate_constant(PredicateKey::new("equal", 2), Predicate::equal())
        .predicate_constant(
            PredicateKey::new("notEqual", 2),
            Predicate::equal().negate().with_symbol("≠", "arguments differ"),
        )
        .function_constant(
            FunctionKey::new("emptySet", 0),
            Function::constant(Entity::new(0)),
        )
        .function_constant(FunctionKey::new("universalClass", 0), Function::constant(last))
}

/// The one-entity model. Nothing is a member of anything, so nothing is a set.
pub fn unary_model() -> Model {
    set_model("unary", &["{} (empty set, the only entity)"])
        .predicate_constant(
            PredicateKey::element_of(),
            Predicate::new("in", "never a member", 2, 2, |_| false),
        )
        .predicate_constant(
            PredicateKey::is_set(),
            Predicate::new("isSet", "nothing is a set", 1, 1, |_| false),
        )
        .comprehension(|_| Entity::new(0))
        .assemble()
}

pub fn three_model() -> Model {
    set_model("three", &["{} (empty set)", "{0}", "{0, 1} (universal class)"])
        .comprehension(|members| collapse(&THREE_COMPREHENSION, members))
        .assemble()
}

pub fn four_model() -> Model {
    set_model(
        "four",
        &["{} (empty set)", "{0}", "{0, 1}", "{0, 1, 2} (universal class)"],
    )
    .comprehension(|members| collapse(&FOUR_COMPREHENSION, members))
    .assemble()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::CallContext;
    use crate::model::FiniteModel;

    fn e(id: u32) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn model_kind_labels() {
        assert_eq!(ModelKind::from_label("Three"), Some(ModelKind::Three));
        assert_eq!(ModelKind::from_label("1"), Some(ModelKind::Unary));
        assert!(ModelKind::parse("seven").is_err());
        for kind in ModelKind::ALL {
            assert_eq!(ModelKind::from_label(&kind.to_string()), Some(kind));
        }
    }

    #[test]
    fn entity_counts() {
        assert_eq!(ModelKind::Unary.build().entity_count(), 1);
        assert_eq!(ModelKind::Three.build().entity_count(), 3);
        assert_eq!(ModelKind::Four.build().entity_count(), 4);
    }

    #[test]
    fn three_model_comprehension_golden_table() {
        let model = three_model();
        assert_eq!(model.comprehension(&[]), e(0));
        assert_eq!(model.comprehension(&[e(0)]), e(1));
        assert_eq!(model.comprehension(&[e(1)]), e(2));
        assert_eq!(model.comprehension(&[e(0), e(1)]), e(2));
        assert_eq!(model.comprehension(&[e(2)]), e(2));
        assert_eq!(model.comprehension(&[e(0), e(1), e(2)]), e(2));
    }

    #[test]
    fn four_model_comprehension_golden_table() {
        let model = four_model();
        let cases: [(&[u32], u32); 9] = [
            (&[], 0),
            (&[0], 1),
            (&[1], 2),
            (&[0, 1], 2),
            (&[2], 3),
            (&[0, 2], 3),
            (&[1, 2], 3),
            (&[0, 1, 2], 3),
            (&[3], 3),
        ];
        for (members, expected) in cases {
            let members: Vec<Entity> = members.iter().copied().map(e).collect();
            assert_eq!(model.comprehension(&members), e(expected), "{members:?}");
        }
    }

    #[test]
    fn unary_model_collapses_everything_to_zero() {
        let model = unary_model();
        assert_eq!(model.comprehension(&[]), e(0));
        assert_eq!(model.comprehension(&[e(0)]), e(0));
    }

    #[test]
    fn membership_is_less_than() {
        let model = three_model();
        let ctx = CallContext::detached(&model);
        let element_of = model.predicate_constant(&PredicateKey::element_of()).unwrap();
        assert!(element_of.calculate(&ctx, &[e(0), e(1)]).unwrap());
        assert!(!element_of.calculate(&ctx, &[e(1), e(1)]).unwrap());
        let is_set = model.predicate_constant(&PredicateKey::is_set()).unwrap();
        assert!(is_set.calculate(&ctx, &[e(1)]).unwrap());
        assert!(!is_set.calculate(&ctx, &[e(2)]).unwrap());
    }

    #[test]
    fn unary_model_overrides_shared_constants() {
        let model = unary_model();
        let ctx = CallContext::detached(&model);
        let element_of = model.predicate_constant(&PredicateKey::element_of()).unwrap();
        assert!(!element_of.calculate(&ctx, &[e(0), e(0)]).unwrap());
        let is_set = model.predicate_constant(&PredicateKey::is_set()).unwrap();
        assert!(!is_set.calculate(&ctx, &[e(0)]).unwrap());
    }

    #[test]
    fn standard_pool_order() {
        let model = three_model();
        let symbols: Vec<String> = (0..model.predicate_pool_size(1))
            .filter_map(|i| model.predicate_candidate(1, i))
            .map(|p| p.symbol().to_string())
            .collect();
        assert_eq!(symbols, ["FALSE", "TRUE", "=0", "=1", "=2", "≠0", "≠1", "≠2"]);
        assert_eq!(model.predicate_pool_size(0), 2);
        assert_eq!(model.predicate_pool_size(2), 8);
        assert_eq!(model.function_pool_size(0), 3);
        assert_eq!(model.function_pool_size(1), 6);
        assert_eq!(model.function_pool_size(2), 6);
    }

    #[test]
    fn constant_functions() {
        let model = four_model();
        let ctx = CallContext::detached(&model);
        let empty = model.function_constant(&FunctionKey::new("emptySet", 0)).unwrap();
        let universe = model
            .function_constant(&FunctionKey::new("universalClass", 0))
            .unwrap();
        assert_eq!(empty.map(&ctx, &[]).unwrap(), e(0));
        assert_eq!(universe.map(&ctx, &[]).unwrap(), e(3));
    }
}
