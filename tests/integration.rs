//! End-to-end checks of the tautology search across the built-in models.
//!
//! These tests exercise the full path from s-expression text through the
//! evaluator and the valuation driver, including derived constants
//! registered on a dynamic model.

use std::sync::Arc;

use fincheck::document::Definition;
use fincheck::element::Element;
use fincheck::error::{DocumentError, EvalError};
use fincheck::eval::Evaluator;
use fincheck::model::{DynamicModel, Entity, FiniteModel, ModelKind, PredicateKey};
use fincheck::search::{SearchOutcome, TautologySearch, is_tautology};
use fincheck::variable::SubjectVariable;

fn parse(text: &str) -> Element {
    Element::parse(text).unwrap()
}

fn holds_in_every_model(text: &str) -> bool {
    let formula = parse(text);
    ModelKind::ALL
        .iter()
        .all(|kind| is_tautology(&kind.build(), &formula).unwrap())
}

#[test]
fn propositional_laws_hold_everywhere() {
    for law in [
        "(EQUI (NOT (NOT (PREDVAR A))) (PREDVAR A))",
        "(OR (PREDVAR A) (NOT (PREDVAR A)))",
        "(NOT (AND (PREDVAR A) (NOT (PREDVAR A))))",
        "(IMPL (AND (PREDVAR A) (PREDVAR B)) (PREDVAR A))",
        "(EQUI (NOT (AND (PREDVAR A) (PREDVAR B))) (OR (NOT (PREDVAR A)) (NOT (PREDVAR B))))",
    ] {
        assert!(holds_in_every_model(law), "{law} should be a tautology");
    }
}

#[test]
fn contradiction_is_never_a_tautology() {
    let formula = parse("(AND (PREDVAR A) (NOT (PREDVAR A)))");
    for kind in ModelKind::ALL {
        assert!(!is_tautology(&kind.build(), &formula).unwrap(), "{kind}");
    }
}

#[test]
fn double_negation_preserves_the_verdict() {
    for inner in [
        "(AND (PREDVAR A) (PREDVAR B))",
        "(OR (PREDVAR A) (NOT (PREDVAR A)))",
        "(PREDCON in (VAR x) (VAR y))",
    ] {
        let formula = parse(inner);
        let doubled = Element::list("NOT", vec![Element::list("NOT", vec![formula.clone()])]);
        for kind in ModelKind::ALL {
            let model = kind.build();
            assert_eq!(
                is_tautology(&model, &doubled).unwrap(),
                is_tautology(&model, &formula).unwrap(),
                "{inner} in {kind}"
            );
        }
    }
    assert!(!is_tautology(
        &ModelKind::Four.build(),
        &parse("(NOT (NOT (AND (PREDVAR A) (PREDVAR B))))")
    )
    .unwrap());
}

#[test]
fn predicate_variables_with_arguments() {
    assert!(holds_in_every_model(
        "(OR (PREDVAR A (VAR x)) (NOT (PREDVAR A (VAR x))))"
    ));
    assert!(holds_in_every_model(
        "(IMPL (FORALL (VAR x) (PREDVAR A (VAR x))) (PREDVAR A (VAR y)))"
    ));
    assert!(holds_in_every_model(
        "(IMPL (PREDVAR A (VAR y)) (EXISTS (VAR x) (PREDVAR A (VAR x))))"
    ));
}

#[test]
fn symmetry_fails_beyond_one_entity() {
    let formula = parse("(EQUI (PREDVAR A (VAR x) (VAR y)) (PREDVAR A (VAR y) (VAR x)))");
    assert!(is_tautology(&ModelKind::Unary.build(), &formula).unwrap());
    assert!(!is_tautology(&ModelKind::Three.build(), &formula).unwrap());
}

#[test]
fn unique_existence_of_self_equal_entity() {
    let exists = parse("(EXISTS (VAR y) (PREDCON equal (VAR y) (VAR y)))");
    let unique = parse("(EXISTSU (VAR y) (PREDCON equal (VAR y) (VAR y)))");
    for kind in ModelKind::ALL {
        assert!(is_tautology(&kind.build(), &exists).unwrap());
    }
    assert!(is_tautology(&ModelKind::Unary.build(), &unique).unwrap());
    assert!(!is_tautology(&ModelKind::Three.build(), &unique).unwrap());
}

#[test]
fn function_variables_are_enumerated() {
    // f(x) = f(x) for every interpretation of f.
    assert!(holds_in_every_model(
        "(PREDCON equal (FUNVAR f (VAR x)) (FUNVAR f (VAR x)))"
    ));
    // but f(x) = x does not.
    let formula = parse("(PREDCON equal (FUNVAR f (VAR x)) (VAR x))");
    let model = ModelKind::Three.build();
    let outcome = TautologySearch::new(Evaluator::new(&model))
        .run(&formula)
        .unwrap();
    let SearchOutcome::Falsified { counterexample, .. } = outcome else {
        panic!("f(x) = x should be falsified");
    };
    assert_eq!(counterexample.functions, vec![("f/1".into(), "0".into())]);
    assert_eq!(counterexample.subjects, vec![("x".into(), "1".into())]);
}

#[test]
fn valuation_count_is_the_product_of_candidate_counts() {
    let model = ModelKind::Three.build();
    let formula = parse("(OR (PREDVAR A (VAR x)) (NOT (PREDVAR A (VAR x))))");
    let outcome = TautologySearch::new(Evaluator::new(&model))
        .run(&formula)
        .unwrap();
    let expected = model.predicate_pool_size(1) * model.entity_count();
    assert_eq!(outcome.valuations(), expected as u64);
}

#[test]
fn set_theory_in_the_three_model() {
    // Nothing is a member of the empty set.
    assert!(holds_in_every_model(
        "(NOT (PREDCON in (VAR x) (FUNCON emptySet)))"
    ));
    // Members are sets.
    let model = ModelKind::Three.build();
    assert!(
        is_tautology(
            &model,
            &parse("(IMPL (PREDCON in (VAR x) (VAR y)) (PREDCON isSet (VAR x)))")
        )
        .unwrap()
    );
    // The universal class is not a set.
    assert!(
        is_tautology(
            &model,
            &parse("(NOT (PREDCON isSet (FUNCON universalClass)))")
        )
        .unwrap()
    );
}

#[test]
fn comprehension_golden_values() {
    let model = ModelKind::Four.build();
    let mut evaluator = Evaluator::new(&model);
    let cases = [
        ("(CLASS (VAR x) (PREDCON notEqual (VAR x) (VAR x)))", 0),
        ("(CLASS (VAR x) (PREDCON equal (VAR x) (FUNCON emptySet)))", 1),
        ("(CLASSLIST (FUNCON emptySet) (CLASSLIST (FUNCON emptySet)))", 2),
        ("(CLASS (VAR x) (PREDCON equal (VAR x) (VAR x)))", 3),
    ];
    for (text, expected) in cases {
        assert_eq!(
            evaluator.evaluate_term(&parse(text)).unwrap(),
            Entity::new(expected),
            "{text}"
        );
    }
}

#[test]
fn registered_constants_are_referentially_transparent() {
    let model = DynamicModel::from_kind(ModelKind::Four);
    model.register_predicate_constant(
        PredicateKey::new("subclass", 2),
        vec![SubjectVariable::new("a"), SubjectVariable::new("b")],
        parse("(FORALL (VAR z) (IMPL (PREDCON in (VAR z) (VAR a)) (PREDCON in (VAR z) (VAR b))))"),
    )
    .unwrap();
    let via_constant = parse("(PREDCON subclass (VAR x) (VAR y))");
    let expanded =
        parse("(FORALL (VAR z) (IMPL (PREDCON in (VAR z) (VAR x)) (PREDCON in (VAR z) (VAR y))))");
    assert!(
        is_tautology(
            &model,
            &Element::list("EQUI", vec![via_constant, expanded])
        )
        .unwrap()
    );
}

#[test]
fn definitions_with_free_variables_cannot_be_registered() {
    let model = DynamicModel::from_kind(ModelKind::Three);
    let err = model
        .register_predicate_constant(
            PredicateKey::new("p", 1),
            vec![SubjectVariable::new("x")],
            parse("(PREDCON in (VAR x) (VAR y))"),
        )
        .unwrap_err();
    assert!(matches!(err, DocumentError::OpenDefinition { .. }));
    assert_eq!(model.registered_predicate_count(), 0);
}

#[test]
fn open_definition_fails_instead_of_falsifying() {
    let model = DynamicModel::from_kind(ModelKind::Three);
    let definition = Definition::new(
        None,
        "p",
        vec![SubjectVariable::new("x")],
        parse("(PREDCON in (VAR x) (VAR y))"),
    );
    model.register_predicate_definition(PredicateKey::new("p", 1), Arc::new(definition));

    let formula = parse("(EQUI (PREDCON p (VAR x)) (PREDCON in (VAR x) (VAR y)))");
    match is_tautology(&model, &formula).unwrap_err() {
        EvalError::OpenDefinition {
            constant, variable, ..
        } => {
            assert_eq!(constant, "p/1");
            assert_eq!(variable, "y");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn free_and_quantified_uses_of_one_name_agree_in_either_order() {
    let model = ModelKind::Three.build();
    for (quantifier_first, free_first) in [
        (
            "(AND (FORALL (VAR x) (PREDCON in (VAR x) (VAR x))) (PREDCON in (VAR x) (VAR x)))",
            "(AND (PREDCON in (VAR x) (VAR x)) (FORALL (VAR x) (PREDCON in (VAR x) (VAR x))))",
        ),
        (
            "(OR (FORALL (VAR x) (PREDCON in (VAR x) (VAR x))) (PREDCON in (VAR x) (VAR x)))",
            "(OR (PREDCON in (VAR x) (VAR x)) (FORALL (VAR x) (PREDCON in (VAR x) (VAR x))))",
        ),
        (
            "(IMPL (FORALL (VAR x) (PREDVAR A (VAR x))) (PREDVAR A (VAR x)))",
            "(IMPL (NOT (PREDVAR A (VAR x))) (NOT (FORALL (VAR x) (PREDVAR A (VAR x)))))",
        ),
    ] {
        let a = is_tautology(&model, &parse(quantifier_first)).unwrap();
        let b = is_tautology(&model, &parse(free_first)).unwrap();
        assert_eq!(a, b, "{quantifier_first} vs {free_first}");
    }
    assert!(
        is_tautology(
            &model,
            &parse("(IMPL (FORALL (VAR x) (PREDVAR A (VAR x))) (PREDVAR A (VAR x)))")
        )
        .unwrap()
    );
}

#[test]
fn unknown_constants_surface_as_errors() {
    let model = ModelKind::Three.build();
    let err = is_tautology(&model, &parse("(PREDCON subset (VAR x) (VAR y))")).unwrap_err();
    assert!(matches!(err, EvalError::UnknownPredicateConstant { .. }));
    let report = miette::Report::new(err);
    assert!(format!("{report:?}").contains("subset/2"));
}
