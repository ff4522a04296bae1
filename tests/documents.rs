//! Loading documents from disk and checking them end to end.

use std::path::Path;

use fincheck::check::{Verdict, check_document};
use fincheck::config::CheckerConfig;
use fincheck::document::{DefinitionSource, DocumentLibrary};
use fincheck::error::DocumentError;
use fincheck::model::ModelKind;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const SETS: &str = r#"
label = "sets"

[[predicates]]
name = "subclass"
variables = ["x", "y"]
definition = "(FORALL (VAR z) (IMPL (PREDCON in (VAR z) (VAR x)) (PREDCON in (VAR z) (VAR y))))"

[[functions]]
name = "singleton"
variables = ["x"]
definition = "(CLASS (VAR z) (PREDCON equal (VAR z) (VAR x)))"
"#;

const MAIN: &str = r#"
label = "main"

[imports]
s = "lib/sets.toml"

[[predicates]]
name = "equalSets"
variables = ["x", "y"]
definition = "(AND (PREDCON s.subclass (VAR x) (VAR y)) (PREDCON s.subclass (VAR y) (VAR x)))"

[[propositions]]
label = "subclass-reflexive"
formula = "(PREDCON s.subclass (VAR x) (VAR x))"

[[propositions]]
label = "equal-sets-symmetric"
formula = "(IMPL (PREDCON equalSets (VAR x) (VAR y)) (PREDCON equalSets (VAR y) (VAR x)))"

[[propositions]]
label = "singleton-of-empty"
formula = "(PREDCON in (FUNCON emptySet) (FUNCON s.singleton (FUNCON emptySet)))"
"#;

fn library_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("lib")).unwrap();
    write(&dir.path().join("lib"), "sets.toml", SETS);
    write(dir.path(), "main.toml", MAIN);
    dir
}

#[test]
fn load_follows_relative_imports() {
    let dir = library_dir();
    let library = DocumentLibrary::load(&dir.path().join("main.toml")).unwrap();
    assert_eq!(library.len(), 2);
    assert_eq!(library.root().label(), "main");
    assert_eq!(library.import("main", "s").as_deref(), Some("sets"));
    assert!(library.predicate_definition(Some("sets"), "subclass", 2).is_some());
    assert_eq!(library.root().propositions().len(), 3);
}

#[test]
fn check_document_from_disk() {
    let dir = library_dir();
    let library = DocumentLibrary::load(&dir.path().join("main.toml")).unwrap();
    let report = check_document(&library, &CheckerConfig::default());

    // The empty set is not a set in the one-entity model, so its singleton
    // is empty there.
    let singleton = &report.propositions[2];
    assert!(matches!(
        singleton.results[0].verdict,
        Verdict::Falsified { .. }
    ));
    assert!(singleton.results[1..].iter().all(|r| r.verdict.is_tautology()));

    assert!(report.propositions[0].is_tautology());
    assert!(report.propositions[1].is_tautology());
    assert_eq!(report.error_count(), 0);
    assert_eq!(report.falsified_count(), 1);
}

#[test]
fn shared_imports_are_loaded_once() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "sets.toml", SETS);
    write(
        dir.path(),
        "a.toml",
        "label = \"a\"\n[imports]\nsets = \"sets.toml\"\n",
    );
    let root = write(
        dir.path(),
        "root.toml",
        "label = \"root\"\n[imports]\na = \"a.toml\"\nsets = \"./sets.toml\"\n",
    );
    let library = DocumentLibrary::load(&root).unwrap();
    assert_eq!(library.len(), 3);
}

#[test]
fn import_cycles_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.toml",
        "label = \"a\"\n[imports]\nb = \"b.toml\"\n",
    );
    write(
        dir.path(),
        "b.toml",
        "label = \"b\"\n[imports]\na = \"a.toml\"\n",
    );
    let err = DocumentLibrary::load(&dir.path().join("a.toml")).unwrap_err();
    assert!(matches!(err, DocumentError::ImportCycle { .. }));
}

#[test]
fn duplicate_labels_across_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "one.toml", "label = \"same\"\n");
    let root = write(
        dir.path(),
        "two.toml",
        "label = \"same\"\n[imports]\none = \"one.toml\"\n",
    );
    let err = DocumentLibrary::load(&root).unwrap_err();
    assert!(matches!(err, DocumentError::DuplicateLabel { .. }));
}

#[test]
fn malformed_documents() {
    let dir = tempfile::tempdir().unwrap();
    let bad_toml = write(dir.path(), "bad.toml", "label = ");
    assert!(matches!(
        DocumentLibrary::load(&bad_toml).unwrap_err(),
        DocumentError::Parse { .. }
    ));

    let bad_formula = write(
        dir.path(),
        "formula.toml",
        "label = \"f\"\n[[propositions]]\nlabel = \"p\"\nformula = \"(AND (PREDVAR A)\"\n",
    );
    assert!(matches!(
        DocumentLibrary::load(&bad_formula).unwrap_err(),
        DocumentError::Element { .. }
    ));

    assert!(matches!(
        DocumentLibrary::load(&dir.path().join("missing.toml")).unwrap_err(),
        DocumentError::Io { .. }
    ));
}

#[test]
fn config_restricts_models() {
    let dir = library_dir();
    let library = DocumentLibrary::load(&dir.path().join("main.toml")).unwrap();
    let config = CheckerConfig {
        models: vec![ModelKind::Three],
        ..Default::default()
    };
    let report = check_document(&library, &config);
    assert!(report.is_clean());
    assert!(report.propositions.iter().all(|p| p.results.len() == 1));
}
