// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # fincheck
//!
//! Decides whether first-order formulas over a set-theoretic signature are
//! tautologies in small finite models, by evaluating them under every
//! valuation of their subject, predicate and function variables.
//!
//! ## Architecture
//!
//! - **Elements** (`element`): formula and term trees read from s-expressions
//! - **Models** (`model`): finite universes with predicate and function pools,
//!   built-in constants and a comprehension rule
//! - **Interpreters** (`interpret`): odometer-style valuations of variables
//! - **Evaluation** (`eval`): recursive evaluation with scoped quantifier
//!   bindings and on-demand resolution of derived constants
//! - **Search** (`search`): the exhaustive tautology driver
//! - **Documents** (`document`, `check`): TOML documents of definitions and
//!   propositions, checked model by model
//!
//! ## Library usage
//!
//! ```
//! use fincheck::element::Element;
//! use fincheck::model::ModelKind;
//! use fincheck::search::is_tautology;
//!
//! let model = ModelKind::Three.build();
//! let formula = Element::parse("(OR (PREDVAR A (VAR x)) (NOT (PREDVAR A (VAR x))))").unwrap();
//! assert!(is_tautology(&model, &formula).unwrap());
//! ```

pub mod check;
pub mod config;
pub mod document;
pub mod element;
pub mod error;
pub mod eval;
pub mod interpret;
pub mod location;
pub mod model;
pub mod search;
pub mod variable;

pub use error::{FincheckError, FincheckResult};
