//! Rich diagnostic error types for the fincheck model checker.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Evaluation errors additionally carry the
//! [`Location`] breadcrumb of the node that failed.

use miette::Diagnostic;
use thiserror::Error;

use crate::location::Location;

/// Top-level error type for fincheck.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum FincheckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum EvalError {
    #[error("expected a formula list but found an atom at {location}")]
    #[diagnostic(
        code(fincheck::eval::wrong_calling_convention),
        help(
            "Formula and term positions must hold a tagged list such as `(PREDVAR A)`. \
             A bare atom is only valid as the name child of a list."
        )
    )]
    WrongCallingConvention { location: Location },

    #[error("unknown formula operator `{operator}` at {location}")]
    #[diagnostic(
        code(fincheck::eval::unknown_operator),
        help(
            "Formula operators are AND, OR, IMPL, EQUI, NOT, PREDVAR, PREDCON, \
             FORALL, EXISTS and EXISTSU. Term operators are not allowed in formula position."
        )
    )]
    UnknownOperator { operator: String, location: Location },

    #[error("unknown term operator `{operator}` at {location}")]
    #[diagnostic(
        code(fincheck::eval::unknown_term_operator),
        help(
            "Term operators are VAR, FUNVAR, FUNCON, CLASS and CLASSLIST. \
             Formula operators are not allowed in term position."
        )
    )]
    UnknownTermOperator { operator: String, location: Location },

    #[error("unknown predicate constant {name}/{arity} at {location}")]
    #[diagnostic(
        code(fincheck::eval::unknown_predicate_constant),
        help(
            "The model has no built-in semantics for this predicate and no definition \
             was found in the current document or its imports. Add a definition or \
             check the import prefix."
        )
    )]
    UnknownPredicateConstant {
        name: String,
        arity: usize,
        location: Location,
    },

    #[error("unknown function constant {name}/{arity} at {location}")]
    #[diagnostic(
        code(fincheck::eval::unknown_function_constant),
        help(
            "The model has no built-in semantics for this function and no definition \
             was found in the current document or its imports. Add a definition or \
             check the import prefix."
        )
    )]
    UnknownFunctionConstant {
        name: String,
        arity: usize,
        location: Location,
    },

    #[error("class construction needs the predicate constant isSet/1 at {location}")]
    #[diagnostic(
        code(fincheck::eval::missing_is_set),
        help(
            "CLASS and CLASSLIST only collect entities that are sets. Use a model that \
             provides `isSet`, or define it in the document."
        )
    )]
    MissingIsSetPredicate { location: Location },

    #[error("malformed element at {location}: {message}")]
    #[diagnostic(
        code(fincheck::eval::malformed),
        help("The element does not have the shape its operator requires.")
    )]
    Malformed { message: String, location: Location },

    #[error("{symbol} accepts {min}..={max} arguments but was given {actual} at {location}")]
    #[diagnostic(
        code(fincheck::eval::arity_mismatch),
        help("Check the number of arguments passed to this predicate or function.")
    )]
    ArityMismatch {
        symbol: String,
        min: usize,
        max: usize,
        actual: usize,
        location: Location,
    },

    #[error("variable binding failed at {location}: {source}")]
    #[diagnostic(
        code(fincheck::eval::binding),
        help(
            "A quantifier may not re-bind a variable that an enclosing quantifier \
             already binds. Rename the inner quantified variable."
        )
    )]
    Binding {
        #[source]
        source: BindingError,
        location: Location,
    },

    #[error("definition nesting exceeded {max_depth} levels at {location}")]
    #[diagnostic(
        code(fincheck::eval::definition_depth),
        help(
            "Derived constants kept expanding into further derived constants. \
             Check for a recursive definition, or raise `max_definition_depth`."
        )
    )]
    DefinitionDepthExceeded { max_depth: usize, location: Location },

    #[error("definition of {constant} uses the free variable {variable} at {location}")]
    #[diagnostic(
        code(fincheck::eval::open_definition),
        help(
            "A derived constant may only use its own parameters and variables its body \
             quantifies. Add the variable as a parameter or quantify it."
        )
    )]
    OpenDefinition {
        constant: String,
        variable: String,
        location: Location,
    },

    #[error("tautology search gave up after {limit} valuations")]
    #[diagnostic(
        code(fincheck::eval::iteration_limit),
        help("Raise `max_iterations`, or check the formula in a smaller model.")
    )]
    IterationLimitExceeded { limit: u64 },
}

impl EvalError {
    /// The breadcrumb of the failing node, when the error has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::WrongCallingConvention { location }
            | Self::UnknownOperator { location, .. }
            | Self::UnknownTermOperator { location, .. }
            | Self::UnknownPredicateConstant { location, .. }
            | Self::UnknownFunctionConstant { location, .. }
            | Self::MissingIsSetPredicate { location }
            | Self::Malformed { location, .. }
            | Self::ArityMismatch { location, .. }
            | Self::Binding { location, .. }
            | Self::DefinitionDepthExceeded { location, .. }
            | Self::OpenDefinition { location, .. } => Some(location),
            Self::IterationLimitExceeded { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Variable interpreter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BindingError {
    #[error("variable {variable} is already bound")]
    #[diagnostic(code(fincheck::binding::already_bound))]
    AlreadyBound { variable: String },

    #[error("cannot unbind {variable}: innermost quantified variable is {innermost}")]
    #[diagnostic(code(fincheck::binding::not_innermost))]
    NotInnermost { variable: String, innermost: String },

    #[error("cannot unbind {variable}: it is not bound by a quantifier")]
    #[diagnostic(code(fincheck::binding::not_bound))]
    NotBound { variable: String },

    #[error("entity index {index} is outside the model (size {size})")]
    #[diagnostic(code(fincheck::binding::out_of_range))]
    OutOfRange { index: usize, size: usize },

    #[error("the model offers no candidates for {variable}")]
    #[diagnostic(
        code(fincheck::binding::no_candidates),
        help("The model's candidate pool has no entry accepting this arity.")
    )]
    NoCandidates { variable: String },
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("model {name} has no entities")]
    #[diagnostic(
        code(fincheck::model::no_entities),
        help("A finite model needs at least one entity to quantify over.")
    )]
    NoEntities { name: String },

    #[error("unknown model: {label}")]
    #[diagnostic(
        code(fincheck::model::unknown),
        help("Built-in models are: unary, three, four.")
    )]
    UnknownModel { label: String },
}

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("cannot read document {path}: {source}")]
    #[diagnostic(
        code(fincheck::document::io),
        help("Check that the document path exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document {path}: {message}")]
    #[diagnostic(
        code(fincheck::document::parse),
        help(
            "A document is TOML with `label`, optional `[imports]`, and \
             `[[predicates]]`, `[[functions]]`, `[[propositions]]` tables."
        )
    )]
    Parse { path: String, message: String },

    #[error("invalid s-expression `{text}`: {message}")]
    #[diagnostic(
        code(fincheck::document::element),
        help("Elements are written as s-expressions, e.g. `(NOT (PREDVAR A))`.")
    )]
    Element { text: String, message: String },

    #[error("document label {label} is used by both {first} and {second}")]
    #[diagnostic(
        code(fincheck::document::duplicate_label),
        help("Every document in a library needs a distinct label.")
    )]
    DuplicateLabel {
        label: String,
        first: String,
        second: String,
    },

    #[error("import cycle through {path}")]
    #[diagnostic(
        code(fincheck::document::import_cycle),
        help("Documents may not import themselves, directly or transitively.")
    )]
    ImportCycle { path: String },

    #[error("definition of {constant} uses the free variable {variable}")]
    #[diagnostic(
        code(fincheck::document::open_definition),
        help(
            "A derived constant may only use its own parameters and variables its body \
             quantifies. Add the variable as a parameter or quantify it."
        )
    )]
    OpenDefinition { constant: String, variable: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    #[diagnostic(
        code(fincheck::config::read),
        help("Check that the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write config {path}: {source}")]
    #[diagnostic(
        code(fincheck::config::write),
        help("Check that the target directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    #[diagnostic(
        code(fincheck::config::parse),
        help("The config is TOML; see `CheckerConfig` for the accepted fields.")
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for evaluation results.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Convenience alias for functions returning fincheck results.
pub type FincheckResult<T> = std::result::Result<T, FincheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_error_converts_to_top_level() {
        let err = EvalError::MissingIsSetPredicate {
            location: Location::root(),
        };
        let top: FincheckError = err.into();
        assert!(matches!(
            top,
            FincheckError::Eval(EvalError::MissingIsSetPredicate { .. })
        ));
    }

    #[test]
    fn error_messages_name_the_constant() {
        let err = EvalError::UnknownPredicateConstant {
            name: "subclass".into(),
            arity: 2,
            location: Location::root().child(1),
        };
        let msg = format!("{err}");
        assert!(msg.contains("subclass/2"));
        assert!(msg.contains("/1"));
    }

    #[test]
    fn iteration_limit_has_no_location() {
        let err = EvalError::IterationLimitExceeded { limit: 10 };
        assert!(err.location().is_none());
    }
}
