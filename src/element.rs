//! Formula and term trees.
//!
//! An [`Element`] is either an atom (a name) or a list tagged with an operator.
//! Trees are produced by document loading and only read by the evaluator.
//! The recognized tags form the closed [`Operator`] set.
//!
//! The textual form is an s-expression, read with egg's `RecExpr<SymbolLang>`:
//!
//! ```
//! use fincheck::element::Element;
//!
//! let formula = Element::parse("(OR (PREDVAR A) (NOT (PREDVAR A)))").unwrap();
//! assert_eq!(formula.to_string(), "(OR (PREDVAR A) (NOT (PREDVAR A)))");
//! ```

use std::collections::BTreeSet;

use egg::{Id, RecExpr, SymbolLang};
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::variable::{FunctionVariable, PredicateVariable, SubjectVariable};

/// A node of a formula or term tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    Atom(String),
    List(ElementList),
}

/// A tagged list of child elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementList {
    pub operator: String,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn atom(name: impl Into<String>) -> Self {
        Element::Atom(name.into())
    }

    pub fn list(operator: impl Into<String>, children: Vec<Element>) -> Self {
        Element::List(ElementList {
            operator: operator.into(),
            children,
        })
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Element::Atom(name) => Some(name),
            Element::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ElementList> {
        match self {
            Element::Atom(_) => None,
            Element::List(list) => Some(list),
        }
    }

    /// Read an element from its s-expression form.
    ///
    /// A list without children cannot be written in this form: a node without
    /// children always reads as an atom.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let expr: RecExpr<SymbolLang> = text.parse().map_err(|e| DocumentError::Element {
            text: text.to_string(),
            message: format!("{e}"),
        })?;
        let nodes = expr.as_ref();
        if nodes.is_empty() {
            return Err(DocumentError::Element {
                text: text.to_string(),
                message: "empty expression".into(),
            });
        }
        Ok(Self::from_rec_expr(&expr, Id::from(nodes.len() - 1)))
    }

    /// Variables that occur in the tree outside the scope of any quantifier
    /// or class term binding them.
    pub fn free_variables(&self) -> FreeVariables {
        let mut free = FreeVariables::default();
        let mut bound = Vec::new();
        self.collect_free(&mut bound, &mut free);
        free
    }

    fn collect_free(&self, bound: &mut Vec<SubjectVariable>, free: &mut FreeVariables) {
        let Element::List(list) = self else {
            return;
        };
        let name = list.child(0).and_then(Element::as_atom);
        match (Operator::from_tag(&list.operator), name) {
            (Some(Operator::SubjectVariable), Some(name)) => {
                let variable = SubjectVariable::new(name);
                if !bound.contains(&variable) {
                    free.subjects.insert(variable);
                }
                return;
            }
            (Some(Operator::PredicateVariable), Some(name)) => {
                free.predicates.insert(PredicateVariable::new(name, list.len() - 1));
            }
            (Some(Operator::FunctionVariable), Some(name)) => {
                free.functions.insert(FunctionVariable::new(name, list.len() - 1));
            }
            (
                Some(
                    Operator::Universal
                    | Operator::Existential
                    | Operator::UniqueExistential
                    | Operator::Class,
                ),
                _,
            ) => {
                let variable = list
                    .child(0)
                    .and_then(Element::as_list)
                    .filter(|head| head.operator == Operator::SubjectVariable.tag())
                    .and_then(|head| head.child(0))
                    .and_then(Element::as_atom)
                    .map(SubjectVariable::new);
                if let Some(variable) = variable {
                    bound.push(variable);
                    for child in &list.children[1..] {
                        child.collect_free(bound, free);
                    }
                    bound.pop();
                    return;
                }
            }
            _ => {}
        }
        for child in &list.children {
            child.collect_free(bound, free);
        }
    }

    fn from_rec_expr(expr: &RecExpr<SymbolLang>, id: Id) -> Self {
        let node = &expr[id];
        if node.children.is_empty() {
            Element::atom(node.op.as_str())
        } else {
            Element::list(
                node.op.as_str(),
                node.children
                    .iter()
                    .map(|&child| Self::from_rec_expr(expr, child))
                    .collect(),
            )
        }
    }
}

impl ElementList {
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&Element> {
        self.children.get(index)
    }
}

/// The free variables of an [`Element`], by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeVariables {
    pub subjects: BTreeSet<SubjectVariable>,
    pub predicates: BTreeSet<PredicateVariable>,
    pub functions: BTreeSet<FunctionVariable>,
}

impl FreeVariables {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.predicates.is_empty() && self.functions.is_empty()
    }
}

impl std::str::FromStr for Element {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::parse(s)
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Atom(name) => write!(f, "{name}"),
            Element::List(list) => {
                write!(f, "({}", list.operator)?;
                for child in &list.children {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// The recognized list tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Conjunction,
    Disjunction,
    Implication,
    Equivalence,
    Negation,
    PredicateVariable,
    PredicateConstant,
    Universal,
    Existential,
    UniqueExistential,
    SubjectVariable,
    FunctionVariable,
    FunctionConstant,
    Class,
    ClassList,
}

impl Operator {
    pub const ALL: [Operator; 15] = [
        Self::Conjunction,
        Self::Disjunction,
        Self::Implication,
        Self::Equivalence,
        Self::Negation,
        Self::PredicateVariable,
        Self::PredicateConstant,
        Self::Universal,
        Self::Existential,
        Self::UniqueExistential,
        Self::SubjectVariable,
        Self::FunctionVariable,
        Self::FunctionConstant,
        Self::Class,
        Self::ClassList,
    ];

    /// Parse an operator from its list tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "AND" => Some(Self::Conjunction),
            "OR" => Some(Self::Disjunction),
            "IMPL" => Some(Self::Implication),
            "EQUI" => Some(Self::Equivalence),
            "NOT" => Some(Self::Negation),
            "PREDVAR" => Some(Self::PredicateVariable),
            "PREDCON" => Some(Self::PredicateConstant),
            "FORALL" => Some(Self::Universal),
            "EXISTS" => Some(Self::Existential),
            "EXISTSU" => Some(Self::UniqueExistential),
            "VAR" => Some(Self::SubjectVariable),
            "FUNVAR" => Some(Self::FunctionVariable),
            "FUNCON" => Some(Self::FunctionConstant),
            "CLASS" => Some(Self::Class),
            "CLASSLIST" => Some(Self::ClassList),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Conjunction => "AND",
            Self::Disjunction => "OR",
            Self::Implication => "IMPL",
            Self::Equivalence => "EQUI",
            Self::Negation => "NOT",
            Self::PredicateVariable => "PREDVAR",
            Self::PredicateConstant => "PREDCON",
            Self::Universal => "FORALL",
            Self::Existential => "EXISTS",
            Self::UniqueExistential => "EXISTSU",
            Self::SubjectVariable => "VAR",
            Self::FunctionVariable => "FUNVAR",
            Self::FunctionConstant => "FUNCON",
            Self::Class => "CLASS",
            Self::ClassList => "CLASSLIST",
        }
    }

    /// Whether this operator builds a formula (as opposed to a term).
    pub fn is_formula(self) -> bool {
        match self {
            Self::Conjunction
            | Self::Disjunction
            | Self::Implication
            | Self::Equivalence
            | Self::Negation
            | Self::PredicateVariable
            | Self::PredicateConstant
            | Self::Universal
            | Self::Existential
            | Self::UniqueExistential => true,
            Self::SubjectVariable
            | Self::FunctionVariable
            | Self::FunctionConstant
            | Self::Class
            | Self::ClassList => false,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}
