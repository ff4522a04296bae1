//! Documents: labelled collections of definitions and propositions.
//!
//! A document is written in TOML:
//!
//! ```toml
//! label = "sets"
//!
//! [imports]
//! base = "base.toml"
//!
//! [[predicates]]
//! name = "subclass"
//! variables = ["x", "y"]
//! definition = "(FORALL (VAR z) (IMPL (PREDCON in (VAR z) (VAR x)) (PREDCON in (VAR z) (VAR y))))"
//!
//! [[propositions]]
//! label = "subclass-reflexive"
//! formula = "(PREDCON subclass (VAR x) (VAR x))"
//! ```
//!
//! Import paths are relative to the importing file. Inside a document the
//! constant `base.name` refers to `name` as defined in the document imported
//! under the prefix `base`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::element::Element;
use crate::error::DocumentError;
use crate::variable::SubjectVariable;

/// Cache key of a constant defined in `document`.
pub fn qualify(document: Option<&str>, name: &str) -> String {
    match document {
        Some(document) => format!("{document}::{name}"),
        None => name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// The body of a derived constant over its parameter variables.
///
/// A predicate definition's body is a formula; a function definition's body
/// is a term.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// Document the body's own references resolve in.
    pub document: Option<String>,
    pub name: String,
    pub variables: Vec<SubjectVariable>,
    pub body: Element,
}

impl Definition {
    pub fn new(
        document: Option<String>,
        name: impl Into<String>,
        variables: Vec<SubjectVariable>,
        body: Element,
    ) -> Self {
        Self {
            document,
            name: name.into(),
            variables,
            body,
        }
    }

    /// Like [`Definition::new`], but rejects a body that uses any variable
    /// other than `variables` and the ones it quantifies itself.
    pub fn closed(
        document: Option<String>,
        name: impl Into<String>,
        variables: Vec<SubjectVariable>,
        body: Element,
    ) -> Result<Self, DocumentError> {
        let definition = Self::new(document, name, variables, body);
        match definition.free_variable() {
            Some(variable) => Err(DocumentError::OpenDefinition {
                constant: format!("{}/{}", definition.qualified_name(), definition.arity()),
                variable,
            }),
            None => Ok(definition),
        }
    }

    /// A variable of the body that is neither a parameter nor quantified.
    pub fn free_variable(&self) -> Option<String> {
        let free = self.body.free_variables();
        free.subjects
            .iter()
            .find(|v| !self.variables.contains(v))
            .map(ToString::to_string)
            .or_else(|| free.predicates.first().map(ToString::to_string))
            .or_else(|| free.functions.first().map(ToString::to_string))
    }

    pub fn arity(&self) -> usize {
        self.variables.len()
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.document.as_deref(), &self.name)
    }
}

/// Where derived constants are looked up.
pub trait DefinitionSource: Send + Sync {
    /// Label of the document that `document` imports under `prefix`.
    fn import(&self, document: &str, prefix: &str) -> Option<String>;

    fn predicate_definition(
        &self,
        document: Option<&str>,
        name: &str,
        arity: usize,
    ) -> Option<Arc<Definition>>;

    fn function_definition(
        &self,
        document: Option<&str>,
        name: &str,
        arity: usize,
    ) -> Option<Arc<Definition>>;
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A labelled formula to check.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposition {
    pub label: String,
    pub formula: Element,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    label: String,
    /// prefix → document label
    imports: BTreeMap<String, String>,
    predicates: HashMap<(String, usize), Arc<Definition>>,
    functions: HashMap<(String, usize), Arc<Definition>>,
    propositions: Vec<Proposition>,
}

impl Document {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Make the document labelled `document` reachable as `prefix.name`.
    pub fn import(mut self, prefix: impl Into<String>, document: impl Into<String>) -> Self {
        self.imports.insert(prefix.into(), document.into());
        self
    }

    /// Add a predicate definition whose body is parsed from `definition`.
    pub fn predicate(
        mut self,
        name: &str,
        variables: &[&str],
        definition: &str,
    ) -> Result<Self, DocumentError> {
        let definition = self.definition(name, variables, definition)?;
        self.predicates
            .insert((name.to_string(), variables.len()), Arc::new(definition));
        Ok(self)
    }

    /// Add a function definition whose body is parsed from `definition`.
    pub fn function(
        mut self,
        name: &str,
        variables: &[&str],
        definition: &str,
    ) -> Result<Self, DocumentError> {
        let definition = self.definition(name, variables, definition)?;
        self.functions
            .insert((name.to_string(), variables.len()), Arc::new(definition));
        Ok(self)
    }

    pub fn proposition(mut self, label: &str, formula: &str) -> Result<Self, DocumentError> {
        if self.propositions.iter().any(|p| p.label == label) {
            return Err(DocumentError::DuplicateLabel {
                label: label.to_string(),
                first: self.label.clone(),
                second: self.label.clone(),
            });
        }
        self.propositions.push(Proposition {
            label: label.to_string(),
            formula: Element::parse(formula)?,
        });
        Ok(self)
    }

    fn definition(
        &self,
        name: &str,
        variables: &[&str],
        definition: &str,
    ) -> Result<Definition, DocumentError> {
        Definition::closed(
            Some(self.label.clone()),
            name,
            variables.iter().map(|v| SubjectVariable::new(*v)).collect(),
            Element::parse(definition)?,
        )
    }

    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports.iter().map(|(p, d)| (p.as_str(), d.as_str()))
    }

    pub fn propositions(&self) -> &[Proposition] {
        &self.propositions
    }

    pub fn predicate_definition(&self, name: &str, arity: usize) -> Option<&Arc<Definition>> {
        self.predicates.get(&(name.to_string(), arity))
    }

    pub fn function_definition(&self, name: &str, arity: usize) -> Option<&Arc<Definition>> {
        self.functions.get(&(name.to_string(), arity))
    }

    pub fn definition_count(&self) -> usize {
        self.predicates.len() + self.functions.len()
    }
}

// ---------------------------------------------------------------------------
// On-disk format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentFile {
    label: String,
    #[serde(default)]
    imports: BTreeMap<String, PathBuf>,
    #[serde(default)]
    predicates: Vec<DefinitionEntry>,
    #[serde(default)]
    functions: Vec<DefinitionEntry>,
    #[serde(default)]
    propositions: Vec<PropositionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionEntry {
    name: String,
    #[serde(default)]
    variables: Vec<String>,
    definition: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropositionEntry {
    label: String,
    formula: String,
}

impl DocumentFile {
    /// Everything but the imports, which the loader resolves to labels.
    fn into_document(self) -> Result<Document, DocumentError> {
        let mut document = Document::new(self.label);
        for entry in self.predicates {
            let variables: Vec<&str> = entry.variables.iter().map(String::as_str).collect();
            document = document.predicate(&entry.name, &variables, &entry.definition)?;
        }
        for entry in self.functions {
            let variables: Vec<&str> = entry.variables.iter().map(String::as_str).collect();
            document = document.function(&entry.name, &variables, &entry.definition)?;
        }
        for entry in self.propositions {
            document = document.proposition(&entry.label, &entry.formula)?;
        }
        Ok(document)
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// A root document together with every document it transitively imports.
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    root: String,
    documents: HashMap<String, Document>,
}

impl DocumentLibrary {
    pub fn new(root: Document) -> Self {
        let label = root.label.clone();
        Self {
            root: label.clone(),
            documents: HashMap::from([(label, root)]),
        }
    }

    /// Add a document that others may import by label.
    pub fn insert(&mut self, document: Document) -> Result<(), DocumentError> {
        if self.documents.contains_key(&document.label) {
            return Err(DocumentError::DuplicateLabel {
                label: document.label.clone(),
                first: document.label.clone(),
                second: document.label,
            });
        }
        self.documents.insert(document.label.clone(), document);
        Ok(())
    }

    /// Load `path` and, recursively, everything it imports.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let mut loader = Loader::default();
        let root = loader.load(path)?;
        tracing::info!(
            root = %root,
            documents = loader.documents.len(),
            "loaded document library"
        );
        Ok(Self {
            root,
            documents: loader.documents,
        })
    }

    pub fn root(&self) -> &Document {
        &self.documents[&self.root]
    }

    pub fn get(&self, label: &str) -> Option<&Document> {
        self.documents.get(label)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DefinitionSource for DocumentLibrary {
    fn import(&self, document: &str, prefix: &str) -> Option<String> {
        self.documents.get(document)?.imports.get(prefix).cloned()
    }

    fn predicate_definition(
        &self,
        document: Option<&str>,
        name: &str,
        arity: usize,
    ) -> Option<Arc<Definition>> {
        self.documents
            .get(document?)?
            .predicate_definition(name, arity)
            .cloned()
    }

    fn function_definition(
        &self,
        document: Option<&str>,
        name: &str,
        arity: usize,
    ) -> Option<Arc<Definition>> {
        self.documents
            .get(document?)?
            .function_definition(name, arity)
            .cloned()
    }
}

/// Depth-first import walk.
#[derive(Default)]
struct Loader {
    documents: HashMap<String, Document>,
    /// label → file it came from
    origins: HashMap<String, PathBuf>,
    /// canonical path → label, for files already loaded
    loaded: HashMap<PathBuf, String>,
    in_progress: HashSet<PathBuf>,
}

impl Loader {
    fn load(&mut self, path: &Path) -> Result<String, DocumentError> {
        let canonical = path.canonicalize().map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if let Some(label) = self.loaded.get(&canonical) {
            return Ok(label.clone());
        }
        if !self.in_progress.insert(canonical.clone()) {
            return Err(DocumentError::ImportCycle {
                path: path.display().to_string(),
            });
        }

        let text = std::fs::read_to_string(&canonical).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut file: DocumentFile = toml::from_str(&text).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let imports = std::mem::take(&mut file.imports);
        let mut document = file.into_document()?;
        tracing::debug!(
            label = %document.label,
            path = %path.display(),
            "parsed document"
        );

        let directory = canonical.parent().unwrap_or(Path::new("."));
        for (prefix, relative) in imports {
            let label = self.load(&directory.join(relative))?;
            document = document.import(prefix, label);
        }

        if let Some(first) = self.origins.get(&document.label) {
            return Err(DocumentError::DuplicateLabel {
                label: document.label.clone(),
                first: first.display().to_string(),
                second: path.display().to_string(),
            });
        }

        self.in_progress.remove(&canonical);
        self.loaded.insert(canonical, document.label.clone());
        self.origins
            .insert(document.label.clone(), path.to_path_buf());
        let label = document.label.clone();
        self.documents.insert(label.clone(), document);
        Ok(label)
    }
}
