//! Error types for schema loading and compilation

use std::fmt;

use thiserror::Error;

use crate::dmt::TypeName;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// A structural fault in a schema declaration.
///
/// These are schema-authoring mistakes. The compiler accumulates them and
/// reports all of them together; none of them stop the compile early.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("unresolved type reference '{name}' in type {referenced_by}{}", suggestion_suffix(.suggestion))]
    UnresolvedReference {
        name: TypeName,
        referenced_by: TypeName,
        suggestion: Option<TypeName>,
    },

    #[error("type {type_name}: kind '{kind}' is not supported")]
    UnsupportedKind { type_name: TypeName, kind: String },

    #[error("type {type_name}: unsupported form: {reason}")]
    UnsupportedForm { type_name: TypeName, reason: String },

    #[error("type {type_name}: invalid representation config: {reason}")]
    InvalidConfig { type_name: TypeName, reason: String },

    #[error("type name '{name}' is declared more than once")]
    DuplicateName { name: TypeName },
}

fn suggestion_suffix(suggestion: &Option<TypeName>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

impl CompileError {
    /// The type whose declaration carries the fault
    pub fn type_name(&self) -> &str {
        match self {
            Self::UnresolvedReference { referenced_by, .. } => referenced_by,
            Self::UnsupportedKind { type_name, .. }
            | Self::UnsupportedForm { type_name, .. }
            | Self::InvalidConfig { type_name, .. } => type_name,
            Self::DuplicateName { name } => name,
        }
    }

    /// The same fault, charged to another declared type
    pub(crate) fn reattributed(&self, owner: &str) -> Self {
        let mut error = self.clone();
        match &mut error {
            Self::UnresolvedReference { referenced_by, .. } => *referenced_by = owner.to_string(),
            Self::UnsupportedKind { type_name, .. }
            | Self::UnsupportedForm { type_name, .. }
            | Self::InvalidConfig { type_name, .. } => *type_name = owner.to_string(),
            Self::DuplicateName { .. } => {}
        }
        error
    }

    pub(crate) fn invalid_config(type_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_form(type_name: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedForm {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// The non-empty set of faults from a failed compile
#[derive(Debug, Clone, PartialEq)]
pub struct CompileErrors(Vec<CompileError>);

impl CompileErrors {
    /// Wrap accumulated errors; `None` when there are none
    pub fn new(errors: Vec<CompileError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a value built by `new`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The first error in report order
    pub fn first(&self) -> &CompileError {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.0.iter()
    }

    /// Errors attributed to one type
    pub fn for_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a CompileError> {
        self.0.iter().filter(move |e| e.type_name() == type_name)
    }

    pub fn into_vec(self) -> Vec<CompileError> {
        self.0
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema compilation failed with {} error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

impl IntoIterator for CompileErrors {
    type Item = CompileError;
    type IntoIter = std::vec::IntoIter<CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompileErrors {
    type Item = &'a CompileError;
    type IntoIter = std::slice::Iter<'a, CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors from the surfaces around the compiler (loading, config, CLI)
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at {path}: {message}")]
    Json { path: String, message: String },

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("{0}")]
    Compile(#[from] CompileErrors),
}

impl From<serde_path_to_error::Error<serde_json::Error>> for SchemaError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self::Json {
            path,
            message: err.into_inner().to_string(),
        }
    }
}
