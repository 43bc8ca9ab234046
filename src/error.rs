//! Diagnostics. Every phase collects `Error`s instead of bailing, then the
//! orchestrator turns the batch into a single `PhaseError`.
use std::fmt;

use crate::location::Location;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("failed to read `{path}`: {message}")]
    Io { path: String, message: String },
    #[error("path `{path}` escapes the root directory")]
    PathEscapesRoot { path: String },
    #[error("referenced file `{path}` does not exist")]
    MissingReferencedFile { path: String },
    #[error("cyclic include of `{path}`")]
    CyclicInclude { path: String },
    #[error("lists cannot directly contain lists")]
    NestedListsUnsupported,
    #[error("field `{field}` of view `{view}` only ever holds empty lists")]
    EmptyList { view: String, field: String },
    #[error("ambiguous markers: {0}")]
    AmbiguousMarkerCombination(String),
    #[error("map has view attributes but neither a view name nor a template")]
    MissingViewIdentity,
    #[error("special key `{key}` must be {expected}")]
    InvalidSpecialValue { key: String, expected: &'static str },
    #[error("cannot infer extension of template `{path}`; no config declares `templateExtension`")]
    UnknownTemplateExtension { path: String },
    #[error("invalid config `{path}`: {message}")]
    InvalidConfig { path: String, message: String },
    #[error("field `{field}` of view `{view}` has both {}", join_categories(.categories))]
    InconsistentFieldType { view: String, field: String, categories: Vec<String> },
    #[error(
        "cannot infer delegate type of field `{field}` of view `{view}`; no view declares `{file}` as its wrapper"
    )]
    UnresolvableDelegate { view: String, field: String, file: String },
    #[error("no documents found under `{root}`")]
    EmptyCorpus { root: String },
}

fn join_categories(categories: &[String]) -> String {
    match categories.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}

/// An `ErrorKind` pinned to the file it is reported against and the node it
/// is about. `file` is the originating file, which differs from
/// `location.file` when the node was pulled in through an include.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub file: String,
    pub location: Location,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(file: &str, location: Location, kind: ErrorKind) -> Self {
        Self { file: file.to_string(), location, kind }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_known() {
            write!(f, "{}: {}", self.location, self.kind)?;
        } else {
            write!(f, "{}: {}", self.file, self.kind)?;
        }
        if self.location.file.as_deref().is_some_and(|lf| lf != self.file) {
            write!(f, " (while resolving {})", self.file)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Discover,
    Parse,
    Normalize,
    Resolve,
    Infer,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Discover => "discover",
            Phase::Parse => "parse",
            Phase::Normalize => "normalize",
            Phase::Resolve => "resolve",
            Phase::Infer => "infer",
        })
    }
}

/// Every error a phase produced, sorted by file then location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseError {
    pub phase: Phase,
    pub errors: Vec<Error>,
}

impl PhaseError {
    pub fn new(phase: Phase, mut errors: Vec<Error>) -> Self {
        errors.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.location.cmp(&b.location)));
        errors.dedup();
        Self { phase, errors }
    }

    /// Distinct files with at least one error.
    pub fn files(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.errors.iter().map(|e| e.file.as_str()).collect();
        out.dedup();
        out
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ErrorKind> {
        self.errors.iter().map(|e| &e.kind)
    }
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.errors.len();
        write!(
            f,
            "{} phase failed with {n} error{} in {} file{}",
            self.phase,
            if n == 1 { "" } else { "s" },
            self.files().len(),
            if self.files().len() == 1 { "" } else { "s" },
        )?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PhaseError {}
