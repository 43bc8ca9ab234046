//! Directory orchestrator.
//!
//! A `Corpus` is the explicit context every phase runs against: it owns the
//! file cache (path → parsed / normalized / resolved document) and the config
//! cache, so independent runs never share state. Phases run strictly in
//! order and each one reports all of its errors at once:
//!
//! discover → parse → normalize → resolve → (infer)
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::config::{CONFIG_FILE_NAME, Configs};
use crate::error::{Error, ErrorKind, Phase, PhaseError};
use crate::location::Location;
use crate::paths;
use crate::value::{Value, ValueKind};

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Files matching any of these (root-relative, no leading `/`) are not
    /// discovered. They can still be included.
    pub ignore: Vec<glob::Pattern>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub value: Value,
    pub errors: Vec<Error>,
}

#[derive(Debug, Default)]
pub struct SourceFile {
    /// Found by discovery, as opposed to loaded because something included it.
    pub discovered: bool,
    pub parsed: Option<Value>,
    pub normalized: Option<Value>,
    pub resolved: Option<Resolution>,
}

pub(crate) enum FetchError {
    Missing,
    Broken(Vec<Error>),
}

#[derive(Debug)]
pub struct Corpus {
    root: PathBuf,
    options: Options,
    files: BTreeMap<String, SourceFile>,
    configs: Configs,
}

impl Corpus {
    pub fn new(root: impl Into<PathBuf>, options: Options) -> Self {
        let root = root.into();
        let configs = Configs::new(&root);
        Self { root, options, files: BTreeMap::new(), configs }
    }

    /// Run every phase and unify the result.
    pub fn build(root: impl Into<PathBuf>, options: Options) -> Result<crate::ir::Model, PhaseError> {
        let mut corpus = Self::new(root, options);
        corpus.discover()?;
        corpus.parse_all()?;
        corpus.normalize_all()?;
        corpus.resolve_all()?;
        crate::inference::infer(&corpus.views())
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Identities of discovered files, sorted.
    pub fn discovered(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|(_, f)| f.discovered)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn file(&self, id: &str) -> Option<&SourceFile> { self.files.get(id) }

    pub(crate) fn configs(&mut self) -> &mut Configs { &mut self.configs }

    // ----------------------------- Phases -------------------------------- //

    pub fn discover(&mut self) -> Result<(), PhaseError> {
        let mut errors = vec![];
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                    errors.push(Error::new(
                        &path,
                        Location::unknown(),
                        ErrorKind::Io { path: path.clone(), message: err.to_string() },
                    ));
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().is_none_or(|ext| ext != "json")
                || entry.file_name() == CONFIG_FILE_NAME
            {
                continue;
            }
            let Some(id) = paths::file_id(&self.root, path) else { continue };
            if self.options.ignore.iter().any(|p| p.matches(&id[1..])) {
                trace!(file = %id, "ignored");
                continue;
            }
            self.files.entry(id).or_default().discovered = true;
        }
        if errors.is_empty() && self.files.is_empty() {
            let root = self.root.display().to_string();
            errors.push(Error::new(&root, Location::unknown(), ErrorKind::EmptyCorpus { root: root.clone() }));
        }
        info!(files = self.files.len(), root = %self.root.display(), "discovered documents");
        check(Phase::Discover, errors)
    }

    pub fn parse_all(&mut self) -> Result<(), PhaseError> {
        let mut errors = vec![];
        let ids: Vec<String> = self.discovered().into_iter().map(String::from).collect();
        for id in ids {
            if let Err(err) = self.parse_file(&id) {
                errors.push(err);
            }
        }
        check(Phase::Parse, errors)
    }

    pub fn normalize_all(&mut self) -> Result<(), PhaseError> {
        let mut errors = vec![];
        let ids: Vec<String> = self.discovered().into_iter().map(String::from).collect();
        for id in ids {
            errors.extend(self.normalize_file(&id));
        }
        check(Phase::Normalize, errors)
    }

    pub fn resolve_all(&mut self) -> Result<(), PhaseError> {
        let mut errors = vec![];
        let ids: Vec<String> = self.discovered().into_iter().map(String::from).collect();
        for id in ids {
            if let Some(resolution) = self.resolve_file(&id) {
                errors.extend(resolution.errors.iter().cloned());
            }
        }
        check(Phase::Resolve, errors)
    }

    // ---------------------------- Per file ------------------------------- //

    fn parse_file(&mut self, id: &str) -> Result<(), Error> {
        if self.files.get(id).is_some_and(|f| f.parsed.is_some()) {
            return Ok(());
        }
        let disk = paths::to_disk(&self.root, id);
        let source = std::fs::read_to_string(&disk).map_err(|e| {
            Error::new(id, Location::file(id), ErrorKind::Io { path: id.to_string(), message: e.to_string() })
        })?;
        let value = crate::parser::parse_document(id, &source)?;
        debug!(file = %id, "parsed");
        self.files.entry(id.to_string()).or_default().parsed = Some(value);
        Ok(())
    }

    fn normalize_file(&mut self, id: &str) -> Vec<Error> {
        let mut errors = vec![];
        let Some(file) = self.files.get_mut(id) else { return errors };
        if file.normalized.is_some() {
            return errors;
        }
        if let Some(parsed) = &file.parsed {
            file.normalized = Some(paths::normalize_document(parsed, id, &mut errors));
        }
        errors
    }

    /// Resolve one file, memoized. `None` if the file has not been normalized.
    pub fn resolve_file(&mut self, id: &str) -> Option<&Resolution> {
        let cached = self.files.get(id).is_some_and(|f| f.resolved.is_some());
        if !cached {
            let doc = self.files.get(id)?.normalized.clone()?;
            debug!(file = %id, "resolving");
            let resolution = crate::resolve::resolve_document(self, id, &doc);
            if let Some(file) = self.files.get_mut(id) {
                file.resolved = Some(resolution);
            }
        }
        self.files.get(id)?.resolved.as_ref()
    }

    /// Normalized, unresolved document for an include target. Files outside
    /// the discovered set are loaded on first use.
    pub(crate) fn fetch(&mut self, id: &str) -> Result<Value, FetchError> {
        if !self.files.contains_key(id) {
            if !paths::to_disk(&self.root, id).is_file() {
                return Err(FetchError::Missing);
            }
            trace!(file = %id, "loading include target on demand");
        }
        self.parse_file(id).map_err(|e| FetchError::Broken(vec![e]))?;
        let errors = self.normalize_file(id);
        if !errors.is_empty() {
            // every includer gets to see these
            if let Some(file) = self.files.get_mut(id) {
                file.normalized = None;
            }
            return Err(FetchError::Broken(errors));
        }
        self.files
            .get(id)
            .and_then(|f| f.normalized.clone())
            .ok_or(FetchError::Missing)
    }

    pub(crate) fn exists(&self, id: &str) -> bool {
        self.files.contains_key(id) || paths::to_disk(&self.root, id).is_file()
    }

    // ---------------------------- Flatten -------------------------------- //

    /// Every view occurrence in every resolved discovered file, nested ones
    /// included, in file order. Each item is a `ValueKind::View`.
    pub fn views(&self) -> Vec<&Value> {
        let mut out = vec![];
        for file in self.files.values().filter(|f| f.discovered) {
            if let Some(resolution) = &file.resolved {
                collect_views(&resolution.value, &mut out);
            }
        }
        out
    }
}

fn collect_views<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match &value.kind {
        ValueKind::View(view) => {
            out.push(value);
            for member in view.fields.values() {
                collect_views(member, out);
            }
        }
        ValueKind::List(items) => items.iter().for_each(|v| collect_views(v, out)),
        ValueKind::Map(fields) => fields.values().for_each(|v| collect_views(v, out)),
        _ => (),
    }
}

fn check(phase: Phase, errors: Vec<Error>) -> Result<(), PhaseError> {
    if errors.is_empty() {
        debug!(%phase, "phase complete");
        Ok(())
    } else {
        Err(PhaseError::new(phase, errors))
    }
}
