//! Path normalizer.
//!
//! File identities are root-relative, `/`-separated and start with `/`
//! (e.g. `/cards/news.json`). References inside documents are rewritten to
//! that form before resolution so included content keeps pointing at the
//! right files no matter where it ends up.
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, ErrorKind};
use crate::special::SpecialKey;
use crate::value::{Value, ValueKind};

/// Resolve `reference`, as written in `referencing_file`, to a file identity.
///
/// A leading `/` means "from the corpus root" when `allow_root_relative` is
/// set; otherwise the reference is always taken relative to the referencing
/// file's directory.
pub fn normalize_reference(
    reference: &str,
    referencing_file: &str,
    allow_root_relative: bool,
) -> Result<String, ErrorKind> {
    let mut segments: Vec<&str> = Vec::new();
    if !(allow_root_relative && reference.starts_with('/')) {
        segments.extend(parent_dir(referencing_file).split('/').filter(|s| !s.is_empty()));
    }
    for segment in reference.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                if segments.pop().is_none() {
                    return Err(ErrorKind::PathEscapesRoot { path: reference.to_string() });
                }
            }
            other => segments.push(other),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Directory part of a file identity: `/a/b.json` → `/a`, `/b.json` → `/`.
pub fn parent_dir(id: &str) -> &str {
    match id.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &id[..i],
    }
}

/// `/a/b` → `["/a/b", "/a", "/"]`.
pub fn ancestors(dir: &str) -> Vec<String> {
    let mut out = vec![];
    let mut current = dir.to_string();
    loop {
        out.push(current.clone());
        if current == "/" {
            break;
        }
        current = parent_dir(&current).to_string();
    }
    out
}

pub fn to_disk(root: &Path, id: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(id.split('/').filter(|s| !s.is_empty()));
    path
}

/// Inverse of [`to_disk`]; `None` for paths outside `root`.
pub fn file_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => (),
            _ => return None,
        }
    }
    Some(format!("/{}", parts.join("/")))
}

/// Copy `doc`, rewriting every path-valued special key to a file identity.
/// Escaping paths are reported and left untouched.
pub fn normalize_document(doc: &Value, file: &str, errors: &mut Vec<Error>) -> Value {
    let kind = match &doc.kind {
        ValueKind::Map(fields) => {
            let mut out = fields.clone();
            for (key, value) in out.iter_mut() {
                let special = SpecialKey::from_name(&key.name).filter(|s| s.is_path());
                *value = match (special, &value.kind) {
                    // a leading `/` in a document is root-relative
                    (Some(_), ValueKind::String(reference)) => {
                        match normalize_reference(reference, file, true) {
                            Ok(id) => Value::new(ValueKind::String(id), value.location.clone()),
                            Err(kind) => {
                                errors.push(Error::new(file, value.location.clone(), kind));
                                value.clone()
                            }
                        }
                    }
                    _ => normalize_document(value, file, errors),
                };
            }
            ValueKind::Map(out)
        }
        ValueKind::List(items) => {
            ValueKind::List(items.iter().map(|v| normalize_document(v, file, errors)).collect())
        }
        other => other.clone(),
    };
    Value::new(kind, doc.location.clone())
}
