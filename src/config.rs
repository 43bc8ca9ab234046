//! Directory-scoped defaults.
//!
//! A `jsonviews.config.json` may sit in any directory. Each lookup walks from
//! the asking directory up to the corpus root and takes the first config
//! that sets the requested key, so a nested config can override one key
//! while inheriting the rest.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ErrorKind;
use crate::paths;

pub const CONFIG_FILE_NAME: &str = "jsonviews.config.json";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DirConfig {
    /// Extension appended to templates referenced without one.
    pub template_extension: Option<String>,
    /// Prepended to view names derived from template file names.
    pub name_prefix: Option<String>,
    /// Wrapper inherited by root views below this directory; relative to
    /// the config's own directory.
    pub wrapper: Option<String>,
}

#[derive(Clone, Debug)]
struct Loaded {
    id: String,
    config: DirConfig,
}

/// Per-corpus config cache, keyed by directory identity.
#[derive(Debug)]
pub struct Configs {
    root: PathBuf,
    by_dir: HashMap<String, Result<Option<Loaded>, ErrorKind>>,
}

impl Configs {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf(), by_dir: HashMap::new() }
    }

    pub fn template_extension(&mut self, dir: &str) -> Result<Option<String>, ErrorKind> {
        self.lookup(dir, |c| {
            c.config
                .template_extension
                .as_ref()
                .map(|ext| ext.trim_start_matches('.').to_string())
        })
    }

    pub fn name_prefix(&mut self, dir: &str) -> Result<Option<String>, ErrorKind> {
        self.lookup(dir, |c| c.config.name_prefix.clone())
    }

    /// Designated wrapper for `dir`, as a file identity.
    pub fn wrapper(&mut self, dir: &str) -> Result<Option<String>, ErrorKind> {
        let found = self.lookup(dir, |c| c.config.wrapper.clone().map(|w| (w, c.id.clone())))?;
        match found {
            None => Ok(None),
            Some((wrapper, config_id)) => paths::normalize_reference(&wrapper, &config_id, false).map(Some),
        }
    }

    fn lookup<T>(&mut self, dir: &str, pick: impl Fn(&Loaded) -> Option<T>) -> Result<Option<T>, ErrorKind> {
        for ancestor in paths::ancestors(dir) {
            if let Some(loaded) = self.load(&ancestor)? {
                if let Some(found) = pick(loaded) {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    fn load(&mut self, dir: &str) -> Result<Option<&Loaded>, ErrorKind> {
        if !self.by_dir.contains_key(dir) {
            let loaded = read_config(&self.root, dir);
            self.by_dir.insert(dir.to_string(), loaded);
        }
        match self.by_dir.get(dir) {
            Some(Ok(loaded)) => Ok(loaded.as_ref()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(None),
        }
    }
}

fn read_config(root: &Path, dir: &str) -> Result<Option<Loaded>, ErrorKind> {
    let id = if dir == "/" {
        format!("/{CONFIG_FILE_NAME}")
    } else {
        format!("{dir}/{CONFIG_FILE_NAME}")
    };
    let disk = paths::to_disk(root, &id);
    if !disk.is_file() {
        return Ok(None);
    }
    tracing::debug!(config = %id, "loading directory config");
    let source = std::fs::read_to_string(&disk)
        .map_err(|e| ErrorKind::Io { path: id.clone(), message: e.to_string() })?;
    let config = crate::path_de::from_str_with_path::<DirConfig>(&source)
        .map_err(|message| ErrorKind::InvalidConfig { path: id.clone(), message })?;
    Ok(Some(Loaded { id, config }))
}
