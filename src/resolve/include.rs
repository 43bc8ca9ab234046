use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

use super::{Chain, Resolver};
use crate::corpus::FetchError;
use crate::error::{Error, ErrorKind};
use crate::special::SpecialKey;
use crate::value::{Fields, Key, Value};

/// A map member together with the include chain it was introduced under.
#[derive(Clone, Debug)]
pub struct Entry {
    pub value: Value,
    pub chain: Chain,
}

pub type Entries = IndexMap<Key, Entry>;

fn entries(fields: &Fields, chain: &Chain) -> Entries {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), Entry { value: v.clone(), chain: chain.clone() }))
        .collect()
}

fn next_include(entries: &Entries) -> Option<usize> {
    entries
        .keys()
        .position(|k| SpecialKey::from_name(&k.name) == Some(SpecialKey::Include))
}

impl Resolver<'_> {
    /// Inline every include of this map, chained includes first-come.
    ///
    /// The included document fills the map and the includer's own keys are
    /// laid over it. Keys keep the position they had in the included
    /// document; keys only the includer has come after.
    pub(super) fn expand_includes(&mut self, fields: &Fields, chain: &Chain) -> Entries {
        let mut current = entries(fields, chain);
        while let Some(index) = next_include(&current) {
            let Some((key, entry)) = current.shift_remove_index(index) else { break };
            let Some(target) = entry.value.as_str() else {
                self.error(&entry.value.location, ErrorKind::InvalidSpecialValue {
                    key: key.name.clone(),
                    expected: "a path",
                });
                continue;
            };
            if entry.chain.contains(target) {
                self.error(&entry.value.location, ErrorKind::CyclicInclude { path: target.to_string() });
                continue;
            }
            let included = match self.corpus.fetch(target) {
                Ok(doc) => doc,
                Err(FetchError::Missing) => {
                    self.error(&entry.value.location, ErrorKind::MissingReferencedFile { path: target.to_string() });
                    continue;
                }
                Err(FetchError::Broken(errors)) => {
                    let file = self.file.clone();
                    self.errors.extend(errors.into_iter().map(|e| Error { file: file.clone(), ..e }));
                    continue;
                }
            };
            let Some(included) = included.as_map() else {
                trace!(file = %self.file, target, found = included.kind_name(), "include target is not a map");
                self.error(&entry.value.location, ErrorKind::InvalidSpecialValue {
                    key: key.name.clone(),
                    expected: "a path to a document whose root is a map",
                });
                continue;
            };
            trace!(file = %self.file, target, "inlining include");

            let mut chain = entry.chain.clone();
            chain.insert(target.to_string());
            // aliases collide: `_name` here overrides `_view` there
            let own_roles: HashSet<SpecialKey> = current.keys().filter_map(|k| SpecialKey::from_name(&k.name)).collect();
            let mut merged = Entries::with_capacity(included.len() + current.len());
            for (k, v) in included {
                if let Some((own_key, own)) = current.shift_remove_entry(k.as_str()) {
                    merged.insert(own_key, own);
                } else if SpecialKey::from_name(&k.name).is_some_and(|role| own_roles.contains(&role)) {
                    trace!(file = %self.file, key = %k, "overridden by includer");
                } else {
                    merged.insert(k.clone(), Entry { value: v.clone(), chain: chain.clone() });
                }
            }
            merged.extend(current);
            current = merged;
        }
        current
    }
}
