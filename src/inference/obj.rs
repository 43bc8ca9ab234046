use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use tracing::warn;

use super::Sample;
use crate::location::Location;
use crate::value::{Key, Value, ViewKey, ViewMap};

/// Everything observed about one logical view.
#[derive(Clone, Debug)]
pub struct ViewC {
    pub key: ViewKey,
    pub notes: Vec<String>,
    pub wrappers: BTreeSet<String>,
    pub locations: Vec<Location>,
    pub seen: u64,
    pub fields: IndexMap<String, FieldC>,
}

#[derive(Clone, Debug, Default)]
pub struct FieldC {
    pub occurrences: Vec<Occurrence>,
    pub non_null_in: u64,
}

/// One field value as written in one view occurrence.
#[derive(Clone, Debug)]
pub struct Occurrence {
    pub key: Key,
    pub value: Value,
    /// File whose resolution produced the enclosing view.
    pub file: String,
}

impl ViewC {
    pub fn new(key: ViewKey) -> Self {
        Self {
            key,
            notes: vec![],
            wrappers: BTreeSet::new(),
            locations: vec![],
            seen: 0,
            fields: IndexMap::new(),
        }
    }

    pub(super) fn observe(&mut self, location: &Location, view: &ViewMap) {
        if self.key.template != view.key.template && self.seen > 0 {
            warn!(
                view = %self.key,
                first = ?self.key.template,
                other = ?view.key.template,
                "view name shared by different templates"
            );
        }
        if self.key.template.is_none() {
            self.key = view.key.clone();
        }
        self.seen += 1;
        if location.is_known() && !self.locations.contains(location) {
            self.locations.push(location.clone());
        }
        if let Some(wrapper) = &view.wrapper {
            self.wrappers.insert(wrapper.clone());
        }
        if let Some(notes) = &view.notes {
            if !self.notes.contains(notes) {
                self.notes.push(notes.clone());
            }
        }
        for (key, value) in &view.fields {
            let field = self.fields.entry(key.name.clone()).or_default();
            if !value.is_null() {
                field.non_null_in += 1;
            }
            field.occurrences.push(Occurrence { key: key.clone(), value: value.clone(), file: view.file.clone() });
        }
    }

    /// Present and non-null in every occurrence of the view.
    pub fn is_required(&self, field: &FieldC) -> bool {
        field.non_null_in == self.seen
    }
}

impl FieldC {
    /// Unification input. An occurrence reached through several includers is
    /// the same declaration and is only counted once.
    pub fn samples(&self) -> Vec<Sample<'_>> {
        let mut declared: HashSet<&Location> = HashSet::new();
        self.occurrences
            .iter()
            .filter(|o| !o.key.location.is_known() || declared.insert(&o.key.location))
            .map(|o| Sample { value: &o.value, file: &o.file })
            .collect()
    }

    pub fn notes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = vec![];
        for o in &self.occurrences {
            if let Some(n) = o.key.notes.as_deref() {
                if !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    pub fn locations(&self) -> Vec<Location> {
        let set: BTreeSet<&Location> = self.occurrences.iter().map(|o| &o.key.location).filter(|l| l.is_known()).collect();
        set.into_iter().cloned().collect()
    }
}
