//! Reference resolver.
//!
//! Runs once per file over its normalized tree and builds a new tree where
//! every view position is classified: `View`, `Delegate`, `Abstract`, or a
//! plain `Map`. Errors are collected against the file being resolved (even
//! when the offending node was pulled in from another file) and never stop
//! the walk.
pub mod include;
pub mod view_key;

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::corpus::{Corpus, Resolution};
use crate::error::{Error, ErrorKind};
use crate::location::Location;
use crate::paths;
use crate::special::{self, SpecialKey};
use crate::value::{AbstractMap, DelegateMap, Fields, Key, Value, ValueKind, ViewMap};

pub use view_key::upper_camel;

/// Include targets visited on the way to a node. Cloned, never shared,
/// whenever the walk branches.
pub type Chain = BTreeSet<String>;

pub fn resolve_document(corpus: &mut Corpus, file: &str, doc: &Value) -> Resolution {
    let mut resolver = Resolver { corpus, file: file.to_string(), errors: vec![] };
    let chain = Chain::from([file.to_string()]);
    let value = resolver.resolve_value(doc, &chain, true);
    Resolution { value, errors: resolver.errors }
}

pub(crate) struct Resolver<'a> {
    corpus: &'a mut Corpus,
    file: String,
    errors: Vec<Error>,
}

/// Special keys pulled out of a map, in the order they are consulted.
#[derive(Default)]
struct Specials {
    by_role: HashMap<SpecialKey, (Key, Value)>,
    field_notes: Vec<(String, Key, Value)>,
}

impl Specials {
    fn take(&mut self, role: SpecialKey) -> Option<(Key, Value)> {
        self.by_role.remove(&role)
    }

    fn has_view_attributes(&self) -> bool {
        !self.field_notes.is_empty() || self.by_role.keys().any(|k| k.is_view_attribute())
    }
}

impl Resolver<'_> {
    fn error(&mut self, location: &Location, kind: ErrorKind) {
        self.errors.push(Error::new(&self.file, location.clone(), kind));
    }

    fn resolve_value(&mut self, value: &Value, chain: &Chain, root: bool) -> Value {
        match &value.kind {
            ValueKind::Map(fields) => self.resolve_map(value, fields, chain, root),
            ValueKind::List(items) => self.resolve_list(value, items, chain, root),
            _ => value.clone(),
        }
    }

    fn resolve_list(&mut self, list: &Value, items: &[Value], chain: &Chain, root: bool) -> Value {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let resolved = self.resolve_value(item, chain, root);
            if matches!(resolved.kind, ValueKind::List(_)) {
                self.error(&item.location, ErrorKind::NestedListsUnsupported);
            }
            out.push(resolved);
        }
        Value::new(ValueKind::List(out), list.location.clone())
    }

    fn resolve_map(&mut self, map: &Value, fields: &Fields, chain: &Chain, root: bool) -> Value {
        let entries = self.expand_includes(fields, chain);
        let total = entries.len();

        let mut specials = Specials::default();
        let mut members = include::Entries::new();
        for (key, entry) in entries {
            if let Some(role) = SpecialKey::from_name(&key.name) {
                if specials.by_role.contains_key(&role) {
                    warn!(file = %self.file, key = %key, role = role.canonical(), "duplicate special key ignored");
                    continue;
                }
                specials.by_role.insert(role, (key, entry.value));
            } else if let Some(target) = special::field_notes_target(&key.name) {
                specials.field_notes.push((target.to_string(), key.clone(), entry.value));
            } else if special::is_special(&key.name) {
                warn!(file = %self.file, key = %key, at = %key.location, "dropping unknown special key");
            } else {
                members.insert(key, entry);
            }
        }

        // 1. placeholders
        let delegate = specials.take(SpecialKey::Delegate);
        let abstract_ = specials.take(SpecialKey::Abstract);
        if delegate.is_some() || abstract_.is_some() {
            return self.placeholder(map, delegate, abstract_, total);
        }

        // 2. views
        let name = specials.take(SpecialKey::ViewName);
        let template = specials.take(SpecialKey::Template);
        if name.is_none() && template.is_none() {
            if specials.has_view_attributes() {
                self.error(&map.location, ErrorKind::MissingViewIdentity);
            }
            return self.plain_map(map, members);
        }
        let Some(key) = self.view_key(name, template) else {
            return self.plain_map(map, members);
        };

        // notes
        let notes = specials
            .take(SpecialKey::Notes)
            .and_then(|(k, v)| self.notes_text(&k, &v));
        let mut field_notes: HashMap<String, String> = HashMap::new();
        for (target, key, value) in std::mem::take(&mut specials.field_notes) {
            if !members.contains_key(target.as_str()) {
                warn!(file = %self.file, key = %key, "notes for a field this view does not have");
                continue;
            }
            if let Some(text) = self.notes_text(&key, &value) {
                field_notes.insert(target, text);
            }
        }

        // member recursion, non-root from here down
        let mut resolved = Fields::new();
        for (mut member, entry) in members {
            member.notes = field_notes.remove(&member.name);
            let value = self.resolve_value(&entry.value, &entry.chain, false);
            resolved.insert(member, value);
        }

        let wrapper = match specials.take(SpecialKey::Wrapper) {
            Some((k, v)) => self.explicit_wrapper(&k, &v),
            None if root && !resolved.values().any(Value::contains_delegate) => {
                self.inherited_wrapper(&map.location)
            }
            None => None,
        };

        let view = ViewMap {
            key,
            wrapper,
            notes,
            fields: resolved,
            file: self.file.clone(),
        };
        Value::new(ValueKind::View(view), map.location.clone())
    }

    fn placeholder(
        &mut self,
        map: &Value,
        delegate: Option<(Key, Value)>,
        abstract_: Option<(Key, Value)>,
        total: usize,
    ) -> Value {
        let both = delegate.is_some() && abstract_.is_some();
        if both {
            self.error(
                &map.location,
                ErrorKind::AmbiguousMarkerCombination("a map cannot be both `_delegate` and `_abstract`".into()),
            );
        }
        let markers = if both { 2 } else { 1 };
        if total > markers {
            self.error(
                &map.location,
                ErrorKind::AmbiguousMarkerCombination(
                    "`_delegate`/`_abstract` must be the only key in its map".into(),
                ),
            );
        }
        if let Some((key, _)) = delegate {
            let file = key.location.file.clone().unwrap_or_else(|| self.file.clone());
            return Value::new(ValueKind::Delegate(DelegateMap { file }), map.location.clone());
        }
        let name = match abstract_ {
            Some((key, value)) => match &value.kind {
                ValueKind::String(s) if !s.trim().is_empty() => Some(s.clone()),
                ValueKind::Bool(true) => None,
                _ => {
                    self.error(&value.location, ErrorKind::InvalidSpecialValue {
                        key: key.name.clone(),
                        expected: "`true` or an extension point name",
                    });
                    None
                }
            },
            None => None,
        };
        Value::new(ValueKind::Abstract(AbstractMap { name }), map.location.clone())
    }

    /// A map that is not a view keeps its members as written; only view
    /// positions get their members resolved. List nesting is still checked
    /// all the way down.
    fn plain_map(&mut self, map: &Value, members: include::Entries) -> Value {
        for entry in members.values() {
            self.check_nesting(&entry.value);
        }
        let fields: Fields = members.into_iter().map(|(k, e)| (k, e.value)).collect();
        Value::new(ValueKind::Map(fields), map.location.clone())
    }

    fn check_nesting(&mut self, value: &Value) {
        match &value.kind {
            ValueKind::List(items) => {
                for item in items {
                    if matches!(item.kind, ValueKind::List(_)) {
                        self.error(&item.location, ErrorKind::NestedListsUnsupported);
                    }
                    self.check_nesting(item);
                }
            }
            ValueKind::Map(fields) => {
                for member in fields.values() {
                    self.check_nesting(member);
                }
            }
            _ => (),
        }
    }

    fn notes_text(&mut self, key: &Key, value: &Value) -> Option<String> {
        match value.as_str() {
            Some(text) => Some(text.to_string()),
            None => {
                self.error(&value.location, ErrorKind::InvalidSpecialValue {
                    key: key.name.clone(),
                    expected: "a string",
                });
                None
            }
        }
    }

    fn explicit_wrapper(&mut self, key: &Key, value: &Value) -> Option<String> {
        let Some(id) = value.as_str() else {
            self.error(&value.location, ErrorKind::InvalidSpecialValue {
                key: key.name.clone(),
                expected: "a path",
            });
            return None;
        };
        if !self.corpus.exists(id) {
            self.error(&value.location, ErrorKind::MissingReferencedFile { path: id.to_string() });
            return None;
        }
        Some(id.to_string())
    }

    /// Wrapper designated by the nearest config above this file.
    fn inherited_wrapper(&mut self, at: &Location) -> Option<String> {
        let dir = paths::parent_dir(&self.file).to_string();
        match self.corpus.configs().wrapper(&dir) {
            Ok(Some(id)) if id == self.file => None,
            Ok(Some(id)) => {
                if self.corpus.exists(&id) {
                    Some(id)
                } else {
                    self.error(at, ErrorKind::MissingReferencedFile { path: id });
                    None
                }
            }
            Ok(None) => None,
            Err(kind) => {
                self.error(at, kind);
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use crate::corpus::Options;
    use crate::test_utils::write_corpus;

    fn resolve(files: &[(&str, &str)], id: &str) -> (tempfile::TempDir, Resolution) {
        let dir = write_corpus(files);
        let mut corpus = Corpus::new(dir.path(), Options::default());
        corpus.discover().unwrap();
        corpus.parse_all().unwrap();
        corpus.normalize_all().unwrap();
        let resolution = corpus.resolve_file(id).cloned().unwrap();
        (dir, resolution)
    }

    fn view(value: &Value) -> &ViewMap {
        value.as_view().unwrap_or_else(|| panic!("not a view: {value:?}"))
    }

    fn field<'v>(view: &'v ViewMap, name: &str) -> &'v Value {
        view.fields.get(name).unwrap_or_else(|| panic!("no field {name}"))
    }

    #[test]
    fn includer_keys_override_included_keys() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"{"_include": "base.json", "_view": "Card", "title": "mine"}"#),
                ("base.json", r#"{"title": "theirs", "subtitle": "kept", "_view": "Base"}"#),
            ],
            "/a.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let card = view(&r.value);
        assert_eq!(card.key.name, "Card");
        assert_eq!(field(card, "title").as_str(), Some("mine"));
        assert_eq!(field(card, "subtitle").as_str(), Some("kept"));
        // the overriding key keeps the includer's location
        let (key, _) = card.fields.get_key_value("title").unwrap();
        assert_eq!(key.location.file.as_deref(), Some("/a.json"));
        assert!(!card.fields.contains_key("_include"));
    }

    #[test]
    fn chained_includes_merge_in_order() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"{"_view": "A", "_include": "b.json", "x": 1}"#),
                ("b.json", r#"{"_data": "c.json", "x": 2, "y": 2}"#),
                ("c.json", r#"{"x": 3, "y": 3, "z": 3}"#),
            ],
            "/a.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let a = view(&r.value);
        let num = |n: &str| match &field(a, n).kind {
            ValueKind::Number(n) => n.as_i64(),
            _ => None,
        };
        assert_eq!((num("x"), num("y"), num("z")), (Some(1), Some(2), Some(3)));
    }

    #[test]
    fn include_cycles_are_reported() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"{"_view": "A", "_include": "b.json"}"#),
                ("b.json", r#"{"_include": "a.json", "y": 1}"#),
            ],
            "/a.json",
        );
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.errors[0].kind, ErrorKind::CyclicInclude { path: "/a.json".into() });
        assert_eq!(r.errors[0].file, "/a.json");
        assert_eq!(r.errors[0].location.file.as_deref(), Some("/b.json"));
    }

    #[test]
    fn self_inclusion_from_a_nested_map_is_a_cycle() {
        let (_d, r) = resolve(&[("a.json", r#"{"_view": "A", "child": {"_include": "a.json"}}"#)], "/a.json");
        assert!(matches!(r.errors[0].kind, ErrorKind::CyclicInclude { .. }));
    }

    #[test]
    fn diamond_inclusion_is_fine() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"{"_view": "A", "left": {"_include": "b.json"}, "right": {"_include": "c.json"}}"#),
                ("b.json", r#"{"_view": "B", "_include": "d.json"}"#),
                ("c.json", r#"{"_view": "C", "_include": "d.json"}"#),
                ("d.json", r#"{"shared": true}"#),
            ],
            "/a.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let a = view(&r.value);
        assert_eq!(view(field(a, "left")).key.name, "B");
        assert_eq!(field(view(field(a, "right")), "shared").kind, ValueKind::Bool(true));
    }

    #[test]
    fn sibling_includes_of_the_same_file_are_not_cycles() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"{"_view": "A", "_include": "d.json", "other": {"_view": "O", "_include": "d.json"}}"#),
                ("d.json", r#"{"shared": 1}"#),
            ],
            "/a.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
    }

    #[test]
    fn missing_include_target() {
        let (_d, r) = resolve(&[("a.json", r#"{"_view": "A", "_include": "nope.json", "t": 1}"#)], "/a.json");
        assert_eq!(r.errors[0].kind, ErrorKind::MissingReferencedFile { path: "/nope.json".into() });
        // the rest of the view still resolves
        assert!(view(&r.value).fields.contains_key("t"));
    }

    #[test]
    fn including_a_list_document_is_rejected() {
        let (_d, r) = resolve(
            &[("a.json", r#"{"_view": "A", "_include": "l.json"}"#), ("l.json", "[1]")],
            "/a.json",
        );
        assert!(matches!(r.errors[0].kind, ErrorKind::InvalidSpecialValue { .. }));
    }

    #[test]
    fn markers_must_stand_alone() {
        let (_d, r) = resolve(
            &[("a.json", r#"{"_view": "A", "body": {"_delegate": true, "extra": 1}, "ext": {"_abstract": "Slot"}}"#)],
            "/a.json",
        );
        assert_eq!(r.errors.len(), 1);
        assert!(matches!(r.errors[0].kind, ErrorKind::AmbiguousMarkerCombination(_)));
        let a = view(&r.value);
        assert_eq!(field(a, "body").kind, ValueKind::Delegate(DelegateMap { file: "/a.json".into() }));
        assert_eq!(field(a, "ext").kind, ValueKind::Abstract(AbstractMap { name: Some("Slot".into()) }));
    }

    #[test]
    fn delegate_wins_over_abstract() {
        let (_d, r) = resolve(&[("a.json", r#"{"_view": "A", "b": {"_delegate": true, "_abstract": true}}"#)], "/a.json");
        assert_eq!(r.errors.len(), 1);
        assert!(matches!(field(view(&r.value), "b").kind, ValueKind::Delegate(_)));
    }

    #[test]
    fn delegate_remembers_its_declaring_file() {
        let (_d, r) = resolve(
            &[
                ("page.json", r#"{"_view": "Page", "_include": "parts/frame.json"}"#),
                ("parts/frame.json", r#"{"body": {"_delegate": true}}"#),
            ],
            "/page.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let body = field(view(&r.value), "body");
        assert_eq!(body.kind, ValueKind::Delegate(DelegateMap { file: "/parts/frame.json".into() }));
    }

    #[test]
    fn plain_maps_are_left_alone() {
        let (_d, r) = resolve(
            &[("a.json", r#"{"_view": "A", "style": {"color": "red", "inner": {"_view": "NotResolved"}}}"#)],
            "/a.json",
        );
        let style = field(view(&r.value), "style").as_map().unwrap();
        assert!(style.get("inner").unwrap().as_map().is_some());
    }

    #[test]
    fn nested_lists_inside_plain_maps_are_flagged() {
        let (_d, r) = resolve(
            &[("a.json", r#"{"_view": "A", "style": {"grid": [[1, 2], [3]], "deep": {"cells": [[[4]]]}}}"#)],
            "/a.json",
        );
        assert_eq!(r.errors.len(), 4);
        assert!(r.errors.iter().all(|e| e.kind == ErrorKind::NestedListsUnsupported));
        assert!(field(view(&r.value), "style").as_map().is_some());

        let (_d, r) = resolve(&[("part.json", r#"{"grid": [[1], [2]], "flat": [1, 2]}"#)], "/part.json");
        assert_eq!(r.errors.len(), 2);
        assert_eq!(r.errors[0].location.line, Some(1));
        assert!(r.value.as_map().is_some());
    }

    #[test]
    fn includer_wins_per_role_not_per_spelling() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"{"_include": "base.data", "_name": "Card", "_doc": "mine", "title": "t"}"#),
                ("base.data", r#"{"_view": "Base", "_notes": "theirs", "title": "b", "extra": 1}"#),
            ],
            "/a.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let card = view(&r.value);
        assert_eq!(card.key.name, "Card");
        assert_eq!(card.notes.as_deref(), Some("mine"));
        assert_eq!(field(card, "title").as_str(), Some("t"));
        assert!(card.fields.contains_key("extra"));
    }

    #[test]
    fn delegates_inside_plain_maps_still_block_wrapper_inheritance() {
        let (_d, r) = resolve(
            &[
                (CONFIG_FILE_NAME, r#"{"wrapper": "frame.json"}"#),
                ("frame.json", r#"{"_view": "Frame", "body": {"_delegate": true}}"#),
                ("shell.json", r#"{"_view": "Shell", "layout": {"main": {"_delegate": true}}}"#),
            ],
            "/shell.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        assert_eq!(view(&r.value).wrapper, None);
    }

    #[test]
    fn view_attributes_without_identity() {
        let (_d, r) = resolve(&[("a.json", r#"{"_notes": "orphan", "x": 1}"#)], "/a.json");
        assert_eq!(r.errors[0].kind, ErrorKind::MissingViewIdentity);
        assert!(r.value.as_map().is_some());
    }

    #[test]
    fn notes_attach_to_view_and_fields() {
        let (_d, r) = resolve(
            &[("a.json", r#"{"_view": "A", "_notes": "a card", "title": "t", "_titleNotes": "headline", "_ghostNotes": "?", "_custom": 1}"#)],
            "/a.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let a = view(&r.value);
        assert_eq!(a.notes.as_deref(), Some("a card"));
        let (title, _) = a.fields.get_key_value("title").unwrap();
        assert_eq!(title.notes.as_deref(), Some("headline"));
        let names: Vec<&str> = a.fields.keys().map(Key::as_str).collect();
        assert_eq!(names, ["title"]);
    }

    #[test]
    fn nested_lists_are_flagged_but_kept() {
        let (_d, r) = resolve(&[("a.json", r#"{"_view": "A", "grid": [[1], 2, [[3]]]}"#)], "/a.json");
        assert_eq!(r.errors.len(), 3);
        assert!(r.errors.iter().all(|e| e.kind == ErrorKind::NestedListsUnsupported));
        assert_eq!(field(view(&r.value), "grid").as_list().unwrap().len(), 3);
    }

    #[test]
    fn root_views_inherit_the_config_wrapper_unless_they_delegate() {
        let (_d, r) = resolve(
            &[
                (CONFIG_FILE_NAME, r#"{"wrapper": "frame.json"}"#),
                ("frame.json", r#"{"_view": "Frame", "body": {"_delegate": true}}"#),
                ("pages/home.json", r#"{"_view": "Home", "hero": {"_view": "Hero"}}"#),
            ],
            "/pages/home.json",
        );
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let home = view(&r.value);
        assert_eq!(home.wrapper.as_deref(), Some("/frame.json"));
        assert_eq!(view(field(home, "hero")).wrapper, None);

        let (_d, r) = resolve(
            &[
                (CONFIG_FILE_NAME, r#"{"wrapper": "frame.json"}"#),
                ("frame.json", r#"{"_view": "Frame", "body": {"_delegate": true}}"#),
            ],
            "/frame.json",
        );
        assert_eq!(view(&r.value).wrapper, None);
    }

    #[test]
    fn explicit_wrapper_must_exist() {
        let (_d, r) = resolve(
            &[
                ("a.json", r#"[{"_view": "A", "_wrapper": "w.json"}, {"_view": "B", "_wrapper": "missing.json"}]"#),
                ("w.json", r#"{"_view": "W"}"#),
            ],
            "/a.json",
        );
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.errors[0].kind, ErrorKind::MissingReferencedFile { path: "/missing.json".into() });
        let items = r.value.as_list().unwrap();
        assert_eq!(view(&items[0]).wrapper.as_deref(), Some("/w.json"));
    }
}
