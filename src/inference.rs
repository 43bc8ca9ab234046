//! Cross-occurrence type unification.
//!
//! Every view occurrence in the corpus is observed, its fields are pooled
//! per (view, field), and each pool is solved to one structural type:
//!
//! - Nulls carry no evidence; a field that is only ever null is absent.
//! - Delegates and abstracts count as views.
//! - Views are always list-compatible, so a field that holds a view once and
//!   a list of views elsewhere is a list of views.
//! - Text may stand in for a child view (the item type is then "mixed"), but
//!   not for anything else.
//! - Anything else that disagrees is an `InconsistentFieldType`.
//!
//! Delegates need the whole corpus (every view's wrapper) and are closed in a
//! second pass once every field has been solved; see [`delegate`].
pub mod arr;
pub mod delegate;
pub mod obj;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, ErrorKind, Phase, PhaseError};
use crate::location::Location;
use crate::value::{Value, ValueKind, ViewKey, ViewMap};

pub use obj::{FieldC, Occurrence, ViewC};

// ------------------------------ Categories -------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    String,
    Number,
    Bool,
    Map,
    List,
    /// Views, delegates and abstracts.
    View,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::String => "string",
            Category::Number => "number",
            Category::Bool => "boolean",
            Category::Map => "map",
            Category::List => "list",
            Category::View => "view",
        })
    }
}

/// `None` for null, which carries no type evidence.
pub fn category_of(v: &Value) -> Option<Category> {
    match &v.kind {
        ValueKind::Null => None,
        ValueKind::Bool(_) => Some(Category::Bool),
        ValueKind::Number(_) => Some(Category::Number),
        ValueKind::String(_) => Some(Category::String),
        ValueKind::List(_) => Some(Category::List),
        ValueKind::Map(_) => Some(Category::Map),
        ValueKind::View(_) | ValueKind::Delegate(_) | ValueKind::Abstract(_) => Some(Category::View),
    }
}

// ------------------------------- State ----------------------------------- //

/// Solved type of a field, or of a list's items.
#[derive(Clone, Debug, PartialEq)]
pub enum U {
    String,
    Number,
    Bool,
    Map,
    List(Box<U>),
    Views(ViewsC),
}

/// Evidence for a view-typed slot. `delegates` stay open until the second
/// pass folds their wrapped views into `views`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewsC {
    pub views: BTreeSet<ViewKey>,
    /// Declaring files of the delegate placeholders seen here.
    pub delegates: BTreeSet<String>,
    /// Named extension points; `None` when the marker was just `true`.
    pub abstracts: BTreeSet<Option<String>>,
    /// Text was seen in place of a view.
    pub mixed: bool,
}

impl U {
    pub fn item(&self) -> Option<&U> {
        match self {
            U::List(item) => Some(item),
            _ => None,
        }
    }

    pub fn views(&self) -> Option<&ViewsC> {
        match self {
            U::Views(c) => Some(c),
            U::List(item) => item.views(),
            _ => None,
        }
    }

    fn views_mut(&mut self) -> Option<&mut ViewsC> {
        match self {
            U::Views(c) => Some(c),
            U::List(item) => item.views_mut(),
            _ => None,
        }
    }
}

// ------------------------------- Unify ----------------------------------- //

/// One value to unify, plus the file it was contributed by.
#[derive(Clone, Copy, Debug)]
pub struct Sample<'a> {
    pub value: &'a Value,
    pub file: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// A field's own value.
    Field,
    /// An item of a field's list.
    Item,
}

/// Which field is being solved, for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct Slot<'a> {
    pub view: &'a str,
    pub field: &'a str,
}

impl Slot<'_> {
    fn error(&self, sample: &Sample, kind: ErrorKind) -> Error {
        Error::new(sample.file, sample.value.location.clone(), kind)
    }

    fn inconsistent(&self, sample: &Sample, categories: &BTreeSet<Category>) -> Error {
        self.error(sample, ErrorKind::InconsistentFieldType {
            view: self.view.to_string(),
            field: self.field.to_string(),
            categories: categories.iter().map(Category::to_string).collect(),
        })
    }
}

fn first_where<'s, 'v>(
    present: &[(&'s Sample<'v>, Category)],
    wanted: impl Fn(Category) -> bool,
) -> Option<&'s Sample<'v>> {
    present.iter().find(|(_, c)| wanted(*c)).map(|(s, _)| *s)
}

/// Solve one pool of samples. `Ok(None)` means no evidence at all (every
/// sample was null), i.e. the field is absent.
pub fn unify(samples: &[Sample], position: Position, slot: Slot) -> Result<Option<U>, Error> {
    let present: Vec<(&Sample, Category)> = samples
        .iter()
        .filter_map(|s| category_of(s.value).map(|c| (s, c)))
        .collect();
    let Some(&(first, first_category)) = present.first() else {
        return Ok(None);
    };
    let categories: BTreeSet<Category> = present.iter().map(|(_, c)| *c).collect();
    let has = |c: Category| categories.contains(&c);

    if position == Position::Field && (has(Category::List) || has(Category::View)) {
        let listy = |c: Category| matches!(c, Category::List | Category::View | Category::String);
        if let Some(culprit) = first_where(&present, |c| !listy(c)) {
            return Err(slot.inconsistent(culprit, &categories));
        }
        let items = arr::flatten_items(samples);
        let any_view = has(Category::View) || items.iter().any(|s| category_of(s.value) == Some(Category::View));
        if has(Category::String) && !any_view {
            let culprit = first_where(&present, |c| c == Category::String).unwrap_or(first);
            return Err(slot.inconsistent(culprit, &categories));
        }
        return match unify(&items, Position::Item, slot)? {
            Some(item) => Ok(Some(U::List(Box::new(item)))),
            None => Err(slot.error(first, ErrorKind::EmptyList {
                view: slot.view.to_string(),
                field: slot.field.to_string(),
            })),
        };
    }
    if has(Category::List) {
        let culprit = first_where(&present, |c| c == Category::List).unwrap_or(first);
        return Err(slot.error(culprit, ErrorKind::NestedListsUnsupported));
    }

    if has(Category::View) {
        if let Some(culprit) = first_where(&present, |c| !matches!(c, Category::View | Category::String)) {
            return Err(slot.inconsistent(culprit, &categories));
        }
        let mut c = ViewsC { mixed: has(Category::String), ..ViewsC::default() };
        for (sample, _) in &present {
            match &sample.value.kind {
                ValueKind::View(v) => { c.views.insert(v.key.clone()); }
                ValueKind::Delegate(d) => { c.delegates.insert(d.file.clone()); }
                ValueKind::Abstract(a) => { c.abstracts.insert(a.name.clone()); }
                _ => (),
            }
        }
        return Ok(Some(U::Views(c)));
    }

    if let Some(culprit) = first_where(&present, |c| c != first_category) {
        return Err(slot.inconsistent(culprit, &categories));
    }
    Ok(Some(match first_category {
        Category::String => U::String,
        Category::Number => U::Number,
        Category::Bool => U::Bool,
        _ => U::Map,
    }))
}

// ------------------------------- Front API -------------------------------- //

/// A pooled view with its solved fields, in first-seen field order.
pub struct SolvedView<'a> {
    pub view: &'a ViewC,
    pub fields: Vec<SolvedField<'a>>,
}

pub struct SolvedField<'a> {
    pub name: &'a str,
    pub field: &'a FieldC,
    pub ty: U,
}

#[derive(Debug, Default)]
pub struct Inference {
    views: BTreeMap<ViewKey, ViewC>,
    wrappers: delegate::Wrappers,
}

impl Inference {
    pub fn new() -> Self { Self::default() }

    /// Pool one resolved value; anything but a view is ignored.
    pub fn observe_value(&mut self, v: &Value) {
        if let ValueKind::View(view) = &v.kind {
            self.observe_view(&v.location, view);
        }
    }

    pub fn observe_view(&mut self, location: &Location, view: &ViewMap) {
        self.wrappers.observe(view);
        match self.views.get_mut(&view.key) {
            Some(pooled) => pooled.observe(location, view),
            None => {
                let mut pooled = ViewC::new(view.key.clone());
                pooled.observe(location, view);
                self.views.insert(view.key.clone(), pooled);
            }
        }
    }

    /// Solve every field, then close delegates over the whole corpus. All
    /// errors of both passes are reported together.
    pub fn solve(&self) -> Result<Vec<SolvedView<'_>>, PhaseError> {
        let mut errors = vec![];
        let mut out = vec![];
        for view in self.views.values() {
            let mut fields = vec![];
            for (name, field) in &view.fields {
                let slot = Slot { view: &view.key.name, field: name };
                match unify(&field.samples(), Position::Field, slot) {
                    Ok(Some(ty)) => fields.push(SolvedField { name, field, ty }),
                    Ok(None) => tracing::trace!(view = %view.key, field = %name, "only ever null; dropped"),
                    Err(e) => errors.push(e),
                }
            }
            out.push(SolvedView { view, fields });
        }

        // second pass: needs every view's wrapper, so only now
        for solved in &mut out {
            for field in &mut solved.fields {
                let Some(c) = field.ty.views_mut() else { continue };
                if c.delegates.is_empty() {
                    continue;
                }
                let slot = Slot { view: &solved.view.key.name, field: field.name };
                errors.extend(self.wrappers.close(c, slot, field.field));
            }
        }

        if errors.is_empty() {
            Ok(out)
        } else {
            Err(PhaseError::new(Phase::Infer, errors))
        }
    }
}

/// Pool `views` and lower the solution to the resolved model.
pub fn infer(views: &[&Value]) -> Result<crate::ir::Model, PhaseError> {
    let mut inference = Inference::new();
    for v in views {
        inference.observe_value(v);
    }
    let solved = inference.solve()?;
    Ok(crate::lower::lower_to_model(&solved))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{AbstractMap, DelegateMap, Fields, Key};

    fn at(line: u32) -> Location { Location::new("/t.json", line, 1, line * 10) }

    fn val(kind: ValueKind, line: u32) -> Value { Value::new(kind, at(line)) }
    fn s(text: &str, line: u32) -> Value { val(ValueKind::String(text.into()), line) }
    fn n(x: i64, line: u32) -> Value { val(ValueKind::Number(x.into()), line) }
    fn null(line: u32) -> Value { val(ValueKind::Null, line) }
    fn list(items: Vec<Value>, line: u32) -> Value { val(ValueKind::List(items), line) }
    fn map(line: u32) -> Value { val(ValueKind::Map(Fields::new()), line) }
    fn view(name: &str, line: u32) -> Value {
        val(ValueKind::View(ViewMap {
            key: ViewKey::named(name),
            wrapper: None,
            notes: None,
            fields: Fields::new(),
            file: "/t.json".into(),
        }), line)
    }
    fn delegate(file: &str, line: u32) -> Value { val(ValueKind::Delegate(DelegateMap { file: file.into() }), line) }

    fn solve(values: &[Value]) -> Result<Option<U>, Error> {
        let samples: Vec<Sample> = values.iter().map(|value| Sample { value, file: "/t.json" }).collect();
        unify(&samples, Position::Field, Slot { view: "V", field: "f" })
    }

    fn names(c: &ViewsC) -> Vec<&str> { c.views.iter().map(|k| k.name.as_str()).collect() }

    #[test]
    fn scalars_unify_to_themselves() {
        assert_eq!(solve(&[s("a", 1), s("b", 2), null(3)]).unwrap(), Some(U::String));
        assert_eq!(solve(&[n(1, 1)]).unwrap(), Some(U::Number));
        assert_eq!(solve(&[map(1), map(2)]).unwrap(), Some(U::Map));
        assert_eq!(solve(&[val(ValueKind::Bool(true), 1)]).unwrap(), Some(U::Bool));
    }

    #[test]
    fn all_null_means_absent() {
        assert_eq!(solve(&[null(1), null(2)]).unwrap(), None);
        assert_eq!(solve(&[]).unwrap(), None);
    }

    #[test]
    fn views_are_lists_of_views() {
        let u = solve(&[view("Card", 1), view("Banner", 2)]).unwrap().unwrap();
        let c = u.item().and_then(U::views).unwrap();
        assert_eq!(names(c), ["Banner", "Card"]);
        assert!(!c.mixed);
    }

    #[test]
    fn text_may_stand_in_for_a_view() {
        let u = solve(&[view("Card", 1), s("plain", 2)]).unwrap().unwrap();
        assert!(u.views().unwrap().mixed);
    }

    #[test]
    fn single_views_and_lists_of_views_merge() {
        let u = solve(&[view("Card", 1), list(vec![view("Card", 3), null(4), view("Tile", 5)], 2)])
            .unwrap()
            .unwrap();
        assert_eq!(names(u.item().and_then(U::views).unwrap()), ["Card", "Tile"]);
    }

    #[test]
    fn placeholders_count_as_views() {
        let abs = val(ValueKind::Abstract(AbstractMap { name: Some("Slot".into()) }), 3);
        let u = solve(&[view("Card", 1), delegate("/w.json", 2), abs]).unwrap().unwrap();
        let c = u.views().unwrap();
        assert!(c.delegates.contains("/w.json"));
        assert!(c.abstracts.contains(&Some("Slot".to_string())));
    }

    #[test]
    fn lists_of_scalars() {
        let u = solve(&[list(vec![n(1, 2)], 1), list(vec![n(2, 4), null(5)], 3)]).unwrap().unwrap();
        assert_eq!(u, U::List(Box::new(U::Number)));
    }

    #[test]
    fn conflicting_scalars_name_both_and_point_at_the_first_conflict() {
        let err = solve(&[s("a", 1), null(2), n(3, 3), n(4, 4)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InconsistentFieldType {
            view: "V".into(),
            field: "f".into(),
            categories: vec!["string".into(), "number".into()],
        });
        assert_eq!(err.location, at(3));
    }

    #[test]
    fn text_next_to_a_list_of_numbers_is_an_error() {
        let err = solve(&[list(vec![n(1, 2)], 1), s("b", 3)]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InconsistentFieldType { .. }));
        assert_eq!(err.location, at(3));
    }

    #[test]
    fn text_may_stand_in_for_a_list_of_views() {
        let u = solve(&[s("plain", 1), list(vec![view("Para", 3)], 2)]).unwrap().unwrap();
        let c = u.views().unwrap();
        assert!(c.mixed);
        assert_eq!(names(c), ["Para"]);
    }

    #[test]
    fn scalars_next_to_lists_are_an_error() {
        let err = solve(&[list(vec![n(1, 2)], 1), n(2, 3)]).unwrap_err();
        match err.kind {
            ErrorKind::InconsistentFieldType { categories, .. } => assert_eq!(categories, ["number", "list"]),
            other => panic!("{other:?}"),
        }
        assert_eq!(err.location, at(3));
    }

    #[test]
    fn maps_next_to_views_are_an_error() {
        let err = solve(&[view("Card", 1), map(2)]).unwrap_err();
        match err.kind {
            ErrorKind::InconsistentFieldType { categories, .. } => assert_eq!(categories, ["map", "view"]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn empty_lists_have_no_item_type() {
        let err = solve(&[list(vec![], 1), list(vec![null(3)], 2)]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::EmptyList { .. }));
        assert_eq!(err.location, at(1));
    }

    #[test]
    fn nested_lists_are_rejected_at_item_level() {
        let err = solve(&[list(vec![list(vec![n(1, 3)], 2)], 1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NestedListsUnsupported);
        assert_eq!(err.location, at(2));
    }

    fn frame_with_delegate(name: &str, file: &str) -> (Location, ViewMap) {
        let mut fields = Fields::new();
        fields.insert(Key::new("body", at(2)), delegate(file, 2));
        (at(1), ViewMap { key: ViewKey::named(name), wrapper: None, notes: None, fields, file: file.into() })
    }

    fn wrapped(name: &str, wrapper: &str, line: u32) -> (Location, ViewMap) {
        (at(line), ViewMap {
            key: ViewKey::named(name),
            wrapper: Some(wrapper.into()),
            notes: None,
            fields: Fields::new(),
            file: format!("/{name}.json"),
        })
    }

    #[test]
    fn delegates_close_over_views_wrapped_by_their_file() {
        let mut inference = Inference::new();
        let (loc, frame) = frame_with_delegate("Frame", "/frame.json");
        inference.observe_view(&loc, &frame);
        for (loc, v) in [wrapped("Home", "/frame.json", 10), wrapped("About", "/frame.json", 20), wrapped("Other", "/x.json", 30)] {
            inference.observe_view(&loc, &v);
        }
        let solved = inference.solve().unwrap();
        let frame = solved.iter().find(|v| v.view.key.name == "Frame").unwrap();
        let body = frame.fields.iter().find(|f| f.name == "body").unwrap();
        assert_eq!(names(body.ty.views().unwrap()), ["About", "Home"]);
    }

    #[test]
    fn delegates_without_wrapped_views_fail() {
        let mut inference = Inference::new();
        let (loc, frame) = frame_with_delegate("Frame", "/frame.json");
        inference.observe_view(&loc, &frame);
        let err = inference.solve().err().unwrap();
        assert_eq!(err.phase, Phase::Infer);
        assert_eq!(err.errors[0].kind, ErrorKind::UnresolvableDelegate {
            view: "Frame".into(),
            field: "body".into(),
            file: "/frame.json".into(),
        });
    }
}
