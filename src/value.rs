//! Document model: a JSON value tree where every node remembers where it came
//! from, plus the three map variants produced by resolution.
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Number;

use crate::location::Location;
use crate::special::SpecialKey;

/// Ordered map keyed by field name.
pub type Fields = IndexMap<Key, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(Fields),
    /// A resolved view occurrence.
    View(ViewMap),
    /// "Any view wrapped by `file`."
    Delegate(DelegateMap),
    /// Type supplied outside the corpus; never resolved further.
    Abstract(AbstractMap),
}

// ------------------------------- Keys ------------------------------------ //

/// A field name. Two keys with the same name are equal regardless of notes
/// or location, so occurrences from different files land in the same slot.
#[derive(Clone, Debug, Serialize)]
pub struct Key {
    pub name: String,
    pub notes: Option<String>,
    pub location: Location,
}

impl Key {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self { name: name.into(), notes: None, location }
    }

    pub fn as_str(&self) -> &str { &self.name }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool { self.name == other.name }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) { self.name.hash(state) }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str { &self.name }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

/// Identity of a logical view.
#[derive(Clone, Debug, Serialize)]
pub struct ViewKey {
    pub name: String,
    /// Dotted directory of the template, when the view came from one.
    pub package: Option<String>,
    /// Root-relative template path, extension included.
    pub template: Option<String>,
}

impl ViewKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), package: None, template: None }
    }
}

impl PartialEq for ViewKey {
    fn eq(&self, other: &Self) -> bool { self.name == other.name }
}

impl Eq for ViewKey {}

impl Hash for ViewKey {
    fn hash<H: Hasher>(&self, state: &mut H) { self.name.hash(state) }
}

impl PartialOrd for ViewKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ViewKey {
    fn cmp(&self, other: &Self) -> Ordering { self.name.cmp(&other.name) }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

// --------------------------- Resolved maps -------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub struct ViewMap {
    pub key: ViewKey,
    /// Root-relative path of the wrapper file, explicit or inherited.
    pub wrapper: Option<String>,
    pub notes: Option<String>,
    /// Member fields; special keys are already stripped.
    pub fields: Fields,
    /// File whose resolution produced this occurrence.
    pub file: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegateMap {
    /// File the marker was written in, not the file that included it.
    pub file: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbstractMap {
    /// Extension point name, when the marker spelled one out.
    pub name: Option<String>,
}

// ----------------------------- Accessors ---------------------------------- //

impl Value {
    pub fn new(kind: ValueKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub fn null(location: Location) -> Self { Self::new(ValueKind::Null, location) }

    pub fn is_null(&self) -> bool { matches!(self.kind, ValueKind::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match &self.kind {
            ValueKind::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::List(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&ViewMap> {
        match &self.kind {
            ValueKind::View(v) => Some(v),
            _ => None,
        }
    }

    /// Short human name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Null => "null",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Number(_) => "number",
            ValueKind::String(_) => "string",
            ValueKind::List(_) => "list",
            ValueKind::Map(_) => "map",
            ValueKind::View(_) => "view",
            ValueKind::Delegate(_) => "delegate",
            ValueKind::Abstract(_) => "abstract",
        }
    }

    /// True if a delegate placeholder appears anywhere below (or at) this node,
    /// including unclassified `_delegate` maps inside plain maps.
    pub fn contains_delegate(&self) -> bool {
        match &self.kind {
            ValueKind::Delegate(_) => true,
            ValueKind::List(xs) => xs.iter().any(Value::contains_delegate),
            ValueKind::Map(m) => {
                m.keys().any(|k| SpecialKey::from_name(&k.name) == Some(SpecialKey::Delegate))
                    || m.values().any(Value::contains_delegate)
            }
            ValueKind::View(v) => v.fields.values().any(Value::contains_delegate),
            _ => false,
        }
    }
}
