// Resolved model: what a code generator consumes. No document values here.
use serde::Serialize;

use crate::location::Location;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Model {
    pub views: Vec<View>,        // sorted by name
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub name: String,
    pub package: Option<String>,
    pub template: Option<String>,
    pub notes: Vec<String>,
    pub wrappers: Vec<String>,   // every wrapper file seen on an occurrence
    pub fields: Vec<Field>,      // first-seen order
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub notes: Vec<String>,
    pub ty: Ty,
    pub required: bool,          // present & non-null in all occurrences
    pub mixed: bool,             // text also seen where a view was expected
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Ty {
    String,
    Number,
    Bool,
    Map,
    List { item: Box<Ty> },
    Views { types: Vec<ViewType> },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum ViewType {
    View(String),
    /// Supplied from outside the corpus.
    Abstract(String),
}

impl Model {
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }
}

impl View {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Ty {
    pub fn item(&self) -> Option<&Ty> {
        match self {
            Ty::List { item } => Some(item),
            _ => None,
        }
    }

    /// Union members of a view-typed slot, looking through one list.
    pub fn view_types(&self) -> &[ViewType] {
        match self {
            Ty::Views { types } => types,
            Ty::List { item } => item.view_types(),
            _ => &[],
        }
    }
}
