use crate::inference::{SolvedField, SolvedView, ViewsC, U};
use crate::ir::{Field, Model, Ty, View, ViewType};
use crate::resolve::upper_camel;

pub fn lower_to_model(solved: &[SolvedView]) -> Model {
    let mut views: Vec<View> = solved.iter().map(lower_view).collect();
    views.sort_by(|a, b| a.name.cmp(&b.name));
    Model { views }
}

fn lower_view(solved: &SolvedView) -> View {
    let c = solved.view;
    View {
        name: c.key.name.clone(),
        package: c.key.package.clone(),
        template: c.key.template.clone(),
        notes: c.notes.clone(),
        wrappers: c.wrappers.iter().cloned().collect(),
        fields: solved.fields.iter().map(|f| lower_field(&c.key.name, solved, f)).collect(),
        locations: c.locations.clone(),
    }
}

fn lower_field(view: &str, solved: &SolvedView, f: &SolvedField) -> Field {
    Field {
        name: f.name.to_string(),
        notes: f.field.notes().into_iter().map(str::to_string).collect(),
        ty: lower_ty(&f.ty, view, f.name),
        required: solved.view.is_required(f.field),
        mixed: f.ty.views().is_some_and(|c| c.mixed),
        locations: f.field.locations(),
    }
}

fn lower_ty(u: &U, view: &str, field: &str) -> Ty {
    match u {
        U::String => Ty::String,
        U::Number => Ty::Number,
        U::Bool => Ty::Bool,
        U::Map => Ty::Map,
        U::List(item) => Ty::List { item: Box::new(lower_ty(item, view, field)) },
        U::Views(c) => Ty::Views { types: view_types(c, view, field) },
    }
}

// Unnamed extension points are named after the slot they sit in.
fn view_types(c: &ViewsC, view: &str, field: &str) -> Vec<ViewType> {
    let mut types: Vec<ViewType> = c.views.iter().map(|k| ViewType::View(k.name.clone())).collect();
    types.extend(c.abstracts.iter().map(|name| {
        ViewType::Abstract(match name {
            Some(name) => name.clone(),
            None => format!("{view}{}", upper_camel(field)),
        })
    }));
    types.sort();
    types.dedup();
    types
}
