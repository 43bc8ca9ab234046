use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{FieldC, Sample, Slot, ViewsC};
use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueKind, ViewKey, ViewMap};

/// Wrapper file -> views wrapped by it, across the whole corpus.
#[derive(Debug, Default)]
pub struct Wrappers {
    by_file: HashMap<String, BTreeSet<ViewKey>>,
}

impl Wrappers {
    pub fn observe(&mut self, view: &ViewMap) {
        if let Some(wrapper) = &view.wrapper {
            self.by_file.entry(wrapper.clone()).or_default().insert(view.key.clone());
        }
    }

    pub fn wrapped_by(&self, file: &str) -> Option<&BTreeSet<ViewKey>> {
        self.by_file.get(file).filter(|set| !set.is_empty())
    }

    /// Replace each delegate in `c` by the views its file wraps.
    pub(super) fn close(&self, c: &mut ViewsC, slot: Slot, field: &FieldC) -> Vec<Error> {
        let mut errors = vec![];
        for file in &c.delegates {
            match self.wrapped_by(file) {
                Some(views) => {
                    debug!(view = slot.view, field = slot.field, file = %file, n = views.len(), "delegate closed");
                    c.views.extend(views.iter().cloned());
                }
                None => {
                    let samples = field.samples();
                    let at = samples.iter().find_map(|s| delegate_in(s, file)).or(samples.first().copied());
                    let kind = ErrorKind::UnresolvableDelegate {
                        view: slot.view.to_string(),
                        field: slot.field.to_string(),
                        file: file.clone(),
                    };
                    errors.push(match at {
                        Some(sample) => slot.error(&sample, kind),
                        None => Error::new(file, crate::location::Location::file(file), kind),
                    });
                }
            }
        }
        errors
    }
}

fn delegate_in<'a>(sample: &Sample<'a>, file: &str) -> Option<Sample<'a>> {
    let is_target = |v: &Value| matches!(&v.kind, ValueKind::Delegate(d) if d.file == file);
    match &sample.value.kind {
        ValueKind::List(items) => items
            .iter()
            .find(|v| is_target(v))
            .map(|value| Sample { value, file: sample.file }),
        _ if is_target(sample.value) => Some(*sample),
        _ => None,
    }
}
