use super::Sample;
use crate::value::ValueKind;

/// Item-level samples of a field: a list contributes each of its items, any
/// other value stands for a single item. Nulls pass through and are dropped
/// by unification.
pub fn flatten_items<'a>(samples: &[Sample<'a>]) -> Vec<Sample<'a>> {
    let mut out = Vec::with_capacity(samples.len());
    for sample in samples {
        match &sample.value.kind {
            ValueKind::List(items) => {
                out.extend(items.iter().map(|value| Sample { value, file: sample.file }));
            }
            _ => out.push(*sample),
        }
    }
    out
}
