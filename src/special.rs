//! Reserved `_`-prefixed keys and their aliases.
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecialKey {
    ViewName,
    Template,
    Include,
    Wrapper,
    Delegate,
    Abstract,
    Notes,
}

const ALIASES: &[(&str, SpecialKey)] = &[
    ("_view", SpecialKey::ViewName),
    ("_name", SpecialKey::ViewName),
    ("_template", SpecialKey::Template),
    ("_include", SpecialKey::Include),
    ("_data", SpecialKey::Include),
    ("_wrapper", SpecialKey::Wrapper),
    ("_delegate", SpecialKey::Delegate),
    ("_abstract", SpecialKey::Abstract),
    ("_notes", SpecialKey::Notes),
    ("_doc", SpecialKey::Notes),
];

static FIELD_NOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_([A-Za-z0-9_$]+)Notes$").unwrap());

impl SpecialKey {
    pub fn from_name(name: &str) -> Option<Self> {
        ALIASES.iter().find(|(alias, _)| *alias == name).map(|(_, key)| *key)
    }

    /// Keys whose string value is a path to another file.
    pub fn is_path(self) -> bool {
        matches!(self, SpecialKey::Template | SpecialKey::Include | SpecialKey::Wrapper)
    }

    /// Keys that only make sense on a view.
    pub fn is_view_attribute(self) -> bool {
        matches!(self, SpecialKey::Wrapper | SpecialKey::Notes)
    }

    /// Canonical spelling, used in diagnostics.
    pub fn canonical(self) -> &'static str {
        ALIASES
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(alias, _)| *alias)
            .unwrap_or("_")
    }
}

pub fn is_special(name: &str) -> bool {
    name.starts_with('_')
}

/// `_titleNotes` → `title`.
pub fn field_notes_target(name: &str) -> Option<&str> {
    if SpecialKey::from_name(name).is_some() {
        return None;
    }
    FIELD_NOTES
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_the_same_role() {
        assert_eq!(SpecialKey::from_name("_include"), Some(SpecialKey::Include));
        assert_eq!(SpecialKey::from_name("_data"), Some(SpecialKey::Include));
        assert_eq!(SpecialKey::from_name("_doc"), Some(SpecialKey::Notes));
        assert_eq!(SpecialKey::from_name("include"), None);
        assert_eq!(SpecialKey::Include.canonical(), "_include");
    }

    #[test]
    fn field_notes_pattern() {
        assert_eq!(field_notes_target("_titleNotes"), Some("title"));
        assert_eq!(field_notes_target("_image_urlNotes"), Some("image_url"));
        assert_eq!(field_notes_target("_notes"), None);
        assert_eq!(field_notes_target("_Notes"), None);
        assert_eq!(field_notes_target("titleNotes"), None);
    }
}
