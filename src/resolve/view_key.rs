use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::Resolver;
use crate::error::ErrorKind;
use crate::paths;
use crate::value::{Key, Value, ViewKey};

static WORD_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// `news_card` / `news-card` / `newsCard` → `NewsCard`.
pub fn upper_camel(raw: &str) -> String {
    WORD_BREAK
        .split(raw)
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `/cards/news/item.mustache` → `cards.news`.
fn package_of(template: &str) -> Option<String> {
    let dir = paths::parent_dir(template);
    let segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() { None } else { Some(segments.join(".")) }
}

impl Resolver<'_> {
    /// Identity of a view from its name and/or template keys. `None` when
    /// both are unusable; the reason is already recorded.
    pub(super) fn view_key(
        &mut self,
        name: Option<(Key, Value)>,
        template: Option<(Key, Value)>,
    ) -> Option<ViewKey> {
        let explicit = match name {
            Some((key, value)) => match value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
                Some(name) => Some(name.to_string()),
                None => {
                    self.error(&value.location, ErrorKind::InvalidSpecialValue {
                        key: key.name.clone(),
                        expected: "a non-empty view name",
                    });
                    None
                }
            },
            None => None,
        };
        let template = match template {
            Some((key, value)) => match value.as_str() {
                Some(path) => self.resolve_template(path, &value),
                None => {
                    self.error(&value.location, ErrorKind::InvalidSpecialValue {
                        key: key.name.clone(),
                        expected: "a template path",
                    });
                    None
                }
            },
            None => None,
        };

        let name = match (explicit, &template) {
            (Some(name), _) => name,
            (None, Some(template)) => self.derived_name(template, &template_stem(template))?,
            (None, None) => return None,
        };
        let package = template.as_deref().and_then(package_of);
        Some(ViewKey { name, package, template })
    }

    /// Concrete template file: the config extension is appended when the
    /// reference has none, then the file has to exist.
    fn resolve_template(&mut self, path: &str, at: &Value) -> Option<String> {
        let full = if Path::new(path).extension().is_some() {
            path.to_string()
        } else {
            match self.corpus.configs().template_extension(paths::parent_dir(path)) {
                Ok(Some(ext)) => format!("{path}.{ext}"),
                Ok(None) => {
                    self.error(&at.location, ErrorKind::UnknownTemplateExtension { path: path.to_string() });
                    return None;
                }
                Err(kind) => {
                    self.error(&at.location, kind);
                    return None;
                }
            }
        };
        if !self.corpus.exists(&full) {
            self.error(&at.location, ErrorKind::MissingReferencedFile { path: full });
            return None;
        }
        Some(full)
    }

    fn derived_name(&mut self, template: &str, stem: &str) -> Option<String> {
        let prefix = match self.corpus.configs().name_prefix(paths::parent_dir(template)) {
            Ok(prefix) => prefix.unwrap_or_default(),
            Err(kind) => {
                let at = crate::location::Location::file(template);
                self.error(&at, kind);
                String::new()
            }
        };
        let name = format!("{prefix}{}", upper_camel(stem));
        if name.is_empty() { None } else { Some(name) }
    }
}

fn template_stem(template: &str) -> String {
    Path::new(template)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use crate::corpus::{Corpus, Options};
    use crate::test_utils::write_corpus;

    #[test]
    fn camel_cases_file_stems() {
        assert_eq!(upper_camel("news_card"), "NewsCard");
        assert_eq!(upper_camel("news-card.v2"), "NewsCardV2");
        assert_eq!(upper_camel("heroBanner"), "HeroBanner");
        assert_eq!(upper_camel("__"), "");
    }

    #[test]
    fn packages_follow_template_directories() {
        assert_eq!(package_of("/cards/news/item.mustache").as_deref(), Some("cards.news"));
        assert_eq!(package_of("/item.mustache"), None);
    }

    fn resolve_root(files: &[(&str, &str)]) -> (tempfile::TempDir, crate::corpus::Resolution) {
        let dir = write_corpus(files);
        let mut corpus = Corpus::new(dir.path(), Options::default());
        corpus.discover().unwrap();
        corpus.parse_all().unwrap();
        corpus.normalize_all().unwrap();
        let r = corpus.resolve_file("/page.json").cloned().unwrap();
        (dir, r)
    }

    #[test]
    fn template_views_infer_extension_prefix_and_package() {
        let (_d, r) = resolve_root(&[
            (CONFIG_FILE_NAME, r#"{"templateExtension": "mustache", "namePrefix": "Acme"}"#),
            ("cards/news_card.mustache", "{{title}}"),
            ("page.json", r#"{"_template": "cards/news_card", "title": "t"}"#),
        ]);
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let key = &r.value.as_view().unwrap().key;
        assert_eq!(key.name, "AcmeNewsCard");
        assert_eq!(key.package.as_deref(), Some("cards"));
        assert_eq!(key.template.as_deref(), Some("/cards/news_card.mustache"));
    }

    #[test]
    fn explicit_name_overrides_derived_one() {
        let (_d, r) = resolve_root(&[
            ("cards/card.html", ""),
            ("page.json", r#"{"_template": "/cards/card.html", "_view": "Tile"}"#),
        ]);
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let key = &r.value.as_view().unwrap().key;
        assert_eq!(key.name, "Tile");
        assert_eq!(key.template.as_deref(), Some("/cards/card.html"));
    }

    #[test]
    fn template_errors() {
        let (_d, r) = resolve_root(&[("page.json", r#"[{"_template": "card"}, {"_template": "gone.html"}, {"_view": ""}]"#)]);
        let kinds: Vec<&ErrorKind> = r.errors.iter().map(|e| &e.kind).collect();
        assert_eq!(kinds, [
            &ErrorKind::UnknownTemplateExtension { path: "/card".into() },
            &ErrorKind::MissingReferencedFile { path: "/gone.html".into() },
            &ErrorKind::InvalidSpecialValue { key: "_view".into(), expected: "a non-empty view name" },
        ]);
    }
}
