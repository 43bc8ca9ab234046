use std::fmt;
use serde::Serialize;

/// Where a node came from. Every part is optional: values synthesized during
/// resolution have no provenance.
///
/// Field order matters: the derived `Ord` sorts by file, line, column, offset,
/// which is the order diagnostics are reported in.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub offset: Option<u32>,
}

impl Location {
    pub fn new(file: &str, line: u32, column: u32, offset: u32) -> Self {
        Self {
            file: Some(file.to_string()),
            line: Some(line),
            column: Some(column),
            offset: Some(offset),
        }
    }

    /// Location pointing at a whole file (no position inside it).
    pub fn file(file: &str) -> Self {
        Self { file: Some(file.to_string()), ..Self::default() }
    }

    pub fn unknown() -> Self { Self::default() }

    pub fn is_known(&self) -> bool {
        self.file.is_some() || self.line.is_some()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => write!(f, "{file}:{line}:{col}"),
            (Some(file), Some(line), None) => write!(f, "{file}:{line}"),
            (Some(file), None, _) => write!(f, "{file}"),
            (None, Some(line), Some(col)) => write!(f, "<unknown>:{line}:{col}"),
            _ => write!(f, "<unknown>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_file_then_position() {
        let mut locs = vec![
            Location::new("/b.json", 1, 1, 0),
            Location::new("/a.json", 3, 2, 20),
            Location::new("/a.json", 3, 1, 19),
            Location::unknown(),
        ];
        locs.sort();
        assert_eq!(locs[0], Location::unknown());
        assert_eq!(locs[1].column, Some(1));
        assert_eq!(locs[2].column, Some(2));
        assert_eq!(locs[3].file.as_deref(), Some("/b.json"));
    }

    #[test]
    fn display_degrades_gracefully() {
        assert_eq!(Location::new("/a.json", 2, 5, 9).to_string(), "/a.json:2:5");
        assert_eq!(Location::file("/a.json").to_string(), "/a.json");
        assert_eq!(Location::unknown().to_string(), "<unknown>");
    }
}
