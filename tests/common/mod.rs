use std::fs;

/// Lay out `(relative path, contents)` pairs in a fresh temp directory.
pub fn write_corpus(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (path, contents) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(&full, contents).expect("write file");
    }
    dir
}
