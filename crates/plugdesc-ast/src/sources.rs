//! Source files and their discovery on disk

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use plugdesc_config::BackendChoice;

/// One source file handed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(SourceFile::new(path, content))
    }
}

/// File extension a backend compiles
pub fn source_extension(backend: BackendChoice) -> &'static str {
    match backend {
        BackendChoice::Java => "java",
        BackendChoice::Kotlin => "kt",
    }
}

/// Every file under `roots` with the given extension, sorted
///
/// A root that is itself a file is included when the extension matches.
pub fn discover_sources(
    roots: &[PathBuf],
    extension: &str,
) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut found = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some(extension) {
                continue;
            }
            found.push(path.to_path_buf());
        }
    }
    found.sort();
    found.dedup();
    debug!(
        "Discovered {} .{} file(s) under {} root(s)",
        found.len(),
        extension,
        roots.len()
    );
    Ok(found)
}

#[cfg(test)]
mod tests {
    use crate::sources::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_filters_by_extension_and_sorts() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("org/example");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("B.java"), "class B {}").unwrap();
        fs::write(pkg.join("A.java"), "class A {}").unwrap();
        fs::write(pkg.join("build.gradle.kts"), "").unwrap();
        fs::write(pkg.join("C.kt"), "class C").unwrap();

        let java = discover_sources(&[dir.path().to_path_buf()], "java").unwrap();
        assert_eq!(java, vec![pkg.join("A.java"), pkg.join("B.java")]);

        let kotlin = discover_sources(&[dir.path().to_path_buf()], "kt").unwrap();
        assert_eq!(kotlin, vec![pkg.join("C.kt")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover_sources(&[dir.path().join("missing")], "java").is_err());
    }
}
