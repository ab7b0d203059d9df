//! Output files opened through a backend

use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::backend::{BackendError, Declaration};

/// Record tying a generated file to the source it was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub source: PathBuf,
}

/// Byte sink for one generated file; the file is closed when dropped
#[derive(Debug)]
pub struct OutputSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OutputSink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered bytes, surfacing any write error
    pub fn finish(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Split `file_name` at its final `.` into stem and extension
pub fn split_extension(file_name: &str) -> Result<(&str, &str), BackendError> {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Ok((stem, ext)),
        _ => Err(BackendError::MissingExtension(file_name.to_string())),
    }
}

/// Files created under one output root during a compilation
#[derive(Debug)]
pub struct OutputTracker {
    root: PathBuf,
    opened: BTreeSet<PathBuf>,
    generated: Vec<GeneratedFile>,
}

impl OutputTracker {
    pub fn new(root: PathBuf) -> Self {
        OutputTracker {
            root,
            opened: BTreeSet::new(),
            generated: Vec::new(),
        }
    }

    /// Path a file would be created at, without creating it
    pub fn resolve_path(&self, package_hint: &str, file_name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in package_hint.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(file_name);
        path
    }

    pub fn open(
        &mut self,
        package_hint: &str,
        file_name: &str,
        depends_on: &Declaration,
    ) -> Result<OutputSink, BackendError> {
        split_extension(file_name)?;
        let path = self.resolve_path(package_hint, file_name);
        if self.opened.contains(&path) {
            return Err(BackendError::DuplicateOutput(path));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BackendError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| BackendError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Opened output {:?} for {:?}", path, depends_on.source());
        self.opened.insert(path.clone());
        self.generated.push(GeneratedFile {
            path: path.clone(),
            source: depends_on.source().to_path_buf(),
        });
        Ok(OutputSink {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn generated(&self) -> &[GeneratedFile] {
        &self.generated
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{Declaration, DeclarationKind};
    use crate::output::*;
    use tempfile::TempDir;

    fn declaration() -> Declaration {
        Declaration::new(
            0,
            DeclarationKind::Class,
            "Main",
            "org.example",
            PathBuf::from("src/org/example/Main.java"),
            3,
            40,
        )
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(
            split_extension("velocity-plugin.json").unwrap(),
            ("velocity-plugin", "json")
        );
        assert_eq!(split_extension("a.b.c").unwrap(), ("a.b", "c"));
        assert!(matches!(
            split_extension("descriptor"),
            Err(BackendError::MissingExtension(_))
        ));
        assert!(split_extension("trailing.").is_err());
    }

    #[test]
    fn test_open_creates_package_dirs_and_records_source() {
        let dir = TempDir::new().unwrap();
        let mut tracker = OutputTracker::new(dir.path().to_path_buf());
        let mut sink = tracker
            .open("org.example", "velocity-plugin.json", &declaration())
            .unwrap();
        sink.write_all(b"{}\n").unwrap();
        let path = sink.path().to_path_buf();
        sink.finish().unwrap();

        assert_eq!(path, dir.path().join("org/example/velocity-plugin.json"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        assert_eq!(tracker.generated().len(), 1);
        assert_eq!(
            tracker.generated()[0].source,
            PathBuf::from("src/org/example/Main.java")
        );
    }

    #[test]
    fn test_duplicate_and_missing_extension_write_nothing() {
        let dir = TempDir::new().unwrap();
        let mut tracker = OutputTracker::new(dir.path().to_path_buf());
        tracker.open("", "plugin.json", &declaration()).unwrap();
        assert!(matches!(
            tracker.open("", "plugin.json", &declaration()),
            Err(BackendError::DuplicateOutput(_))
        ));
        assert!(matches!(
            tracker.open("org", "plugin", &declaration()),
            Err(BackendError::MissingExtension(_))
        ));
        assert!(!dir.path().join("org").exists());
        assert_eq!(tracker.generated().len(), 1);
    }
}
