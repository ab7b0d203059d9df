//! The processing-environment abstraction shared by both backends

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;


use crate::diagnostics::{Diagnostic, Severity};
use crate::output::{GeneratedFile, OutputSink};
use crate::sources::SourceFile;
use crate::view::AnnotationView;

/// Syntactic kind of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    Record,
    AnnotationType,
    Object,
    CompanionObject,
    Method,
    Constructor,
    Field,
    Function,
    Property,
}

impl DeclarationKind {
    /// Kinds that declare a type and so enter the type index
    pub fn declares_type(self) -> bool {
        !matches!(
            self,
            DeclarationKind::Method
                | DeclarationKind::Constructor
                | DeclarationKind::Field
                | DeclarationKind::Function
                | DeclarationKind::Property
        )
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Record => "record",
            DeclarationKind::AnnotationType => "annotation type",
            DeclarationKind::Object => "object",
            DeclarationKind::CompanionObject => "companion object",
            DeclarationKind::Method => "method",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Field => "field",
            DeclarationKind::Function => "function",
            DeclarationKind::Property => "property",
        };
        write!(f, "{}", label)
    }
}

/// Opaque handle to a declaration owned by a backend
///
/// Handles stay valid across rounds of the backend that issued them and
/// order by source file, then position in that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    id: usize,
    kind: DeclarationKind,
    simple_name: String,
    package: String,
    source: PathBuf,
    line: usize,
    offset: usize,
}

impl Declaration {
    pub fn new(
        id: usize,
        kind: DeclarationKind,
        simple_name: impl Into<String>,
        package: impl Into<String>,
        source: PathBuf,
        line: usize,
        offset: usize,
    ) -> Self {
        Declaration {
            id,
            kind,
            simple_name: simple_name.into(),
            package: package.into(),
            source,
            line,
            offset,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Package of the file the declaration lives in
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Ord for Declaration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then(self.offset.cmp(&other.offset))
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Declaration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("@{annotation} may only be applied to classes, but '{name}' is a {kind}")]
    MisusedTarget {
        annotation: String,
        name: String,
        kind: DeclarationKind,
    },

    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("output file name '{0}' has no extension")]
    MissingExtension(String),

    #[error("output {0:?} was already created in this compilation")]
    DuplicateOutput(PathBuf),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A compiler's declaration and annotation model, seen through the
/// operations the descriptor generator needs
pub trait ProcessingBackend {
    /// Feed the source files that are new in this round
    fn begin_round(&mut self, sources: Vec<SourceFile>);

    /// Declarations from this round's sources that carry the marker
    /// annotation, in source order
    fn find_annotated_declarations(&self) -> Vec<Declaration>;

    /// Whether every type the marker's arguments reference is known now
    fn is_resolvable(&self, decl: &Declaration) -> bool;

    fn qualified_name(&self, decl: &Declaration) -> Result<String, BackendError>;

    fn find_marker_annotation(&self, decl: &Declaration) -> Result<AnnotationView, BackendError>;

    /// Open a generated file placed by `package_hint` and tracked against
    /// the source file of `depends_on`
    fn open_output(
        &mut self,
        package_hint: &str,
        file_name: &str,
        depends_on: &Declaration,
    ) -> Result<OutputSink, BackendError>;

    /// Where `open_output` would put a file, without creating it
    fn output_path(&self, package_hint: &str, file_name: &str) -> PathBuf;

    fn log_notice(&mut self, message: &str, decl: Option<&Declaration>);

    fn log_warning(&mut self, message: &str, decl: Option<&Declaration>);

    fn log_error(
        &mut self,
        message: &str,
        decl: Option<&Declaration>,
        cause: Option<&(dyn Error + 'static)>,
    );

    fn diagnostics(&self) -> &[Diagnostic];

    fn generated(&self) -> &[GeneratedFile];

    fn error_count(&self) -> usize {
        self.diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}
