//! Annotation model and source backends
//!
//! This crate reads plugin marker annotations out of Java and Kotlin sources:
//! 1. `ast-grep` parses each file and the backend records its declarations
//!    and import scope
//! 2. Each annotation's arguments are parsed into raw values ([`RawValue`]),
//!    one annotation at a time, with defaults taken from an [`AnnotationSchema`]
//! 3. [`AnnotationView`] gives typed access to the resolved values
//!
//! Both backends implement [`ProcessingBackend`], the only surface the
//! descriptor generator depends on.
pub mod backend;
pub mod compilation;
pub mod diagnostics;
pub mod java;
pub mod kotlin;
pub mod output;
pub mod resolver;
pub mod schema;
pub mod scope;
pub mod sources;
pub mod syntax;
pub mod value;
pub mod view;

use std::path::PathBuf;

use plugdesc_config::{BackendChoice, ProcessorConfig};

pub use backend::{BackendError, Declaration, DeclarationKind, ProcessingBackend};
pub use diagnostics::{Diagnostic, Location, Severity};
pub use java::JavaBackend;
pub use kotlin::KotlinBackend;
pub use output::{GeneratedFile, OutputSink};
pub use resolver::AnnotationValueResolver;
pub use schema::AnnotationSchema;
pub use sources::{discover_sources, source_extension, SourceFile};
pub use value::{AnnotationValue, RawAnnotation, RawValue, Scalar};
pub use view::{AnnotationView, FromAnnotationValue, TypeMismatch};

/// Build the backend selected in the configuration
pub fn create_backend(
    choice: BackendChoice,
    config: &ProcessorConfig,
    output_dir: PathBuf,
) -> Box<dyn ProcessingBackend> {
    match choice {
        BackendChoice::Java => Box::new(JavaBackend::new(config, output_dir)),
        BackendChoice::Kotlin => Box::new(KotlinBackend::new(config, output_dir)),
    }
}
