use std::io;
use std::path::PathBuf;
use thiserror::Error;

use plugdesc_ast::{BackendError, TypeMismatch};
use plugdesc_descriptor::DescriptorError;

/// Why one declaration produced no descriptor
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("duplicate plugin id '{id}', already declared by {first}")]
    DuplicateId { id: String, first: String },

    #[error("could not write descriptor to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
