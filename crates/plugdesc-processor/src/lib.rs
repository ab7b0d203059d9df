//! Descriptor generation
//!
//! [`DescriptorGenerator::process_round`] is one round of annotation
//! processing: it reads the marker annotation of every ready declaration,
//! validates the resulting descriptors and writes them through the backend.
//! Declarations that cannot be resolved yet come back in
//! [`RoundOutcome::deferred`] for the caller to retry.
//!
//! Output is fail-closed: one invalid descriptor means no file is written
//! for the whole round.

pub mod errors;
pub mod extract;
pub mod generator;

pub use errors::GenerateError;
pub use extract::extract_descriptor;
pub use generator::{DescriptorGenerator, RoundOutcome, WrittenDescriptor};
