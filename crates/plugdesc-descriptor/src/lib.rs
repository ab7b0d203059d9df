//! Plugin descriptor model
//!
//! This crate holds the record emitted for every plugin entry point: the
//! [`PluginDescriptor`] type, the checks a descriptor must pass before it may be
//! published ([`validate`]), and the order-stable JSON form consumed by the
//! runtime plugin loader ([`writer`]).

pub mod errors;
pub mod types;
pub mod validation;
pub mod writer;

pub use errors::DescriptorError;
pub use types::{DependencyDescriptor, PluginDescriptor};
pub use validation::{is_valid_id, validate, DescriptorViolation, ValidationRules, ID_PATTERN};
pub use writer::{to_json, write_descriptor};
