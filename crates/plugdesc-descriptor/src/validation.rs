//! Descriptor-level validation
//!
//! Every violation found is collected so the author sees all of them at once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::errors::DescriptorError;
use crate::types::PluginDescriptor;

/// Shape every plugin id must have
pub const ID_PATTERN: &str = "[a-z][a-z0-9_-]{0,63}";

static ID_REGEX: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(&format!("^{}$", ID_PATTERN)));

/// Check an id against [`ID_PATTERN`]
pub fn is_valid_id(id: &str) -> bool {
    ID_REGEX.as_ref().is_ok_and(|re| re.is_match(id))
}

/// Schema-level rules that are not fixed by the id pattern
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub reserved_ids: Vec<String>,
}

impl ValidationRules {
    pub fn new(reserved_ids: impl IntoIterator<Item = String>) -> Self {
        ValidationRules {
            reserved_ids: reserved_ids.into_iter().collect(),
        }
    }

    fn is_reserved(&self, id: &str) -> bool {
        self.reserved_ids.iter().any(|reserved| reserved == id)
    }
}

/// A single reason a descriptor may not be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorViolation {
    InvalidId(String),
    ReservedId(String),
    BlankMain,
    BlankVersion,
    MalformedVersion(String),
    InvalidDependencyId(String),
    DuplicateDependency(String),
    SelfDependency(String),
}

impl fmt::Display for DescriptorViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorViolation::InvalidId(id) => write!(
                f,
                "Invalid ID '{}'. IDs must start alphabetically, have lowercase alphanumeric \
                 characters, and can contain dashes or underscores ({})",
                id, ID_PATTERN
            ),
            DescriptorViolation::ReservedId(id) => {
                write!(f, "ID '{}' is reserved and cannot be used by a plugin", id)
            }
            DescriptorViolation::BlankMain => write!(f, "main class name is blank"),
            DescriptorViolation::BlankVersion => {
                write!(f, "version was given explicitly but is blank")
            }
            DescriptorViolation::MalformedVersion(version) => write!(
                f,
                "version '{}' must not contain whitespace or control characters",
                version.escape_debug()
            ),
            DescriptorViolation::InvalidDependencyId(id) => {
                write!(f, "dependency ID '{}' is not a valid plugin ID", id)
            }
            DescriptorViolation::DuplicateDependency(id) => {
                write!(f, "dependency '{}' is declared more than once", id)
            }
            DescriptorViolation::SelfDependency(id) => {
                write!(f, "plugin '{}' cannot depend on itself", id)
            }
        }
    }
}

/// Check a descriptor against the id pattern and the schema rules
pub fn validate(
    descriptor: &PluginDescriptor,
    rules: &ValidationRules,
) -> Result<(), DescriptorError> {
    let violations = collect_violations(descriptor, rules);
    if violations.is_empty() {
        return Ok(());
    }

    debug!(
        "Descriptor '{}' failed validation with {} violation(s)",
        descriptor.id,
        violations.len()
    );
    Err(DescriptorError::Invalid {
        id: descriptor.id.clone(),
        violations,
    })
}

fn collect_violations(
    descriptor: &PluginDescriptor,
    rules: &ValidationRules,
) -> Vec<DescriptorViolation> {
    let mut violations = Vec::new();

    if !is_valid_id(&descriptor.id) {
        violations.push(DescriptorViolation::InvalidId(descriptor.id.clone()));
    } else if rules.is_reserved(&descriptor.id) {
        violations.push(DescriptorViolation::ReservedId(descriptor.id.clone()));
    }

    if descriptor.main.trim().is_empty() {
        violations.push(DescriptorViolation::BlankMain);
    }

    if let Some(version) = &descriptor.version {
        if version.trim().is_empty() {
            violations.push(DescriptorViolation::BlankVersion);
        } else if version
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            violations.push(DescriptorViolation::MalformedVersion(version.clone()));
        }
    }

    let mut seen = HashSet::new();
    for dependency in &descriptor.dependencies {
        if !is_valid_id(&dependency.id) {
            violations.push(DescriptorViolation::InvalidDependencyId(
                dependency.id.clone(),
            ));
        } else if dependency.id == descriptor.id {
            violations.push(DescriptorViolation::SelfDependency(dependency.id.clone()));
        } else if !seen.insert(dependency.id.as_str()) {
            violations.push(DescriptorViolation::DuplicateDependency(
                dependency.id.clone(),
            ));
        }
    }

    violations
}
