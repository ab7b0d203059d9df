//! Descriptor records
//!
//! Field order here is the field order of the serialized file, so keep it
//! stable: consumers diff these files across builds.

use serde::{Deserialize, Serialize};

/// Metadata describing one plugin entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
    /// Qualified name of the plugin's main class
    pub main: String,
}

/// A dependency on another plugin, by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    pub id: String,
    #[serde(default)]
    pub optional: bool,
}

impl PluginDescriptor {
    /// Start a descriptor holding only the required fields
    ///
    /// The `with_*` setters normalise blank text to absent and drop blank authors.
    pub fn new(id: impl Into<String>, main: impl Into<String>) -> Self {
        PluginDescriptor {
            id: id.into(),
            name: None,
            version: None,
            description: None,
            url: None,
            authors: Vec::new(),
            dependencies: Vec::new(),
            main: main.into(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = empty_to_none(name);
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = empty_to_none(version);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = empty_to_none(description);
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = empty_to_none(url);
        self
    }

    pub fn with_authors(mut self, authors: impl IntoIterator<Item = String>) -> Self {
        self.authors = authors
            .into_iter()
            .filter(|author| !author.is_empty())
            .collect();
        self
    }

    pub fn with_dependencies(
        mut self,
        dependencies: impl IntoIterator<Item = DependencyDescriptor>,
    ) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }
}

impl DependencyDescriptor {
    pub fn new(id: impl Into<String>, optional: bool) -> Self {
        DependencyDescriptor {
            id: id.into(),
            optional,
        }
    }
}

fn empty_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::types::*;

    #[test]
    fn test_blank_optionals_become_absent() {
        let descriptor = PluginDescriptor::new("chat-filter", "pkg.Main")
            .with_name(Some(String::new()))
            .with_version(Some("1.0".to_string()))
            .with_url(None);

        assert_eq!(descriptor.name, None);
        assert_eq!(descriptor.version.as_deref(), Some("1.0"));
        assert_eq!(descriptor.url, None);
    }

    #[test]
    fn test_blank_authors_are_dropped() {
        let descriptor = PluginDescriptor::new("chat-filter", "pkg.Main").with_authors(vec![
            String::new(),
            "alice".to_string(),
            String::new(),
            "bob".to_string(),
        ]);
        assert_eq!(descriptor.authors, vec!["alice", "bob"]);
    }
}
