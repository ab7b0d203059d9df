//! Parameter order and defaults of the recognized annotation types
//!
//! Annotation type definitions are not parsed; defaults come from here.

use plugdesc_config::ProcessorConfig;

use crate::value::{RawAnnotation, RawValue};

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaParam {
    pub name: String,
    pub default: Option<RawValue>,
}

/// Declared parameters of one annotation type, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSchema {
    pub type_name: String,
    pub params: Vec<SchemaParam>,
}

impl AnnotationSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        AnnotationSchema {
            type_name: type_name.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, default: Option<RawValue>) -> Self {
        self.params.push(SchemaParam {
            name: name.to_string(),
            default,
        });
        self
    }

    /// Name of the parameter at a positional argument index
    pub fn param_at(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(|p| p.name.as_str())
    }

    /// Attach defaults to an annotation that only has explicit arguments
    pub fn fill_defaults(&self, annotation: &mut RawAnnotation) {
        annotation.defaults = self
            .params
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
    }
}

/// Schema of the plugin marker annotation
pub fn plugin_schema(type_name: &str) -> AnnotationSchema {
    let empty = || Some(RawValue::Str(String::new()));
    AnnotationSchema::new(type_name)
        .param("id", None)
        .param("name", empty())
        .param("version", empty())
        .param("description", empty())
        .param("url", empty())
        .param("dependencies", Some(RawValue::Array(Vec::new())))
        .param("authors", empty())
}

/// Schema of the nested dependency annotation
pub fn dependency_schema(type_name: &str) -> AnnotationSchema {
    AnnotationSchema::new(type_name)
        .param("id", None)
        .param("optional", Some(RawValue::Bool(false)))
}

/// Every schema known to a compilation
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<AnnotationSchema>,
}

impl SchemaRegistry {
    pub fn from_config(config: &ProcessorConfig) -> Self {
        SchemaRegistry {
            schemas: vec![
                plugin_schema(&config.marker_annotation),
                dependency_schema(&config.dependency_annotation),
            ],
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&AnnotationSchema> {
        self.schemas.iter().find(|s| s.type_name == type_name)
    }

    /// Qualified names of every registered annotation type
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.type_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::*;

    #[test]
    fn test_plugin_schema_order_and_defaults() {
        let schema = plugin_schema("pkg.Plugin");
        assert_eq!(schema.param_at(0), Some("id"));
        assert_eq!(schema.param_at(2), Some("version"));
        assert_eq!(schema.param_at(6), Some("authors"));
        assert_eq!(schema.param_at(7), None);

        let mut annotation = RawAnnotation::new("pkg.Plugin");
        schema.fill_defaults(&mut annotation);
        let names: Vec<&str> = annotation
            .defaults
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(
            names.join(","),
            "name,version,description,url,dependencies,authors"
        );
    }

    #[test]
    fn test_registry_uses_configured_names() {
        let config = ProcessorConfig::default();
        let registry = SchemaRegistry::from_config(&config);
        assert!(registry.get(&config.marker_annotation).is_some());
        let dependency = registry.get(&config.dependency_annotation).unwrap();
        assert_eq!(dependency.param_at(1), Some("optional"));
        assert!(registry.get("pkg.Unknown").is_none());
    }
}
