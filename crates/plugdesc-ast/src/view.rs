//! Typed, merged access to one annotation instance

use std::collections::BTreeMap;
use thiserror::Error;

use crate::resolver::AnnotationValueResolver;
use crate::value::{AnnotationValue, RawAnnotation, RawValue, Scalar};

/// A typed accessor found a value of the wrong shape
#[derive(Error, Debug, Clone, PartialEq)]
#[error("annotation argument '{key}' should be {expected}, found {} {actual}", actual.shape())]
pub struct TypeMismatch {
    pub key: String,
    pub expected: &'static str,
    pub actual: AnnotationValue,
}

/// Conversion from a resolved value into a concrete Rust type
pub trait FromAnnotationValue: Sized {
    const EXPECTED: &'static str;

    /// Returns the value back when the shape does not fit
    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue>;
}

/// Explicit and default arguments of a single annotation instance
///
/// Explicit arguments shadow defaults of the same name. A key present in
/// neither map reads as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationView {
    type_name: String,
    explicit: BTreeMap<String, RawValue>,
    defaults: BTreeMap<String, RawValue>,
}

impl AnnotationView {
    pub fn new(
        type_name: impl Into<String>,
        explicit: impl IntoIterator<Item = (String, RawValue)>,
        defaults: impl IntoIterator<Item = (String, RawValue)>,
    ) -> Self {
        let explicit: BTreeMap<String, RawValue> = explicit.into_iter().collect();
        let defaults = defaults
            .into_iter()
            .filter(|(name, _)| !explicit.contains_key(name))
            .collect();
        AnnotationView {
            type_name: type_name.into(),
            explicit,
            defaults,
        }
    }

    pub fn from_raw(annotation: &RawAnnotation) -> Self {
        AnnotationView::new(
            annotation.type_name.clone(),
            annotation.explicit.iter().cloned(),
            annotation.defaults.iter().cloned(),
        )
    }

    /// Qualified name of the annotation type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_explicit(&self, key: &str) -> bool {
        self.explicit.contains_key(key)
    }

    fn lookup(&self, key: &str) -> Option<&RawValue> {
        self.explicit.get(key).or_else(|| self.defaults.get(key))
    }

    /// Resolved value under `key`, without any type assertion
    pub fn value(&self, key: &str) -> Option<AnnotationValue> {
        let raw = self.lookup(key)?;
        Some(AnnotationValueResolver.resolve(raw))
    }

    pub fn get<T: FromAnnotationValue>(&self, key: &str) -> Result<Option<T>, TypeMismatch> {
        let Some(value) = self.value(key) else {
            return Ok(None);
        };
        T::from_annotation_value(value)
            .map(Some)
            .map_err(|actual| mismatch::<T>(key, actual))
    }

    /// Like [`get`](Self::get) for list-valued keys; a single matching value
    /// reads as a one-element list
    pub fn get_list<T: FromAnnotationValue>(
        &self,
        key: &str,
    ) -> Result<Option<Vec<T>>, TypeMismatch> {
        let Some(raw) = self.lookup(key) else {
            return Ok(None);
        };
        AnnotationValueResolver
            .resolve_list(raw)
            .into_iter()
            .map(|item| T::from_annotation_value(item).map_err(|v| mismatch::<T>(key, v)))
            .collect::<Result<Vec<T>, TypeMismatch>>()
            .map(Some)
    }
}

fn mismatch<T: FromAnnotationValue>(key: &str, actual: AnnotationValue) -> TypeMismatch {
    TypeMismatch {
        key: key.to_string(),
        expected: T::EXPECTED,
        actual,
    }
}

impl FromAnnotationValue for String {
    const EXPECTED: &'static str = "string";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        match value {
            AnnotationValue::Scalar(Scalar::Str(s)) => Ok(s),
            AnnotationValue::DeclarationRef(name) => Ok(name),
            other => Err(other),
        }
    }
}

impl FromAnnotationValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        match value {
            AnnotationValue::Scalar(Scalar::Bool(b)) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromAnnotationValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        match value {
            AnnotationValue::Scalar(Scalar::Int(i)) => Ok(i),
            other => Err(other),
        }
    }
}

impl FromAnnotationValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        match value {
            AnnotationValue::Scalar(Scalar::Float(x)) => Ok(x),
            other => Err(other),
        }
    }
}

impl FromAnnotationValue for char {
    const EXPECTED: &'static str = "char";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        match value {
            AnnotationValue::Scalar(Scalar::Char(c)) => Ok(c),
            other => Err(other),
        }
    }
}

impl FromAnnotationValue for AnnotationView {
    const EXPECTED: &'static str = "annotation";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        match value {
            AnnotationValue::Nested(view) => Ok(view),
            other => Err(other),
        }
    }
}

impl FromAnnotationValue for AnnotationValue {
    const EXPECTED: &'static str = "any value";

    fn from_annotation_value(value: AnnotationValue) -> Result<Self, AnnotationValue> {
        Ok(value)
    }
}
