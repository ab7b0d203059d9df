//! Annotation argument values, before and after resolution

use std::fmt;

use crate::view::AnnotationView;

/// An argument value as the source model stores it
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Array(Vec<RawValue>),
    Annotation(RawAnnotation),
    /// Reference to a named member such as a constant field or enum entry
    MemberRef {
        owner: Option<String>,
        name: String,
    },
    /// A class literal, carrying the qualified name of the referenced type
    ClassRef(String),
}

/// One annotation instance with its explicit arguments and schema defaults
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    pub type_name: String,
    pub explicit: Vec<(String, RawValue)>,
    pub defaults: Vec<(String, RawValue)>,
}

impl RawAnnotation {
    pub fn new(type_name: impl Into<String>) -> Self {
        RawAnnotation {
            type_name: type_name.into(),
            explicit: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn with_explicit(mut self, name: impl Into<String>, value: RawValue) -> Self {
        self.explicit.push((name.into(), value));
        self
    }

    pub fn with_default(mut self, name: impl Into<String>, value: RawValue) -> Self {
        self.defaults.push((name.into(), value));
        self
    }
}

/// A primitive or string argument
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
}

/// The closed set of shapes a resolved argument can take
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Scalar(Scalar),
    List(Vec<AnnotationValue>),
    Nested(AnnotationView),
    /// A referenced declaration, by name; constants are not inlined
    DeclarationRef(String),
}

impl AnnotationValue {
    /// Short shape name used in mismatch diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            AnnotationValue::Scalar(Scalar::Str(_)) => "string",
            AnnotationValue::Scalar(Scalar::Bool(_)) => "boolean",
            AnnotationValue::Scalar(Scalar::Int(_)) => "integer",
            AnnotationValue::Scalar(Scalar::Float(_)) => "float",
            AnnotationValue::Scalar(Scalar::Char(_)) => "char",
            AnnotationValue::List(_) => "list",
            AnnotationValue::Nested(_) => "annotation",
            AnnotationValue::DeclarationRef(_) => "declaration reference",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Char(c) => write!(f, "{:?}", c),
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Scalar(scalar) => write!(f, "{}", scalar),
            AnnotationValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            AnnotationValue::Nested(view) => write!(f, "@{}", view.type_name()),
            AnnotationValue::DeclarationRef(name) => write!(f, "{}", name),
        }
    }
}
