//! Unboxing raw argument values into [`AnnotationValue`] shapes

use crate::value::{AnnotationValue, RawValue, Scalar};
use crate::view::AnnotationView;

/// Stateless converter from [`RawValue`] to [`AnnotationValue`]
///
/// Member references resolve to the member's simple name; the constant
/// behind them is never looked up.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationValueResolver;

impl AnnotationValueResolver {
    pub fn resolve(&self, raw: &RawValue) -> AnnotationValue {
        match raw {
            RawValue::Str(s) => AnnotationValue::Scalar(Scalar::Str(s.clone())),
            RawValue::Bool(b) => AnnotationValue::Scalar(Scalar::Bool(*b)),
            RawValue::Int(i) => AnnotationValue::Scalar(Scalar::Int(*i)),
            RawValue::Float(x) => AnnotationValue::Scalar(Scalar::Float(*x)),
            RawValue::Char(c) => AnnotationValue::Scalar(Scalar::Char(*c)),
            RawValue::Array(items) => {
                AnnotationValue::List(items.iter().map(|item| self.resolve(item)).collect())
            }
            RawValue::Annotation(annotation) => {
                AnnotationValue::Nested(AnnotationView::from_raw(annotation))
            }
            RawValue::MemberRef { name, .. } => AnnotationValue::DeclarationRef(name.clone()),
            RawValue::ClassRef(qualified) => AnnotationValue::DeclarationRef(qualified.clone()),
        }
    }

    /// Resolve a value requested as a list; a single value becomes a singleton
    pub fn resolve_list(&self, raw: &RawValue) -> Vec<AnnotationValue> {
        match self.resolve(raw) {
            AnnotationValue::List(items) => items,
            single => vec![single],
        }
    }
}
