//! Reading a descriptor out of the marker annotation

use plugdesc_ast::{AnnotationView, TypeMismatch};
use plugdesc_descriptor::{DependencyDescriptor, PluginDescriptor};

/// Build the descriptor for the class `main` from its marker annotation
///
/// Absent text fields and blank defaults read as absent. A version the
/// author wrote out is kept as written, blank or not, so validation can
/// reject it.
pub fn extract_descriptor(
    view: &AnnotationView,
    main: impl Into<String>,
) -> Result<PluginDescriptor, TypeMismatch> {
    let id = view.get::<String>("id")?.unwrap_or_default();

    let mut descriptor = PluginDescriptor::new(id, main)
        .with_name(view.get("name")?)
        .with_description(view.get("description")?)
        .with_url(view.get("url")?)
        .with_authors(view.get_list::<String>("authors")?.unwrap_or_default())
        .with_dependencies(extract_dependencies(view)?);

    let version = view.get::<String>("version")?;
    if view.is_explicit("version") {
        descriptor.version = version;
    } else {
        descriptor = descriptor.with_version(version);
    }

    Ok(descriptor)
}

fn extract_dependencies(view: &AnnotationView) -> Result<Vec<DependencyDescriptor>, TypeMismatch> {
    let Some(dependencies) = view.get_list::<AnnotationView>("dependencies")? else {
        return Ok(Vec::new());
    };
    dependencies
        .iter()
        .map(|dependency| {
            let id = dependency.get::<String>("id").map_err(nested_key)?;
            let optional = dependency.get::<bool>("optional").map_err(nested_key)?;
            Ok(DependencyDescriptor::new(
                id.unwrap_or_default(),
                optional.unwrap_or(false),
            ))
        })
        .collect()
}

fn nested_key(mut mismatch: TypeMismatch) -> TypeMismatch {
    mismatch.key = format!("dependencies.{}", mismatch.key);
    mismatch
}
