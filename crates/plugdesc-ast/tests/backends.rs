use plugdesc_ast::{
    create_backend, AnnotationView, BackendError, ProcessingBackend, Severity, SourceFile,
};
use plugdesc_config::{BackendChoice, ProcessorConfig};
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn java_backend(dir: &TempDir) -> Box<dyn ProcessingBackend> {
    create_backend(
        BackendChoice::Java,
        &ProcessorConfig::default(),
        dir.path().to_path_buf(),
    )
}

#[test]
fn test_wildcard_and_fully_qualified_markers() {
    let dir = TempDir::new().unwrap();
    let mut backend = java_backend(&dir);
    backend.begin_round(vec![
        SourceFile::new(
            "src/a/Wild.java",
            "package a;\nimport com.velocitypowered.api.plugin.*;\n@Plugin(id = \"wild\")\npublic class Wild {}\n",
        ),
        SourceFile::new(
            "src/b/Full.java",
            "package b;\n@com.velocitypowered.api.plugin.Plugin(id = \"full\")\nclass Full {}\n",
        ),
        SourceFile::new(
            "src/c/Other.java",
            "package c;\nimport org.other.*;\n@Plugin(id = \"other\")\nclass Other {}\n",
        ),
    ]);

    let found = backend.find_annotated_declarations();
    let names: Vec<String> = found
        .iter()
        .map(|d| backend.qualified_name(d).unwrap())
        .collect();
    assert_eq!(names, vec!["a.Wild".to_string(), "b.Full".to_string()]);
}

#[test]
fn test_unsupported_sibling_annotation_keeps_the_marker() {
    let dir = TempDir::new().unwrap();
    let mut backend = java_backend(&dir);
    backend.begin_round(vec![SourceFile::new(
        "src/org/example/Main.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.Plugin;\n@Plugin(id = \"main\") @Priority(Integer.MAX_VALUE - 1)\npublic class Main {}\n",
    )]);

    let found = backend.find_annotated_declarations();
    assert_eq!(found.len(), 1);
    assert!(backend.is_resolvable(&found[0]));
    assert_eq!(backend.error_count(), 0);
    let warnings: Vec<_> = backend
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("@Priority"));

    let view = backend.find_marker_annotation(&found[0]).unwrap();
    assert_eq!(view.get::<String>("id").unwrap().as_deref(), Some("main"));
}

#[test]
fn test_kotlin_unsupported_sibling_annotation_keeps_the_marker() {
    let dir = TempDir::new().unwrap();
    let mut backend = create_backend(
        BackendChoice::Kotlin,
        &ProcessorConfig::default(),
        dir.path().to_path_buf(),
    );
    backend.begin_round(vec![SourceFile::new(
        "src/Main.kt",
        "package org.example\n\nimport com.velocitypowered.api.plugin.Plugin\n\n@Priority(Int.MAX_VALUE * 2)\n@Plugin(id = \"main\")\nclass Main\n",
    )]);
    let found = backend.find_annotated_declarations();
    assert_eq!(found.len(), 1);
    assert_eq!(backend.error_count(), 0);
}

#[test]
fn test_marker_wildcard_import_still_defers_missing_constants() {
    let dir = TempDir::new().unwrap();
    let mut backend = java_backend(&dir);
    backend.begin_round(vec![SourceFile::new(
        "src/org/example/Main.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.*;\n@Plugin(id = \"main\", version = BuildConstants.VERSION)\nclass Main {}\n",
    )]);
    let main = backend.find_annotated_declarations().remove(0);
    assert!(!backend.is_resolvable(&main));

    backend.begin_round(vec![SourceFile::new(
        "gen/org/example/BuildConstants.java",
        "package org.example;\nfinal class BuildConstants {\n  static final String VERSION = \"2.0\";\n}\n",
    )]);
    assert!(backend.is_resolvable(&main));
}

#[test]
fn test_configured_library_wildcard_supplies_types() {
    let dir = TempDir::new().unwrap();
    let source = SourceFile::new(
        "src/org/example/Main.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.Plugin;\nimport org.acme.build.*;\n@Plugin(id = \"main\", version = Versions.CURRENT)\nclass Main {}\n",
    );

    let mut closed = java_backend(&dir);
    closed.begin_round(vec![source.clone()]);
    let main = closed.find_annotated_declarations().remove(0);
    assert!(!closed.is_resolvable(&main));

    let config = ProcessorConfig {
        library_packages: vec!["org.acme.build".to_string()],
        ..ProcessorConfig::default()
    };
    let mut open = create_backend(BackendChoice::Java, &config, dir.path().to_path_buf());
    open.begin_round(vec![source]);
    let main = open.find_annotated_declarations().remove(0);
    assert!(open.is_resolvable(&main));
}

#[test]
fn test_nested_class_qualified_name() {
    let dir = TempDir::new().unwrap();
    let mut backend = java_backend(&dir);
    backend.begin_round(vec![SourceFile::new(
        "src/org/example/Outer.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.Plugin;\npublic class Outer {\n  @Plugin(id = \"inner\")\n  public static class Inner {}\n}\n",
    )]);
    let found = backend.find_annotated_declarations();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line(), 4);
    assert_eq!(
        backend.qualified_name(&found[0]).unwrap(),
        "org.example.Outer.Inner"
    );
}

#[test]
fn test_deferred_declaration_resolves_in_later_round() {
    let dir = TempDir::new().unwrap();
    let mut backend = java_backend(&dir);
    backend.begin_round(vec![SourceFile::new(
        "src/org/example/Main.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.Plugin;\n@Plugin(id = \"main\", version = BuildConstants.VERSION)\npublic class Main {}\n",
    )]);
    let main = backend.find_annotated_declarations().remove(0);
    assert!(!backend.is_resolvable(&main));

    backend.begin_round(vec![SourceFile::new(
        "gen/org/example/BuildConstants.java",
        "package org.example;\npublic final class BuildConstants {\n  public static final String VERSION = \"1.2.3\";\n}\n",
    )]);
    assert!(backend.find_annotated_declarations().is_empty());
    assert!(backend.is_resolvable(&main));

    let view: AnnotationView = backend.find_marker_annotation(&main).unwrap();
    assert_eq!(
        view.get::<String>("version").unwrap().as_deref(),
        Some("VERSION")
    );
}

#[test]
fn test_open_output_tracks_source_and_refuses_duplicates() {
    let dir = TempDir::new().unwrap();
    let mut backend = java_backend(&dir);
    backend.begin_round(vec![SourceFile::new(
        "src/org/example/Main.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.Plugin;\n@Plugin(id = \"main\")\npublic class Main {}\n",
    )]);
    let main = backend.find_annotated_declarations().remove(0);

    let mut sink = backend
        .open_output("org.example", "velocity-plugin.json", &main)
        .unwrap();
    sink.write_all(b"{}\n").unwrap();
    sink.finish().unwrap();

    let expected = dir.path().join("org/example/velocity-plugin.json");
    assert_eq!(fs::read_to_string(&expected).unwrap(), "{}\n");
    assert_eq!(backend.generated().len(), 1);
    assert_eq!(
        backend.generated()[0].source.to_str(),
        Some("src/org/example/Main.java")
    );

    assert!(matches!(
        backend.open_output("org.example", "velocity-plugin.json", &main),
        Err(BackendError::DuplicateOutput(_))
    ));
    assert!(matches!(
        backend.open_output("org.example", "descriptor", &main),
        Err(BackendError::MissingExtension(_))
    ));
}

#[test]
fn test_kotlin_backend_same_package_marker() {
    let dir = TempDir::new().unwrap();
    let mut backend = create_backend(
        BackendChoice::Kotlin,
        &ProcessorConfig::default(),
        dir.path().to_path_buf(),
    );
    backend.begin_round(vec![SourceFile::new(
        "src/Main.kt",
        "package com.velocitypowered.api.plugin\n\n@Plugin(\"same-package\")\nobject Main\n",
    )]);
    let found = backend.find_annotated_declarations();
    assert_eq!(found.len(), 1);
    assert_eq!(
        backend.qualified_name(&found[0]).unwrap(),
        "com.velocitypowered.api.plugin.Main"
    );
    let view = backend.find_marker_annotation(&found[0]).unwrap();
    assert_eq!(
        view.get::<String>("id").unwrap().as_deref(),
        Some("same-package")
    );
}
