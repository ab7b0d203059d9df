use plugdesc_ast::{create_backend, ProcessingBackend, Severity, SourceFile};
use plugdesc_config::{BackendChoice, ProcessorConfig};
use plugdesc_processor::DescriptorGenerator;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CHAT_FILTER: &str = r#"package org.example;

import com.velocitypowered.api.plugin.Dependency;
import com.velocitypowered.api.plugin.Plugin;

@Plugin(
    id = "chat-filter",
    version = BuildConstants.VERSION,
    authors = {"alice"},
    dependencies = @Dependency(id = "luckperms", optional = true)
)
public class ChatFilter {
}
"#;

const BUILD_CONSTANTS: &str = r#"package org.example;

public final class BuildConstants {
    public static final String VERSION = "1.4.0";
}
"#;

const EXPECTED_JSON: &str = r#"{
  "id": "chat-filter",
  "version": "VERSION",
  "authors": [
    "alice"
  ],
  "dependencies": [
    {
      "id": "luckperms",
      "optional": true
    }
  ],
  "main": "org.example.ChatFilter"
}
"#;

fn backend(choice: BackendChoice, out: &Path) -> Box<dyn ProcessingBackend> {
    create_backend(choice, &ProcessorConfig::default(), out.to_path_buf())
}

#[test]
fn test_java_plugin_waits_for_generated_constants() {
    let dir = TempDir::new().unwrap();
    let mut backend = backend(BackendChoice::Java, dir.path());
    let generator = DescriptorGenerator::new(&ProcessorConfig::default());

    backend.begin_round(vec![SourceFile::new(
        "src/org/example/ChatFilter.java",
        CHAT_FILTER,
    )]);
    let first = generator.process_round(backend.as_mut(), Vec::new());
    assert_eq!(first.deferred.len(), 1);
    assert!(first.written.is_empty());
    assert_eq!(backend.error_count(), 0);

    backend.begin_round(vec![SourceFile::new(
        "build/generated/org/example/BuildConstants.java",
        BUILD_CONSTANTS,
    )]);
    let second = generator.process_round(backend.as_mut(), first.deferred);
    assert!(second.deferred.is_empty());
    assert_eq!(second.written.len(), 1);

    let path = dir.path().join("org/example/velocity-plugin.json");
    assert_eq!(second.written[0].path, path);
    assert_eq!(fs::read_to_string(&path).unwrap(), EXPECTED_JSON);
    assert_eq!(backend.error_count(), 0);
}

#[test]
fn test_java_output_is_reproducible() {
    let run = || {
        let dir = TempDir::new().unwrap();
        let mut backend = backend(BackendChoice::Java, dir.path());
        backend.begin_round(vec![
            SourceFile::new("src/org/example/ChatFilter.java", CHAT_FILTER),
            SourceFile::new("src/org/example/BuildConstants.java", BUILD_CONSTANTS),
        ]);
        let outcome = DescriptorGenerator::new(&ProcessorConfig::default())
            .process_round(backend.as_mut(), Vec::new());
        assert_eq!(outcome.written.len(), 1);
        fs::read(&outcome.written[0].path).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_java_invalid_second_plugin_blocks_both() {
    let dir = TempDir::new().unwrap();
    let mut backend = backend(BackendChoice::Java, dir.path());
    backend.begin_round(vec![
        SourceFile::new(
            "src/a/First.java",
            "package a;\nimport com.velocitypowered.api.plugin.Plugin;\n@Plugin(id = \"first\")\npublic class First {}\n",
        ),
        SourceFile::new(
            "src/b/Second.java",
            "package b;\nimport com.velocitypowered.api.plugin.Plugin;\n@Plugin(id = \"Not_Valid\")\npublic class Second {}\n",
        ),
    ]);
    let outcome = DescriptorGenerator::new(&ProcessorConfig::default())
        .process_round(backend.as_mut(), Vec::new());

    assert!(outcome.blocked);
    assert!(outcome.written.is_empty());
    assert!(!dir.path().join("a").exists());
    assert!(!dir.path().join("b").exists());

    let errors: Vec<_> = backend
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    let location = errors[0].location.as_ref().unwrap();
    assert_eq!(location.file, Path::new("src/b/Second.java"));
    assert_eq!(location.line, 3);
}

#[test]
fn test_kotlin_object_plugin_goes_to_resources() {
    let dir = TempDir::new().unwrap();
    let mut backend = backend(BackendChoice::Kotlin, dir.path());
    backend.begin_round(vec![SourceFile::new(
        "src/main/kotlin/org/example/Economy.kt",
        r#"package org.example

import com.velocitypowered.api.plugin.Dependency
import com.velocitypowered.api.plugin.Plugin

@Plugin(
    "economy",
    "Economy",
    authors = ["carol", "dave"],
    dependencies = [Dependency("vault"), Dependency(id = "luckperms", optional = true)]
)
object Economy
"#,
    )]);
    let outcome = DescriptorGenerator::new(&ProcessorConfig::default())
        .process_round(backend.as_mut(), Vec::new());
    assert_eq!(backend.error_count(), 0);
    assert_eq!(outcome.written.len(), 1);

    let written = &outcome.written[0];
    assert_eq!(
        written.path,
        dir.path()
            .join("resources/org/example/velocity-plugin.json")
    );
    let descriptor = &written.descriptor;
    assert_eq!(descriptor.id, "economy");
    assert_eq!(descriptor.name.as_deref(), Some("Economy"));
    assert_eq!(descriptor.main, "org.example.Economy");
    assert_eq!(descriptor.authors, vec!["carol", "dave"]);
    let deps: Vec<(&str, bool)> = descriptor
        .dependencies
        .iter()
        .map(|d| (d.id.as_str(), d.optional))
        .collect();
    assert_eq!(deps, vec![("vault", false), ("luckperms", true)]);
}

#[test]
fn test_java_method_target_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut backend = backend(BackendChoice::Java, dir.path());
    backend.begin_round(vec![SourceFile::new(
        "src/org/example/Main.java",
        "package org.example;\nimport com.velocitypowered.api.plugin.Plugin;\npublic class Main {\n  @Plugin(id = \"main\")\n  void start() {}\n}\n",
    )]);
    let outcome = DescriptorGenerator::new(&ProcessorConfig::default())
        .process_round(backend.as_mut(), Vec::new());
    assert!(outcome.written.is_empty());
    assert!(!outcome.blocked);
    assert_eq!(backend.error_count(), 1);
    assert!(backend.diagnostics()[0]
        .message
        .contains("'start' is a method"));
}
