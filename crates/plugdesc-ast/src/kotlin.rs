//! Symbol-resolution backend over Kotlin sources

use ast_grep_core::source::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::Kotlin;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

use plugdesc_config::ProcessorConfig;

use crate::backend::{BackendError, Declaration, DeclarationKind, ProcessingBackend};
use crate::compilation::{line_of, Compilation, ScannedDeclaration, ScannedFile};
use crate::diagnostics::{cause_chain, Diagnostic, Severity};
use crate::output::{GeneratedFile, OutputSink};
use crate::scope::{parse_package, FileScope, Import, KOTLIN};
use crate::sources::SourceFile;
use crate::syntax::Dialect;
use crate::view::AnnotationView;

type KotlinNode<'r> = Node<'r, StrDoc<Kotlin>>;

/// Directory under the output root that receives resources
pub const RESOURCES_DIR: &str = "resources";

/// Backend modelled on KSP's symbol API
///
/// Every class declaration kind counts as a class, interfaces and objects
/// included. Generated files are resources.
#[derive(Debug)]
pub struct KotlinBackend {
    compilation: Compilation,
}

impl KotlinBackend {
    pub fn new(config: &ProcessorConfig, output_dir: PathBuf) -> Self {
        KotlinBackend {
            compilation: Compilation::new(
                config,
                Dialect::Kotlin,
                &KOTLIN,
                output_dir.join(RESOURCES_DIR),
            ),
        }
    }

    pub fn scan(source: &SourceFile) -> ScannedFile {
        let start = Instant::now();
        let grep = AstGrep::new(source.content.as_str(), Kotlin);
        let root = grep.root();

        let mut scope = FileScope::default();
        let mut declarations = Vec::new();
        for node in root.dfs() {
            let kind = node.kind();
            match kind.as_ref() {
                "package_header" => {
                    if let Some(package) = parse_package(&node.text()) {
                        scope.package = package;
                    }
                }
                "import_header" => {
                    if let Some(import) = Import::parse(&node.text()) {
                        scope.imports.push(import);
                    }
                }
                other => {
                    let Some(decl_kind) = declaration_kind(&node, other) else {
                        continue;
                    };
                    let Some(name) = declaration_name(&node, decl_kind) else {
                        continue;
                    };
                    let offset = node.range().start;
                    declarations.push(ScannedDeclaration {
                        kind: decl_kind,
                        simple_name: name,
                        enclosing: enclosing_types(&node),
                        offset,
                        line: line_of(&source.content, offset),
                        annotations: annotation_texts(&node),
                    });
                }
            }
        }

        debug!(
            "Scanned {:?}: {} declaration(s) in {:.3}ms",
            source.path,
            declarations.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        ScannedFile {
            path: source.path.clone(),
            scope,
            declarations,
        }
    }
}

fn modifiers_node<'r>(node: &KotlinNode<'r>) -> Option<KotlinNode<'r>> {
    node.children().find(|child| child.kind() == "modifiers")
}

/// Each annotation of the declaration's modifier list, as written
fn annotation_texts(node: &KotlinNode<'_>) -> Vec<String> {
    modifiers_node(node)
        .map(|modifiers| {
            modifiers
                .children()
                .filter(|child| child.kind() == "annotation")
                .map(|annotation| annotation.text().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn has_class_modifier(node: &KotlinNode<'_>, modifier: &str) -> bool {
    modifiers_node(node).is_some_and(|modifiers| {
        modifiers
            .children()
            .any(|child| child.kind() == "class_modifier" && child.text().trim() == modifier)
    })
}

fn declaration_kind(node: &KotlinNode<'_>, node_kind: &str) -> Option<DeclarationKind> {
    let kind = match node_kind {
        "class_declaration" => {
            if node.children().any(|child| child.kind() == "interface") {
                DeclarationKind::Interface
            } else if has_class_modifier(node, "enum") {
                DeclarationKind::Enum
            } else if has_class_modifier(node, "annotation") {
                DeclarationKind::AnnotationType
            } else {
                DeclarationKind::Class
            }
        }
        "object_declaration" => DeclarationKind::Object,
        "companion_object" => DeclarationKind::CompanionObject,
        "function_declaration" => DeclarationKind::Function,
        "property_declaration" => DeclarationKind::Property,
        _ => return None,
    };
    Some(kind)
}

fn first_child_text(node: &KotlinNode<'_>, kind: &str) -> Option<String> {
    node.children()
        .find(|child| child.kind() == kind)
        .map(|child| child.text().to_string())
}

fn declaration_name(node: &KotlinNode<'_>, kind: DeclarationKind) -> Option<String> {
    match kind {
        DeclarationKind::Function => first_child_text(node, "simple_identifier"),
        DeclarationKind::Property => node
            .children()
            .find(|child| child.kind() == "variable_declaration")
            .and_then(|declaration| first_child_text(&declaration, "simple_identifier")),
        DeclarationKind::CompanionObject => {
            let name = first_child_text(node, "type_identifier");
            Some(name.unwrap_or_else(|| "Companion".to_string()))
        }
        _ => first_child_text(node, "type_identifier"),
    }
}

fn enclosing_types(node: &KotlinNode<'_>) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        let parent_kind = parent.kind();
        if let Some(kind) = declaration_kind(&parent, &parent_kind) {
            if kind.declares_type() {
                if let Some(name) = declaration_name(&parent, kind) {
                    names.push(name);
                }
            }
        }
        current = parent.parent();
    }
    names.reverse();
    names
}

impl ProcessingBackend for KotlinBackend {
    fn begin_round(&mut self, sources: Vec<SourceFile>) {
        let scanned = sources.iter().map(KotlinBackend::scan).collect();
        self.compilation.add_round(scanned);
    }

    fn find_annotated_declarations(&self) -> Vec<Declaration> {
        self.compilation.annotated_in_round()
    }

    fn is_resolvable(&self, decl: &Declaration) -> bool {
        self.compilation.is_resolvable(decl)
    }

    fn qualified_name(&self, decl: &Declaration) -> Result<String, BackendError> {
        let qualified = self.compilation.qualified_name(decl)?;
        if !decl.kind().declares_type() {
            return Err(BackendError::MisusedTarget {
                annotation: self.compilation.marker_simple_name().to_string(),
                name: decl.simple_name().to_string(),
                kind: decl.kind(),
            });
        }
        Ok(qualified.to_string())
    }

    fn find_marker_annotation(&self, decl: &Declaration) -> Result<AnnotationView, BackendError> {
        self.compilation.marker_view(decl)
    }

    fn open_output(
        &mut self,
        package_hint: &str,
        file_name: &str,
        depends_on: &Declaration,
    ) -> Result<OutputSink, BackendError> {
        self.compilation
            .outputs
            .open(package_hint, file_name, depends_on)
    }

    fn output_path(&self, package_hint: &str, file_name: &str) -> PathBuf {
        self.compilation
            .outputs
            .resolve_path(package_hint, file_name)
    }

    fn log_notice(&mut self, message: &str, decl: Option<&Declaration>) {
        self.compilation
            .log
            .push(Severity::Notice, message, decl, Vec::new());
    }

    fn log_warning(&mut self, message: &str, decl: Option<&Declaration>) {
        self.compilation
            .log
            .push(Severity::Warning, message, decl, Vec::new());
    }

    fn log_error(
        &mut self,
        message: &str,
        decl: Option<&Declaration>,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        let causes = cause.map(cause_chain).unwrap_or_default();
        self.compilation
            .log
            .push(Severity::Error, message, decl, causes);
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        self.compilation.log.entries()
    }

    fn generated(&self) -> &[GeneratedFile] {
        self.compilation.outputs.generated()
    }
}

#[cfg(test)]
mod tests {
    use crate::kotlin::*;

    const MAIN: &str = r#"package org.example

import com.velocitypowered.api.plugin.Dependency
import com.velocitypowered.api.plugin.Plugin

@Plugin(
    id = "chat-filter",
    version = "1.0",
    authors = ["alice"],
    dependencies = [Dependency(id = "luckperms", optional = true)]
)
class ChatFilter {
    companion object {
        const val LIMIT = 3
    }

    fun onEnable() {}
}

@Plugin(id = "service")
interface Service
"#;

    #[test]
    fn test_scan_reads_kotlin_declarations() {
        let file = KotlinBackend::scan(&SourceFile::new("src/ChatFilter.kt", MAIN));
        assert_eq!(file.scope.package, "org.example");
        assert_eq!(file.scope.imports.len(), 2);

        let names: Vec<(&str, DeclarationKind)> = file
            .declarations
            .iter()
            .map(|d| (d.simple_name.as_str(), d.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("ChatFilter", DeclarationKind::Class),
                ("Companion", DeclarationKind::CompanionObject),
                ("LIMIT", DeclarationKind::Property),
                ("onEnable", DeclarationKind::Function),
                ("Service", DeclarationKind::Interface),
            ]
        );
        assert_eq!(
            file.declarations[2].enclosing,
            vec!["ChatFilter".to_string(), "Companion".to_string()]
        );
    }

    #[test]
    fn test_interfaces_are_class_like() {
        let mut backend = KotlinBackend::new(&ProcessorConfig::default(), PathBuf::from("out"));
        backend.begin_round(vec![SourceFile::new("src/ChatFilter.kt", MAIN)]);
        let found = backend.find_annotated_declarations();
        assert_eq!(found.len(), 2);
        assert_eq!(
            backend.qualified_name(&found[1]).unwrap(),
            "org.example.Service"
        );

        let view = backend.find_marker_annotation(&found[0]).unwrap();
        let deps = view
            .get_list::<AnnotationView>("dependencies")
            .unwrap()
            .unwrap();
        assert_eq!(
            deps[0].get::<String>("id").unwrap().as_deref(),
            Some("luckperms")
        );
    }

    #[test]
    fn test_outputs_go_to_resources() {
        let backend = KotlinBackend::new(&ProcessorConfig::default(), PathBuf::from("out"));
        assert_eq!(
            backend.output_path("org.example", "velocity-plugin.json"),
            PathBuf::from("out/resources/org/example/velocity-plugin.json")
        );
    }

    #[test]
    fn test_log_error_attaches_cause() {
        let mut backend = KotlinBackend::new(&ProcessorConfig::default(), PathBuf::from("out"));
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        backend.log_error("could not write", None, Some(&cause));
        assert_eq!(backend.diagnostics().len(), 1);
        assert_eq!(
            backend.diagnostics()[0].causes,
            vec!["disk full".to_string()]
        );
    }
}
