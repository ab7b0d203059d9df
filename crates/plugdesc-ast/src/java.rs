//! Declaration-based backend over Java sources

use ast_grep_core::source::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::Java;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

use plugdesc_config::ProcessorConfig;

use crate::backend::{BackendError, Declaration, DeclarationKind, ProcessingBackend};
use crate::compilation::{line_of, Compilation, ScannedDeclaration, ScannedFile};
use crate::diagnostics::{cause_chain, Diagnostic, Severity};
use crate::output::{GeneratedFile, OutputSink};
use crate::scope::{parse_package, FileScope, Import, JAVA_LANG};
use crate::sources::SourceFile;
use crate::syntax::Dialect;
use crate::view::AnnotationView;

type JavaNode<'r> = Node<'r, StrDoc<Java>>;

const ANNOTATION_KINDS: [&str; 2] = ["annotation", "marker_annotation"];

/// Backend modelled on javac's element API
///
/// Generated files land under the class-output root, in the directory of
/// their package.
#[derive(Debug)]
pub struct JavaBackend {
    compilation: Compilation,
}

impl JavaBackend {
    pub fn new(config: &ProcessorConfig, output_dir: PathBuf) -> Self {
        JavaBackend {
            compilation: Compilation::new(config, Dialect::Java, &JAVA_LANG, output_dir),
        }
    }

    /// Parse one file into its scope and declarations
    pub fn scan(source: &SourceFile) -> ScannedFile {
        let start = Instant::now();
        let grep = AstGrep::new(source.content.as_str(), Java);
        let root = grep.root();

        let mut scope = FileScope::default();
        let mut declarations = Vec::new();
        for node in root.dfs() {
            let kind = node.kind();
            match kind.as_ref() {
                "package_declaration" => {
                    if let Some(package) = parse_package(&node.text()) {
                        scope.package = package;
                    }
                }
                "import_declaration" => {
                    if let Some(import) = Import::parse(&node.text()) {
                        scope.imports.push(import);
                    }
                }
                other => {
                    let Some(decl_kind) = declaration_kind(other) else {
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

    fn is_class_like(kind: DeclarationKind) -> bool {
        matches!(
            kind,
            DeclarationKind::Class | DeclarationKind::Enum | DeclarationKind::Record
        )
    }
}

fn declaration_kind(node_kind: &str) -> Option<DeclarationKind> {
    let kind = match node_kind {
        "class_declaration" => DeclarationKind::Class,
        "interface_declaration" => DeclarationKind::Interface,
        "enum_declaration" => DeclarationKind::Enum,
        "record_declaration" => DeclarationKind::Record,
        "annotation_type_declaration" => DeclarationKind::AnnotationType,
        "method_declaration" => DeclarationKind::Method,
        "constructor_declaration" => DeclarationKind::Constructor,
        "field_declaration" => DeclarationKind::Field,
        _ => return None,
    };
    Some(kind)
}

fn first_child_text(node: &JavaNode<'_>, kind: &str) -> Option<String> {
    node.children()
        .find(|child| child.kind() == kind)
        .map(|child| child.text().to_string())
}

fn declaration_name(node: &JavaNode<'_>, kind: DeclarationKind) -> Option<String> {
    if kind == DeclarationKind::Field {
        return node
            .children()
            .find(|child| child.kind() == "variable_declarator")
            .and_then(|declarator| first_child_text(&declarator, "identifier"));
    }
    first_child_text(node, "identifier")
}

/// Each annotation of the declaration's modifier list, as written
fn annotation_texts(node: &JavaNode<'_>) -> Vec<String> {
    node.children()
        .filter(|child| child.kind() == "modifiers")
        .flat_map(|modifiers| {
            modifiers
                .children()
                .filter(|child| ANNOTATION_KINDS.iter().any(|kind| child.kind() == *kind))
                .map(|annotation| annotation.text().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Simple names of the enclosing type declarations, outermost first
fn enclosing_types(node: &JavaNode<'_>) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        if let Some(kind) = declaration_kind(&parent.kind()) {
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

impl ProcessingBackend for JavaBackend {
    fn begin_round(&mut self, sources: Vec<SourceFile>) {
        let scanned = sources.iter().map(JavaBackend::scan).collect();
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
        if !JavaBackend::is_class_like(decl.kind()) {
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

    /// The cause goes out as its own unattributed error, trace style
    fn log_error(
        &mut self,
        message: &str,
        decl: Option<&Declaration>,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        self.compilation
            .log
            .push(Severity::Error, message, decl, Vec::new());
        if let Some(cause) = cause {
            let mut chain = cause_chain(cause);
            let head = chain.remove(0);
            self.compilation.log.push(
                Severity::Error,
                &format!("caused by: {}", head),
                None,
                chain,
            );
        }
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        self.compilation.log.entries()
    }

    fn generated(&self) -> &[GeneratedFile] {
        self.compilation.outputs.generated()
    }
}
