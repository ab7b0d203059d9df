//! State shared by both backends: scanned files, the type index and the
//! conversion of parsed annotations into raw values

use std::path::{Path, PathBuf};
use tracing::debug;

use plugdesc_config::ProcessorConfig;

use crate::backend::{BackendError, Declaration, DeclarationKind};
use crate::diagnostics::{DiagnosticLog, Severity};
use crate::output::OutputTracker;
use crate::schema::SchemaRegistry;
use crate::scope::{FileScope, ImplicitScope, TypeIndex, TypeResolver};
use crate::syntax::{parse_modifiers, Arg, Dialect, Expr, ParsedAnnotation};
use crate::value::{RawAnnotation, RawValue};
use crate::view::AnnotationView;

/// A declaration as a backend's scanner reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDeclaration {
    pub kind: DeclarationKind,
    pub simple_name: String,
    /// Simple names of the enclosing types, outermost first
    pub enclosing: Vec<String>,
    pub offset: usize,
    pub line: usize,
    /// Source text of each annotation on the declaration, `@` included
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub scope: FileScope,
    pub declarations: Vec<ScannedDeclaration>,
}

#[derive(Debug)]
struct Entry {
    decl: Declaration,
    file: usize,
    qualified: String,
    /// Qualified names of the enclosing types, innermost first; a type
    /// declaration lists itself first
    enclosing: Vec<String>,
    annotations: Vec<ParsedAnnotation>,
}

/// One compilation: every file fed so far, across rounds
#[derive(Debug)]
pub struct Compilation {
    dialect: Dialect,
    implicit: &'static ImplicitScope,
    marker: String,
    schemas: SchemaRegistry,
    scopes: Vec<FileScope>,
    entries: Vec<Entry>,
    index: TypeIndex,
    round_start: usize,
    pub log: DiagnosticLog,
    pub outputs: OutputTracker,
}

const ARRAY_BUILDERS: &[&str] = &["arrayOf", "emptyArray"];

fn is_array_builder(callee: &[String]) -> bool {
    match callee {
        [name] => ARRAY_BUILDERS.contains(&name.as_str()) || name.ends_with("ArrayOf"),
        _ => false,
    }
}

/// 1-based line of a byte offset
pub fn line_of(content: &str, offset: usize) -> usize {
    content
        .get(..offset)
        .map_or(1, |before| before.matches('\n').count() + 1)
}

fn simple_name(written: &str) -> &str {
    written.rsplit('.').next().unwrap_or(written)
}

/// Type name of an annotation usage as written, `field:` style targets skipped
fn written_annotation_name(text: &str) -> Option<String> {
    let body = text.trim_start().strip_prefix('@')?.trim_start();
    let body = match body.split_once(':') {
        Some((target, rest)) if target.chars().all(char::is_alphanumeric) => rest.trim_start(),
        _ => body,
    };
    let name: String = body
        .chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'))
        .collect();
    let name = name.trim_end_matches('.');
    (!name.is_empty()).then(|| name.to_string())
}

impl Compilation {
    pub fn new(
        config: &ProcessorConfig,
        dialect: Dialect,
        implicit: &'static ImplicitScope,
        output_root: PathBuf,
    ) -> Self {
        let schemas = SchemaRegistry::from_config(config);
        let mut index = TypeIndex::default();
        for name in schemas.type_names() {
            index.add_closed_classpath(name);
        }
        for package in &config.library_packages {
            index.add_library_package(package);
        }
        Compilation {
            dialect,
            implicit,
            marker: config.marker_annotation.clone(),
            schemas,
            scopes: Vec::new(),
            entries: Vec::new(),
            index,
            round_start: 0,
            log: DiagnosticLog::default(),
            outputs: OutputTracker::new(output_root),
        }
    }

    pub fn marker_simple_name(&self) -> &str {
        simple_name(&self.marker)
    }

    /// Register the files of a new round
    pub fn add_round(&mut self, files: Vec<ScannedFile>) {
        self.round_start = self.entries.len();

        for file in &files {
            self.index.add_source_package(&file.scope.package);
            for scanned in &file.declarations {
                if scanned.kind.declares_type() {
                    let qualified = qualify(&file.scope, &scanned.enclosing, &scanned.simple_name);
                    self.index.add_declared(qualified, &file.scope.package);
                }
            }
        }

        for file in files {
            let file_index = self.scopes.len();
            for scanned in file.declarations {
                self.add_entry(file_index, &file.path, &file.scope, scanned);
            }
            self.scopes.push(file.scope);
        }

        debug!(
            "Round registered {} declaration(s); {} type(s) known",
            self.entries.len() - self.round_start,
            self.index.len()
        );
    }

    fn add_entry(
        &mut self,
        file: usize,
        path: &Path,
        scope: &FileScope,
        scanned: ScannedDeclaration,
    ) {
        let qualified = qualify(scope, &scanned.enclosing, &scanned.simple_name);
        let mut enclosing: Vec<String> = (1..=scanned.enclosing.len())
            .rev()
            .map(|depth| {
                qualify(
                    scope,
                    &scanned.enclosing[..depth - 1],
                    &scanned.enclosing[depth - 1],
                )
            })
            .collect();
        if scanned.kind.declares_type() {
            enclosing.insert(0, qualified.clone());
        }

        let decl = Declaration::new(
            self.entries.len(),
            scanned.kind,
            scanned.simple_name,
            scope.package.clone(),
            path.to_path_buf(),
            scanned.line,
            scanned.offset,
        );

        let mut annotations = Vec::new();
        for text in &scanned.annotations {
            match parse_modifiers(text, self.dialect) {
                Ok(parsed) => annotations.extend(parsed),
                Err(err) => {
                    let name = written_annotation_name(text);
                    let resolver = TypeResolver {
                        index: &self.index,
                        scope,
                        enclosing: &enclosing,
                        implicit: self.implicit,
                    };
                    let is_marker = name.as_deref().is_some_and(|name| {
                        resolver.resolve(name).qualified() == Some(self.marker.as_str())
                    });
                    let message = format!(
                        "could not read @{}: {}",
                        name.as_deref().unwrap_or("annotation"),
                        err
                    );
                    let severity = if is_marker {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    self.log.push(severity, &message, Some(&decl), Vec::new());
                }
            }
        }

        self.entries.push(Entry {
            decl,
            file,
            qualified,
            enclosing,
            annotations,
        });
    }

    fn resolver<'a>(&'a self, entry: &'a Entry) -> TypeResolver<'a> {
        TypeResolver {
            index: &self.index,
            scope: &self.scopes[entry.file],
            enclosing: &entry.enclosing,
            implicit: self.implicit,
        }
    }

    fn entry(&self, decl: &Declaration) -> Result<&Entry, BackendError> {
        self.entries
            .get(decl.id())
            .filter(|entry| entry.decl == *decl)
            .ok_or_else(|| {
                BackendError::InternalConsistency(format!(
                    "declaration '{}' was not issued by this backend",
                    decl.simple_name()
                ))
            })
    }

    fn marker_of<'a>(&'a self, entry: &'a Entry) -> Option<&'a ParsedAnnotation> {
        let resolver = self.resolver(entry);
        entry
            .annotations
            .iter()
            .find(|a| resolver.resolve(&a.name).qualified() == Some(self.marker.as_str()))
    }

    /// Marked declarations registered by the latest round, in source order
    pub fn annotated_in_round(&self) -> Vec<Declaration> {
        let mut found: Vec<Declaration> = self.entries[self.round_start..]
            .iter()
            .filter(|entry| self.marker_of(entry).is_some())
            .map(|entry| entry.decl.clone())
            .collect();
        found.sort();
        found
    }

    pub fn qualified_name(&self, decl: &Declaration) -> Result<&str, BackendError> {
        self.entry(decl).map(|entry| entry.qualified.as_str())
    }

    pub fn is_resolvable(&self, decl: &Declaration) -> bool {
        let Ok(entry) = self.entry(decl) else {
            return false;
        };
        let Some(marker) = self.marker_of(entry) else {
            return false;
        };
        let resolver = self.resolver(entry);
        marker
            .args
            .iter()
            .all(|arg| self.expr_resolvable(&arg.value, &resolver))
    }

    fn expr_resolvable(&self, expr: &Expr, resolver: &TypeResolver<'_>) -> bool {
        match expr {
            Expr::Str(_) | Expr::Char(_) | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) => true,
            Expr::Array(items) | Expr::Concat(items) => {
                items.iter().all(|i| self.expr_resolvable(i, resolver))
            }
            Expr::Annotation(nested) => {
                resolver.resolve(&nested.name).is_resolved()
                    && self.args_resolvable(&nested.args, resolver)
            }
            Expr::Call { callee, args } => {
                (is_array_builder(callee) || resolver.resolve(&callee.join(".")).is_resolved())
                    && self.args_resolvable(args, resolver)
            }
            Expr::ClassLiteral(path) => resolver.resolve(&path.join(".")).is_resolved(),
            Expr::Path(path) => match path.split_last() {
                Some((name, [])) => resolver.member_resolvable(name),
                Some((_, owner)) => {
                    let owner = owner.join(".");
                    // lowercase owner: a package-level member
                    simple_name(&owner).starts_with(char::is_lowercase)
                        || resolver.resolve(&owner).is_resolved()
                }
                None => true,
            },
        }
    }

    fn args_resolvable(&self, args: &[Arg], resolver: &TypeResolver<'_>) -> bool {
        args.iter()
            .all(|arg| self.expr_resolvable(&arg.value, resolver))
    }

    pub fn marker_view(&self, decl: &Declaration) -> Result<AnnotationView, BackendError> {
        let entry = self.entry(decl)?;
        let marker = self.marker_of(entry).ok_or_else(|| {
            BackendError::InternalConsistency(format!(
                "'{}' does not carry @{}",
                entry.qualified, self.marker
            ))
        })?;
        let resolver = self.resolver(entry);
        let raw = self.convert_annotation(&marker.name, &marker.args, &resolver);
        Ok(AnnotationView::from_raw(&raw))
    }

    fn convert_annotation(
        &self,
        written: &str,
        args: &[Arg],
        resolver: &TypeResolver<'_>,
    ) -> RawAnnotation {
        let type_name = resolver
            .resolve(written)
            .qualified()
            .map_or_else(|| written.to_string(), str::to_string);
        let schema = self.schemas.get(&type_name);

        let mut annotation = RawAnnotation::new(type_name.clone());
        let mut position = 0;
        for arg in args {
            let name = match &arg.name {
                Some(name) => name.clone(),
                None => {
                    let name = match self.dialect {
                        Dialect::Java => "value".to_string(),
                        Dialect::Kotlin => schema
                            .and_then(|s| s.param_at(position))
                            .map(str::to_string)
                            .unwrap_or_else(|| {
                                if position == 0 {
                                    "value".to_string()
                                } else {
                                    format!("arg{}", position)
                                }
                            }),
                    };
                    position += 1;
                    name
                }
            };
            annotation
                .explicit
                .push((name, self.convert_expr(&arg.value, resolver)));
        }
        if let Some(schema) = schema {
            schema.fill_defaults(&mut annotation);
        }
        annotation
    }

    fn convert_expr(&self, expr: &Expr, resolver: &TypeResolver<'_>) -> RawValue {
        match expr {
            Expr::Str(s) => RawValue::Str(s.clone()),
            Expr::Char(c) => RawValue::Char(*c),
            Expr::Bool(b) => RawValue::Bool(*b),
            Expr::Int(i) => RawValue::Int(*i),
            Expr::Float(x) => RawValue::Float(*x),
            Expr::Array(items) => RawValue::Array(
                items
                    .iter()
                    .map(|item| self.convert_expr(item, resolver))
                    .collect(),
            ),
            Expr::Annotation(nested) => {
                RawValue::Annotation(self.convert_annotation(&nested.name, &nested.args, resolver))
            }
            Expr::Call { callee, args } if is_array_builder(callee) => RawValue::Array(
                args.iter()
                    .map(|arg| self.convert_expr(&arg.value, resolver))
                    .collect(),
            ),
            Expr::Call { callee, args } => {
                RawValue::Annotation(self.convert_annotation(&callee.join("."), args, resolver))
            }
            Expr::ClassLiteral(path) => {
                let written = path.join(".");
                let qualified = resolver
                    .resolve(&written)
                    .qualified()
                    .map_or(written.clone(), str::to_string);
                RawValue::ClassRef(qualified)
            }
            Expr::Path(path) => match path.split_last() {
                Some((name, [])) => RawValue::MemberRef {
                    owner: None,
                    name: name.clone(),
                },
                Some((name, owner)) => {
                    let written = owner.join(".");
                    let owner = resolver
                        .resolve(&written)
                        .qualified()
                        .map_or(written.clone(), str::to_string);
                    RawValue::MemberRef {
                        owner: Some(owner),
                        name: name.clone(),
                    }
                }
                None => RawValue::Str(String::new()),
            },
            Expr::Concat(parts) => RawValue::Str(parts.iter().map(concat_text).collect()),
        }
    }
}

/// Text of one part of an unfolded concatenation; references contribute
/// their simple name
fn concat_text(part: &Expr) -> String {
    match part {
        Expr::Str(s) => s.clone(),
        Expr::Char(c) => c.to_string(),
        Expr::Int(i) => i.to_string(),
        Expr::Float(x) => x.to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Path(path) => path.last().cloned().unwrap_or_default(),
        Expr::Concat(parts) => parts.iter().map(concat_text).collect(),
        _ => String::new(),
    }
}

fn qualify(scope: &FileScope, enclosing: &[String], name: &str) -> String {
    let mut segments: Vec<&str> = Vec::with_capacity(enclosing.len() + 2);
    if !scope.package.is_empty() {
        segments.push(&scope.package);
    }
    segments.extend(enclosing.iter().map(String::as_str));
    segments.push(name);
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use crate::compilation::*;
    use crate::scope::{Import, JAVA_LANG, KOTLIN};
    use crate::value::AnnotationValue;

    fn scanned(
        kind: DeclarationKind,
        name: &str,
        enclosing: &[&str],
        offset: usize,
        annotations: &[&str],
    ) -> ScannedDeclaration {
        ScannedDeclaration {
            kind,
            simple_name: name.to_string(),
            enclosing: enclosing.iter().map(|s| s.to_string()).collect(),
            offset,
            line: 1,
            annotations: annotations.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn file(
        path: &str,
        package: &str,
        imports: &[&str],
        declarations: Vec<ScannedDeclaration>,
    ) -> ScannedFile {
        ScannedFile {
            path: PathBuf::from(path),
            scope: FileScope {
                package: package.to_string(),
                imports: imports.iter().filter_map(|i| Import::parse(i)).collect(),
            },
            declarations,
        }
    }

    fn java_compilation() -> Compilation {
        Compilation::new(
            &ProcessorConfig::default(),
            Dialect::Java,
            &JAVA_LANG,
            PathBuf::from("out"),
        )
    }

    const IMPORT: &str = "import com.velocitypowered.api.plugin.Plugin;";
    const PLUGIN_MAIN: &str = r#"@Plugin(id = "main")"#;

    #[test]
    fn test_marker_found_and_qualified() {
        let mut compilation = java_compilation();
        compilation.add_round(vec![file(
            "src/Main.java",
            "org.example",
            &[IMPORT],
            vec![
                scanned(DeclarationKind::Class, "Main", &[], 0, &[PLUGIN_MAIN]),
                scanned(
                    DeclarationKind::Class,
                    "Inner",
                    &["Main"],
                    50,
                    &["@Deprecated"],
                ),
            ],
        )]);

        let found = compilation.annotated_in_round();
        assert_eq!(found.len(), 1);
        assert_eq!(
            compilation.qualified_name(&found[0]).unwrap(),
            "org.example.Main"
        );
        assert!(compilation.is_resolvable(&found[0]));

        let view = compilation.marker_view(&found[0]).unwrap();
        assert_eq!(view.type_name(), "com.velocitypowered.api.plugin.Plugin");
        assert_eq!(view.get::<String>("id").unwrap().as_deref(), Some("main"));
        assert!(!view.is_explicit("version"));
        assert_eq!(view.get::<String>("version").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_unimported_marker_is_ignored() {
        let mut compilation = java_compilation();
        compilation.add_round(vec![file(
            "src/Main.java",
            "org.example",
            &["import org.other.Plugin;"],
            vec![scanned(
                DeclarationKind::Class,
                "Main",
                &[],
                0,
                &[r#"@Plugin(id = "main")"#],
            )],
        )]);
        assert!(compilation.annotated_in_round().is_empty());
    }

    #[test]
    fn test_generated_reference_defers_until_declared() {
        let mut compilation = java_compilation();
        compilation.add_round(vec![file(
            "src/Main.java",
            "org.example",
            &[IMPORT],
            vec![scanned(
                DeclarationKind::Class,
                "Main",
                &[],
                0,
                &[r#"@Plugin(id = "main", version = BuildConstants.VERSION)"#],
            )],
        )]);
        let main = compilation.annotated_in_round().remove(0);
        assert!(!compilation.is_resolvable(&main));

        compilation.add_round(vec![file(
            "gen/BuildConstants.java",
            "org.example",
            &[],
            vec![scanned(DeclarationKind::Class, "BuildConstants", &[], 0, &[])],
        )]);
        assert!(compilation.annotated_in_round().is_empty());
        assert!(compilation.is_resolvable(&main));
        let view = compilation.marker_view(&main).unwrap();
        assert_eq!(
            view.get::<String>("version").unwrap().as_deref(),
            Some("VERSION")
        );
        match view.value("version") {
            Some(AnnotationValue::DeclarationRef(name)) => assert_eq!(name, "VERSION"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_kotlin_positional_arguments_follow_schema() {
        let mut compilation = Compilation::new(
            &ProcessorConfig::default(),
            Dialect::Kotlin,
            &KOTLIN,
            PathBuf::from("out"),
        );
        compilation.add_round(vec![file(
            "src/Main.kt",
            "org.example",
            &[
                "import com.velocitypowered.api.plugin.Plugin",
                "import com.velocitypowered.api.plugin.Dependency",
            ],
            vec![scanned(
                DeclarationKind::Class,
                "Main",
                &[],
                0,
                &[r#"@Plugin("main", "Main Plugin", dependencies = [Dependency("economy", true)])"#],
            )],
        )]);
        let main = compilation.annotated_in_round().remove(0);
        let view = compilation.marker_view(&main).unwrap();
        assert_eq!(view.get::<String>("id").unwrap().as_deref(), Some("main"));
        assert_eq!(
            view.get::<String>("name").unwrap().as_deref(),
            Some("Main Plugin")
        );
        let deps = view
            .get_list::<AnnotationView>("dependencies")
            .unwrap()
            .unwrap();
        assert_eq!(
            deps[0].type_name(),
            "com.velocitypowered.api.plugin.Dependency"
        );
        assert_eq!(
            deps[0].get::<String>("id").unwrap().as_deref(),
            Some("economy")
        );
        assert_eq!(deps[0].get::<bool>("optional").unwrap(), Some(true));
    }

    #[test]
    fn test_unparsable_marker_modifiers_are_errors() {
        let mut compilation = java_compilation();
        compilation.add_round(vec![file(
            "src/Main.java",
            "org.example",
            &[IMPORT],
            vec![scanned(
                DeclarationKind::Class,
                "Main",
                &[],
                0,
                &[r#"@Plugin(id = "oops)"#],
            )],
        )]);
        assert!(compilation.annotated_in_round().is_empty());
        assert_eq!(compilation.log.count(Severity::Error), 1);
    }

    #[test]
    fn test_unreadable_sibling_annotation_is_skipped() {
        let mut compilation = java_compilation();
        compilation.add_round(vec![file(
            "src/Main.java",
            "org.example",
            &[IMPORT],
            vec![scanned(
                DeclarationKind::Class,
                "Main",
                &[],
                0,
                &[
                    r#"@Plugin(id = "main")"#,
                    "@Priority(Integer.MAX_VALUE - 1)",
                ],
            )],
        )]);

        let found = compilation.annotated_in_round();
        assert_eq!(found.len(), 1);
        assert!(compilation.is_resolvable(&found[0]));
        assert_eq!(compilation.log.count(Severity::Error), 0);
        assert_eq!(compilation.log.count(Severity::Warning), 1);
        let message = &compilation.log.entries()[0].message;
        assert!(message.starts_with("could not read @Priority"));
    }

    #[test]
    fn test_written_annotation_names() {
        assert_eq!(
            written_annotation_name("@Plugin(id = 1)").as_deref(),
            Some("Plugin")
        );
        assert_eq!(
            written_annotation_name("@field:com.example.Inject").as_deref(),
            Some("com.example.Inject")
        );
        assert_eq!(written_annotation_name("Plugin"), None);
    }

    #[test]
    fn test_marker_package_wildcard_does_not_invent_constants() {
        let mut compilation = java_compilation();
        compilation.add_round(vec![file(
            "src/Main.java",
            "org.example",
            &["import com.velocitypowered.api.plugin.*;"],
            vec![scanned(
                DeclarationKind::Class,
                "Main",
                &[],
                0,
                &[r#"@Plugin(id = "main", version = BuildConstants.VERSION)"#],
            )],
        )]);
        let main = compilation.annotated_in_round().remove(0);
        assert!(!compilation.is_resolvable(&main));
    }

    #[test]
    fn test_foreign_declaration_is_internal_error() {
        let compilation = java_compilation();
        let stray = Declaration::new(
            7,
            DeclarationKind::Class,
            "Stray",
            "pkg",
            PathBuf::from("Stray.java"),
            1,
            0,
        );
        assert!(matches!(
            compilation.marker_view(&stray),
            Err(BackendError::InternalConsistency(_))
        ));
        assert!(!compilation.is_resolvable(&stray));
    }
}
