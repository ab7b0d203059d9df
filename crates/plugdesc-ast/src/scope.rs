//! Import scopes and the type index standing in for compiler symbol tables

use std::collections::BTreeSet;

/// One `import` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    pub wildcard: bool,
    pub is_static: bool,
}

impl Import {
    /// Parse the text of an import line in either language
    pub fn parse(text: &str) -> Option<Import> {
        let body = strip_comments(text);
        let body = body.trim().strip_prefix("import")?.trim();
        let body = body.trim_end_matches(';').trim();
        let (body, is_static) = match body.strip_prefix("static ") {
            Some(rest) => (rest.trim(), true),
            None => (body, false),
        };
        let (path, alias) = match body.split_once(" as ") {
            Some((path, alias)) => (path, Some(alias.trim().to_string())),
            None => (body, None),
        };
        let path: String = path.chars().filter(|c| !c.is_whitespace()).collect();
        let (path, wildcard) = match path.strip_suffix(".*") {
            Some(base) => (base.to_string(), true),
            None => (path, false),
        };
        if path.is_empty() {
            return None;
        }
        Some(Import {
            path,
            alias,
            wildcard,
            is_static,
        })
    }

    /// Name this import binds in the file, for non-wildcard imports
    pub fn bound_name(&self) -> Option<&str> {
        if self.wildcard {
            return None;
        }
        self.alias
            .as_deref()
            .or_else(|| self.path.rsplit('.').next())
    }
}

/// Parse the text of a package line, `package a.b;` or `package a.b`
pub fn parse_package(text: &str) -> Option<String> {
    let body = strip_comments(text);
    let name: String = body
        .trim()
        .strip_prefix("package")?
        .trim()
        .trim_end_matches(';')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    Some(name)
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map_or("", |i| &after[i..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |i| &after[i + 2..]);
            out.push(' ');
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// Package and imports of one source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScope {
    pub package: String,
    pub imports: Vec<Import>,
}

impl FileScope {
    pub fn qualify(&self, name: &str) -> String {
        if self.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.package, name)
        }
    }
}

/// Types every file sees without imports
#[derive(Debug, Clone, Copy)]
pub struct ImplicitScope {
    pub package: &'static str,
    pub names: &'static [&'static str],
}

pub const JAVA_LANG: ImplicitScope = ImplicitScope {
    package: "java.lang",
    names: &[
        "Boolean",
        "Byte",
        "Character",
        "Class",
        "Deprecated",
        "Double",
        "Enum",
        "Error",
        "Exception",
        "Float",
        "FunctionalInterface",
        "Integer",
        "Iterable",
        "Long",
        "Math",
        "Number",
        "Object",
        "Override",
        "Record",
        "Runnable",
        "RuntimeException",
        "SafeVarargs",
        "Short",
        "String",
        "StringBuilder",
        "SuppressWarnings",
        "System",
        "Thread",
        "Throwable",
        "Void",
    ],
};

pub const KOTLIN: ImplicitScope = ImplicitScope {
    package: "kotlin",
    names: &[
        "Any",
        "Array",
        "Boolean",
        "Byte",
        "Char",
        "Comparable",
        "Deprecated",
        "Double",
        "Enum",
        "Exception",
        "Float",
        "Int",
        "Lazy",
        "Long",
        "Nothing",
        "Number",
        "Pair",
        "Short",
        "String",
        "Suppress",
        "Throwable",
        "Triple",
        "Unit",
    ],
};

/// Outcome of looking up a type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Declared in a source file fed so far
    Source(String),
    /// Assumed present on the compile classpath
    Classpath(String),
    /// Not known yet; may be generated by a later round
    Unresolved,
}

impl Resolution {
    pub fn qualified(&self) -> Option<&str> {
        match self {
            Resolution::Source(name) | Resolution::Classpath(name) => Some(name),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }
}

/// Every type declared in the compilation so far, plus known library types
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    declared: BTreeSet<String>,
    source_packages: BTreeSet<String>,
    classpath: BTreeSet<String>,
    /// Packages whose members are all in `classpath`
    closed_packages: BTreeSet<String>,
    /// Packages whose wildcard imports may supply unknown capitalized names
    library_packages: BTreeSet<String>,
}

impl TypeIndex {
    pub fn add_declared(&mut self, qualified: String, package: &str) {
        self.source_packages.insert(package.to_string());
        self.declared.insert(qualified);
    }

    pub fn add_source_package(&mut self, package: &str) {
        self.source_packages.insert(package.to_string());
    }

    /// Register a library type that is on the classpath
    pub fn add_classpath(&mut self, qualified: &str) {
        self.classpath.insert(qualified.to_string());
    }

    /// Register a library type and treat its package as fully known
    pub fn add_closed_classpath(&mut self, qualified: &str) {
        if let Some((package, _)) = qualified.rsplit_once('.') {
            self.closed_packages.insert(package.to_string());
        }
        self.add_classpath(qualified);
    }

    pub fn add_library_package(&mut self, package: &str) {
        self.library_packages.insert(package.to_string());
    }

    /// Whether a wildcard import of `package` may supply names the index
    /// has never seen
    fn is_open_library(&self, package: &str) -> bool {
        self.library_packages.contains(package)
            && !self.closed_packages.contains(package)
            && !self.source_packages.contains(package)
            && !self.declared.contains(package)
    }

    pub fn is_declared(&self, qualified: &str) -> bool {
        self.declared.contains(qualified)
    }

    pub fn is_source_package(&self, package: &str) -> bool {
        self.source_packages.contains(package)
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    fn known(&self, qualified: &str) -> Option<Resolution> {
        if self.declared.contains(qualified) {
            Some(Resolution::Source(qualified.to_string()))
        } else if self.classpath.contains(qualified) {
            Some(Resolution::Classpath(qualified.to_string()))
        } else {
            None
        }
    }

    /// Classify a fully qualified name
    ///
    /// A name under a declared type, or directly inside a source package
    /// or a closed library package, that is not itself known cannot exist
    /// yet.
    pub fn classify(&self, qualified: &str) -> Resolution {
        if let Some(known) = self.known(qualified) {
            return known;
        }
        let mut prefix = qualified;
        let mut first = true;
        while let Some((parent, _)) = prefix.rsplit_once('.') {
            let package_is_known = self.source_packages.contains(parent)
                || self.closed_packages.contains(parent);
            if self.declared.contains(parent) || (first && package_is_known) {
                return Resolution::Unresolved;
            }
            first = false;
            prefix = parent;
        }
        if !qualified.contains('.') && self.source_packages.contains("") {
            return Resolution::Unresolved;
        }
        Resolution::Classpath(qualified.to_string())
    }
}

/// Name lookup from one position in one file
pub struct TypeResolver<'a> {
    pub index: &'a TypeIndex,
    pub scope: &'a FileScope,
    /// Qualified names of the enclosing types, innermost first
    pub enclosing: &'a [String],
    pub implicit: &'a ImplicitScope,
}

impl TypeResolver<'_> {
    /// Resolve a type name as written: simple, nested or fully qualified
    pub fn resolve(&self, written: &str) -> Resolution {
        let (first, rest) = match written.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (written, None),
        };
        match (self.resolve_simple(first), rest) {
            (Some(resolution), None) => resolution,
            (Some(Resolution::Source(base)), Some(rest)) => {
                let nested = format!("{}.{}", base, rest);
                if self.index.is_declared(&nested) {
                    Resolution::Source(nested)
                } else {
                    Resolution::Unresolved
                }
            }
            (Some(Resolution::Classpath(base)), Some(rest)) => {
                Resolution::Classpath(format!("{}.{}", base, rest))
            }
            (Some(Resolution::Unresolved), Some(_)) => Resolution::Unresolved,
            (None, Some(_)) => self.index.classify(written),
            (None, None) => Resolution::Unresolved,
        }
    }

    fn resolve_simple(&self, name: &str) -> Option<Resolution> {
        let imports = || self.scope.imports.iter().filter(|i| !i.is_static);

        if let Some(import) = imports().find(|i| i.bound_name() == Some(name)) {
            return Some(self.index.classify(&import.path));
        }

        for outer in self.enclosing {
            if let Some(found) = self.index.known(&format!("{}.{}", outer, name)) {
                return Some(found);
            }
        }

        if let Some(found) = self.index.known(&self.scope.qualify(name)) {
            return Some(found);
        }

        for import in imports().filter(|i| i.wildcard) {
            if let Some(found) = self.index.known(&format!("{}.{}", import.path, name)) {
                return Some(found);
            }
        }

        if self.implicit.names.contains(&name) {
            return Some(Resolution::Classpath(format!(
                "{}.{}",
                self.implicit.package, name
            )));
        }

        // A capitalized name under a configured library wildcard import is
        // taken to come from that library.
        if name.starts_with(char::is_uppercase) {
            let library = imports().find(|i| i.wildcard && self.index.is_open_library(&i.path));
            if let Some(import) = library {
                return Some(Resolution::Classpath(format!("{}.{}", import.path, name)));
            }
        }

        None
    }

    /// Whether a bare member name (no owner) can be bound yet
    ///
    /// Only explicit single-member imports are checked; anything else is
    /// taken to be a member in scope.
    pub fn member_resolvable(&self, name: &str) -> bool {
        let Some(import) = self
            .scope
            .imports
            .iter()
            .find(|i| !i.wildcard && i.bound_name() == Some(name))
        else {
            return true;
        };
        let Some((owner, _)) = import.path.rsplit_once('.') else {
            return true;
        };
        if self.index.is_source_package(owner) {
            return true;
        }
        self.index.classify(owner).is_resolved()
    }
}
