//! Symbol tables produced by indexing: packages, types, functions, methods.
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Synthetic call target for function literals launched or invoked in place.
pub const CLOSURE_TARGET: &str = "<closure>";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub dir: PathBuf,
    /// Non-standard-library imports, first-seen order, no duplicates.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Struct,
    Interface,
    Other,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Other => "type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    /// Referenced type, qualified as `pkg.Name` when it lives in another package.
    pub type_name: String,
    /// Package token of a qualified reference (`pkg` in `pkg.Name`).
    pub type_package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSymbol {
    pub name: String,
    pub package: String,
    pub kind: TypeKind,
    pub file: String,
    pub line: usize,
    pub fields: Vec<Field>,
    pub embeds: Vec<String>,
    /// Method names declared by an interface type; empty for other kinds.
    pub methods: Vec<String>,
}

impl TypeSymbol {
    pub fn id(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

/// A raw, unresolved invocation captured inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// `Func`, `recv.Method`, `a.b.Method` or [`CLOSURE_TARGET`].
    pub target: String,
    pub is_method: bool,
    /// Receiver expression token (`recv`, `a.b`).
    pub receiver: Option<String>,
    /// Import path when the receiver token names an import of the file.
    pub import_path: Option<String>,
    pub line: usize,
    pub is_goroutine: bool,
    pub is_deferred: bool,
}

impl CallSite {
    pub fn function(name: &str, line: usize) -> Self {
        Self {
            target: name.to_string(),
            is_method: false,
            receiver: None,
            import_path: None,
            line,
            is_goroutine: false,
            is_deferred: false,
        }
    }

    pub fn method(receiver: &str, selector: &str, line: usize) -> Self {
        Self {
            target: format!("{receiver}.{selector}"),
            is_method: true,
            receiver: Some(receiver.to_string()),
            import_path: None,
            line,
            is_goroutine: false,
            is_deferred: false,
        }
    }

    pub fn closure(line: usize) -> Self {
        Self::function(CLOSURE_TARGET, line)
    }

    pub fn is_closure(&self) -> bool {
        self.target == CLOSURE_TARGET
    }

    /// Last dotted segment of the target.
    pub fn selector(&self) -> &str {
        self.target.rsplit('.').next().unwrap_or(&self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSymbol {
    pub name: String,
    pub package: String,
    pub file: String,
    pub line: usize,
    pub calls: Vec<CallSite>,
}

impl FunctionSymbol {
    pub fn id(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSymbol {
    pub name: String,
    /// Receiver type name with pointer and type arguments stripped.
    pub receiver: String,
    /// Name the body uses for its receiver, if it binds one.
    pub receiver_var: Option<String>,
    pub package: String,
    pub file: String,
    pub line: usize,
    pub calls: Vec<CallSite>,
}

impl MethodSymbol {
    pub fn id(&self) -> String {
        format!("{}.{}.{}", self.package, self.receiver, self.name)
    }

    pub fn receiver_type_id(&self) -> String {
        format!("{}.{}", self.package, self.receiver)
    }
}

/// A function or method looked up by ID.
#[derive(Debug, Clone, Copy)]
pub enum Callable<'a> {
    Function(&'a FunctionSymbol),
    Method(&'a MethodSymbol),
}

impl<'a> Callable<'a> {
    pub fn package(&self) -> &'a str {
        match self {
            Callable::Function(f) => &f.package,
            Callable::Method(m) => &m.package,
        }
    }

    pub fn calls(&self) -> &'a [CallSite] {
        match self {
            Callable::Function(f) => &f.calls,
            Callable::Method(m) => &m.calls,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub packages: usize,
    pub types: usize,
    pub functions: usize,
    pub methods: usize,
    pub units: usize,
}

/// Read-only symbol universe of one analysis run.
///
/// Registries are ordered by ID so every scan over them is deterministic.
#[derive(Debug, Default, Clone)]
pub struct SymbolIndex {
    pub(crate) packages: BTreeMap<String, Package>,
    pub(crate) types: BTreeMap<String, TypeSymbol>,
    pub(crate) functions: BTreeMap<String, FunctionSymbol>,
    pub(crate) methods: BTreeMap<String, MethodSymbol>,
    pub(crate) units: usize,
}

impl SymbolIndex {
    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    pub fn type_symbol(&self, id: &str) -> Option<&TypeSymbol> {
        self.types.get(id)
    }

    pub fn function(&self, id: &str) -> Option<&FunctionSymbol> {
        self.functions.get(id)
    }

    pub fn method(&self, id: &str) -> Option<&MethodSymbol> {
        self.methods.get(id)
    }

    pub fn callable(&self, id: &str) -> Option<Callable<'_>> {
        if let Some(f) = self.functions.get(id) {
            return Some(Callable::Function(f));
        }
        self.methods.get(id).map(Callable::Method)
    }

    pub fn packages(&self) -> impl Iterator<Item = (&String, &Package)> {
        self.packages.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = (&String, &TypeSymbol)> {
        self.types.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = (&String, &FunctionSymbol)> {
        self.functions.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = (&String, &MethodSymbol)> {
        self.methods.iter()
    }

    /// True when nothing callable was indexed.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.methods.is_empty()
    }

    /// Finds the indexed package an import path refers to.
    ///
    /// Package IDs are directory paths (possibly truncated), never module
    /// paths, so the match is on trailing path segments: the package sharing
    /// the longest run of them with the import wins, the smallest ID on ties.
    /// `github.com/acme/app/store` matches `app/store` as well as
    /// `home/dev/acme/app/store`.
    pub fn find_package_by_import(&self, import_path: &str) -> Option<&str> {
        if let Some((id, _)) = self.packages.get_key_value(import_path) {
            return Some(id.as_str());
        }
        let mut best: Option<(&str, usize)> = None;
        for id in self.packages.keys() {
            let shared = shared_trailing_segments(import_path, id);
            if shared > 0 && best.is_none_or(|(_, n)| shared > n) {
                best = Some((id.as_str(), shared));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            packages: self.packages.len(),
            types: self.types.len(),
            functions: self.functions.len(),
            methods: self.methods.len(),
            units: self.units,
        }
    }
}

/// Number of trailing `/`-separated segments two paths have in common.
fn shared_trailing_segments(a: &str, b: &str) -> usize {
    a.rsplit('/')
        .zip(b.rsplit('/'))
        .take_while(|(x, y)| x == y)
        .count()
}
