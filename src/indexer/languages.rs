use tree_sitter::Language;

/// Grammar and queries used to read Go source units.
pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    /// Suffix of source units that belong to the test build only.
    pub test_suffix: &'static str,
    pub import_query: &'static str,
}

impl LanguageConfig {
    pub fn go() -> LanguageConfig {
        LanguageConfig {
            name: "go",
            language: tree_sitter_go::LANGUAGE.into(),
            extensions: &["go"],
            test_suffix: "_test.go",
            import_query: r#"
(import_spec
  path: (_) @path) @import
"#,
        }
    }

    /// Whether a file name is a primary (non-test) unit of this language.
    pub fn is_primary_unit(&self, file_name: &str) -> bool {
        if file_name.ends_with(self.test_suffix) {
            return false;
        }
        self.extensions
            .iter()
            .any(|ext| file_name.len() > ext.len() + 1 && file_name.ends_with(&format!(".{ext}")))
    }
}

// ── Go builtins ──────────────────────────────────────────────────────

/// Predeclared functions; calls to these never become graph nodes.
pub const BUILTIN_FUNCS: &[&str] = &[
    "make", "new", "len", "cap", "append", "copy", "delete", "close", "panic", "recover", "print",
    "println", "min", "max", "clear", "complex", "real", "imag",
];

/// Predeclared type names (plus the placeholders the parser emits for
/// anonymous types). References to these never resolve to a symbol.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "string",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "bool",
    "byte",
    "rune",
    "error",
    "any",
    "comparable",
    "interface{}",
    "struct{}",
    "func",
    "",
];

const STDLIB_ROOTS: &[&str] = &[
    "fmt", "io", "os", "path", "time", "net", "strings", "bytes", "errors", "sync", "context",
    "encoding", "crypto", "database", "log", "math", "regexp", "sort", "strconv", "testing",
    "runtime",
];

pub fn is_builtin_func(name: &str) -> bool {
    BUILTIN_FUNCS.contains(&name)
}

pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

/// Standard-library import paths have no dot and no slash, or start with
/// one of the well-known stdlib roots.
pub fn is_std_lib(import_path: &str) -> bool {
    if !import_path.contains('.') && !import_path.contains('/') {
        return true;
    }
    STDLIB_ROOTS.iter().any(|root| {
        import_path == *root
            || import_path
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Name a file refers to an import by when it declares no alias.
///
/// `github.com/acme/store/v2` → `store`, `gopkg.in/yaml.v3` → `yaml`.
pub fn default_import_name(import_path: &str) -> &str {
    let mut segments: Vec<&str> = import_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        if let Some(last) = segments.last() {
            if is_major_version(last) {
                segments.pop();
            }
        }
    }
    let last = segments.last().copied().unwrap_or(import_path);
    match last.rsplit_once(".v") {
        Some((base, version)) if !base.is_empty() && version.chars().all(|c| c.is_ascii_digit()) => {
            base
        }
        _ => last,
    }
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
