use super::IndexError;
use super::calls::CallExtractor;
use super::languages::{LanguageConfig, default_import_name};
use super::symbols::{Field, FunctionSymbol, MethodSymbol, TypeKind, TypeSymbol};
use std::collections::HashMap;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit alias, `_` and `.` included.
    pub alias: Option<String>,
    pub path: String,
}

/// Everything one source unit declares.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedUnit {
    pub package_name: String,
    pub imports: Vec<ImportSpec>,
    pub types: Vec<TypeSymbol>,
    pub functions: Vec<FunctionSymbol>,
    pub methods: Vec<MethodSymbol>,
}

pub struct GoParser {
    parser: Parser,
    import_query: Query,
}

impl GoParser {
    pub fn new() -> Result<Self, IndexError> {
        let config = LanguageConfig::go();
        let mut parser = Parser::new();
        parser.set_language(&config.language)?;
        let import_query = Query::new(&config.language, config.import_query)?;
        Ok(Self {
            parser,
            import_query,
        })
    }

    /// Parses one unit. `package_id` becomes the package of every symbol and
    /// `file` their declaring file. Any syntax error fails the unit.
    pub fn parse_unit(
        &mut self,
        source: &[u8],
        package_id: &str,
        file: &str,
    ) -> Result<ParsedUnit, IndexError> {
        let tree = self.parser.parse(source, None).ok_or_else(|| IndexError::Parse {
            path: file.to_string(),
        })?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error(root)
                .map(|n| n.start_position().row + 1)
                .unwrap_or(1);
            return Err(IndexError::Syntax {
                path: file.to_string(),
                line,
            });
        }

        let imports = self.extract_imports(root, source);
        let aliases = import_aliases(&imports);

        let mut unit = UnitReader {
            source,
            package_id,
            file,
            aliases: &aliases,
            unit: ParsedUnit {
                imports,
                ..ParsedUnit::default()
            },
        };
        unit.read(root);
        Ok(unit.unit)
    }

    fn extract_imports(&self, root: Node, source: &[u8]) -> Vec<ImportSpec> {
        let mut cursor = QueryCursor::new();
        let mut imports = Vec::new();
        let import_idx = self.import_query.capture_index_for_name("import");

        let mut matches = cursor.matches(&self.import_query, root, source);
        while let Some(m) = matches.next() {
            for cap in m.captures {
                if Some(cap.index) != import_idx {
                    continue;
                }
                let spec = cap.node;
                let Some(path) = spec
                    .child_by_field_name("path")
                    .and_then(|p| p.utf8_text(source).ok())
                    .map(|p| p.trim_matches(|c| c == '"' || c == '`').to_string())
                else {
                    continue;
                };
                if path.is_empty() {
                    continue;
                }
                let alias = spec
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok())
                    .map(str::to_string);
                imports.push(ImportSpec { alias, path });
            }
        }

        imports
    }
}

/// Name → import path for every import a call can reach through a selector.
fn import_aliases(imports: &[ImportSpec]) -> HashMap<String, String> {
    imports
        .iter()
        .filter_map(|imp| {
            let name = match imp.alias.as_deref() {
                Some("_") | Some(".") => return None,
                Some(alias) => alias,
                None => default_import_name(&imp.path),
            };
            Some((name.to_string(), imp.path.clone()))
        })
        .collect()
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

struct UnitReader<'a> {
    source: &'a [u8],
    package_id: &'a str,
    file: &'a str,
    aliases: &'a HashMap<String, String>,
    unit: ParsedUnit,
}

impl<'a> UnitReader<'a> {
    fn read(&mut self, root: Node) {
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            match decl.kind() {
                "package_clause" => {
                    let mut inner = decl.walk();
                    if let Some(name) = decl
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "package_identifier")
                    {
                        self.unit.package_name = self.text(name);
                    }
                }
                "type_declaration" => self.read_type_declaration(decl),
                "function_declaration" => self.read_function(decl),
                "method_declaration" => self.read_method(decl),
                _ => {}
            }
        }
    }

    fn read_type_declaration(&mut self, decl: Node) {
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
                continue;
            }
            let Some(name) = spec.child_by_field_name("name").map(|n| self.text(n)) else {
                continue;
            };
            let type_node = spec.child_by_field_name("type");
            let mut symbol = TypeSymbol {
                name,
                package: self.package_id.to_string(),
                kind: TypeKind::Other,
                file: self.file.to_string(),
                line: spec.start_position().row + 1,
                fields: Vec::new(),
                embeds: Vec::new(),
                methods: Vec::new(),
            };

            match type_node.map(|t| (t.kind(), t)) {
                Some(("struct_type", t)) => {
                    symbol.kind = TypeKind::Struct;
                    self.read_struct(t, &mut symbol);
                }
                Some(("interface_type", t)) => {
                    symbol.kind = TypeKind::Interface;
                    self.read_interface(t, &mut symbol);
                }
                _ => {}
            }

            self.unit.types.push(symbol);
        }
    }

    fn read_struct(&self, struct_type: Node, symbol: &mut TypeSymbol) {
        let mut cursor = struct_type.walk();
        let Some(list) = struct_type
            .named_children(&mut cursor)
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return;
        };

        let mut list_cursor = list.walk();
        for field in list.named_children(&mut list_cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = field.child_by_field_name("type") else {
                continue;
            };
            let (type_name, type_package) = self.type_name(type_node);

            let mut name_cursor = field.walk();
            let names: Vec<String> = field
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(n))
                .collect();

            if names.is_empty() {
                if !type_name.is_empty() {
                    symbol.embeds.push(type_name);
                }
                continue;
            }
            for name in names {
                symbol.fields.push(Field {
                    name,
                    type_name: type_name.clone(),
                    type_package: type_package.clone(),
                });
            }
        }
    }

    fn read_interface(&mut self, iface: Node, symbol: &mut TypeSymbol) {
        let mut cursor = iface.walk();
        for elem in iface.named_children(&mut cursor) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name) = elem.child_by_field_name("name").map(|n| self.text(n)) else {
                        continue;
                    };
                    self.unit.methods.push(MethodSymbol {
                        name: name.clone(),
                        receiver: symbol.name.clone(),
                        receiver_var: None,
                        package: self.package_id.to_string(),
                        file: self.file.to_string(),
                        line: elem.start_position().row + 1,
                        calls: Vec::new(),
                    });
                    symbol.methods.push(name);
                }
                "type_elem" | "constraint_elem" => {
                    let mut inner = elem.walk();
                    for t in elem.named_children(&mut inner) {
                        let (name, _) = self.type_name(t);
                        if !name.is_empty() {
                            symbol.embeds.push(name);
                        }
                    }
                }
                "type_identifier" | "qualified_type" | "interface_type_name" => {
                    let (name, _) = self.type_name(elem);
                    if !name.is_empty() {
                        symbol.embeds.push(name);
                    }
                }
                _ => {}
            }
        }
    }

    fn read_function(&mut self, decl: Node) {
        let Some(name) = decl.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let calls = CallExtractor::new(self.source, self.aliases)
            .extract(decl.child_by_field_name("body"));
        self.unit.functions.push(FunctionSymbol {
            name,
            package: self.package_id.to_string(),
            file: self.file.to_string(),
            line: decl.start_position().row + 1,
            calls,
        });
    }

    fn read_method(&mut self, decl: Node) {
        let Some(name) = decl.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let (receiver, receiver_var) = decl
            .child_by_field_name("receiver")
            .map(|list| self.receiver(list))
            .unwrap_or_else(|| ("Unknown".to_string(), None));
        let calls = CallExtractor::new(self.source, self.aliases)
            .extract(decl.child_by_field_name("body"));

        self.unit.methods.push(MethodSymbol {
            name,
            receiver,
            receiver_var,
            package: self.package_id.to_string(),
            file: self.file.to_string(),
            line: decl.start_position().row + 1,
            calls,
        });
    }

    /// Receiver type name and variable of a method's receiver list.
    fn receiver(&self, list: Node) -> (String, Option<String>) {
        let mut cursor = list.walk();
        let Some(param) = list
            .named_children(&mut cursor)
            .find(|n| n.kind() == "parameter_declaration")
        else {
            return ("Unknown".to_string(), None);
        };
        let var = param
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .filter(|v| v != "_");
        let receiver = param
            .child_by_field_name("type")
            .map(|t| self.receiver_type(t))
            .unwrap_or_else(|| "Unknown".to_string());
        (receiver, var)
    }

    fn receiver_type(&self, node: Node) -> String {
        match node.kind() {
            "type_identifier" => self.text(node),
            "pointer_type" | "parenthesized_type" => node
                .named_child(0)
                .map(|inner| self.receiver_type(inner))
                .unwrap_or_else(|| "Unknown".to_string()),
            "generic_type" => node
                .child_by_field_name("type")
                .map(|inner| self.receiver_type(inner))
                .unwrap_or_else(|| "Unknown".to_string()),
            _ => "Unknown".to_string(),
        }
    }

    /// Referenced type name and, for `pkg.Name`, the package token.
    ///
    /// Containers resolve to their element (`[]T`, `map[K]T`, `chan T` → `T`);
    /// anonymous function / interface / struct types map to placeholders.
    fn type_name(&self, node: Node) -> (String, Option<String>) {
        match node.kind() {
            "type_identifier" | "identifier" => (self.text(node), None),
            "qualified_type" => {
                let pkg = node.child_by_field_name("package").map(|n| self.text(n));
                let name = node.child_by_field_name("name").map(|n| self.text(n));
                match (pkg, name) {
                    (Some(pkg), Some(name)) => (format!("{pkg}.{name}"), Some(pkg)),
                    _ => (String::new(), None),
                }
            }
            "pointer_type" | "parenthesized_type" | "interface_type_name" => node
                .named_child(0)
                .map(|inner| self.type_name(inner))
                .unwrap_or_default(),
            "generic_type" => node
                .child_by_field_name("type")
                .map(|inner| self.type_name(inner))
                .unwrap_or_default(),
            "slice_type" | "array_type" | "implicit_length_array_type" => node
                .child_by_field_name("element")
                .map(|inner| self.type_name(inner))
                .unwrap_or_default(),
            "map_type" | "channel_type" => node
                .child_by_field_name("value")
                .map(|inner| self.type_name(inner))
                .unwrap_or_default(),
            "function_type" => ("func".to_string(), None),
            "interface_type" => ("interface{}".to_string(), None),
            "struct_type" => ("struct{}".to_string(), None),
            _ => (String::new(), None),
        }
    }

    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedUnit {
        let mut parser = GoParser::new().expect("Failed to initialize GoParser");
        parser
            .parse_unit(source.as_bytes(), "app/sample", "sample/service.go")
            .expect("Failed to parse Go code")
    }

    const SERVICE: &str = r#"
package sample

import (
    "fmt"
    store "github.com/acme/app/internal/storage"
    "github.com/acme/app/model"
)

type Repository interface {
    Save(id string) error
    Get(id string) (string, error)
}

type ReadWriter interface {
    Repository
    fmt.Stringer
}

type Base struct{}

type Service struct {
    *Base
    repo      Repository
    users     []*model.User
    cache     map[string]store.Entry
    done, err chan error
}

type ID string

func NewService(repo Repository) *Service {
    return &Service{repo: repo}
}

func (s *Service) Process(id string) error {
    data, err := s.repo.Get(id)
    if err != nil {
        return err
    }
    store.Put(data)
    return nil
}

func (Base) Close() {}
"#;

    #[test]
    fn test_parse_package_and_imports() {
        let unit = parse(SERVICE);
        assert_eq!(unit.package_name, "sample");
        assert_eq!(unit.imports.len(), 3);
        assert_eq!(unit.imports[1].alias.as_deref(), Some("store"));
        assert_eq!(unit.imports[1].path, "github.com/acme/app/internal/storage");
        assert_eq!(unit.imports[2].alias, None);
    }

    #[test]
    fn test_parse_types() {
        let unit = parse(SERVICE);
        let find = |name: &str| unit.types.iter().find(|t| t.name == name).unwrap();

        let repo = find("Repository");
        assert_eq!(repo.kind, TypeKind::Interface);
        assert_eq!(repo.methods, vec!["Save", "Get"]);
        assert_eq!(repo.package, "app/sample");

        let rw = find("ReadWriter");
        assert_eq!(rw.embeds, vec!["Repository", "fmt.Stringer"]);

        let service = find("Service");
        assert_eq!(service.kind, TypeKind::Struct);
        assert_eq!(service.embeds, vec!["Base"]);
        let fields: Vec<(&str, &str)> = service
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.type_name.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("repo", "Repository"),
                ("users", "model.User"),
                ("cache", "store.Entry"),
                ("done", "error"),
                ("err", "error"),
            ]
        );
        assert_eq!(service.fields[1].type_package.as_deref(), Some("model"));

        assert_eq!(find("ID").kind, TypeKind::Other);
    }

    #[test]
    fn test_parse_functions_and_methods() {
        let unit = parse(SERVICE);
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].id(), "app/sample.NewService");

        let process = unit
            .methods
            .iter()
            .find(|m| m.name == "Process")
            .expect("Process method");
        assert_eq!(process.receiver, "Service");
        assert_eq!(process.receiver_var.as_deref(), Some("s"));
        assert_eq!(process.id(), "app/sample.Service.Process");
        let targets: Vec<&str> = process.calls.iter().map(|c| c.target.as_str()).collect();
        assert_eq!(targets, vec!["s.repo.Get", "store.Put"]);
        assert_eq!(
            process.calls[1].import_path.as_deref(),
            Some("github.com/acme/app/internal/storage")
        );

        let close = unit.methods.iter().find(|m| m.name == "Close").unwrap();
        assert_eq!(close.receiver, "Base");
        assert_eq!(close.receiver_var, None);

        let iface_get = unit
            .methods
            .iter()
            .find(|m| m.id() == "app/sample.Repository.Get")
            .expect("interface method registered");
        assert!(iface_get.calls.is_empty());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut parser = GoParser::new().unwrap();
        let err = parser
            .parse_unit(b"package broken\n\nfunc oops( {\n", "broken", "broken.go")
            .unwrap_err();
        match err {
            IndexError::Syntax { path, line } => {
                assert_eq!(path, "broken.go");
                assert!(line >= 1);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
