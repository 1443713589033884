use super::symbols::CallSite;
use std::collections::HashMap;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launch {
    Direct,
    Goroutine,
    Deferred,
}

/// Walks a function body and records every call site in source order.
///
/// `go` and `defer` statements record only the launched call. Function
/// literals are not entered; a literal that is itself launched or invoked
/// is recorded as a closure site.
pub struct CallExtractor<'a> {
    source: &'a [u8],
    /// Import alias → import path for the unit being read.
    imports: &'a HashMap<String, String>,
    calls: Vec<CallSite>,
}

impl<'a> CallExtractor<'a> {
    pub fn new(source: &'a [u8], imports: &'a HashMap<String, String>) -> Self {
        Self {
            source,
            imports,
            calls: Vec::new(),
        }
    }

    pub fn extract(mut self, body: Option<Node>) -> Vec<CallSite> {
        if let Some(body) = body {
            self.visit(body);
        }
        self.calls
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "go_statement" => {
                if let Some(call) = launched_call(node) {
                    self.capture(call, Launch::Goroutine);
                }
                return;
            }
            "defer_statement" => {
                if let Some(call) = launched_call(node) {
                    self.capture(call, Launch::Deferred);
                }
                return;
            }
            "func_literal" => return,
            "call_expression" => self.capture(node, Launch::Direct),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child);
        }
    }

    fn capture(&mut self, call: Node, launch: Launch) {
        let Some(function) = call.child_by_field_name("function").map(unparen) else {
            return;
        };
        let line = call.start_position().row + 1;

        let site = match function.kind() {
            "identifier" => self.text(function).map(|name| CallSite::function(name, line)),
            "selector_expression" => self.selector_call(function, line),
            "func_literal" => Some(CallSite::closure(line)),
            _ => None,
        };

        if let Some(mut site) = site {
            site.is_goroutine = launch == Launch::Goroutine;
            site.is_deferred = launch == Launch::Deferred;
            self.calls.push(site);
        }
    }

    /// `x.Sel(...)` and `x.y.Sel(...)`; chained calls such as `f().Sel()`
    /// have no nameable receiver and are dropped here (the inner call is
    /// still visited).
    fn selector_call(&self, selector: Node, line: usize) -> Option<CallSite> {
        let field = self.text(selector.child_by_field_name("field")?)?;
        let operand = unparen(selector.child_by_field_name("operand")?);

        match operand.kind() {
            "identifier" => {
                let receiver = self.text(operand)?;
                let mut site = CallSite::method(receiver, field, line);
                site.import_path = self.imports.get(receiver).cloned();
                Some(site)
            }
            "selector_expression" => {
                let inner = unparen(operand.child_by_field_name("operand")?);
                if inner.kind() != "identifier" {
                    return None;
                }
                let base = self.text(inner)?;
                let middle = self.text(operand.child_by_field_name("field")?)?;
                Some(CallSite::method(&format!("{base}.{middle}"), field, line))
            }
            _ => None,
        }
    }

    fn text(&self, node: Node) -> Option<&'a str> {
        node.utf8_text(self.source).ok()
    }
}

/// The call expression a `go`/`defer` statement launches.
fn launched_call(statement: Node) -> Option<Node> {
    let mut cursor = statement.walk();
    let expr = statement
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")
        .map(unparen)?;
    (expr.kind() == "call_expression").then_some(expr)
}

fn unparen(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}
