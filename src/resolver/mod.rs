//! Name-based resolution of call sites and type references.
//!
//! Nothing here type-checks. Call sites are matched against the symbol
//! tables with a fixed chain of heuristics and the first hit wins; scans
//! run in symbol-ID order, so ties always break the same way.
pub mod implementations;

use crate::callgraph::model::{CallType, NodeKind};
use crate::indexer::languages::{is_builtin_func, is_primitive_type};
use crate::indexer::{CLOSURE_TARGET, CallSite, Callable, MethodSymbol, SymbolIndex, TypeKind};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Tag methods of interface types and upgrade direct calls to them.
    pub resolve_interfaces: bool,
    /// Classify `go` launches as asynchronous goroutine calls.
    pub track_goroutines: bool,
    /// Match `recv.Method` against any `<pkg>.recv.Method` in the caller's
    /// package, ignoring what type `recv` actually has.
    pub receiver_name_fallback: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            resolve_interfaces: true,
            track_goroutines: true,
            receiver_name_fallback: true,
        }
    }
}

/// What the resolver knows about the symbol a call site belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller<'a> {
    pub package: &'a str,
    pub receiver_type: Option<&'a str>,
    pub receiver_var: Option<&'a str>,
}

impl<'a> Caller<'a> {
    pub fn in_package(package: &'a str) -> Self {
        Self {
            package,
            ..Self::default()
        }
    }

    pub fn of(callable: Callable<'a>) -> Self {
        match callable {
            Callable::Function(f) => Self::in_package(&f.package),
            Callable::Method(m) => Self {
                package: &m.package,
                receiver_type: Some(&m.receiver),
                receiver_var: m.receiver_var.as_deref(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Symbol ID; for external targets the call text, package-qualified
    /// when the call names a bare identifier.
    pub id: String,
    pub kind: NodeKind,
    pub call_type: CallType,
    pub is_async: bool,
    pub package: Option<String>,
    pub function: String,
    pub receiver: Option<String>,
    pub file: Option<String>,
    /// Declaring line of a resolved target.
    pub line: Option<usize>,
}

pub struct Resolver<'a> {
    index: &'a SymbolIndex,
    options: ResolverOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex, options: ResolverOptions) -> Self {
        Self { index, options }
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Resolves a call site made from a plain function of `caller_package`.
    ///
    /// Returns `None` for calls that never become graph nodes (builtins,
    /// conversions to predeclared types, empty targets).
    pub fn resolve_call(&self, site: &CallSite, caller_package: &str) -> Option<ResolvedTarget> {
        self.resolve_call_from(site, &Caller::in_package(caller_package))
    }

    /// Like [`Resolver::resolve_call`], but a method caller also lets the
    /// receiver variable and its fields take part in resolution.
    pub fn resolve_call_from(&self, site: &CallSite, caller: &Caller) -> Option<ResolvedTarget> {
        if site.target.is_empty() {
            return None;
        }
        let (call_type, is_async) = self.classify(site);

        if site.is_closure() {
            return Some(ResolvedTarget {
                id: format!("{}.{CLOSURE_TARGET}", caller.package),
                kind: NodeKind::Closure,
                call_type,
                is_async,
                package: Some(caller.package.to_string()),
                function: CLOSURE_TARGET.to_string(),
                receiver: None,
                file: None,
                line: None,
            });
        }

        // A builtin name on a selector may still be a real method (`s.clear()`).
        let builtin = is_builtin_func(site.selector());
        if builtin && !site.is_method {
            return None;
        }
        if !site.target.contains('.') && is_primitive_type(&site.target) {
            return None;
        }

        let resolved = self
            .resolve_symbol(site, caller)
            .and_then(|id| self.internal_target(id, call_type, is_async));
        if resolved.is_some() || builtin {
            return resolved;
        }

        trace!("Unresolved call {} from {}", site.target, caller.package);
        // Bare names are unqualified only in source; scope them to the caller.
        let id = if site.target.contains('.') {
            site.target.clone()
        } else {
            format!("{}.{}", caller.package, site.target)
        };
        Some(ResolvedTarget {
            id,
            kind: NodeKind::External,
            call_type,
            is_async,
            package: None,
            function: site.target.clone(),
            receiver: None,
            file: None,
            line: None,
        })
    }

    fn resolve_symbol(&self, site: &CallSite, caller: &Caller) -> Option<String> {
        if self.index.callable(&site.target).is_some() {
            return Some(site.target.clone());
        }

        if !site.target.contains('/') {
            let qualified = format!("{}.{}", caller.package, site.target);
            if self.index.callable(&qualified).is_some() {
                return Some(qualified);
            }
        }

        if let Some(id) = self.match_import(site) {
            return Some(id);
        }

        if self.options.receiver_name_fallback {
            if let Some(id) = self.match_receiver_name(site, caller.package) {
                return Some(id);
            }
        }

        self.match_receiver_binding(site, caller)
    }

    /// `alias.Func` where `alias` is an import of the caller's file that
    /// maps to an indexed package.
    fn match_import(&self, site: &CallSite) -> Option<String> {
        let import_path = site.import_path.as_deref()?;
        let package = self.index.find_package_by_import(import_path)?;
        let id = format!("{package}.{}", site.selector());
        self.index.function(&id).map(|_| id)
    }

    /// Structural name match: any method of the caller's own package whose
    /// ID ends with `.<receiver>.<selector>`. Ignores the receiver's actual
    /// type, so two same-named receivers across types can mis-resolve.
    pub fn match_receiver_name(&self, site: &CallSite, caller_package: &str) -> Option<String> {
        if !site.is_method {
            return None;
        }
        let receiver = site.receiver.as_deref()?;
        let suffix = format!(".{receiver}.{}", site.selector());
        self.index
            .methods()
            .find(|(id, m)| m.package == caller_package && id.ends_with(&suffix))
            .map(|(id, _)| id.clone())
    }

    /// Calls through the caller's own receiver: `s.Method()` and
    /// `s.field.Method()`, including methods promoted from embedded types.
    fn match_receiver_binding(&self, site: &CallSite, caller: &Caller) -> Option<String> {
        let var = caller.receiver_var?;
        let receiver_type = caller.receiver_type?;
        let receiver = site.receiver.as_deref()?;
        let selector = site.selector();
        let type_id = format!("{}.{receiver_type}", caller.package);

        if receiver == var {
            let id = format!("{type_id}.{selector}");
            if self.index.method(&id).is_some() {
                return Some(id);
            }
            return self.match_embedded(&type_id, selector);
        }

        let field_name = receiver.strip_prefix(var)?.strip_prefix('.')?;
        let owner = self.index.type_symbol(&type_id)?;
        let field = owner.fields.iter().find(|f| f.name == field_name)?;
        let field_type =
            self.resolve_type_ref(&field.type_name, field.type_package.as_deref(), &owner.package)?;
        let id = format!("{field_type}.{selector}");
        self.index.method(&id).map(|_| id)
    }

    fn match_embedded(&self, type_id: &str, selector: &str) -> Option<String> {
        let owner = self.index.type_symbol(type_id)?;
        owner.embeds.iter().find_map(|embed| {
            let (hint, _) = split_qualified(embed);
            let embedded = self.resolve_type_ref(embed, hint, &owner.package)?;
            let id = format!("{embedded}.{selector}");
            self.index.method(&id).map(|_| id)
        })
    }

    fn internal_target(
        &self,
        id: String,
        call_type: CallType,
        is_async: bool,
    ) -> Option<ResolvedTarget> {
        if let Some(f) = self.index.function(&id) {
            return Some(ResolvedTarget {
                id,
                kind: NodeKind::Function,
                call_type,
                is_async,
                package: Some(f.package.clone()),
                function: f.name.clone(),
                receiver: None,
                file: Some(f.file.clone()),
                line: Some(f.line),
            });
        }

        let m = self.index.method(&id)?;
        let kind = self.method_kind(m);
        let call_type = if kind == NodeKind::InterfaceMethod && call_type == CallType::Direct {
            CallType::Interface
        } else {
            call_type
        };
        Some(ResolvedTarget {
            id,
            kind,
            call_type,
            is_async,
            package: Some(m.package.clone()),
            function: m.name.clone(),
            receiver: Some(m.receiver.clone()),
            file: Some(m.file.clone()),
            line: Some(m.line),
        })
    }

    /// `interface_method` when the receiver type is a registered interface.
    pub fn method_kind(&self, method: &MethodSymbol) -> NodeKind {
        if !self.options.resolve_interfaces {
            return NodeKind::Method;
        }
        match self.index.type_symbol(&method.receiver_type_id()) {
            Some(t) if t.is_interface() => NodeKind::InterfaceMethod,
            _ => NodeKind::Method,
        }
    }

    fn classify(&self, site: &CallSite) -> (CallType, bool) {
        if site.is_goroutine && self.options.track_goroutines {
            return (CallType::Goroutine, true);
        }
        if site.is_deferred {
            return (CallType::Deferred, false);
        }
        if site.is_closure() {
            return (CallType::Closure, false);
        }
        (CallType::Direct, false)
    }

    /// Resolves a referenced type name to a type ID.
    ///
    /// With a package hint the first type whose ID contains the hint and ends
    /// in the type's last segment wins; this is a textual match, not import
    /// resolution. Without a hint the caller's package is tried first, then
    /// any package.
    pub fn resolve_type_ref(
        &self,
        type_name: &str,
        hint: Option<&str>,
        caller_package: &str,
    ) -> Option<String> {
        if is_primitive_type(type_name) {
            return None;
        }

        if let Some(hint) = hint.filter(|h| !h.is_empty()) {
            let (_, name) = split_qualified(type_name);
            let suffix = format!(".{name}");
            return self
                .index
                .types()
                .find(|(id, _)| id.contains(hint) && id.ends_with(&suffix))
                .map(|(id, _)| id.clone());
        }

        let local = format!("{caller_package}.{type_name}");
        if self.index.type_symbol(&local).is_some() {
            return Some(local);
        }

        let suffix = format!(".{type_name}");
        self.index
            .types()
            .find(|(id, _)| id.ends_with(&suffix))
            .map(|(id, _)| id.clone())
    }

    /// Structs with a field whose type resolves to `interface_id`.
    ///
    /// This is a weak stand-in for interface satisfaction: holding an
    /// interface is not implementing it. Use
    /// [`implementations::find_method_set_implementations`] to compare
    /// method sets instead.
    pub fn find_implementations(&self, interface_id: &str) -> Vec<String> {
        match self.index.type_symbol(interface_id) {
            Some(t) if t.is_interface() => {}
            _ => return Vec::new(),
        }

        self.index
            .types()
            .filter(|(id, t)| t.kind == TypeKind::Struct && id.as_str() != interface_id)
            .filter(|(_, t)| {
                t.fields.iter().any(|f| {
                    self.resolve_type_ref(&f.type_name, f.type_package.as_deref(), &t.package)
                        .as_deref()
                        == Some(interface_id)
                })
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// `pkg.Name` → (`Some("pkg")`, `"Name"`); `Name` → (`None`, `"Name"`).
pub fn split_qualified(type_name: &str) -> (Option<&str>, &str) {
    match type_name.rsplit_once('.') {
        Some((pkg, name)) => (Some(pkg), name),
        None => (None, type_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{IndexOptions, SymbolIndexer};
    use std::path::Path;

    const SERVICE: &str = r#"
package sample

type Repository interface {
    Save(id string) error
    Get(id string) (string, error)
}

type Base struct{}

func (b *Base) Close() {}

type Service struct {
    Base
    repo Repository
}

type Holder struct {
    r Repository
}

func (s *Service) Process(id string) error {
    data, _ := s.repo.Get(id)
    transform(data)
    go s.notify(id)
    defer s.Close()
    go func() {}()
    _ = make([]string, 0)
    _ = string(data)
    fmt.Println(data)
    return nil
}

func (s *Service) notify(id string) {}

func (svc *Service) Flush() {}

func transform(data string) string { return validate(data) }

func validate(data string) string { return data }
"#;

    const STORE: &str = r#"
package store

type Record struct{}

func Open() {}
"#;

    fn sample_index() -> SymbolIndex {
        let mut indexer = SymbolIndexer::new(IndexOptions::default()).unwrap();
        indexer
            .add_source(Path::new("sample"), "sample/service.go", SERVICE.as_bytes())
            .unwrap();
        indexer
            .add_source(Path::new("app/store"), "store/store.go", STORE.as_bytes())
            .unwrap();
        indexer.finish()
    }

    fn process_calls(index: &SymbolIndex) -> &[CallSite] {
        &index.method("sample.Service.Process").unwrap().calls
    }

    fn resolve_all(index: &SymbolIndex, options: ResolverOptions) -> Vec<Option<ResolvedTarget>> {
        let resolver = Resolver::new(index, options);
        let method = index.method("sample.Service.Process").unwrap();
        let caller = Caller::of(Callable::Method(method));
        method
            .calls
            .iter()
            .map(|site| resolver.resolve_call_from(site, &caller))
            .collect()
    }

    #[test]
    fn test_resolution_chain() {
        let index = sample_index();
        assert_eq!(process_calls(&index).len(), 8);
        let resolved = resolve_all(&index, ResolverOptions::default());

        let get = resolved[0].as_ref().unwrap();
        assert_eq!(get.id, "sample.Repository.Get");
        assert_eq!(get.kind, NodeKind::InterfaceMethod);
        assert_eq!(get.call_type, CallType::Interface);

        let transform = resolved[1].as_ref().unwrap();
        assert_eq!(transform.id, "sample.transform");
        assert_eq!(transform.kind, NodeKind::Function);
        assert_eq!(transform.call_type, CallType::Direct);

        let notify = resolved[2].as_ref().unwrap();
        assert_eq!(notify.id, "sample.Service.notify");
        assert_eq!(notify.call_type, CallType::Goroutine);
        assert!(notify.is_async);

        let close = resolved[3].as_ref().unwrap();
        assert_eq!(close.id, "sample.Base.Close");
        assert_eq!(close.call_type, CallType::Deferred);

        let closure = resolved[4].as_ref().unwrap();
        assert_eq!(closure.id, "sample.<closure>");
        assert_eq!(closure.kind, NodeKind::Closure);
        assert_eq!(closure.call_type, CallType::Goroutine);

        assert!(resolved[5].is_none(), "make is a builtin");
        assert!(resolved[6].is_none(), "string(x) is a conversion");

        let println = resolved[7].as_ref().unwrap();
        assert_eq!(println.id, "fmt.Println");
        assert_eq!(println.kind, NodeKind::External);
    }

    #[test]
    fn test_interface_upgrade_can_be_disabled() {
        let index = sample_index();
        let options = ResolverOptions {
            resolve_interfaces: false,
            track_goroutines: false,
            ..ResolverOptions::default()
        };
        let resolved = resolve_all(&index, options);

        let get = resolved[0].as_ref().unwrap();
        assert_eq!(get.kind, NodeKind::Method);
        assert_eq!(get.call_type, CallType::Direct);

        let notify = resolved[2].as_ref().unwrap();
        assert_eq!(notify.call_type, CallType::Direct);
        assert!(!notify.is_async);
    }

    #[test]
    fn test_exact_and_package_qualified_match() {
        let index = sample_index();
        let resolver = Resolver::new(&index, ResolverOptions::default());

        let exact = CallSite::function("app/store.Open", 1);
        assert_eq!(resolver.resolve_call(&exact, "sample").unwrap().id, "app/store.Open");

        let bare = CallSite::function("validate", 1);
        let target = resolver.resolve_call(&bare, "sample").unwrap();
        assert_eq!(target.id, "sample.validate");
        assert_eq!(target.line, Some(40));

        let elsewhere = resolver.resolve_call(&bare, "app/store").unwrap();
        assert_eq!(elsewhere.kind, NodeKind::External);
        assert_eq!(elsewhere.id, "app/store.validate");
        assert_eq!(elsewhere.function, "validate");
    }

    #[test]
    fn test_unresolved_bare_calls_stay_per_package() {
        let index = sample_index();
        let resolver = Resolver::new(&index, ResolverOptions::default());

        let helper = CallSite::function("helper", 1);
        let from_sample = resolver.resolve_call(&helper, "sample").unwrap();
        let from_store = resolver.resolve_call(&helper, "app/store").unwrap();
        assert_eq!(from_sample.id, "sample.helper");
        assert_eq!(from_store.id, "app/store.helper");
        assert_ne!(from_sample.id, from_store.id);
    }

    #[test]
    fn test_builtin_named_methods_still_resolve() {
        const CACHE: &str = r#"
package cache

type Cache struct{}

func (c *Cache) clear() {}

func (c *Cache) Reset() {
    c.clear()
    clear(nil)
    other.max()
}
"#;
        let mut indexer = SymbolIndexer::new(IndexOptions::default()).unwrap();
        indexer
            .add_source(Path::new("cache"), "cache/cache.go", CACHE.as_bytes())
            .unwrap();
        let index = indexer.finish();
        let resolver = Resolver::new(&index, ResolverOptions::default());
        let reset = index.method("cache.Cache.Reset").unwrap();
        let caller = Caller::of(Callable::Method(reset));
        let resolved: Vec<_> = reset
            .calls
            .iter()
            .map(|site| resolver.resolve_call_from(site, &caller))
            .collect();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].as_ref().unwrap().id, "cache.Cache.clear");
        assert!(resolved[1].is_none(), "bare clear is the builtin");
        assert!(resolved[2].is_none(), "unresolved builtin-named selector is ignored");
    }

    #[test]
    fn test_import_qualified_match() {
        let index = sample_index();
        let resolver = Resolver::new(&index, ResolverOptions::default());

        let mut site = CallSite::method("store", "Open", 7);
        site.import_path = Some("github.com/acme/app/store".to_string());
        assert_eq!(resolver.resolve_call(&site, "sample").unwrap().id, "app/store.Open");

        site.import_path = None;
        assert_eq!(resolver.resolve_call(&site, "sample").unwrap().kind, NodeKind::External);
    }

    #[test]
    fn test_receiver_name_fallback_stays_in_package() {
        let index = sample_index();
        let resolver = Resolver::new(&index, ResolverOptions::default());

        // The receiver token happens to equal a type name in the caller's package.
        let site = CallSite::method("Service", "Flush", 3);
        assert_eq!(
            resolver.match_receiver_name(&site, "sample").as_deref(),
            Some("sample.Service.Flush")
        );
        assert_eq!(resolver.match_receiver_name(&site, "app/store"), None);

        let bare = CallSite::function("Flush", 3);
        assert_eq!(resolver.match_receiver_name(&bare, "sample"), None);
    }

    #[test]
    fn test_resolve_type_ref() {
        let index = sample_index();
        let resolver = Resolver::new(&index, ResolverOptions::default());

        assert_eq!(resolver.resolve_type_ref("string", None, "sample"), None);
        assert_eq!(
            resolver.resolve_type_ref("Repository", None, "sample").as_deref(),
            Some("sample.Repository")
        );
        assert_eq!(
            resolver.resolve_type_ref("Record", None, "sample").as_deref(),
            Some("app/store.Record")
        );
        assert_eq!(
            resolver
                .resolve_type_ref("store.Record", Some("store"), "sample")
                .as_deref(),
            Some("app/store.Record")
        );
        assert_eq!(resolver.resolve_type_ref("model.User", Some("model"), "sample"), None);
    }

    #[test]
    fn test_find_implementations_by_field() {
        let index = sample_index();
        let resolver = Resolver::new(&index, ResolverOptions::default());

        assert_eq!(
            resolver.find_implementations("sample.Repository"),
            vec!["sample.Holder", "sample.Service"]
        );
        assert!(resolver.find_implementations("sample.Service").is_empty());
    }
}
