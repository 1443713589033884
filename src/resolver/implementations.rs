use super::{Resolver, ResolverOptions, split_qualified};
use crate::indexer::{SymbolIndex, TypeKind, TypeSymbol};
use std::collections::BTreeSet;

/// Structs whose method set covers every method of `interface_id`.
///
/// Methods are compared by name only. Interface embeds are expanded, and a
/// struct also gets the methods of the structs it embeds. An interface with
/// no methods is satisfied by every struct.
pub fn find_method_set_implementations(index: &SymbolIndex, interface_id: &str) -> Vec<String> {
    let Some(iface) = index.type_symbol(interface_id).filter(|t| t.is_interface()) else {
        return Vec::new();
    };
    let resolver = Resolver::new(index, ResolverOptions::default());

    let mut required = BTreeSet::new();
    interface_methods(&resolver, index, iface, &mut required, &mut BTreeSet::new());

    index
        .types()
        .filter(|(_, t)| t.kind == TypeKind::Struct)
        .filter(|(_, t)| {
            let mut provided = BTreeSet::new();
            struct_methods(&resolver, index, t, &mut provided, &mut BTreeSet::new());
            required.is_subset(&provided)
        })
        .map(|(id, _)| id.clone())
        .collect()
}

fn interface_methods(
    resolver: &Resolver,
    index: &SymbolIndex,
    iface: &TypeSymbol,
    out: &mut BTreeSet<String>,
    seen: &mut BTreeSet<String>,
) {
    if !seen.insert(iface.id()) {
        return;
    }
    out.extend(iface.methods.iter().cloned());
    for embed in &iface.embeds {
        if let Some(inner) = embedded(resolver, index, iface, embed) {
            if inner.is_interface() {
                interface_methods(resolver, index, inner, out, seen);
            }
        }
    }
}

fn struct_methods(
    resolver: &Resolver,
    index: &SymbolIndex,
    ty: &TypeSymbol,
    out: &mut BTreeSet<String>,
    seen: &mut BTreeSet<String>,
) {
    if !seen.insert(ty.id()) {
        return;
    }
    out.extend(
        index
            .methods()
            .filter(|(_, m)| m.package == ty.package && m.receiver == ty.name)
            .map(|(_, m)| m.name.clone()),
    );
    for embed in &ty.embeds {
        if let Some(inner) = embedded(resolver, index, ty, embed) {
            match inner.kind {
                TypeKind::Struct => struct_methods(resolver, index, inner, out, seen),
                // An embedded interface field forwards its whole method set.
                TypeKind::Interface => interface_methods(resolver, index, inner, out, seen),
                TypeKind::Other => {}
            }
        }
    }
}

fn embedded<'i>(
    resolver: &Resolver,
    index: &'i SymbolIndex,
    owner: &TypeSymbol,
    embed: &str,
) -> Option<&'i TypeSymbol> {
    let (hint, _) = split_qualified(embed);
    let id = resolver.resolve_type_ref(embed, hint, &owner.package)?;
    index.type_symbol(&id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{IndexOptions, SymbolIndexer};
    use std::path::Path;

    const SOURCE: &str = r#"
package store

type Reader interface {
    Get(id string) string
}

type ReadWriter interface {
    Reader
    Save(id string)
}

type Empty interface{}

type memStore struct{}

func (m *memStore) Get(id string) string { return id }
func (m *memStore) Save(id string) {}

type readOnly struct{}

func (r readOnly) Get(id string) string { return id }

type cached struct {
    readOnly
}

func (c *cached) Save(id string) {}

type wrapper struct {
    Reader
}
"#;

    fn index() -> SymbolIndex {
        let mut indexer = SymbolIndexer::new(IndexOptions::default()).unwrap();
        indexer
            .add_source(Path::new("store"), "store/store.go", SOURCE.as_bytes())
            .unwrap();
        indexer.finish()
    }

    #[test]
    fn test_method_set_cover() {
        let index = index();
        assert_eq!(
            find_method_set_implementations(&index, "store.ReadWriter"),
            vec!["store.cached", "store.memStore"]
        );
        assert_eq!(
            find_method_set_implementations(&index, "store.Reader"),
            vec!["store.cached", "store.memStore", "store.readOnly", "store.wrapper"]
        );
    }

    #[test]
    fn test_empty_interface_and_non_interface() {
        let index = index();
        assert_eq!(find_method_set_implementations(&index, "store.Empty").len(), 4);
        assert!(find_method_set_implementations(&index, "store.memStore").is_empty());
        assert!(find_method_set_implementations(&index, "store.Missing").is_empty());
    }
}
