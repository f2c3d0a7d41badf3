//! Types that cross the boundary by value even though their two layouts
//! differ, and the codec schema each one is encoded with.

use crate::syntax::attrs::BridgeAttrs;
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::{Atom, ItemId};
use std::rc::Rc;

#[derive(Debug)]
pub enum Bridge {
    /// `std::optional<T>` ⇄ `Option<T>`.
    Optional(Rc<TypeDescriptor>),
    /// `std::pair` or `std::tuple` ⇄ a Rust tuple.
    Tuple {
        template: TupleTemplate,
        elements: Vec<Rc<TypeDescriptor>>,
    },
    /// `std::unique_ptr<T>` ⇄ `crubit::UniquePtr<T>`. Moves ownership
    /// rather than bytes, so it has no schema.
    UniquePtr(Rc<TypeDescriptor>),
    /// A record annotated with `bridge_type`, `bridge_abi_rust` and
    /// `bridge_abi_cpp`.
    Custom {
        id: ItemId,
        attrs: BridgeAttrs,
        source_name: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TupleTemplate {
    Pair,
    Tuple,
}

/// Encoding of one bridged value. The Rust half names it as a schema
/// marker type (`ByTransmute`, `ByBridge<S>`), the C++ half as an Abi class
/// (`TransmuteAbi<T>`, `OptionalAbi<A>`, ...); the two must produce the
/// same bytes.
#[derive(Clone, Debug)]
pub enum Schema {
    Transmute(Rc<TypeDescriptor>),
    Optional(Box<Schema>),
    Tuple(TupleTemplate, Vec<Schema>),
    Custom { id: ItemId, attrs: BridgeAttrs },
}

impl Bridge {
    /// Why a bridge cannot be encoded, if it can't.
    pub fn problem(&self) -> Option<String> {
        let components: Vec<&Rc<TypeDescriptor>> = match self {
            Bridge::Optional(inner) => vec![inner],
            Bridge::Tuple { elements, .. } => elements.iter().collect(),
            Bridge::UniquePtr(_) | Bridge::Custom { .. } => return None,
        };
        components
            .into_iter()
            .find(|component| schema(component).is_none())
            .map(|component| format!("{} cannot be nested in a bridged type", component.spelling))
    }
}

/// Schema of a value passed through a bridge buffer. `None` for types that
/// are never encoded: void, references, owning pointers, and records that
/// are not trivially copyable.
pub fn schema(desc: &Rc<TypeDescriptor>) -> Option<Schema> {
    match &desc.kind {
        TypeKind::Primitive(Atom::Void) => None,
        TypeKind::Primitive(_)
        | TypeKind::Enum(_)
        | TypeKind::Pointer { .. }
        | TypeKind::FunctionPointer { .. } => Some(Schema::Transmute(desc.clone())),
        TypeKind::Record(_) | TypeKind::TemplateInstantiation { .. } => {
            if desc.triviality.copyable {
                Some(Schema::Transmute(desc.clone()))
            } else {
                None
            }
        }
        TypeKind::Reference { .. } => None,
        TypeKind::Tuple(elements) => elements
            .iter()
            .map(|element| schema(element))
            .collect::<Option<Vec<_>>>()
            .map(|schemas| Schema::Tuple(TupleTemplate::Tuple, schemas)),
        TypeKind::Bridged(bridge) => bridge_schema(bridge),
    }
}

fn bridge_schema(bridge: &Bridge) -> Option<Schema> {
    match bridge {
        Bridge::Optional(inner) => schema(inner).map(|inner| Schema::Optional(Box::new(inner))),
        Bridge::Tuple { template, elements } => elements
            .iter()
            .map(|element| schema(element))
            .collect::<Option<Vec<_>>>()
            .map(|schemas| Schema::Tuple(*template, schemas)),
        Bridge::UniquePtr(_) => None,
        Bridge::Custom { id, attrs, .. } => Some(Schema::Custom {
            id: *id,
            attrs: attrs.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{schema, Schema, TupleTemplate};
    use crate::syntax::{Ir, Types};
    use serde_json::json;

    fn prim(name: &str) -> serde_json::Value {
        json!({"kind": "primitive", "name": name})
    }

    #[test]
    fn test_nested_schemas() {
        let ir: Ir = serde_json::from_value(json!({"lang": "cxx"})).unwrap();
        let types = Types::collect(&ir).unwrap();
        let ty = serde_json::from_value(json!({
            "kind": "instantiation", "template": "std::pair", "args": [
                prim("int"),
                {"kind": "instantiation", "template": "std::optional", "args": [prim("double")]},
            ],
        }))
        .unwrap();
        let desc = types.classify(&ty).unwrap();
        let Some(Schema::Tuple(TupleTemplate::Pair, elements)) = schema(&desc) else {
            panic!("expected a pair schema");
        };
        assert!(matches!(elements[0], Schema::Transmute(_)));
        assert!(matches!(&elements[1], Schema::Optional(inner) if matches!(**inner, Schema::Transmute(_))));
    }

    #[test]
    fn test_reference_cannot_be_nested() {
        let ir: Ir = serde_json::from_value(json!({"lang": "cxx"})).unwrap();
        let types = Types::collect(&ir).unwrap();
        let ty = serde_json::from_value(json!({
            "kind": "instantiation", "template": "std::optional", "args": [
                {"kind": "reference", "pointee": prim("int")},
            ],
        }))
        .unwrap();
        assert_eq!(
            "int& cannot be nested in a bridged type",
            types.classify(&ty).unwrap_err(),
        );
    }
}
