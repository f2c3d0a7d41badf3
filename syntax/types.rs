use crate::syntax::classify::TypeDescriptor;
use crate::syntax::lifetime::LifetimeFactory;
use crate::syntax::map::{OrderedMap, UnorderedMap};
use crate::syntax::set::UnorderedSet;
use crate::syntax::{Atom, Func, Ir, Item, ItemId, Lang, Type};
use std::cell::RefCell;
use std::fmt::{self, Display};
use std::rc::Rc;

/// Context of one generator run: every item by id, plus the caches that
/// the classifier fills in along the way. Dropped at the end of the run.
pub struct Types<'a> {
    pub lang: Lang,
    pub target: &'a str,
    /// Headers the C++ target exposes; generated C++ includes them all.
    pub public_headers: &'a [String],
    pub items: &'a [Item],
    by_id: UnorderedMap<ItemId, &'a Item>,
    elision_files: UnorderedSet<&'a str>,
    pub lifetimes: LifetimeFactory,
    pub(crate) cache: RefCell<OrderedMap<String, Result<Rc<TypeDescriptor>, String>>>,
    pub(crate) records: RefCell<OrderedMap<ItemId, Result<Rc<TypeDescriptor>, Vec<String>>>>,
    /// Records whose import is underway, innermost last.
    pub(crate) importing: RefCell<Vec<ItemId>>,
}

/// The IR violates an invariant the frontend guarantees.
#[derive(Debug)]
pub enum Invalid {
    DuplicateId(ItemId),
    UnknownId { id: ItemId, referenced_by: String },
}

impl Display for Invalid {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Invalid::DuplicateId(id) => write!(formatter, "item id {} is declared twice", id.0),
            Invalid::UnknownId { id, referenced_by } => write!(
                formatter,
                "item '{}' refers to undeclared item id {}",
                referenced_by, id.0,
            ),
        }
    }
}

impl std::error::Error for Invalid {}

impl<'a> Types<'a> {
    pub fn collect(ir: &'a Ir) -> Result<Self, Invalid> {
        let mut by_id = UnorderedMap::new();
        for item in &ir.items {
            if by_id.insert(item.id(), item).is_some() {
                return Err(Invalid::DuplicateId(item.id()));
            }
        }

        let mut elision_files = UnorderedSet::new();
        for file in &ir.lifetime_elision_files {
            elision_files.insert(file.as_str());
        }

        let types = Types {
            lang: ir.lang,
            target: &ir.target,
            public_headers: &ir.public_headers,
            items: &ir.items,
            by_id,
            elision_files,
            lifetimes: LifetimeFactory::new(),
            cache: RefCell::new(OrderedMap::new()),
            records: RefCell::new(OrderedMap::new()),
            importing: RefCell::new(Vec::new()),
        };

        for item in &ir.items {
            types.check_references(item)?;
        }
        Ok(types)
    }

    pub fn get(&self, id: ItemId) -> Option<&'a Item> {
        self.by_id.get(&id).copied()
    }

    /// Whether `func` was declared in a file that opted into lifetime
    /// elision.
    pub fn elision_enabled(&self, func: &Func) -> bool {
        match &func.decl.source_loc {
            Some(source_loc) => self.elision_files.contains(source_loc.file.as_str()),
            None => false,
        }
    }

    /// Canonical spelling of `ty`, used as the classifier's cache key and
    /// to tell overloads apart in thunk names. Aliases are not looked
    /// through, so `size_t` and `std::size_t` share one spelling while two
    /// distinct records with the same name in different namespaces do not.
    pub fn spelling(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(prim) => match Atom::lookup(self.lang, &prim.name) {
                Some(atom) => atom.to_cxx().to_owned(),
                None => prim.name.clone(),
            },
            Type::Pointer(ptr) => {
                let constness = if ptr.is_const { " const" } else { "" };
                let nullability = if ptr.nullable { "" } else { " _Nonnull" };
                format!("{}{}*{}", self.spelling(&ptr.pointee), constness, nullability)
            }
            Type::Reference(reference) => {
                let constness = if reference.is_const { " const" } else { "" };
                let amps = if reference.rvalue { "&&" } else { "&" };
                format!("{}{}{}", self.spelling(&reference.pointee), constness, amps)
            }
            Type::Named(named) => match self.get(named.id) {
                Some(item) => item.decl().qualified_name(),
                None => format!("<{}>", named.id.0),
            },
            Type::Instantiation(inst) => {
                let args = inst
                    .args
                    .iter()
                    .map(|arg| self.spelling(arg))
                    .collect::<Vec<_>>();
                let template = inst.template.strip_prefix("::").unwrap_or(&inst.template);
                format!("{}<{}>", template, args.join(", "))
            }
            Type::FunctionPointer(sig) => {
                let params = sig
                    .params
                    .iter()
                    .map(|param| self.spelling(param))
                    .collect::<Vec<_>>();
                let attribute = match sig.cc.cxx_attribute() {
                    Some(attribute) => format!("{} ", attribute),
                    None => String::new(),
                };
                format!("{}({}*)({})", self.spelling(&sig.ret), attribute, params.join(", "))
            }
            Type::Tuple(tuple) => {
                let elements = tuple
                    .elements
                    .iter()
                    .map(|element| self.spelling(element))
                    .collect::<Vec<_>>();
                format!("({})", elements.join(", "))
            }
        }
    }

    fn check_references(&self, item: &Item) -> Result<(), Invalid> {
        let mut types = Vec::new();
        match item {
            Item::Record(record) => {
                types.extend(record.fields.iter().map(|field| &field.ty));
                if let Some(variants) = &record.variants {
                    types.push(&variants.tag);
                    for variant in &variants.variants {
                        types.extend(variant.fields.iter().map(|field| &field.ty));
                    }
                }
            }
            Item::Enum(enm) => types.push(&enm.underlying),
            Item::Func(func) => {
                if let Some(id) = func.record {
                    self.check_id(id, item)?;
                }
                types.extend(func.params.iter().map(|param| &param.ty));
                types.push(&func.ret);
            }
            Item::TypeAlias(alias) => types.push(&alias.underlying),
            Item::Unsupported(_) => {}
        }
        for ty in types {
            self.check_type(ty, item)?;
        }
        Ok(())
    }

    fn check_type(&self, ty: &Type, item: &Item) -> Result<(), Invalid> {
        match ty {
            Type::Primitive(_) => Ok(()),
            Type::Pointer(ptr) => self.check_type(&ptr.pointee, item),
            Type::Reference(reference) => self.check_type(&reference.pointee, item),
            Type::Named(named) => self.check_id(named.id, item),
            Type::Instantiation(inst) => {
                if let Some(id) = inst.id {
                    self.check_id(id, item)?;
                }
                inst.args.iter().try_for_each(|arg| self.check_type(arg, item))
            }
            Type::FunctionPointer(sig) => {
                sig.params.iter().try_for_each(|param| self.check_type(param, item))?;
                self.check_type(&sig.ret, item)
            }
            Type::Tuple(tuple) => tuple
                .elements
                .iter()
                .try_for_each(|element| self.check_type(element, item)),
        }
    }

    fn check_id(&self, id: ItemId, item: &Item) -> Result<(), Invalid> {
        if self.by_id.contains_key(&id) {
            Ok(())
        } else {
            Err(Invalid::UnknownId {
                id,
                referenced_by: item.decl().qualified_name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Invalid, Types};
    use crate::syntax::Ir;
    use serde_json::json;

    fn ir(value: serde_json::Value) -> Ir {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_duplicate_id() {
        let ir = ir(json!({
            "lang": "cxx",
            "items": [
                {"kind": "record", "id": 1, "name": "A", "size": 1, "align": 1},
                {"kind": "record", "id": 1, "name": "B", "size": 1, "align": 1},
            ],
        }));
        assert!(matches!(Types::collect(&ir), Err(Invalid::DuplicateId(_))));
    }

    #[test]
    fn test_unknown_id() {
        let ir = ir(json!({
            "lang": "cxx",
            "items": [{
                "kind": "func", "id": 1, "name": "f", "namespace": ["ns"],
                "params": [{"name": "x", "type": {"kind": "named", "id": 7}}],
            }],
        }));
        let err = Types::collect(&ir).err().unwrap();
        assert_eq!("item 'ns::f' refers to undeclared item id 7", err.to_string());
    }

    #[test]
    fn test_spelling() {
        let ir = ir(json!({
            "lang": "cxx",
            "items": [{"kind": "record", "id": 1, "name": "S", "namespace": ["a"], "size": 4, "align": 4}],
        }));
        let types = Types::collect(&ir).unwrap();
        let ty = serde_json::from_value(json!({
            "kind": "pointer", "is_const": true,
            "pointee": {"kind": "instantiation", "template": "::std::optional", "args": [
                {"kind": "named", "id": 1},
            ]},
        }))
        .unwrap();
        assert_eq!("std::optional<a::S> const*", types.spelling(&ty));
        let size_t = serde_json::from_value(json!({"kind": "primitive", "name": "std::size_t"})).unwrap();
        assert_eq!("std::uintptr_t", types.spelling(&size_t));
    }
}
