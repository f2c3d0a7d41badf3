//! How each function call crosses the boundary.
//!
//! A call is either linked directly against the source-language symbol, when
//! every value already has the same ABI in both languages, or routed through
//! a generated `extern "C"` thunk which adapts the values that don't.

use crate::syntax::abi_class;
use crate::syntax::bridge::{self, Bridge, Schema};
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::error;
use crate::syntax::mangle;
use crate::syntax::special::{self, SpecialState};
use crate::syntax::symbol::Symbol;
use crate::syntax::{FnKind, Func, Item, Lang, Type, Types};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Passing {
    /// As itself, in registers or on the stack per the C ABI.
    Direct,
    /// By pointer to caller-owned storage: the argument is moved into a
    /// slot, or the return value is constructed into one.
    Indirect,
    /// Encoded into a byte buffer and passed by pointer.
    Bridged(Schema),
    /// Ownership handed over as a raw pointer.
    Transfer,
}

#[derive(Clone, Debug)]
pub struct ThunkValue {
    pub desc: Rc<TypeDescriptor>,
    pub passing: Passing,
}

#[derive(Clone, Debug)]
pub struct ThunkParam {
    pub name: String,
    pub value: ThunkValue,
}

#[derive(Clone, Debug)]
pub enum Strategy {
    /// Declared directly against the source symbol.
    Direct { link_name: String },
    Thunk,
}

#[derive(Clone, Debug)]
pub struct ThunkDescriptor {
    /// Name of the generated thunk, or of the Rust declaration linked to the
    /// source symbol under `Strategy::Direct`.
    pub symbol: Symbol,
    pub strategy: Strategy,
    /// Record whose address is passed as the receiver.
    pub this: Option<Rc<TypeDescriptor>>,
    pub params: Vec<ThunkParam>,
    /// `None` for `void`.
    pub ret: Option<ThunkValue>,
}

/// Shape of a thunk's body on the side that makes the actual call.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Body {
    DirectCall,
    DecodeThenCall,
    CallThenEncode,
    DecodeCallEncode,
}

impl Passing {
    pub fn is_direct(&self) -> bool {
        matches!(self, Passing::Direct)
    }

    /// Whether the value is converted on the way through.
    pub fn is_coded(&self) -> bool {
        matches!(self, Passing::Bridged(_) | Passing::Transfer)
    }
}

impl ThunkDescriptor {
    pub fn body(&self) -> Body {
        let decode = self.params.iter().any(|param| param.value.passing.is_coded());
        let encode = self.ret.as_ref().is_some_and(|ret| ret.passing.is_coded());
        match (decode, encode) {
            (false, false) => Body::DirectCall,
            (true, false) => Body::DecodeThenCall,
            (false, true) => Body::CallThenEncode,
            (true, true) => Body::DecodeCallEncode,
        }
    }

    pub fn thunk_symbol(&self) -> Option<&Symbol> {
        match &self.strategy {
            Strategy::Thunk => Some(&self.symbol),
            Strategy::Direct { .. } => None,
        }
    }
}

pub fn plan(types: &Types, func: &Func) -> Result<ThunkDescriptor, Vec<String>> {
    let mut problems = Vec::new();

    let record = match func.record {
        Some(id) => match types.record(id) {
            Ok(record) => Some(record),
            Err(_) => {
                let name = types
                    .get(id)
                    .map_or_else(|| id.0.to_string(), |item| item.decl().qualified_name());
                return Err(vec![error::DEPENDS_ON_UNSUPPORTED.with(format_args!("'{}'", name))]);
            }
        },
        None => None,
    };

    let this = match (&func.receiver, func.kind) {
        (Some(_), FnKind::Method) => record.clone(),
        _ => None,
    };

    let mut params = Vec::new();
    for param in &func.params {
        match value(types, &param.ty) {
            Ok(Some(value)) => params.push(ThunkParam {
                name: param.name.clone(),
                value,
            }),
            Ok(None) => problems.push(format!("parameter '{}': has type void", param.name)),
            Err(problem) => problems.push(format!("parameter '{}': {}", param.name, problem)),
        }
    }

    let ret = if func.kind == FnKind::Constructor {
        match &record {
            Some(record) => match by_value(types, record.clone()) {
                Ok(passing) => Some(ThunkValue {
                    desc: record.clone(),
                    passing: match passing {
                        Passing::Direct => Passing::Indirect,
                        other => other,
                    },
                }),
                Err(problem) => {
                    problems.push(problem);
                    None
                }
            },
            None => None,
        }
    } else {
        match value(types, &func.ret) {
            Ok(ret) => ret,
            Err(problem) => {
                problems.push(format!("return type: {}", problem));
                None
            }
        }
    };

    if !problems.is_empty() {
        return Err(problems);
    }

    let everything_direct = params.iter().all(|param| param.value.passing.is_direct())
        && ret.as_ref().map_or(true, |ret| ret.passing.is_direct());
    let strategy = match &func.mangled_name {
        Some(link_name)
            if types.lang == Lang::Cxx
                && !func.is_inline
                && matches!(func.kind, FnKind::Free | FnKind::Method)
                && !func.receiver.as_ref().is_some_and(|receiver| receiver.rvalue)
                && func.cc.rust_abi().is_some()
                && everything_direct =>
        {
            Strategy::Direct {
                link_name: link_name.clone(),
            }
        }
        _ => Strategy::Thunk,
    };

    let record_decl = func.record.and_then(|id| types.get(id)).map(Item::decl);
    let spellings = func
        .params
        .iter()
        .map(|param| types.spelling(&param.ty))
        .collect::<Vec<_>>();
    let symbol = mangle::thunk(func, record_decl, &spellings);

    Ok(ThunkDescriptor {
        symbol,
        strategy,
        this,
        params,
        ret,
    })
}

fn value(types: &Types, ty: &Type) -> Result<Option<ThunkValue>, String> {
    let desc = types.classify(ty)?;
    if desc.is_void() {
        return Ok(None);
    }
    let passing = by_value(types, desc.clone())?;
    Ok(Some(ThunkValue { desc, passing }))
}

fn by_value(types: &Types, desc: Rc<TypeDescriptor>) -> Result<Passing, String> {
    match &desc.kind {
        TypeKind::Primitive(_)
        | TypeKind::Pointer { .. }
        | TypeKind::Reference { .. }
        | TypeKind::FunctionPointer { .. }
        | TypeKind::Enum(_) => Ok(Passing::Direct),
        TypeKind::Record(id) | TypeKind::TemplateInstantiation { id, .. } => {
            let Some(Item::Record(record)) = types.get(*id) else {
                return Err(error::NOT_A_TYPE.with(&desc.spelling));
            };
            match types.lang {
                Lang::Cxx => {
                    if !desc.triviality.movable {
                        return Err(error::NON_MOVABLE_BY_VALUE.with(&desc.spelling));
                    }
                    let classes = abi_class::classify(types, record, &desc);
                    if desc.triviality.copyable && !abi_class::is_memory(&classes) {
                        Ok(Passing::Direct)
                    } else {
                        Ok(Passing::Indirect)
                    }
                }
                // The C++ class is an opaque byte array, which the C ABI
                // classifies differently from the Rust struct.
                Lang::Rust => {
                    let plan = special::plan(Lang::Rust, record);
                    if plan.move_construct == SpecialState::Deleted {
                        return Err(error::NON_MOVABLE_BY_VALUE.with(&desc.spelling));
                    }
                    Ok(Passing::Indirect)
                }
            }
        }
        TypeKind::Bridged(Bridge::UniquePtr(_)) => Ok(Passing::Transfer),
        TypeKind::Bridged(_) | TypeKind::Tuple(_) => match bridge::schema(&desc) {
            Some(schema) => Ok(Passing::Bridged(schema)),
            None => Err(format!("{} cannot be passed by value", desc.spelling)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{plan, Body, Passing, Strategy};
    use crate::syntax::{Func, Ir, Item, Types};
    use serde_json::{json, Value};

    fn ir(lang: &str, items: Value) -> Ir {
        serde_json::from_value(json!({"lang": lang, "items": items})).unwrap()
    }

    fn func<'a>(ir: &'a Ir, name: &str) -> &'a Func {
        ir.items
            .iter()
            .find_map(|item| match item {
                Item::Func(func) if func.decl.name == name => Some(func),
                _ => None,
            })
            .unwrap()
    }

    fn int() -> Value {
        json!({"kind": "primitive", "name": "int"})
    }

    #[test]
    fn test_direct_link() {
        let ir = ir("cxx", json!([
            {"kind": "func", "id": 1, "name": "add", "mangled_name": "_Z3addii",
             "params": [{"name": "a", "type": int()}, {"name": "b", "type": int()}], "ret": int()},
            {"kind": "func", "id": 2, "name": "inl", "mangled_name": "_Z3inlv", "is_inline": true},
        ]));
        let types = Types::collect(&ir).unwrap();
        let add = plan(&types, func(&ir, "add")).unwrap();
        assert!(matches!(&add.strategy, Strategy::Direct { link_name } if link_name == "_Z3addii"));
        assert_eq!(Body::DirectCall, add.body());

        let inl = plan(&types, func(&ir, "inl")).unwrap();
        assert_eq!("__crubit_thunk_inl", inl.thunk_symbol().unwrap().to_string());
        assert!(inl.ret.is_none());
    }

    #[test]
    fn test_nontrivial_record_goes_indirect() {
        let ir = ir("cxx", json!([
            {"kind": "record", "id": 1, "name": "S", "size": 8, "align": 8,
             "fields": [{"name": "p", "type": {"kind": "pointer", "pointee": int()}, "offset": 0}],
             "special_members": {"copy_ctor": "nontrivial_user_defined"}},
            {"kind": "record", "id": 2, "name": "Pinned", "size": 8, "align": 8,
             "special_members": {"move_ctor": "unavailable"}},
            {"kind": "func", "id": 3, "name": "make", "mangled_name": "_Z4makev",
             "ret": {"kind": "named", "id": 1}},
            {"kind": "func", "id": 4, "name": "take",
             "params": [{"name": "p", "type": {"kind": "named", "id": 2}}]},
        ]));
        let types = Types::collect(&ir).unwrap();
        let make = plan(&types, func(&ir, "make")).unwrap();
        assert!(matches!(make.ret.unwrap().passing, Passing::Indirect));
        assert!(matches!(make.strategy, Strategy::Thunk));

        let err = plan(&types, func(&ir, "take")).unwrap_err();
        assert_eq!(
            vec!["parameter 'p': type cannot be passed or returned by value because it is not movable: Pinned".to_owned()],
            err,
        );
    }

    #[test]
    fn test_register_class_decides_passing() {
        let prim = |name: &str| json!({"kind": "primitive", "name": name});
        let ir = ir("cxx", json!([
            {"kind": "record", "id": 1, "name": "Vec3", "size": 12, "align": 4,
             "fields": [
                {"name": "x", "type": prim("float"), "offset": 0},
                {"name": "y", "type": prim("float"), "offset": 4},
                {"name": "z", "type": prim("float"), "offset": 8},
             ]},
            {"kind": "record", "id": 2, "name": "Packed", "size": 5, "align": 1, "packed": 1,
             "fields": [
                {"name": "pad", "type": prim("char"), "offset": 0},
                {"name": "value", "type": int(), "offset": 1},
             ]},
            {"kind": "record", "id": 3, "name": "Count", "size": 4, "align": 4,
             "fields": [{"name": "value", "type": int(), "offset": 0}]},
            {"kind": "func", "id": 4, "name": "add_vec", "mangled_name": "_Z7add_vec4Vec3S_",
             "params": [{"name": "a", "type": {"kind": "named", "id": 1}}, {"name": "b", "type": {"kind": "named", "id": 1}}],
             "ret": {"kind": "named", "id": 1}},
            {"kind": "func", "id": 5, "name": "add_packed", "mangled_name": "_Z10add_packed6PackedS_",
             "params": [{"name": "a", "type": {"kind": "named", "id": 2}}, {"name": "b", "type": {"kind": "named", "id": 2}}],
             "ret": {"kind": "named", "id": 2}},
            {"kind": "func", "id": 6, "name": "add_count", "mangled_name": "_Z9add_count5CountS_",
             "params": [{"name": "a", "type": {"kind": "named", "id": 3}}, {"name": "b", "type": {"kind": "named", "id": 3}}],
             "ret": {"kind": "named", "id": 3}},
        ]));
        let types = Types::collect(&ir).unwrap();

        let add_vec = plan(&types, func(&ir, "add_vec")).unwrap();
        assert!(add_vec.params.iter().all(|param| matches!(param.value.passing, Passing::Direct)));
        assert!(matches!(add_vec.ret.unwrap().passing, Passing::Direct));

        let add_packed = plan(&types, func(&ir, "add_packed")).unwrap();
        assert!(add_packed.params.iter().all(|param| matches!(param.value.passing, Passing::Indirect)));
        assert!(matches!(add_packed.ret.unwrap().passing, Passing::Indirect));
        assert!(matches!(add_packed.strategy, Strategy::Thunk));

        let add_count = plan(&types, func(&ir, "add_count")).unwrap();
        assert!(add_count.params.iter().all(|param| matches!(param.value.passing, Passing::Direct)));
        assert!(matches!(add_count.ret.unwrap().passing, Passing::Direct));
    }

    #[test]
    fn test_bridged_optional() {
        let ir = ir("cxx", json!([
            {"kind": "func", "id": 1, "name": "find", "mangled_name": "_Z4findi",
             "params": [{"name": "key", "type": int()}],
             "ret": {"kind": "instantiation", "template": "std::optional", "args": [int()]}},
        ]));
        let types = Types::collect(&ir).unwrap();
        let find = plan(&types, func(&ir, "find")).unwrap();
        assert!(matches!(find.ret.as_ref().unwrap().passing, Passing::Bridged(_)));
        assert_eq!(Body::CallThenEncode, find.body());
        assert!(matches!(find.strategy, Strategy::Thunk));
    }

    #[test]
    fn test_rust_records_go_indirect() {
        let ir = ir("rust", json!([
            {"kind": "record", "id": 1, "name": "Point", "size": 8, "align": 4,
             "rust_traits": {"copy": true, "clone": true}},
            {"kind": "record", "id": 2, "name": "Handle", "size": 8, "align": 8,
             "rust_traits": {"drop": true}},
            {"kind": "func", "id": 3, "name": "origin", "ret": {"kind": "named", "id": 1}},
            {"kind": "func", "id": 4, "name": "close",
             "params": [{"name": "h", "type": {"kind": "named", "id": 2}}]},
        ]));
        let types = Types::collect(&ir).unwrap();
        let origin = plan(&types, func(&ir, "origin")).unwrap();
        assert!(matches!(origin.ret.unwrap().passing, Passing::Indirect));
        assert!(plan(&types, func(&ir, "close")).is_err());
    }

    #[test]
    fn test_errors_name_the_parameter() {
        let ir = ir("cxx", json!([
            {"kind": "func", "id": 1, "name": "f", "params": [
                {"name": "x", "type": {"kind": "reference", "rvalue": true, "pointee": int()}},
            ], "ret": {"kind": "primitive", "name": "__int128"}},
        ]));
        let types = Types::collect(&ir).unwrap();
        let err = plan(&types, func(&ir, "f")).unwrap_err();
        assert_eq!(
            vec![
                "parameter 'x': rvalue references are not supported".to_owned(),
                "return type: unsupported builtin type: `__int128`".to_owned(),
            ],
            err,
        );
    }
}
