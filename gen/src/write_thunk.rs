//! C++ definitions of the `extern "C"` thunks that bindings for C++
//! declarations call.

use crate::gen::out::Content;
use crate::gen::write_type::{cxx_schema, cxx_type};
use crate::gen::{names, Context};
use crate::syntax::bridge::Bridge;
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::symbol::Symbol;
use crate::syntax::thunk::{Passing, ThunkDescriptor, ThunkValue};
use crate::syntax::{FnKind, Func, Record};

pub(super) fn write_default(out: &mut Content, symbol: &Symbol, path: &str) {
    out.next_section();
    writeln!(out, "extern \"C\" void {}({}* __this) {{", symbol, path);
    writeln!(out, "  ::crubit::construct_at(__this);");
    writeln!(out, "}}");
}

pub(super) fn write_clone(out: &mut Content, symbol: &Symbol, path: &str) {
    out.next_section();
    writeln!(
        out,
        "extern \"C\" void {}({}* __this, {} const* other) {{",
        symbol, path, path,
    );
    writeln!(out, "  ::crubit::construct_at(__this, *other);");
    writeln!(out, "}}");
}

pub(super) fn write_clone_from(out: &mut Content, symbol: &Symbol, path: &str) {
    out.next_section();
    writeln!(
        out,
        "extern \"C\" void {}({}* __this, {} const* other) {{",
        symbol, path, path,
    );
    writeln!(out, "  if (__this != other) {{");
    writeln!(out, "    *__this = *other;");
    writeln!(out, "  }}");
    writeln!(out, "}}");
}

pub(super) fn write_drop(out: &mut Content, symbol: &Symbol, path: &str) {
    out.next_section();
    writeln!(out, "extern \"C\" void {}({}* __this) {{", symbol, path);
    writeln!(out, "  std::destroy_at(__this);");
    writeln!(out, "}}");
}

/// `delete` for the pointee of a `std::unique_ptr` adopted by Rust.
pub(super) fn write_delete(out: &mut Content, symbol: &Symbol, path: &str) {
    out.next_section();
    writeln!(out, "extern \"C\" void {}({}* ptr) {{", symbol, path);
    writeln!(out, "  delete ptr;");
    writeln!(out, "}}");
}

pub(super) fn write_size_assertions(out: &mut Content, path: &str, size: u64, align: u64) {
    out.next_section();
    writeln!(out, "static_assert(sizeof({}) == {});", path, size);
    writeln!(out, "static_assert(alignof({}) == {});", path, align);
}

pub(super) fn write_record_assertions(
    out: &mut Content,
    record: &Record,
    path: &str,
    offsets: &[(String, u64)],
    trivially_copyable: bool,
) {
    write_size_assertions(out, path, record.size, record.align);
    for (field, offset) in offsets {
        writeln!(out, "static_assert(offsetof({}, {}) == {});", path, field, offset);
    }
    if trivially_copyable {
        writeln!(out, "static_assert(std::is_trivially_copyable_v<{}>);", path);
    }
}

/// Thunk for a function whose call cannot be linked directly: it adapts
/// each value that crosses the boundary, then calls the C++ function.
pub(super) fn write_fn_thunk(
    out: &mut Content,
    cx: &Context,
    func: &Func,
    thunk: &ThunkDescriptor,
) -> Result<(), String> {
    let mut params = Vec::new();
    if let Some(this) = &thunk.this {
        let is_const = func.receiver.as_ref().is_some_and(|receiver| receiver.is_const);
        let constness = if is_const { " const" } else { "" };
        params.push(format!("{}{}* __this", cxx_type(cx, this)?, constness));
    }

    let mut args = Vec::new();
    for (index, param) in thunk.params.iter().enumerate() {
        let name = names::param_name(index, &param.name);
        let value = &param.value;
        params.push(format!("{} {}", abi_param_type(cx, value)?, name));
        args.push(match &value.passing {
            Passing::Direct => name,
            Passing::Indirect => format!("std::move(*{})", name),
            Passing::Bridged(schema) => format!(
                "::crubit::internal::Decode({}(), {})",
                cxx_schema(cx, schema)?,
                name,
            ),
            Passing::Transfer => format!("{}({})", cxx_type(cx, &value.desc)?, name),
        });
    }
    let args = args.join(", ");

    let return_type = match &thunk.ret {
        None => "void".to_owned(),
        Some(ret) => match &ret.passing {
            Passing::Direct => cxx_type(cx, &ret.desc)?,
            Passing::Indirect => {
                params.push(format!("{}* __return", cxx_type(cx, &ret.desc)?));
                "void".to_owned()
            }
            Passing::Bridged(_) => {
                params.push("unsigned char* __return".to_owned());
                "void".to_owned()
            }
            Passing::Transfer => format!("{}*", cxx_type(cx, unique_ptr_pointee(&ret.desc)?)?),
        },
    };

    let call = if func.kind == FnKind::Constructor {
        None
    } else {
        Some(format!("{}({})", callee(cx, func)?, args))
    };

    out.next_section();
    writeln!(
        out,
        "extern \"C\" {} {}({}) {{",
        return_type,
        thunk.symbol,
        params.join(", "),
    );
    match (&thunk.ret, call) {
        (Some(_), None) if args.is_empty() => writeln!(out, "  ::crubit::construct_at(__return);"),
        (Some(_), None) => writeln!(out, "  ::crubit::construct_at(__return, {});", args),
        (None, Some(call)) => writeln!(out, "  {};", call),
        (Some(ret), Some(call)) => match &ret.passing {
            Passing::Direct => writeln!(out, "  return {};", call),
            Passing::Indirect => writeln!(out, "  ::crubit::construct_at(__return, {});", call),
            Passing::Bridged(schema) => writeln!(
                out,
                "  ::crubit::internal::Encode({}(), __return, {});",
                cxx_schema(cx, schema)?,
                call,
            ),
            Passing::Transfer => writeln!(out, "  return {}.release();", call),
        },
        (None, None) => {}
    }
    writeln!(out, "}}");
    Ok(())
}

fn abi_param_type(cx: &Context, value: &ThunkValue) -> Result<String, String> {
    Ok(match &value.passing {
        Passing::Direct => cxx_type(cx, &value.desc)?,
        Passing::Indirect => format!("{}*", cxx_type(cx, &value.desc)?),
        Passing::Bridged(_) => "const unsigned char*".to_owned(),
        Passing::Transfer => format!("{}*", cxx_type(cx, unique_ptr_pointee(&value.desc)?)?),
    })
}

fn unique_ptr_pointee(desc: &TypeDescriptor) -> Result<&TypeDescriptor, String> {
    match &desc.kind {
        TypeKind::Bridged(Bridge::UniquePtr(pointee)) => Ok(pointee),
        _ => Err(format!("{} cannot be transferred", desc.spelling)),
    }
}

/// The C++ expression naming the function being wrapped.
fn callee(cx: &Context, func: &Func) -> Result<String, String> {
    let name = &func.decl.name;
    match (func.record, &func.receiver) {
        (Some(_), Some(receiver)) if func.kind == FnKind::Method => Ok(if receiver.rvalue {
            format!("std::move(*__this).{}", name)
        } else {
            format!("__this->{}", name)
        }),
        (Some(record), _) => Ok(format!("{}::{}", names::cxx_path(cx, record)?, name)),
        (None, _) => {
            let mut path = String::new();
            for segment in &func.decl.namespace {
                path.push_str("::");
                path.push_str(segment);
            }
            path.push_str("::");
            path.push_str(name);
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::write_fn_thunk;
    use crate::gen::out::Content;
    use crate::gen::{Context, Opt};
    use crate::syntax::thunk::plan;
    use crate::syntax::{Ir, Item, Types};
    use indoc::indoc;
    use serde_json::json;

    #[test]
    fn test_bridged_return_and_indirect_param() {
        let ir: Ir = serde_json::from_value(json!({"lang": "cxx", "items": [
            {"kind": "record", "id": 1, "name": "Big", "namespace": ["ns"], "size": 8, "align": 8,
             "special_members": {"copy_ctor": "nontrivial_user_defined"}, "is_trivial_abi": true},
            {"kind": "func", "id": 2, "name": "Lookup", "namespace": ["ns"],
             "params": [{"name": "key", "type": {"kind": "named", "id": 1}}],
             "ret": {"kind": "instantiation", "template": "std::optional",
                     "args": [{"kind": "primitive", "name": "int"}]}},
        ]}))
        .unwrap();
        let types = Types::collect(&ir).unwrap();
        let opt = Opt::default();
        let cx = Context::new(&types, &opt).unwrap();
        let Item::Func(func) = &ir.items[1] else {
            unreachable!();
        };
        let thunk = plan(&types, func).unwrap();

        let mut out = Content::new();
        write_fn_thunk(&mut out, &cx, func, &thunk).unwrap();
        let expected = indoc! {r#"
            extern "C" void __crubit_thunk_ns__Lookup__ns_3ah_3ahBig(::ns::Big* key, unsigned char* __return) {
              ::crubit::internal::Encode(::crubit::OptionalAbi<::crubit::TransmuteAbi<int>>(), __return, ::ns::Lookup(std::move(*key)));
            }
        "#};
        assert_eq!(expected, out.into_string());
    }
}
