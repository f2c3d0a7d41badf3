//! C++ entry points for Rust functions: an inline wrapper with the C++
//! signature, which adapts its arguments and calls a Rust thunk declared
//! `extern "C"`.

use crate::gen::expand_thunk;
use crate::gen::out::Content;
use crate::gen::write_type::{cxx_abi_type, cxx_schema, cxx_type};
use crate::gen::{cxx_deprecated_attr, doc_lines, names, Context};
use crate::syntax::attrs;
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::error;
use crate::syntax::special::{self, SpecialState};
use crate::syntax::thunk::{self, Passing};
use crate::syntax::{FnKind, Func, Item, Lang};
use proc_macro2::TokenStream;

pub(super) struct FnPiece {
    pub namespace: Vec<String>,
    /// Declaration inside the class body, for a method.
    pub member: Option<String>,
    /// `extern "C"` declaration of the thunk.
    pub internal: Content,
    pub definition: Content,
    /// Rust side of the thunk.
    pub thunk: TokenStream,
}

pub(super) fn write_fn(cx: &Context, func: &Func) -> Result<FnPiece, Vec<String>> {
    let decl = &func.decl;
    if let Some(attr) = &decl.unknown_attr {
        return Err(vec![error::UNKNOWN_ATTRIBUTE.with(attr)]);
    }
    let attrs = attrs::parse(decl)?;
    if matches!(func.kind, FnKind::Constructor | FnKind::Destructor) {
        return Err(vec![format!(
            "'{}' is a {:?}, which Rust does not have",
            decl.qualified_name(),
            func.kind,
        )]);
    }
    let one = |message: String| vec![message];
    let name = names::cxx_ident(&decl.name).map_err(one)?;
    let thunk = thunk::plan(cx.types, func)?;
    let symbol = &thunk.symbol;

    let mut params = Vec::new();
    let mut extern_params = Vec::new();
    let mut prelude = Vec::new();
    let mut args = Vec::new();

    let mut qualifier = "";
    if let (Some(this), Some(receiver)) = (&thunk.this, &func.receiver) {
        let ty = cxx_type(cx, this).map_err(one)?;
        if receiver.rvalue {
            check_movable(cx, this).map_err(one)?;
            extern_params.push(format!("{}* __this", ty));
            prelude.push(format!("::crubit::Slot<{}> __this_slot(std::move(*this));", ty));
            args.push("__this_slot.Get()".to_owned());
            qualifier = " &&";
        } else if receiver.is_const {
            extern_params.push(format!("{} const* __this", ty));
            args.push("this".to_owned());
            qualifier = " const";
        } else {
            extern_params.push(format!("{}* __this", ty));
            args.push("this".to_owned());
        }
    }

    for (index, param) in thunk.params.iter().enumerate() {
        let name = cxx_param_name(index, &param.name);
        let value = &param.value;
        let ty = cxx_type(cx, &value.desc).map_err(one)?;
        params.push(format!("{} {}", ty, name));
        match &value.passing {
            Passing::Direct => {
                let abi_type = cxx_abi_type(cx, &value.desc).map_err(one)?;
                extern_params.push(format!("{} {}", abi_type, name));
                args.push(if is_reference(&value.desc) {
                    format!("&{}", name)
                } else {
                    name
                });
            }
            Passing::Indirect => {
                extern_params.push(format!("{}* {}", ty, name));
                prelude.push(format!("::crubit::Slot<{}> __{}_slot(std::move({}));", ty, name, name));
                args.push(format!("__{}_slot.Get()", name));
            }
            Passing::Bridged(schema) => {
                let abi = cxx_schema(cx, schema).map_err(one)?;
                extern_params.push(format!("const unsigned char* {}", name));
                prelude.push(format!("unsigned char __{}_buffer[{}::kSize];", name, abi));
                prelude.push(format!(
                    "::crubit::internal::Encode({}(), __{}_buffer, std::move({}));",
                    abi, name, name,
                ));
                args.push(format!("__{}_buffer", name));
            }
            Passing::Transfer => return Err(vec![not_transferable(&value.desc)]),
        }
    }

    let call = |args: &[String]| format!("__crubit_internal::{}({})", symbol, args.join(", "));
    let mut body = prelude;
    let (ret_type, extern_ret) = match &thunk.ret {
        None => {
            body.push(format!("{};", call(&args)));
            ("void".to_owned(), "void".to_owned())
        }
        Some(ret) => {
            let ty = cxx_type(cx, &ret.desc).map_err(one)?;
            match &ret.passing {
                Passing::Direct => {
                    let extern_ret = cxx_abi_type(cx, &ret.desc).map_err(one)?;
                    if is_reference(&ret.desc) {
                        body.push(format!("return *{};", call(&args)));
                    } else {
                        body.push(format!("return {};", call(&args)));
                    }
                    (ty, extern_ret)
                }
                Passing::Indirect => {
                    extern_params.push(format!("{}* __return", ty));
                    args.push("__return.Get()".to_owned());
                    body.push(format!("::crubit::Slot<{}> __return;", ty));
                    body.push(format!("{};", call(&args)));
                    body.push("return std::move(__return).AssumeInitAndTakeValue();".to_owned());
                    (ty, "void".to_owned())
                }
                Passing::Bridged(schema) => {
                    let abi = cxx_schema(cx, schema).map_err(one)?;
                    extern_params.push("unsigned char* __return".to_owned());
                    args.push("__return".to_owned());
                    body.push(format!("unsigned char __return[{}::kSize];", abi));
                    body.push(format!("{};", call(&args)));
                    body.push(format!("return ::crubit::internal::Decode({}(), __return);", abi));
                    (ty, "void".to_owned())
                }
                Passing::Transfer => return Err(vec![not_transferable(&ret.desc)]),
            }
        }
    };

    let record = match func.record {
        Some(id) => match cx.types.get(id) {
            Some(Item::Record(record)) => Some(record),
            _ => return Err(vec![error::NOT_A_TYPE.with(id.0)]),
        },
        None => None,
    };
    let deprecated = cxx_deprecated_attr(attrs.deprecated.as_ref()).unwrap_or_default();
    let params = params.join(", ");

    let mut internal = Content::new();
    writeln!(
        internal,
        "extern \"C\" {} {}({});",
        extern_ret,
        symbol,
        extern_params.join(", "),
    );

    let mut member = None;
    let mut definition = Content::new();
    match record {
        Some(record) => {
            let class = names::cxx_ident(&record.decl.name).map_err(one)?;
            let is_static = func.receiver.is_none();
            let mut decl_text = Content::new();
            write_doc(&mut decl_text, "  ", &doc_lines(cx, decl));
            writeln!(
                decl_text,
                "  {}{}{} {}({}){};",
                deprecated,
                if is_static { "static " } else { "" },
                ret_type,
                name,
                params,
                qualifier,
            );
            member = Some(decl_text.into_string());
            writeln!(
                definition,
                "inline {} {}::{}({}){} {{",
                ret_type, class, name, params, qualifier,
            );
        }
        None => {
            write_doc(&mut definition, "", &doc_lines(cx, decl));
            writeln!(definition, "{}inline {} {}({}) {{", deprecated, ret_type, name, params);
        }
    }
    for line in &body {
        writeln!(definition, "  {}", line);
    }
    writeln!(definition, "}}");

    // Out-of-class definitions of methods go next to their class.
    let namespace = match record {
        Some(record) => {
            let record_attrs = attrs::parse(&record.decl).unwrap_or_default();
            names::cxx_namespace(cx, &record.decl, &record_attrs)
        }
        None => names::cxx_namespace(cx, decl, &attrs),
    };
    let thunk_tokens = expand_thunk::expand_fn_thunk(cx, func, &thunk).map_err(one)?;
    Ok(FnPiece {
        namespace,
        member,
        internal,
        definition,
        thunk: thunk_tokens,
    })
}

/// C++ parameter name: Rust names that are C++ keywords get a trailing
/// underscore.
pub(super) fn cxx_param_name(index: usize, name: &str) -> String {
    let name = names::param_name(index, name);
    if names::cxx_ident(&name).is_err() {
        format!("{}_", name)
    } else {
        name
    }
}

fn is_reference(desc: &TypeDescriptor) -> bool {
    matches!(desc.kind, TypeKind::Reference { .. })
}

fn check_movable(cx: &Context, this: &TypeDescriptor) -> Result<(), String> {
    if let Some(Item::Record(record)) = this.record_id().and_then(|id| cx.types.get(id)) {
        if special::plan(Lang::Rust, record).move_construct == SpecialState::Deleted {
            return Err(error::NON_MOVABLE_BY_VALUE.with(&this.spelling));
        }
    }
    Ok(())
}

fn not_transferable(desc: &TypeDescriptor) -> String {
    format!(
        "{} cannot cross from Rust: ownership transfer is only implemented for C++ declarations",
        desc.spelling,
    )
}

/// Doc comment lines as `///` comments.
pub(super) fn write_doc(out: &mut Content, indent: &str, lines: &[String]) {
    for line in lines {
        if line.is_empty() {
            writeln!(out, "{}///", indent);
        } else {
            writeln!(out, "{}/// {}", indent, line);
        }
    }
}
