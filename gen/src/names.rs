use crate::gen::Context;
use crate::syntax::attrs::{self, Attrs};
use crate::syntax::error;
use crate::syntax::namespace::Namespace;
use crate::syntax::symbol::{self, Symbol};
use crate::syntax::{Decl, ItemId, Lang};
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

const TEMPLATE_INSTANTIATION_PREFIX: &str = "__CcTemplateInst";

// Reserved words that a Rust item name cannot take in the C++ header.
static CXX_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
];

/// `name` as a Rust identifier, raw if it is a keyword.
pub(crate) fn rust_ident(name: &str) -> Result<Ident, String> {
    if syn::parse_str::<Ident>(name).is_ok() {
        return Ok(Ident::new(name, Span::call_site()));
    }
    let raw = format!("r#{}", name);
    if syn::parse_str::<Ident>(&raw).is_ok() {
        return Ok(Ident::new_raw(name, Span::call_site()));
    }
    Err(error::NOT_AN_IDENTIFIER.with(format_args!("'{}'", name)))
}

pub(crate) fn cxx_ident(name: &str) -> Result<&str, String> {
    if CXX_KEYWORDS.contains(&name) {
        Err(error::CXX_KEYWORD.with(format_args!("'{}'", name)))
    } else {
        Ok(name)
    }
}

/// Whether the record is a class template specialization, which is named
/// after its full spelling.
pub(crate) fn is_instantiation(decl: &Decl) -> bool {
    decl.name.contains('<')
}

/// Rust name of a class template specialization, emitted at the top of
/// the generated module and derived from its escaped spelling.
pub(crate) fn instantiation_ident(decl: &Decl) -> Symbol {
    symbol::join(TEMPLATE_INSTANTIATION_PREFIX, &[&decl.qualified_name()])
}

/// Name of a function parameter in generated code on either side. The IR
/// leaves unnamed parameters empty.
pub(crate) fn param_name(index: usize, name: &str) -> String {
    if name.is_empty() {
        format!("__param_{}", index)
    } else {
        name.to_owned()
    }
}

/// Name of the declaration on the generated side.
pub(crate) fn target_name<'a>(lang: Lang, decl: &'a Decl, attrs: &'a Attrs) -> &'a str {
    match (lang, &attrs.rust_name) {
        (Lang::Cxx, Some(rust_name)) => rust_name,
        _ => &decl.name,
    }
}

/// Enclosing namespace with any `namespace_rename` applied.
pub(crate) fn namespace(decl: &Decl, attrs: &Attrs) -> Namespace {
    match &attrs.namespace_rename {
        Some(rename) => decl.namespace.renamed(&rename.from, &rename.to),
        None => decl.namespace.clone(),
    }
}

/// C++ namespace that bindings for a Rust item are emitted into: the
/// crate name, then the module path.
pub(crate) fn cxx_namespace(cx: &Context, decl: &Decl, attrs: &Attrs) -> Vec<String> {
    let mut segments = Vec::new();
    if !cx.types.target.is_empty() {
        segments.push(cx.types.target.to_owned());
    }
    segments.extend(namespace(decl, attrs).iter().cloned());
    segments
}

fn item_attrs<'a>(cx: &Context<'a>, id: ItemId) -> Result<(&'a Decl, Attrs), String> {
    let Some(item) = cx.types.get(id) else {
        return Err(error::DEPENDS_ON_UNSUPPORTED.with(id.0));
    };
    let decl = item.decl();
    match attrs::parse(decl) {
        Ok(attrs) => Ok((decl, attrs)),
        Err(_) => Err(error::DEPENDS_ON_UNSUPPORTED.with(format_args!("'{}'", decl.qualified_name()))),
    }
}

/// Path of a type in generated Rust. For C++ items this points into the
/// generated module (`crate::ns::Name`); for Rust items it names the
/// original (`::my_crate::module::Name`).
pub(crate) fn rust_path(cx: &Context, id: ItemId) -> Result<TokenStream, String> {
    let (decl, attrs) = item_attrs(cx, id)?;
    match cx.types.lang {
        Lang::Cxx => {
            if is_instantiation(decl) {
                let ident = instantiation_ident(decl);
                return Ok(quote!(crate::#ident));
            }
            let modules = namespace(decl, &attrs)
                .iter()
                .map(|segment| rust_ident(segment))
                .collect::<Result<Vec<_>, _>>()?;
            let name = rust_ident(target_name(Lang::Cxx, decl, &attrs))?;
            Ok(quote!(crate #(::#modules)* ::#name))
        }
        Lang::Rust => {
            let root = if cx.types.target.is_empty() {
                quote!(crate)
            } else {
                let krate = rust_ident(cx.types.target)?;
                quote!(::#krate)
            };
            let modules = decl
                .namespace
                .iter()
                .map(|segment| rust_ident(segment))
                .collect::<Result<Vec<_>, _>>()?;
            let name = rust_ident(&decl.name)?;
            Ok(quote!(#root #(::#modules)* ::#name))
        }
    }
}

/// Fully qualified C++ spelling of a type, e.g. `::ns::Name`.
pub(crate) fn cxx_path(cx: &Context, id: ItemId) -> Result<String, String> {
    let (decl, attrs) = item_attrs(cx, id)?;
    let mut path = String::new();
    let segments = match cx.types.lang {
        Lang::Cxx => decl.namespace.iter().cloned().collect::<Vec<_>>(),
        Lang::Rust => cxx_namespace(cx, decl, &attrs),
    };
    for segment in segments {
        path.push_str("::");
        path.push_str(&segment);
    }
    path.push_str("::");
    path.push_str(&decl.name);
    Ok(path)
}
