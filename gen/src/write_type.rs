use crate::gen::{names, Context};
use crate::syntax::bridge::{Bridge, Schema, TupleTemplate};
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::Lang;

/// C++ spelling of a classified type.
pub(crate) fn cxx_type(cx: &Context, desc: &TypeDescriptor) -> Result<String, String> {
    Ok(match &desc.kind {
        TypeKind::Primitive(atom) => atom.to_cxx().to_owned(),
        TypeKind::Pointer { pointee, is_const } => {
            format!("{}{}*", cxx_type(cx, pointee)?, constness(*is_const))
        }
        TypeKind::Reference { pointee, is_const } => {
            format!("{}{}&", cxx_type(cx, pointee)?, constness(*is_const))
        }
        TypeKind::Enum(id) | TypeKind::Record(id) | TypeKind::TemplateInstantiation { id, .. } => {
            names::cxx_path(cx, *id)?
        }
        TypeKind::FunctionPointer { cc, params, ret } => {
            let params = join(cx, params)?;
            let attribute = match cc.cxx_attribute() {
                Some(attribute) => format!(" {}", attribute),
                None => String::new(),
            };
            format!("std::add_pointer_t<{}({}){}>", cxx_type(cx, ret)?, params, attribute)
        }
        TypeKind::Tuple(elements) => format!("std::tuple<{}>", join(cx, elements)?),
        TypeKind::Bridged(bridge) => match bridge {
            Bridge::Optional(inner) => format!("std::optional<{}>", cxx_type(cx, inner)?),
            Bridge::Tuple { template, elements } => match template {
                TupleTemplate::Pair => format!("std::pair<{}>", join(cx, elements)?),
                TupleTemplate::Tuple => format!("std::tuple<{}>", join(cx, elements)?),
            },
            Bridge::UniquePtr(pointee) => format!("std::unique_ptr<{}>", cxx_type(cx, pointee)?),
            Bridge::Custom { id, attrs, .. } => match cx.types.lang {
                Lang::Cxx => names::cxx_path(cx, *id)?,
                Lang::Rust => attrs.ty.clone(),
            },
        },
    })
}

/// Like [`cxx_type`], except a top-level reference is spelled as the pointer
/// it is passed as through an `extern "C"` signature.
pub(crate) fn cxx_abi_type(cx: &Context, desc: &TypeDescriptor) -> Result<String, String> {
    match &desc.kind {
        TypeKind::Reference { pointee, is_const } => {
            Ok(format!("{}{}*", cxx_type(cx, pointee)?, constness(*is_const)))
        }
        _ => cxx_type(cx, desc),
    }
}

/// The C++ Abi class that encodes values of a schema, e.g.
/// `::crubit::OptionalAbi<::crubit::TransmuteAbi<int>>`.
pub(crate) fn cxx_schema(cx: &Context, schema: &Schema) -> Result<String, String> {
    Ok(match schema {
        Schema::Transmute(desc) => format!("::crubit::TransmuteAbi<{}>", cxx_type(cx, desc)?),
        Schema::Optional(inner) => format!("::crubit::OptionalAbi<{}>", cxx_schema(cx, inner)?),
        Schema::Tuple(template, elements) => {
            let elements = elements
                .iter()
                .map(|element| cxx_schema(cx, element))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ");
            match template {
                TupleTemplate::Pair => format!("::crubit::PairAbi<{}>", elements),
                TupleTemplate::Tuple => format!("::crubit::TupleAbi<{}>", elements),
            }
        }
        Schema::Custom { attrs, .. } => attrs.abi_cpp.clone(),
    })
}

fn constness(is_const: bool) -> &'static str {
    if is_const {
        " const"
    } else {
        ""
    }
}

fn join(cx: &Context, descs: &[std::rc::Rc<TypeDescriptor>]) -> Result<String, String> {
    Ok(descs
        .iter()
        .map(|desc| cxx_type(cx, desc))
        .collect::<Result<Vec<_>, _>>()?
        .join(", "))
}
