use crate::gen::{names, Context};
use crate::syntax::attrs::BridgeAttrs;
use crate::syntax::bridge::{Bridge, Schema};
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::elision::count_positions;
use crate::syntax::{Atom, Lang, Type};
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use std::slice;

/// Rust spelling of a classified type as it appears in `extern` blocks and
/// layouts: references and pointers are raw.
pub(crate) fn expand_desc(cx: &Context, desc: &TypeDescriptor) -> Result<TokenStream, String> {
    let runtime = &cx.runtime;
    Ok(match &desc.kind {
        TypeKind::Primitive(atom) => atom.to_token_stream(),
        TypeKind::Pointer { pointee, is_const } | TypeKind::Reference { pointee, is_const } => {
            let pointee = if pointee.is_void() {
                quote!(::core::ffi::c_void)
            } else {
                expand_desc(cx, pointee)?
            };
            if *is_const {
                quote!(*const #pointee)
            } else {
                quote!(*mut #pointee)
            }
        }
        TypeKind::Enum(id) | TypeKind::Record(id) | TypeKind::TemplateInstantiation { id, .. } => {
            names::rust_path(cx, *id)?
        }
        TypeKind::FunctionPointer { cc, params, ret } => {
            let function = expand_fn_pointer(cx, cc.rust_abi().unwrap_or("C"), params, ret)?;
            if desc.nullable {
                quote!(::core::option::Option<#function>)
            } else {
                function
            }
        }
        TypeKind::Tuple(elements) => {
            let elements = elements
                .iter()
                .map(|element| expand_desc(cx, element))
                .collect::<Result<Vec<_>, _>>()?;
            quote!((#(#elements,)*))
        }
        TypeKind::Bridged(bridge) => match bridge {
            Bridge::Optional(inner) => {
                let inner = expand_desc(cx, inner)?;
                quote!(::core::option::Option<#inner>)
            }
            Bridge::Tuple { elements, .. } => {
                let elements = elements
                    .iter()
                    .map(|element| expand_desc(cx, element))
                    .collect::<Result<Vec<_>, _>>()?;
                quote!((#(#elements,)*))
            }
            Bridge::UniquePtr(pointee) => {
                let pointee = expand_desc(cx, pointee)?;
                quote!(#runtime::UniquePtr<#pointee>)
            }
            Bridge::Custom { id, attrs, .. } => match cx.types.lang {
                Lang::Cxx => parse_type(&attrs.ty, "bridge_type")?,
                Lang::Rust => names::rust_path(cx, *id)?,
            },
        },
    })
}

fn expand_fn_pointer(
    cx: &Context,
    abi: &str,
    params: &[std::rc::Rc<TypeDescriptor>],
    ret: &TypeDescriptor,
) -> Result<TokenStream, String> {
    let params = params
        .iter()
        .map(|param| expand_desc(cx, param))
        .collect::<Result<Vec<_>, _>>()?;
    let ret = if ret.is_void() {
        None
    } else {
        let ret = expand_desc(cx, ret)?;
        Some(quote!(-> #ret))
    };
    // Calling through a C++ function pointer is unsafe; a Rust one is
    // spelled as the Rust code declared it.
    let unsafety = match cx.types.lang {
        Lang::Cxx => Some(quote!(unsafe)),
        Lang::Rust => None,
    };
    Ok(quote!(#unsafety extern #abi fn(#(#params),*) #ret))
}

/// Schema marker type naming how a bridged value is encoded, e.g.
/// `ByBridge<(ByTransmute, ByTransmute)>` for a pair of integers.
pub(crate) fn expand_schema(cx: &Context, schema: &Schema) -> Result<TokenStream, String> {
    let runtime = &cx.runtime;
    Ok(match schema {
        Schema::Transmute(_) => quote!(#runtime::ByTransmute),
        Schema::Optional(inner) => {
            let inner = expand_schema(cx, inner)?;
            quote!(#runtime::ByBridge<#inner>)
        }
        Schema::Tuple(_, elements) => {
            let elements = elements
                .iter()
                .map(|element| expand_schema(cx, element))
                .collect::<Result<Vec<_>, _>>()?;
            quote!(#runtime::ByBridge<(#(#elements,)*)>)
        }
        Schema::Custom { attrs, .. } => custom_abi(attrs)?,
    })
}

fn custom_abi(attrs: &BridgeAttrs) -> Result<TokenStream, String> {
    parse_type(&attrs.abi_rust, "bridge_abi_rust")
}

fn parse_type(text: &str, annotation: &str) -> Result<TokenStream, String> {
    match syn::parse_str::<syn::Type>(text) {
        Ok(ty) => Ok(ty.into_token_stream()),
        Err(_) => Err(format!("`{}` in {} is not a Rust type", text, annotation)),
    }
}

/// Renders types of a public Rust API for C++ declarations, handing out
/// the function's lifetimes to pointer and reference positions in the order
/// elision assigned them.
pub(crate) struct ApiTypes<'c, 'a> {
    cx: &'c Context<'a>,
    /// Set once a pointer had to be rendered raw, which makes the function
    /// `unsafe` to call.
    pub raw_pointers: bool,
}

impl<'c, 'a> ApiTypes<'c, 'a> {
    pub fn new(cx: &'c Context<'a>) -> Self {
        ApiTypes {
            cx,
            raw_pointers: false,
        }
    }

    /// `lifetimes` is `None` when the function has no lifetimes at all, in
    /// which case pointers stay raw and references get elided lifetimes.
    pub fn render(
        &mut self,
        ty: &Type,
        mut lifetimes: Option<&mut slice::Iter<syn::Lifetime>>,
    ) -> Result<TokenStream, String> {
        let (pointee, is_const, is_reference, nullable) = match ty {
            Type::Pointer(ptr) => (&ptr.pointee, ptr.is_const, false, ptr.nullable),
            Type::Reference(reference) => {
                (&reference.pointee, reference.is_const, true, false)
            }
            _ => {
                if let Some(lifetimes) = lifetimes.as_deref_mut() {
                    for _ in 0..count_positions(ty) {
                        lifetimes.next();
                    }
                }
                let desc = self.cx.types.classify(ty)?;
                if contains_pointer(&desc) {
                    self.raw_pointers = true;
                }
                return expand_desc(self.cx, &desc);
            }
        };

        let pointee_desc = self.cx.types.classify(pointee)?;
        let rendered_pointee = if pointee_desc.is_void() {
            quote!(::core::ffi::c_void)
        } else {
            self.render(pointee, lifetimes.as_deref_mut())?
        };
        let lifetime = lifetimes.and_then(Iterator::next);

        // Without a lifetime a pointer stays raw and a reference is elided.
        if pointee_desc.is_void() || (lifetime.is_none() && !is_reference) {
            self.raw_pointers = true;
            return Ok(if is_const {
                quote!(*const #rendered_pointee)
            } else {
                quote!(*mut #rendered_pointee)
            });
        }

        let pinned = !is_const && is_pinned(&pointee_desc);
        let reference = if is_const {
            quote!(&#lifetime #rendered_pointee)
        } else if pinned {
            quote!(::core::pin::Pin<&#lifetime mut #rendered_pointee>)
        } else {
            quote!(&#lifetime mut #rendered_pointee)
        };
        Ok(if nullable {
            quote!(::core::option::Option<#reference>)
        } else {
            reference
        })
    }
}

/// A record Rust must never move out from behind a reference.
pub(crate) fn is_pinned(desc: &TypeDescriptor) -> bool {
    desc.record_id().is_some() && !desc.triviality.movable
}

fn contains_pointer(desc: &TypeDescriptor) -> bool {
    match &desc.kind {
        TypeKind::Pointer { .. } | TypeKind::Reference { .. } => true,
        TypeKind::FunctionPointer { params, ret, .. } => {
            params.iter().any(|param| contains_pointer(param)) || contains_pointer(ret)
        }
        TypeKind::Tuple(elements) => elements.iter().any(|element| contains_pointer(element)),
        TypeKind::Bridged(Bridge::Optional(inner)) => contains_pointer(inner),
        TypeKind::Bridged(Bridge::Tuple { elements, .. }) => {
            elements.iter().any(|element| contains_pointer(element))
        }
        TypeKind::Primitive(_)
        | TypeKind::Enum(_)
        | TypeKind::Record(_)
        | TypeKind::TemplateInstantiation { .. }
        | TypeKind::Bridged(Bridge::UniquePtr(_) | Bridge::Custom { .. }) => false,
    }
}

/// `Atom::Void` as a return type renders as nothing.
pub(crate) fn expand_return(cx: &Context, desc: &TypeDescriptor) -> Result<Option<TokenStream>, String> {
    if matches!(desc.kind, TypeKind::Primitive(Atom::Void)) {
        Ok(None)
    } else {
        expand_desc(cx, desc).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::{expand_desc, ApiTypes};
    use crate::gen::{Context, Opt};
    use crate::syntax::{Ir, Type, Types};
    use serde_json::{json, Value};

    fn ir(items: Value) -> Ir {
        serde_json::from_value(json!({"lang": "cxx", "target": "lib", "items": items})).unwrap()
    }

    fn ty(value: Value) -> Type {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_raw_layout_types() {
        let ir = ir(json!([
            {"kind": "record", "id": 1, "name": "S", "namespace": ["ns"], "size": 4, "align": 4},
        ]));
        let types = Types::collect(&ir).unwrap();
        let opt = Opt::default();
        let cx = Context::new(&types, &opt).unwrap();

        let ptr = ty(json!({"kind": "pointer", "is_const": true, "pointee": {"kind": "named", "id": 1}}));
        let desc = types.classify(&ptr).unwrap();
        assert_eq!(
            "* const crate :: ns :: S",
            expand_desc(&cx, &desc).unwrap().to_string(),
        );

        let fn_ptr = ty(json!({
            "kind": "function_pointer",
            "params": [{"kind": "primitive", "name": "int"}],
            "ret": {"kind": "primitive", "name": "void"},
        }));
        let desc = types.classify(&fn_ptr).unwrap();
        assert_eq!(
            ":: core :: option :: Option < unsafe extern \"C\" fn (:: core :: ffi :: c_int) >",
            expand_desc(&cx, &desc).unwrap().to_string(),
        );
    }

    #[test]
    fn test_api_references() {
        let ir = ir(json!([
            {"kind": "record", "id": 1, "name": "Pinned", "size": 4, "align": 4,
             "special_members": {"move_ctor": "nontrivial_user_defined"}},
        ]));
        let types = Types::collect(&ir).unwrap();
        let opt = Opt::default();
        let cx = Context::new(&types, &opt).unwrap();
        let a: syn::Lifetime = syn::parse_str("'a").unwrap();
        let lifetimes = vec![a];

        let mut api = ApiTypes::new(&cx);
        let reference = ty(json!({"kind": "reference", "pointee": {"kind": "named", "id": 1}}));
        let rendered = api.render(&reference, Some(&mut lifetimes.iter())).unwrap();
        assert_eq!(
            ":: core :: pin :: Pin < & 'a mut crate :: Pinned >",
            rendered.to_string(),
        );
        assert!(!api.raw_pointers);

        let pointer = ty(json!({"kind": "pointer", "pointee": {"kind": "primitive", "name": "int"}}));
        let rendered = api.render(&pointer, Some(&mut lifetimes.iter())).unwrap();
        assert_eq!(
            ":: core :: option :: Option < & 'a mut :: core :: ffi :: c_int >",
            rendered.to_string(),
        );

        let rendered = api.render(&pointer, None).unwrap();
        assert_eq!("* mut :: core :: ffi :: c_int", rendered.to_string());
        assert!(api.raw_pointers);

        let mut api = ApiTypes::new(&cx);
        let rendered = api.render(&reference, None).unwrap();
        assert_eq!(":: core :: pin :: Pin < & mut crate :: Pinned >", rendered.to_string());
        assert!(!api.raw_pointers);
    }
}
