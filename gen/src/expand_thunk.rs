//! Rust definitions of the `#[no_mangle]` thunks that the C++ header for a
//! Rust crate calls.

use crate::gen::expand_type::{expand_desc, expand_schema};
use crate::gen::{names, Context};
use crate::syntax::classify::TypeKind;
use crate::syntax::mangle::SpecialThunk;
use crate::syntax::symbol::Symbol;
use crate::syntax::thunk::{Passing, ThunkDescriptor};
use crate::syntax::Func;
use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};

pub(super) fn expand_fn_thunk(cx: &Context, func: &Func, thunk: &ThunkDescriptor) -> Result<TokenStream, String> {
    let runtime = &cx.runtime;
    let mut params = Vec::new();
    let mut args = Vec::new();

    if let (Some(this), Some(receiver)) = (&thunk.this, &func.receiver) {
        let ty = expand_desc(cx, this)?;
        if receiver.rvalue {
            params.push(quote!(__this: *mut #ty));
            args.push(quote!(__this.read()));
        } else if receiver.is_const {
            params.push(quote!(__this: *const #ty));
            args.push(quote!(&*__this));
        } else {
            params.push(quote!(__this: *mut #ty));
            args.push(quote!(&mut *__this));
        }
    }

    for (index, param) in thunk.params.iter().enumerate() {
        let name = format_ident!("__param_{}", index);
        let desc = &param.value.desc;
        match &param.value.passing {
            Passing::Direct => {
                let ty = expand_desc(cx, desc)?;
                params.push(quote!(#name: #ty));
                args.push(match &desc.kind {
                    TypeKind::Reference { is_const: true, .. } => quote!(&*#name),
                    TypeKind::Reference { is_const: false, .. } => quote!(&mut *#name),
                    _ => quote!(#name),
                });
            }
            Passing::Indirect => {
                let ty = expand_desc(cx, desc)?;
                params.push(quote!(#name: *mut #ty));
                args.push(quote!(#name.read()));
            }
            Passing::Bridged(schema) => {
                let ty = expand_desc(cx, desc)?;
                let schema = expand_schema(cx, schema)?;
                params.push(quote!(#name: *const u8));
                args.push(quote!(#runtime::private::decode::<#ty, #schema>(#name)));
            }
            Passing::Transfer => {
                return Err(format!("{} cannot be transferred from C++ to Rust", desc.spelling));
            }
        }
    }

    let name = names::rust_ident(&func.decl.name)?;
    let callee = match func.record {
        Some(record) => {
            let record = names::rust_path(cx, record)?;
            quote!(<#record>::#name)
        }
        None => names::rust_path(cx, func.decl.id)?,
    };
    let call = quote!(#callee(#(#args),*));

    let (ret, body) = match &thunk.ret {
        None => (None, quote!(#call;)),
        Some(ret) => {
            let ty = expand_desc(cx, &ret.desc)?;
            match &ret.passing {
                // A reference comes back as the pointer C++ dereferences.
                Passing::Direct if matches!(ret.desc.kind, TypeKind::Reference { .. }) => {
                    (Some(quote!(-> #ty)), quote!(#call as #ty))
                }
                Passing::Direct => (Some(quote!(-> #ty)), call),
                Passing::Indirect => {
                    params.push(quote!(__return: *mut #ty));
                    (None, quote!(__return.write(#call);))
                }
                Passing::Bridged(schema) => {
                    let schema = expand_schema(cx, schema)?;
                    params.push(quote!(__return: *mut u8));
                    (None, quote!(#runtime::private::encode::<#ty, #schema>(__return, #call);))
                }
                Passing::Transfer => {
                    return Err(format!("{} cannot be transferred from Rust to C++", ret.desc.spelling));
                }
            }
        }
    };

    let symbol = &thunk.symbol;
    Ok(quote! {
        #[no_mangle]
        unsafe extern "C" fn #symbol(#(#params),*) #ret {
            unsafe { #body }
        }
    })
}

/// Rust half of a special member function of the C++ class for `path`.
pub(super) fn expand_special_thunk(
    cx: &Context,
    symbol: &Symbol,
    path: &TokenStream,
    member: SpecialThunk,
) -> TokenStream {
    let runtime = &cx.runtime;
    let (params, helper): (TokenStream, Ident) = match member {
        SpecialThunk::Default => (quote!(__this: *mut #path), format_ident!("default_construct")),
        SpecialThunk::Clone => (
            quote!(__this: *mut #path, other: *const #path),
            format_ident!("clone_construct"),
        ),
        SpecialThunk::CloneFrom => (
            quote!(__this: *mut #path, other: *const #path),
            format_ident!("clone_assign"),
        ),
        SpecialThunk::Move => (
            quote!(__this: *mut #path, other: *mut #path),
            format_ident!("move_construct"),
        ),
        SpecialThunk::MoveAssign => (
            quote!(__this: *mut #path, other: *mut #path),
            format_ident!("move_assign"),
        ),
        // Rust values are never deleted from C++; both end in `drop`.
        SpecialThunk::Drop | SpecialThunk::Delete => {
            (quote!(__this: *mut #path), format_ident!("drop_in_place"))
        }
    };
    let args = match member {
        SpecialThunk::Default | SpecialThunk::Drop | SpecialThunk::Delete => quote!(__this),
        _ => quote!(__this, other),
    };
    quote! {
        #[no_mangle]
        unsafe extern "C" fn #symbol(#params) {
            unsafe { #runtime::private::#helper(#args) }
        }
    }
}

/// Compile-time checks that the Rust type still has the layout the header
/// was generated for.
pub(super) fn expand_layout_assertions(
    path: &TokenStream,
    size: u64,
    align: u64,
    offsets: &[(TokenStream, u64)],
) -> TokenStream {
    let size = Literal::u64_unsuffixed(size);
    let align = Literal::u64_unsuffixed(align);
    let offsets = offsets.iter().map(|(field, offset)| {
        let offset = Literal::u64_unsuffixed(*offset);
        quote!(const _: () = assert!(::core::mem::offset_of!(#path, #field) == #offset);)
    });
    quote! {
        const _: () = assert!(::core::mem::size_of::<#path>() == #size);
        const _: () = assert!(::core::mem::align_of::<#path>() == #align);
        #(#offsets)*
    }
}

#[cfg(test)]
mod tests {
    use super::{expand_fn_thunk, expand_special_thunk};
    use crate::gen::{names, Context, Opt};
    use crate::syntax::mangle::{self, SpecialThunk};
    use crate::syntax::thunk::plan;
    use crate::syntax::{Ir, Item, ItemId, Types};
    use serde_json::json;

    #[test]
    fn test_method_thunk() {
        let ir: Ir = serde_json::from_value(json!({"lang": "rust", "target": "shapes", "items": [
            {"kind": "record", "id": 1, "name": "Circle", "size": 8, "align": 8,
             "rust_traits": {"clone": true, "default": true, "drop": true}},
            {"kind": "func", "id": 2, "name": "scaled", "fn_kind": "method", "record": 1,
             "receiver": {"is_const": true},
             "params": [{"name": "by", "type": {"kind": "primitive", "name": "f64"}}],
             "ret": {"kind": "named", "id": 1}},
        ]}))
        .unwrap();
        let types = Types::collect(&ir).unwrap();
        let opt = Opt::default();
        let cx = Context::new(&types, &opt).unwrap();
        let Item::Func(func) = &ir.items[1] else {
            unreachable!();
        };
        let thunk = plan(&types, func).unwrap();
        let tokens = expand_fn_thunk(&cx, func, &thunk).unwrap().to_string();
        assert!(tokens.contains("(__this : * const :: shapes :: Circle , __param_0 : f64 , __return : * mut :: shapes :: Circle)"));
        assert!(tokens.contains("__return . write (< :: shapes :: Circle > :: scaled (& * __this , __param_0)) ;"));

        let path = names::rust_path(&cx, ItemId(1)).unwrap();
        let Item::Record(record) = &ir.items[0] else {
            unreachable!();
        };
        let symbol = mangle::special(&record.decl, SpecialThunk::CloneFrom);
        let tokens = expand_special_thunk(&cx, &symbol, &path, SpecialThunk::CloneFrom).to_string();
        assert!(tokens.contains(":: crubit :: private :: clone_assign (__this , other)"));
    }
}
