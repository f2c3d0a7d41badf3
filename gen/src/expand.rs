//! Bindings for C++ declarations: the Rust module `rs_api` and the C++
//! thunks behind it, `rs_api_impl`.

use crate::gen::expand_fn::{self, Overloads};
use crate::gen::expand_type::expand_desc;
use crate::gen::namespace_organizer::ModuleTree;
use crate::gen::out::{Content, OutFile};
use crate::gen::write_thunk;
use crate::gen::{deprecated_attr, doc_attrs, names, skip, Context};
use crate::syntax::attrs::{self, EnumKind};
use crate::syntax::classify::{FieldDescriptor, TypeDescriptor, TypeKind};
use crate::syntax::error;
use crate::syntax::mangle::{self, SpecialThunk};
use crate::syntax::report::Errors;
use crate::syntax::special::{self, SpecialMemberPlan, SpecialState};
use crate::syntax::{Access, Enum, Item, Lang, Record, Type, TypeAlias};
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote, ToTokens};

/// Everything generated for one C++ declaration.
#[derive(Default)]
pub(super) struct Bindings {
    /// Public API, placed in the module of the declaration's namespace.
    pub api: TokenStream,
    /// Declarations for `mod detail`.
    pub detail: TokenStream,
    /// C++ definitions of the thunks `detail` declares, and layout checks.
    pub thunks: Content,
}

pub(super) type BindingsResult = Result<Option<Bindings>, Vec<String>>;

pub(super) fn gen(cx: &Context, errors: &mut Errors) -> (String, String) {
    let overloads = Overloads::new(cx);
    let owned = expand_fn::unique_ptr_pointees(cx);

    let mut tree = ModuleTree::new();
    let mut detail = TokenStream::new();
    let mut out = OutFile::new();

    for item in cx.types.items {
        let decl = item.decl();
        log::debug!("importing {:?} '{}'", decl.id, decl.qualified_name());
        let result = match item {
            Item::Record(record) => expand_record(cx, record, owned.contains(&decl.id)),
            Item::Enum(enm) => expand_enum(cx, enm),
            Item::Func(func) => expand_fn::expand_fn(cx, func, &overloads),
            Item::TypeAlias(alias) => expand_alias(cx, alias),
            Item::Unsupported(unsupported) => Err(vec![unsupported.message.clone()]),
        };
        let module = module_of(item);
        match result {
            Ok(Some(bindings)) => {
                if !bindings.api.is_empty() {
                    tree.push(&module, bindings.api.to_string());
                }
                detail.extend(bindings.detail);
                out.write_content(bindings.thunks);
            }
            Ok(None) => {}
            Err(messages) => tree.push(&module, skip(errors, decl, messages)),
        }
    }

    (rs_api(cx, &tree, detail), rs_api_impl(cx, out))
}

fn rs_api(cx: &Context, tree: &ModuleTree, detail: TokenStream) -> String {
    let mut api = String::new();
    api.push_str("// Automatically @generated Rust bindings for the following C++ target:\n");
    api.push_str("// ");
    api.push_str(cx.types.target);
    api.push_str("\n\n");
    api.push_str("#![allow(dead_code, non_camel_case_types, non_snake_case, non_upper_case_globals)]\n");
    api.push_str("#![allow(clippy::all)]\n\n");
    tree.render(&mut api);
    if !detail.is_empty() {
        let detail = quote! {
            mod detail {
                #detail
            }
        };
        api.push_str(&detail.to_string());
        api.push('\n');
    }
    api
}

fn rs_api_impl(cx: &Context, mut out: OutFile) -> String {
    out.preamble = format!(
        "// Automatically @generated C++ thunks for the following C++ target:\n// {}\n",
        cx.types.target,
    );
    out.include.cstddef = true;
    out.include.memory = true;
    out.include.type_traits = true;
    out.include.utility = true;
    out.include.insert(cx.support_header());
    out.include.extend(cx.types.public_headers.iter().cloned());
    out.include.extend(cx.opt.include.iter().cloned());
    out.content()
}

/// Rust module a declaration's bindings are placed in. Class template
/// specializations go to the top, since they may be named from anywhere.
fn module_of(item: &Item) -> Vec<String> {
    let decl = item.decl();
    if matches!(item, Item::Record(_)) && names::is_instantiation(decl) {
        return Vec::new();
    }
    let attrs = attrs::parse(decl).unwrap_or_default();
    names::namespace(decl, &attrs).iter().cloned().collect()
}

fn expand_record(cx: &Context, record: &Record, owned_by_unique_ptr: bool) -> BindingsResult {
    let decl = &record.decl;
    let attrs = attrs::parse(decl)?;
    if attrs.bridge.is_some() {
        // Crosses by value through its codec, never by layout.
        return Ok(None);
    }
    let desc = cx.types.record(decl.id)?;
    let plan = special::plan(Lang::Cxx, record);
    let one = |message: String| vec![message];

    let name = if names::is_instantiation(decl) {
        names::instantiation_ident(decl).to_token_stream()
    } else {
        names::rust_ident(names::target_name(Lang::Cxx, decl, &attrs))
            .map_err(one)?
            .to_token_stream()
    };
    let path = names::rust_path(cx, decl.id).map_err(one)?;
    let cxx_path = names::cxx_path(cx, decl.id).map_err(one)?;

    let layout = expand_layout(cx, record, &desc).map_err(one)?;
    let fields = &layout.fields;

    let doc = doc_attrs(cx, decl);
    let deprecated = deprecated_attr(attrs.deprecated.as_ref());
    let derive = if plan.derive_copy {
        Some(quote!(#[derive(Clone, Copy)]))
    } else {
        None
    };
    let repr_align = desc.repr.align.map(|align| {
        let align = Literal::u64_unsuffixed(align);
        quote!(, align(#align))
    });
    let repr_packed = desc.repr.packed.map(|packed| {
        let packed = Literal::u64_unsuffixed(packed);
        quote!(, packed(#packed))
    });
    let keyword = if record.is_union {
        quote!(union)
    } else {
        quote!(struct)
    };

    let mut bindings = Bindings::default();
    bindings.api.extend(quote! {
        #doc
        #derive
        #[repr(C #repr_align #repr_packed)]
        #deprecated
        pub #keyword #name {
            #(#fields,)*
        }
    });

    expand_special_members(cx, record, &desc, &plan, &path, &cxx_path, &mut bindings);

    if owned_by_unique_ptr && plan.drop.is_available() {
        let runtime = &cx.runtime;
        let symbol = mangle::special(decl, SpecialThunk::Delete);
        let typename = decl.qualified_name();
        bindings.api.extend(quote! {
            unsafe impl #runtime::CppDelete for #path {
                const TYPENAME: &'static str = #typename;
                #[inline(always)]
                unsafe fn delete(ptr: *mut Self) {
                    unsafe { crate::detail::#symbol(ptr) }
                }
            }
        });
        bindings.detail.extend(quote! {
            extern "C" {
                pub(crate) fn #symbol(ptr: *mut #path);
            }
        });
        write_thunk::write_delete(&mut bindings.thunks, &symbol, &cxx_path);
    }

    if cx.opt.emit_layout_assertions {
        let size = Literal::u64_unsuffixed(record.size);
        let align = Literal::u64_unsuffixed(record.align);
        let offsets = layout.offsets.iter().map(|(field, offset)| {
            let offset = Literal::u64_unsuffixed(*offset);
            quote!(const _: () = assert!(::core::mem::offset_of!(#path, #field) == #offset);)
        });
        bindings.api.extend(quote! {
            const _: () = assert!(::core::mem::size_of::<#path>() == #size);
            const _: () = assert!(::core::mem::align_of::<#path>() == #align);
            #(#offsets)*
        });
        write_thunk::write_record_assertions(
            &mut bindings.thunks,
            record,
            &cxx_path,
            &layout.public_offsets,
            plan.derive_copy,
        );
    }

    Ok(Some(bindings))
}

struct Layout {
    fields: Vec<TokenStream>,
    /// Rust field name and offset of every typed field of a struct.
    offsets: Vec<(TokenStream, u64)>,
    /// C++ name and offset of every public typed field of a struct.
    public_offsets: Vec<(String, u64)>,
}

/// Fields of the Rust struct: typed fields where the type maps, byte blobs
/// where it doesn't, and explicit padding reproducing every C++ offset.
fn expand_layout(cx: &Context, record: &Record, desc: &TypeDescriptor) -> Result<Layout, String> {
    let mut layout = Layout {
        fields: Vec::new(),
        offsets: Vec::new(),
        public_offsets: Vec::new(),
    };
    let mut end = 0;
    let mut padding = 0usize;

    for field in &desc.fields {
        let source = &record.fields[field.index];
        if !record.is_union {
            if field.offset < end {
                // Overlaps the previous field, e.g. `[[no_unique_address]]`.
                continue;
            }
            if field.offset > end {
                layout.fields.push(blob(format_ident!("__padding{}", padding), field.offset - end));
                padding += 1;
            }
        }

        match &field.ty {
            Ok(ty) => {
                let name = field_ident(field)?;
                let mut rust_type = expand_desc(cx, ty)?;
                if record.is_union && !ty.triviality.copyable {
                    rust_type = quote!(::core::mem::ManuallyDrop<#rust_type>);
                }
                let vis = if source.access == Access::Public {
                    Some(quote!(pub))
                } else {
                    None
                };
                let doc = source.doc.iter().flat_map(|doc| doc.lines()).map(|line| format!(" {}", line));
                layout.fields.push(quote!(#(#[doc = #doc])* #vis #name: #rust_type));
                if !record.is_union {
                    layout.offsets.push((name.clone(), field.offset));
                    if let (Access::Public, Some(cxx_name)) = (source.access, &field.name) {
                        layout.public_offsets.push((cxx_name.clone(), field.offset));
                    }
                }
            }
            Err(reason) => {
                let reason = format!(" Reason for representing this field as a blob of bytes:\n {}", reason);
                let blob = blob(format_ident!("__blob{}", field.index), field.size);
                layout.fields.push(quote!(#[doc = #reason] #blob));
            }
        }

        end = if record.is_union {
            end.max(field.size)
        } else {
            field.offset + field.size
        };
    }

    let align = record.align.max(1);
    if record.is_union {
        if end < record.size {
            layout.fields.push(blob(format_ident!("__padding"), record.size));
        }
    } else if (end + align - 1) / align * align != record.size {
        layout.fields.push(blob(format_ident!("__tail_padding"), record.size - end));
    }

    if !desc.triviality.movable {
        layout.fields.push(quote!(__marker: ::core::marker::PhantomPinned));
    }
    Ok(layout)
}

fn blob(name: proc_macro2::Ident, len: u64) -> TokenStream {
    let len = Literal::u64_unsuffixed(len);
    quote!(#name: [::core::mem::MaybeUninit<u8>; #len])
}

fn field_ident(field: &FieldDescriptor) -> Result<TokenStream, String> {
    match &field.name {
        Some(name) => Ok(names::rust_ident(name)?.to_token_stream()),
        None => Ok(format_ident!("__unnamed_field{}", field.index).to_token_stream()),
    }
}

fn expand_special_members(
    cx: &Context,
    record: &Record,
    desc: &TypeDescriptor,
    plan: &SpecialMemberPlan,
    path: &TokenStream,
    cxx_path: &str,
    bindings: &mut Bindings,
) {
    let runtime = &cx.runtime;
    let decl = &record.decl;
    // Rust hands values around by memcpy, so only a movable record can be
    // produced by value from `default()` or `clone()`.
    let movable = desc.triviality.movable;

    if movable {
        match plan.default {
            SpecialState::Trivial => bindings.api.extend(quote! {
                impl Default for #path {
                    #[inline(always)]
                    fn default() -> Self {
                        unsafe { ::core::mem::zeroed() }
                    }
                }
            }),
            state if state.needs_thunk() => {
                let symbol = mangle::special(decl, SpecialThunk::Default);
                bindings.api.extend(quote! {
                    impl Default for #path {
                        #[inline(always)]
                        fn default() -> Self {
                            unsafe {
                                #runtime::ReturnValueSlot::call(|__this| crate::detail::#symbol(__this))
                            }
                        }
                    }
                });
                bindings.detail.extend(quote! {
                    extern "C" {
                        pub(crate) fn #symbol(__this: *mut #path);
                    }
                });
                write_thunk::write_default(&mut bindings.thunks, &symbol, cxx_path);
            }
            _ => {}
        }
    }

    if movable && !plan.derive_copy {
        let clone = match plan.clone {
            SpecialState::Trivial => Some(quote! {
                #[inline(always)]
                fn clone(&self) -> Self {
                    unsafe { ::core::ptr::read(self) }
                }
            }),
            state if state.needs_thunk() => {
                let symbol = mangle::special(decl, SpecialThunk::Clone);
                bindings.detail.extend(quote! {
                    extern "C" {
                        pub(crate) fn #symbol(__this: *mut #path, other: *const #path);
                    }
                });
                write_thunk::write_clone(&mut bindings.thunks, &symbol, cxx_path);
                Some(quote! {
                    #[inline(always)]
                    fn clone(&self) -> Self {
                        unsafe {
                            #runtime::ReturnValueSlot::call(|__this| crate::detail::#symbol(__this, self))
                        }
                    }
                })
            }
            _ => None,
        };
        let clone_from = match plan.clone_from {
            SpecialState::Trivial => Some(quote! {
                #[inline(always)]
                fn clone_from(&mut self, source: &Self) {
                    unsafe { ::core::ptr::copy_nonoverlapping(source, self, 1) }
                }
            }),
            state if state.needs_thunk() => {
                let symbol = mangle::special(decl, SpecialThunk::CloneFrom);
                bindings.detail.extend(quote! {
                    extern "C" {
                        pub(crate) fn #symbol(__this: *mut #path, other: *const #path);
                    }
                });
                write_thunk::write_clone_from(&mut bindings.thunks, &symbol, cxx_path);
                Some(quote! {
                    #[inline(always)]
                    fn clone_from(&mut self, source: &Self) {
                        unsafe { crate::detail::#symbol(self, source) }
                    }
                })
            }
            _ => None,
        };
        if let Some(clone) = clone {
            bindings.api.extend(quote! {
                impl Clone for #path {
                    #clone
                    #clone_from
                }
            });
        }
    }

    if plan.drop.needs_thunk() {
        let symbol = mangle::special(decl, SpecialThunk::Drop);
        bindings.api.extend(quote! {
            impl Drop for #path {
                #[inline(always)]
                fn drop(&mut self) {
                    unsafe { crate::detail::#symbol(self) }
                }
            }
        });
        bindings.detail.extend(quote! {
            extern "C" {
                pub(crate) fn #symbol(__this: *mut #path);
            }
        });
        write_thunk::write_drop(&mut bindings.thunks, &symbol, cxx_path);
    }
}

fn expand_enum(cx: &Context, enm: &Enum) -> BindingsResult {
    let decl = &enm.decl;
    let attrs = attrs::parse(decl)?;
    let atom = cx.types.import_enum(enm)?;
    let one = |message: String| vec![message];

    let name = names::rust_ident(names::target_name(Lang::Cxx, decl, &attrs)).map_err(one)?;
    let path = names::rust_path(cx, decl.id).map_err(one)?;
    let repr = atom.to_token_stream();

    let mut consts = Vec::new();
    let mut idents = Vec::new();
    for enumerator in &enm.enumerators {
        let ident = names::rust_ident(&enumerator.name).map_err(one)?;
        let value = enumerator.value;
        let doc = enumerator
            .doc
            .iter()
            .flat_map(|doc| doc.lines())
            .map(|line| format!(" {}", line));
        consts.push(quote! {
            #(#[doc = #doc])*
            pub const #ident: #name = #name(#value);
        });
        idents.push(ident);
    }

    let doc = doc_attrs(cx, decl);
    let deprecated = deprecated_attr(attrs.deprecated.as_ref());
    let mut bindings = Bindings::default();
    bindings.api.extend(quote! {
        #doc
        #[repr(transparent)]
        #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
        #deprecated
        pub struct #name(#repr);

        impl #name {
            #(#consts)*
        }

        impl From<#repr> for #name {
            #[inline(always)]
            fn from(value: #repr) -> #name {
                #name(value)
            }
        }

        impl From<#name> for #repr {
            #[inline(always)]
            fn from(value: #name) -> #repr {
                value.0
            }
        }
    });

    let unscoped = match attrs.enum_kind {
        Some(EnumKind::C) => true,
        Some(EnumKind::Cpp) => false,
        None => !enm.is_scoped,
    };
    if unscoped {
        bindings.api.extend(quote! {
            #(pub const #idents: #name = #name::#idents;)*
        });
    }

    if cx.opt.emit_layout_assertions {
        let size = Literal::u64_unsuffixed(atom.size());
        let align = Literal::u64_unsuffixed(atom.align());
        bindings.api.extend(quote! {
            const _: () = assert!(::core::mem::size_of::<#path>() == #size);
            const _: () = assert!(::core::mem::align_of::<#path>() == #align);
        });
        let cxx_path = names::cxx_path(cx, decl.id).map_err(one)?;
        write_thunk::write_size_assertions(&mut bindings.thunks, &cxx_path, atom.size(), atom.align());
    }
    Ok(Some(bindings))
}

fn expand_alias(cx: &Context, alias: &TypeAlias) -> BindingsResult {
    let decl = &alias.decl;
    let attrs = attrs::parse(decl)?;
    if let Some(attr) = &decl.unknown_attr {
        return Err(vec![error::UNKNOWN_ATTRIBUTE.with(attr)]);
    }
    let one = |message: String| vec![message];
    let desc = cx.types.classify(&alias.underlying).map_err(one)?;
    let name = names::target_name(Lang::Cxx, decl, &attrs);

    // `typedef struct S S;` names the record itself.
    if let Type::Named(named) = &alias.underlying {
        if let Some(target) = cx.types.get(named.id) {
            let target_decl = target.decl();
            let target_attrs = attrs::parse(target_decl).unwrap_or_default();
            if names::target_name(Lang::Cxx, target_decl, &target_attrs) == name
                && names::namespace(target_decl, &target_attrs) == names::namespace(decl, &attrs)
            {
                return Ok(None);
            }
        }
    }

    let ident = names::rust_ident(name).map_err(one)?;
    let ty = expand_desc(cx, &desc).map_err(one)?;
    let doc = doc_attrs(cx, decl);
    let deprecated = deprecated_attr(attrs.deprecated.as_ref());
    let mut bindings = Bindings::default();
    bindings.api.extend(quote! {
        #doc
        #deprecated
        pub type #ident = #ty;
    });

    if let (Some(EnumKind::C), TypeKind::Enum(id)) = (attrs.enum_kind, &desc.kind) {
        if let Some(Item::Enum(enm)) = cx.types.get(*id) {
            let idents = enm
                .enumerators
                .iter()
                .map(|enumerator| names::rust_ident(&enumerator.name))
                .collect::<Result<Vec<_>, _>>()
                .map_err(one)?;
            bindings.api.extend(quote! {
                #(pub const #idents: #ident = #ident::#idents;)*
            });
        }
    }
    Ok(Some(bindings))
}

#[cfg(test)]
mod tests {
    use super::gen;
    use crate::gen::{Context, Opt};
    use crate::syntax::report::Errors;
    use crate::syntax::{Ir, Types};
    use serde_json::{json, Value};

    fn run(items: Value) -> (String, String, Errors) {
        let ir: Ir = serde_json::from_value(json!({"lang": "cxx", "target": "//lib", "items": items})).unwrap();
        let types = Types::collect(&ir).unwrap();
        let opt = Opt::default();
        let cx = Context::new(&types, &opt).unwrap();
        let mut errors = Errors::new();
        let (api, implementation) = gen(&cx, &mut errors);
        (api, implementation, errors)
    }

    fn int() -> Value {
        json!({"kind": "primitive", "name": "int"})
    }

    #[test]
    fn test_padding_and_blobs() {
        let (api, implementation, errors) = run(json!([
            {"kind": "record", "id": 1, "name": "S", "size": 16, "align": 8, "fields": [
                {"name": "a", "type": {"kind": "primitive", "name": "char"}, "offset": 0},
                {"name": "b", "type": {"kind": "primitive", "name": "long"}, "offset": 8, "access": "private"},
            ]},
            {"kind": "record", "id": 2, "name": "Bits", "size": 4, "align": 4, "fields": [
                {"name": "x", "type": int(), "offset": 0, "is_bitfield": true},
                {"name": "y", "type": int(), "offset": 0, "is_bitfield": true},
            ]},
        ]));
        assert!(errors.is_empty());
        assert!(api.contains(
            "pub struct S { pub a : :: core :: ffi :: c_char , __padding0 : [:: core :: mem :: MaybeUninit < u8 > ; 7] , b : :: core :: ffi :: c_long , }",
        ));
        assert!(api.contains("# [derive (Clone , Copy)] # [repr (C)] pub struct S"));
        assert!(api.contains("__blob0 : [:: core :: mem :: MaybeUninit < u8 > ; 4]"));
        assert!(api.contains("bitfields are not supported"));
        assert!(api.contains("const _ : () = assert ! (:: core :: mem :: offset_of ! (crate :: S , b) == 8) ;"));
        assert!(implementation.contains("static_assert(sizeof(::S) == 16);\n"));
        assert!(implementation.contains("static_assert(offsetof(::S, a) == 0);\n"));
        assert!(!implementation.contains("offsetof(::S, b)"));
    }

    #[test]
    fn test_enum_is_open_newtype() {
        let (api, _, errors) = run(json!([
            {"kind": "enum", "id": 1, "name": "Color", "namespace": ["gfx"], "underlying": int(),
             "enumerators": [{"name": "kRed", "value": 0}, {"name": "kGreen", "value": -1}]},
        ]));
        assert!(errors.is_empty());
        assert!(api.contains("pub mod gfx {\n"));
        assert!(api.contains("# [repr (transparent)]"));
        assert!(api.contains("pub struct Color (:: core :: ffi :: c_int) ;"));
        assert!(api.contains("pub const kGreen : Color = Color (- 1) ;"));
        // Unscoped enumerators are also visible in the enclosing namespace.
        assert!(api.contains("pub const kRed : Color = Color :: kRed ;"));
    }

    #[test]
    fn test_special_members() {
        let (api, implementation, errors) = run(json!([
            {"kind": "record", "id": 1, "name": "Handle", "size": 8, "align": 8, "is_trivial_abi": true,
             "special_members": {
                "default_ctor": "nontrivial_user_defined",
                "copy_ctor": "nontrivial_user_defined",
                "copy_assign": "nontrivial_user_defined",
                "move_ctor": "nontrivial_user_defined",
                "destructor": "nontrivial_user_defined",
             }},
        ]));
        assert!(errors.is_empty());
        assert!(api.contains("impl Default for crate :: Handle"));
        assert!(api.contains("impl Clone for crate :: Handle"));
        assert!(api.contains("fn clone_from (& mut self , source : & Self)"));
        assert!(api.contains("impl Drop for crate :: Handle"));
        assert!(api.contains("pub (crate) fn __crubit_thunk_Handle___7bhdrop_7dh (__this : * mut crate :: Handle) ;"));
        assert!(implementation.contains("  if (__this != other) {\n    *__this = *other;\n  }\n"));
        assert!(implementation.contains("  std::destroy_at(__this);\n"));
    }

    #[test]
    fn test_unsupported_item_leaves_comment() {
        let (api, _, errors) = run(json!([
            {"kind": "unsupported", "id": 1, "name": "Weird", "namespace": ["ns"],
             "message": "variadic templates are not supported"},
            {"kind": "record", "id": 2, "name": "Fine", "namespace": ["ns"], "size": 1, "align": 1},
        ]));
        assert_eq!(1, errors.iter().count());
        assert!(api.contains(
            "// Error while generating bindings for item 'ns::Weird':\n// variadic templates are not supported\n",
        ));
        assert!(api.contains("pub struct Fine"));
    }
}
