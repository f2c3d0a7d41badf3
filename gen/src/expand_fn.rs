use crate::gen::expand::{Bindings, BindingsResult};
use crate::gen::expand_type::{expand_desc, expand_schema, is_pinned, ApiTypes};
use crate::gen::write_thunk;
use crate::gen::{deprecated_attr, doc_attrs, names, Context};
use crate::syntax::attrs;
use crate::syntax::bridge::Bridge;
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::elision::{self, FunctionLifetimes, LifetimeErrorKind};
use crate::syntax::error;
use crate::syntax::lifetime::{Lifetime, LifetimeSymbolTable};
use crate::syntax::map::UnorderedMap;
use crate::syntax::set::UnorderedSet;
use crate::syntax::special::{self, SpecialState};
use crate::syntax::thunk::{self, Passing, Strategy, ThunkDescriptor, ThunkValue};
use crate::syntax::{FnKind, Func, Item, ItemId, Lang, Type};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use std::iter;
use std::slice;

type OverloadKey = (Option<ItemId>, Vec<String>, String);

/// How many functions share each Rust name. Rust has no overloading, so a
/// name claimed by more than one function binds none of them.
pub(super) struct Overloads {
    counts: UnorderedMap<OverloadKey, usize>,
}

impl Overloads {
    pub fn new(cx: &Context) -> Self {
        let mut counts = UnorderedMap::new();
        for item in cx.types.items {
            if let Item::Func(func) = item {
                if let Some(key) = overload_key(func) {
                    let count = counts.get(&key).copied().unwrap_or(0);
                    counts.insert(key, count + 1);
                }
            }
        }
        Overloads { counts }
    }

    fn is_overloaded(&self, func: &Func) -> bool {
        overload_key(func).is_some_and(|key| self.counts.get(&key).is_some_and(|&count| count > 1))
    }
}

fn overload_key(func: &Func) -> Option<OverloadKey> {
    if !matches!(func.kind, FnKind::Free | FnKind::Method) {
        return None;
    }
    let attrs = attrs::parse(&func.decl).ok()?;
    let namespace = names::namespace(&func.decl, &attrs).iter().cloned().collect();
    let name = names::target_name(Lang::Cxx, &func.decl, &attrs).to_owned();
    Some((func.record, namespace, name))
}

/// Records handed across as `std::unique_ptr`, which need a `CppDelete`
/// impl so that Rust can destroy them.
pub(super) fn unique_ptr_pointees(cx: &Context) -> UnorderedSet<ItemId> {
    let mut pointees = UnorderedSet::new();
    for item in cx.types.items {
        let Item::Func(func) = item else {
            continue;
        };
        let types = func.params.iter().map(|param| &param.ty).chain(iter::once(&func.ret));
        for ty in types {
            if let Ok(desc) = cx.types.classify(ty) {
                collect_pointees(&desc, &mut pointees);
            }
        }
    }
    pointees
}

fn collect_pointees(desc: &TypeDescriptor, pointees: &mut UnorderedSet<ItemId>) {
    match &desc.kind {
        TypeKind::Bridged(Bridge::UniquePtr(pointee)) => {
            if let Some(id) = pointee.record_id() {
                pointees.insert(id);
            }
        }
        TypeKind::Bridged(Bridge::Optional(inner)) => collect_pointees(inner, pointees),
        TypeKind::Bridged(Bridge::Tuple { elements, .. }) | TypeKind::Tuple(elements) => {
            for element in elements {
                collect_pointees(element, pointees);
            }
        }
        _ => {}
    }
}

pub(super) fn expand_fn(cx: &Context, func: &Func, overloads: &Overloads) -> BindingsResult {
    let decl = &func.decl;
    if let Some(attr) = &decl.unknown_attr {
        return Err(vec![error::UNKNOWN_ATTRIBUTE.with(attr)]);
    }
    let attrs = attrs::parse(decl)?;
    match func.kind {
        // Bound as `Drop`, `Default` and `Clone` of the record.
        FnKind::Destructor => return Ok(None),
        FnKind::Constructor if func.params.is_empty() || is_copy_or_move(func) => return Ok(None),
        FnKind::Free | FnKind::Method if overloads.is_overloaded(func) => {
            return Err(vec![error::OVERLOADED.with(format_args!("'{}'", decl.qualified_name()))]);
        }
        _ => {}
    }
    let one = |message: String| vec![message];

    if let Some(record) = func.record {
        check_record(cx, record).map_err(one)?;
    }
    let thunk = thunk::plan(cx.types, func)?;
    let lifetimes = Lifetimes::resolve(cx, func)?;

    let mut wrapper = Wrapper::new(cx);
    wrapper.expand(func, &thunk, &lifetimes).map_err(one)?;
    let symbol = &thunk.symbol;
    let runtime = &cx.runtime;

    let mut bindings = Bindings::default();
    let generics = if lifetimes.generics.is_empty() {
        None
    } else {
        let generics = &lifetimes.generics;
        Some(quote!(<#(#generics),*>))
    };
    let decl_params = &wrapper.decl_params;
    let decl_ret = wrapper.decl_ret.as_ref().map(|ret| quote!(-> #ret));
    let (abi, link_name) = match &thunk.strategy {
        Strategy::Direct { link_name } => (
            func.cc.rust_abi().unwrap_or("C"),
            Some(quote!(#[link_name = #link_name])),
        ),
        Strategy::Thunk => ("C", None),
    };
    bindings.detail.extend(quote! {
        extern #abi {
            #link_name
            pub(crate) fn #symbol #generics(#(#decl_params),*) #decl_ret;
        }
    });
    if let Strategy::Thunk = thunk.strategy {
        write_thunk::write_fn_thunk(&mut bindings.thunks, cx, func, &thunk).map_err(one)?;
    }

    let args = &wrapper.args;
    let prelude = &wrapper.prelude;
    let call = quote!(crate::detail::#symbol(#(#args),*));
    let body = match (&thunk.ret, &wrapper.ret_schema) {
        (None, _) => quote!(#call;),
        (Some(ret), schema) => match (&ret.passing, schema) {
            (Passing::Indirect, _) => {
                let args = args.iter().cloned().chain(iter::once(quote!(__return)));
                quote!(#runtime::ReturnValueSlot::call(|__return| crate::detail::#symbol(#(#args),*)))
            }
            (Passing::Bridged(_), Some((ty, schema))) => {
                let args = args
                    .iter()
                    .cloned()
                    .chain(iter::once(quote!(__return.as_mut_ptr() as *mut u8)));
                quote! {
                    let mut __return = #runtime::private::empty_buffer::<{ <#ty as #runtime::CrubitAbi<#schema>>::SIZE }>();
                    crate::detail::#symbol(#(#args),*);
                    #runtime::private::decode::<#ty, #schema>(__return.as_ptr() as *const u8)
                }
            }
            (Passing::Transfer, _) => quote!(#runtime::private::transfer_in(#call)),
            _ => call,
        },
    };

    let doc = doc_attrs(cx, decl);
    let deprecated = deprecated_attr(attrs.deprecated.as_ref());

    if func.kind == FnKind::Constructor {
        let Some(record) = func.record else {
            return Err(vec![format!("constructor '{}' has no record", decl.qualified_name())]);
        };
        if wrapper.api.raw_pointers {
            return Err(vec![
                "constructors taking raw pointers cannot implement `From`, which is safe to call"
                    .to_owned(),
            ]);
        }
        let path = names::rust_path(cx, record).map_err(one)?;
        let (patterns, types): (Vec<_>, Vec<_>) = wrapper.api_params.iter().cloned().unzip();
        let (arg_type, arg_pattern) = if let ([pattern], [ty]) = (patterns.as_slice(), types.as_slice()) {
            (ty.clone(), pattern.clone())
        } else {
            (quote!((#(#types,)*)), quote!((#(#patterns,)*)))
        };
        bindings.api.extend(quote! {
            #doc
            #deprecated
            impl #generics From<#arg_type> for #path {
                #[inline(always)]
                fn from(args: #arg_type) -> Self {
                    let #arg_pattern = args;
                    unsafe {
                        #(#prelude)*
                        #body
                    }
                }
            }
        });
        return Ok(Some(bindings));
    }

    let name = names::rust_ident(names::target_name(Lang::Cxx, decl, &attrs)).map_err(one)?;
    let receiver = &wrapper.receiver;
    let params = wrapper
        .api_params
        .iter()
        .map(|(pattern, ty)| quote!(#pattern: #ty));
    let ret = wrapper.api_ret.as_ref().map(|ret| quote!(-> #ret));
    let unsafety = if wrapper.api.raw_pointers {
        Some(quote!(unsafe))
    } else {
        None
    };
    let function = quote! {
        #doc
        #deprecated
        #[inline(always)]
        pub #unsafety fn #name #generics(#receiver #(#params),*) #ret {
            unsafe {
                #(#prelude)*
                #body
            }
        }
    };

    match func.record {
        Some(record) => {
            let path = names::rust_path(cx, record).map_err(one)?;
            bindings.api.extend(quote! {
                impl #path {
                    #function
                }
            });
        }
        None => bindings.api.extend(function),
    }
    Ok(Some(bindings))
}

/// `S(const S&)` and `S(S&&)` are bound through `Clone` and moves.
fn is_copy_or_move(func: &Func) -> bool {
    match (func.record, func.params.as_slice()) {
        (Some(record), [param]) => match &param.ty {
            Type::Reference(reference) => {
                matches!(&reference.pointee, Type::Named(named) if named.id == record)
            }
            _ => false,
        },
        _ => false,
    }
}

/// Members of a record can only be bound if the record itself is.
fn check_record(cx: &Context, id: ItemId) -> Result<(), String> {
    let Some(Item::Record(record)) = cx.types.get(id) else {
        return Err(error::NOT_A_TYPE.with(id.0));
    };
    let attrs = attrs::parse(&record.decl)
        .map_err(|_| error::DEPENDS_ON_UNSUPPORTED.with(format_args!("'{}'", record.decl.qualified_name())))?;
    if attrs.bridge.is_some() {
        return Err(error::DEPENDS_ON_UNSUPPORTED.with(format_args!(
            "'{}' (bridged types have no members in Rust)",
            record.decl.qualified_name(),
        )));
    }
    Ok(())
}

fn has_reference(ty: &Type) -> bool {
    match ty {
        Type::Reference(_) => true,
        Type::Pointer(ptr) => has_reference(&ptr.pointee),
        Type::Tuple(tuple) => tuple.elements.iter().any(has_reference),
        Type::Instantiation(inst) => inst.args.iter().any(has_reference),
        Type::FunctionPointer(sig) => sig.params.iter().any(has_reference) || has_reference(&sig.ret),
        Type::Primitive(_) | Type::Named(_) => false,
    }
}

/// Rust lifetimes of one function's signature, named `'a`, `'b`, ... unless
/// annotations named them.
struct Lifetimes {
    /// `None` when elision is not enabled and nothing was annotated: pointers
    /// are then left raw and references elided.
    resolved: Option<Resolved>,
    generics: Vec<syn::Lifetime>,
}

struct Resolved {
    this: Option<syn::Lifetime>,
    params: Vec<Vec<syn::Lifetime>>,
    ret: Vec<syn::Lifetime>,
}

impl Lifetimes {
    fn resolve(cx: &Context, func: &Func) -> Result<Self, Vec<String>> {
        let mut table = LifetimeSymbolTable::new(&cx.types.lifetimes);
        let lifetimes = match elision::resolve(func, cx.types.elision_enabled(func), &mut table) {
            Ok(lifetimes) => lifetimes,
            // Only a returned reference needs a lifetime from elision.
            // Parameter references keep Rust's own elided lifetimes.
            Err(err) if err.kind == LifetimeErrorKind::ElisionNotEnabled => {
                if has_reference(&func.ret) {
                    return Err(vec![err.message]);
                }
                return Ok(Lifetimes {
                    resolved: None,
                    generics: Vec::new(),
                });
            }
            Err(err) => return Err(vec![err.message]),
        };
        Self::name(func, &lifetimes, &mut table).map_err(|message| vec![message])
    }

    fn name(
        func: &Func,
        lifetimes: &FunctionLifetimes,
        table: &mut LifetimeSymbolTable,
    ) -> Result<Self, String> {
        let mut to_syn = |lifetime: Lifetime| -> Result<syn::Lifetime, String> {
            let name = table.lookup_lifetime_and_maybe_declare(lifetime);
            syn::parse_str::<syn::Lifetime>(&format!("'{}", name))
                .map_err(|_| format!("lifetime '{}' is not a valid Rust lifetime name", name))
        };

        // A constructor's `this` is the value under construction, which
        // `From::from` returns by value.
        let this = match func.kind {
            FnKind::Constructor => None,
            _ => lifetimes.this,
        };
        let mut distinct: Vec<Lifetime> = Vec::new();
        let signature = this
            .iter()
            .chain(lifetimes.params.iter().flatten())
            .chain(&lifetimes.ret);
        for &lifetime in signature {
            if !lifetime.is_static() && !distinct.contains(&lifetime) {
                distinct.push(lifetime);
            }
        }

        let generics = distinct
            .into_iter()
            .map(&mut to_syn)
            .collect::<Result<Vec<_>, _>>()?;
        let resolved = Resolved {
            this: this.map(&mut to_syn).transpose()?,
            params: lifetimes
                .params
                .iter()
                .map(|param| {
                    param
                        .iter()
                        .copied()
                        .map(&mut to_syn)
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?,
            ret: lifetimes
                .ret
                .iter()
                .copied()
                .map(&mut to_syn)
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(Lifetimes {
            resolved: Some(resolved),
            generics,
        })
    }

    fn param(&self, index: usize) -> Option<slice::Iter<syn::Lifetime>> {
        let resolved = self.resolved.as_ref()?;
        resolved.params.get(index).map(|lifetimes| lifetimes.iter())
    }

    fn ret(&self) -> Option<slice::Iter<syn::Lifetime>> {
        self.resolved.as_ref().map(|resolved| resolved.ret.iter())
    }

    fn this(&self) -> Option<&syn::Lifetime> {
        self.resolved.as_ref()?.this.as_ref()
    }
}

/// The pieces of a safe wrapper and of the declaration it calls.
struct Wrapper<'c, 'a> {
    cx: &'c Context<'a>,
    api: ApiTypes<'c, 'a>,
    receiver: Option<TokenStream>,
    /// Pattern and type of each parameter of the wrapper.
    api_params: Vec<(TokenStream, TokenStream)>,
    api_ret: Option<TokenStream>,
    decl_params: Vec<TokenStream>,
    decl_ret: Option<TokenStream>,
    /// Statements run before the call, which encode bridged arguments.
    prelude: Vec<TokenStream>,
    args: Vec<TokenStream>,
    /// Rust type and schema of a bridged return value.
    ret_schema: Option<(TokenStream, TokenStream)>,
}

impl<'c, 'a> Wrapper<'c, 'a> {
    fn new(cx: &'c Context<'a>) -> Self {
        Wrapper {
            cx,
            api: ApiTypes::new(cx),
            receiver: None,
            api_params: Vec::new(),
            api_ret: None,
            decl_params: Vec::new(),
            decl_ret: None,
            prelude: Vec::new(),
            args: Vec::new(),
            ret_schema: None,
        }
    }

    fn expand(&mut self, func: &Func, thunk: &ThunkDescriptor, lifetimes: &Lifetimes) -> Result<(), String> {
        if let Some(this) = &thunk.this {
            self.expand_receiver(func, this, lifetimes.this())?;
        }
        for (index, (param, thunk_param)) in func.params.iter().zip(&thunk.params).enumerate() {
            let name = names::rust_ident(&names::param_name(index, &param.name))?;
            let value = &thunk_param.value;
            self.expand_param(index, name, &param.ty, value, lifetimes.param(index))?;
        }
        match (&thunk.ret, func.kind) {
            (Some(ret), FnKind::Constructor) => {
                let ty = expand_desc(self.cx, &ret.desc)?;
                self.decl_params.push(quote!(__return: *mut #ty));
            }
            (Some(ret), _) => self.expand_ret(&func.ret, ret, lifetimes.ret())?,
            (None, _) => {}
        }
        Ok(())
    }

    fn expand_receiver(
        &mut self,
        func: &Func,
        this: &TypeDescriptor,
        lifetime: Option<&syn::Lifetime>,
    ) -> Result<(), String> {
        let path = expand_desc(self.cx, this)?;
        let Some(receiver) = &func.receiver else {
            return Ok(());
        };
        if receiver.rvalue {
            // `std::move(*this).f()` leaves a moved-from object, which Rust
            // destroys when the wrapper returns.
            if !this.triviality.movable {
                return Err(error::NON_MOVABLE_BY_VALUE.with(&this.spelling));
            }
            self.receiver = Some(quote!(mut self,));
            self.decl_params.push(quote!(__this: *mut #path));
            self.args.push(quote!(&mut self));
        } else if receiver.is_const {
            self.receiver = Some(quote!(&#lifetime self,));
            self.decl_params.push(quote!(__this: &#lifetime #path));
            self.args.push(quote!(self));
        } else if is_pinned(this) {
            self.receiver = Some(quote!(self: ::core::pin::Pin<&#lifetime mut Self>,));
            self.decl_params.push(quote!(__this: ::core::pin::Pin<&#lifetime mut #path>));
            self.args.push(quote!(self));
        } else {
            self.receiver = Some(quote!(&#lifetime mut self,));
            self.decl_params.push(quote!(__this: &#lifetime mut #path));
            self.args.push(quote!(self));
        }
        Ok(())
    }

    fn expand_param(
        &mut self,
        index: usize,
        name: Ident,
        ty: &Type,
        value: &ThunkValue,
        mut lifetimes: Option<slice::Iter<syn::Lifetime>>,
    ) -> Result<(), String> {
        let runtime = &self.cx.runtime;
        let desc = &value.desc;
        match &value.passing {
            Passing::Direct => {
                let ty = self.api.render(ty, lifetimes.as_mut())?;
                self.api_params.push((quote!(#name), ty.clone()));
                self.decl_params.push(quote!(#name: #ty));
                self.args.push(quote!(#name));
            }
            Passing::Indirect => {
                let ty = expand_desc(self.cx, desc)?;
                self.api_params.push((quote!(mut #name), ty.clone()));
                self.decl_params.push(quote!(#name: *mut #ty));
                self.args.push(quote!(&mut #name));
            }
            Passing::Bridged(schema) => {
                let ty = self.api.render(ty, lifetimes.as_mut())?;
                let schema = expand_schema(self.cx, schema)?;
                let buffer = format_ident!("__param{}_buffer", index);
                self.prelude.push(quote! {
                    let mut #buffer = #runtime::private::empty_buffer::<{ <#ty as #runtime::CrubitAbi<#schema>>::SIZE }>();
                    #runtime::private::encode::<#ty, #schema>(#buffer.as_mut_ptr() as *mut u8, #name);
                });
                self.api_params.push((quote!(#name), ty));
                self.decl_params.push(quote!(#name: *const u8));
                self.args.push(quote!(#buffer.as_ptr() as *const u8));
            }
            Passing::Transfer => {
                let pointee = transferable(self.cx, desc)?;
                let ty = expand_desc(self.cx, desc)?;
                self.api_params.push((quote!(#name), ty));
                self.decl_params.push(quote!(#name: *mut #pointee));
                self.args.push(quote!(#runtime::private::transfer_out(#name)));
            }
        }
        Ok(())
    }

    fn expand_ret(
        &mut self,
        ty: &Type,
        ret: &ThunkValue,
        mut lifetimes: Option<slice::Iter<syn::Lifetime>>,
    ) -> Result<(), String> {
        let desc = &ret.desc;
        match &ret.passing {
            Passing::Direct => {
                let ty = self.api.render(ty, lifetimes.as_mut())?;
                self.api_ret = Some(ty.clone());
                self.decl_ret = Some(ty);
            }
            Passing::Indirect => {
                let ty = expand_desc(self.cx, desc)?;
                self.decl_params.push(quote!(__return: *mut #ty));
                self.api_ret = Some(ty);
            }
            Passing::Bridged(schema) => {
                let ty = self.api.render(ty, lifetimes.as_mut())?;
                let schema = expand_schema(self.cx, schema)?;
                self.decl_params.push(quote!(__return: *mut u8));
                self.ret_schema = Some((ty.clone(), schema));
                self.api_ret = Some(ty);
            }
            Passing::Transfer => {
                let pointee = transferable(self.cx, desc)?;
                self.decl_ret = Some(quote!(*mut #pointee));
                self.api_ret = Some(expand_desc(self.cx, desc)?);
            }
        }
        Ok(())
    }
}

/// Rust type of the pointee of a `std::unique_ptr`, which `UniquePtr` can
/// only own if C++ can delete it.
fn transferable(cx: &Context, desc: &TypeDescriptor) -> Result<TokenStream, String> {
    let TypeKind::Bridged(Bridge::UniquePtr(pointee)) = &desc.kind else {
        return Err(format!("{} cannot be transferred", desc.spelling));
    };
    if let Some(Item::Record(record)) = pointee.record_id().and_then(|id| cx.types.get(id)) {
        if special::plan(Lang::Cxx, record).drop == SpecialState::Deleted {
            return Err(format!(
                "{} cannot be owned from Rust because its destructor is not accessible",
                desc.spelling,
            ));
        }
    }
    expand_desc(cx, pointee)
}

#[cfg(test)]
mod tests {
    use crate::gen::expand::gen;
    use crate::gen::{Context, Opt};
    use crate::syntax::report::Errors;
    use crate::syntax::{Ir, Types};
    use serde_json::{json, Value};

    fn run(ir: Value) -> (String, String, Errors) {
        let ir: Ir = serde_json::from_value(ir).unwrap();
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
    fn test_direct_call_links_to_mangled_name() {
        let (api, implementation, errors) = run(json!({"lang": "cxx", "items": [
            {"kind": "func", "id": 1, "name": "add", "mangled_name": "_Z3addii", "ret": int(),
             "params": [{"name": "a", "type": int()}, {"name": "b", "type": int()}]},
        ]}));
        assert!(errors.is_empty());
        assert!(api.contains(
            "pub fn add (a : :: core :: ffi :: c_int , b : :: core :: ffi :: c_int) -> :: core :: ffi :: c_int",
        ));
        assert!(api.contains("# [link_name = \"_Z3addii\"]"));
        assert!(!implementation.contains("add("));
    }

    #[test]
    fn test_raw_pointer_makes_wrapper_unsafe() {
        let (api, implementation, errors) = run(json!({"lang": "cxx", "items": [
            {"kind": "func", "id": 1, "name": "take", "is_inline": true,
             "params": [{"name": "p", "type": {"kind": "pointer", "pointee": int()}}]},
        ]}));
        assert!(errors.is_empty());
        assert!(api.contains("pub unsafe fn take (p : * mut :: core :: ffi :: c_int)"));
        assert!(implementation.contains("::take(p);"));
    }

    #[test]
    fn test_elided_lifetimes() {
        let reference = json!({"kind": "reference", "pointee": int(), "is_const": true});
        let (api, _, errors) = run(json!({"lang": "cxx", "lifetime_elision_files": ["a.h"], "items": [
            {"kind": "func", "id": 1, "name": "get", "source_loc": {"file": "a.h", "line": 1},
             "mangled_name": "_Z3getRKi", "ret": reference, "params": [{"name": "x", "type": reference}]},
        ]}));
        assert!(errors.is_empty());
        assert!(api.contains(
            "pub fn get < 'a > (x : & 'a :: core :: ffi :: c_int) -> & 'a :: core :: ffi :: c_int",
        ));
    }

    #[test]
    fn test_reference_without_elision() {
        let reference = json!({"kind": "reference", "pointee": int(), "is_const": true});
        let (api, _, errors) = run(json!({"lang": "cxx", "items": [
            {"kind": "func", "id": 1, "name": "len", "mangled_name": "_Z3lenRKi", "ret": int(),
             "params": [{"name": "x", "type": reference}]},
            {"kind": "func", "id": 2, "name": "get", "mangled_name": "_Z3getv", "ret": reference},
        ]}));
        assert_eq!(1, errors.iter().count());
        assert!(api.contains(
            "pub fn len (x : & :: core :: ffi :: c_int) -> :: core :: ffi :: c_int",
        ));
        assert!(api.contains("// Error while generating bindings for item 'get':"));
        assert!(api.contains("Lifetime elision not enabled for 'get'"));
        assert!(!api.contains("pub fn get"));
    }

    #[test]
    fn test_overloads_are_rejected() {
        let (api, _, errors) = run(json!({"lang": "cxx", "items": [
            {"kind": "func", "id": 1, "name": "f", "params": [{"name": "x", "type": int()}]},
            {"kind": "func", "id": 2, "name": "f"},
            {"kind": "func", "id": 3, "name": "g"},
        ]}));
        assert_eq!(2, errors.iter().count());
        assert!(api.contains("overloaded functions are not supported: 'f'"));
        assert!(api.contains("pub fn g ()"));
    }

    #[test]
    fn test_constructor_becomes_from() {
        let (api, implementation, errors) = run(json!({"lang": "cxx", "items": [
            {"kind": "record", "id": 1, "name": "Meters", "size": 4, "align": 4,
             "fields": [{"name": "value", "type": int(), "offset": 0}]},
            {"kind": "func", "id": 2, "name": "Meters", "fn_kind": "constructor", "record": 1,
             "params": [{"name": "value", "type": int()}]},
        ]}));
        assert!(errors.is_empty());
        assert!(api.contains("impl From < :: core :: ffi :: c_int > for crate :: Meters"));
        assert!(api.contains("ReturnValueSlot :: call"));
        assert!(implementation.contains("  ::crubit::construct_at(__return, value);\n"));
    }

    #[test]
    fn test_rvalue_method_consumes_self() {
        let (api, implementation, errors) = run(json!({"lang": "cxx", "items": [
            {"kind": "record", "id": 1, "name": "Builder", "size": 8, "align": 8},
            {"kind": "func", "id": 2, "name": "Finish", "fn_kind": "method", "record": 1,
             "receiver": {"rvalue": true}, "ret": int()},
        ]}));
        assert!(errors.is_empty());
        assert!(api.contains("pub fn Finish (mut self ,) -> :: core :: ffi :: c_int"));
        assert!(implementation.contains("return std::move(*__this).Finish();"));
    }
}
