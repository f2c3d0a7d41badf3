//! Bindings for Rust declarations: the C++ header `cc_api`, and the Rust
//! thunks behind it, `cc_api_impl`.

use crate::gen::expand_thunk::{expand_layout_assertions, expand_special_thunk};
use crate::gen::out::{Content, OutFile};
use crate::gen::write_fn::{self, write_doc, FnPiece};
use crate::gen::write_thunk::write_size_assertions;
use crate::gen::write_type::cxx_type;
use crate::gen::{cxx_deprecated_attr, doc_lines, names, skip, Context};
use crate::syntax::attrs::{self, Attrs};
use crate::syntax::classify::{TypeDescriptor, TypeKind};
use crate::syntax::error;
use crate::syntax::mangle::{self, SpecialThunk};
use crate::syntax::discriminant::Discriminant;
use crate::syntax::map::OrderedMap;
use crate::syntax::set::UnorderedSet;
use crate::syntax::report::Errors;
use crate::syntax::special::{self, SpecialState};
use crate::syntax::symbol::Symbol;
use crate::syntax::{Access, Atom, Decl, Enum, Item, ItemId, Lang, Record, TypeAlias};
use proc_macro2::TokenStream;
use std::mem;

/// What one Rust declaration contributes to each section of the header.
#[derive(Default)]
struct Piece {
    namespace: Vec<String>,
    /// Forward declaration, so that any declaration may name the type.
    forward: Option<String>,
    decl: Content,
    /// `extern "C"` declarations of thunks, in `__crubit_internal`.
    internal: Content,
    /// Out-of-class definitions.
    definitions: Content,
    assertions: Content,
}

type PieceResult = Result<Option<(Piece, TokenStream)>, Vec<String>>;

pub(super) fn gen(cx: &Context, errors: &mut Errors) -> (String, String) {
    let items = cx.types.items;

    let mut functions: Vec<Option<Result<FnPiece, Vec<String>>>> = items
        .iter()
        .map(|item| match item {
            Item::Func(func) => Some(write_fn::write_fn(cx, func)),
            _ => None,
        })
        .collect();

    // Method declarations go inside their class body.
    let mut members: OrderedMap<ItemId, Vec<String>> = OrderedMap::new();
    for (item, function) in items.iter().zip(&mut functions) {
        if let (Item::Func(func), Some(Ok(piece))) = (item, function) {
            if let (Some(record), Some(member)) = (func.record, piece.member.take()) {
                members.entry(record).or_default().push(member);
            }
        }
    }

    let mut records: Vec<Option<PieceResult>> = Vec::with_capacity(items.len());
    let mut failed_records = UnorderedSet::new();
    for item in items {
        records.push(match item {
            Item::Record(record) => {
                let methods = members.get(&record.decl.id).map_or(&[][..], Vec::as_slice);
                let result = write_record(cx, record, methods);
                if !matches!(result, Ok(Some(_))) {
                    failed_records.insert(record.decl.id);
                }
                Some(result)
            }
            _ => None,
        });
    }

    let mut pieces = Vec::new();
    let mut thunks = TokenStream::new();
    for ((item, function), record) in items.iter().zip(functions).zip(records) {
        let decl = item.decl();
        log::debug!("exporting {:?} '{}'", decl.id, decl.qualified_name());
        let result = match item {
            Item::Record(_) => record.unwrap_or(Ok(None)),
            Item::Enum(enm) => write_enum(cx, enm),
            Item::TypeAlias(alias) => write_alias(cx, alias),
            Item::Func(func) => match function {
                Some(Ok(_)) if func.record.is_some_and(|id| failed_records.contains(&id)) => {
                    let record = func.record.map_or(0, |id| id.0);
                    Err(vec![error::DEPENDS_ON_UNSUPPORTED.with(match cx.types.get(ItemId(record)) {
                        Some(item) => format!("'{}'", item.decl().qualified_name()),
                        None => record.to_string(),
                    })])
                }
                Some(Ok(function)) => Ok(Some((
                    Piece {
                        namespace: function.namespace,
                        internal: function.internal,
                        definitions: function.definition,
                        ..Piece::default()
                    },
                    function.thunk,
                ))),
                Some(Err(messages)) => Err(messages),
                None => Ok(None),
            },
            Item::Unsupported(unsupported) => Err(vec![unsupported.message.clone()]),
        };
        match result {
            Ok(Some((piece, tokens))) => {
                pieces.push(piece);
                thunks.extend(tokens);
            }
            Ok(None) => {}
            Err(messages) => {
                let mut piece = Piece {
                    namespace: namespace_of(cx, decl),
                    ..Piece::default()
                };
                write!(piece.decl, "{}", skip(errors, decl, messages));
                pieces.push(piece);
            }
        }
    }

    (cc_api(cx, pieces), cc_api_impl(cx, thunks))
}

fn namespace_of(cx: &Context, decl: &Decl) -> Vec<String> {
    let attrs = attrs::parse(decl).unwrap_or_default();
    names::cxx_namespace(cx, decl, &attrs)
}

fn cc_api(cx: &Context, mut pieces: Vec<Piece>) -> String {
    let mut out = OutFile::new();
    out.preamble = format!(
        "// Automatically @generated C++ bindings for the following Rust crate:\n// {}\n\n#pragma once\n",
        cx.types.target,
    );

    for piece in &pieces {
        if let Some(forward) = &piece.forward {
            out.set_namespace(&piece.namespace);
            writeln!(out, "{}", forward);
        }
    }
    for piece in &mut pieces {
        if !piece.decl.is_empty() {
            out.set_namespace(&piece.namespace);
            out.next_section();
            out.write_content(mem::take(&mut piece.decl));
        }
    }
    for piece in &mut pieces {
        if !piece.internal.is_empty() {
            let mut namespace = piece.namespace.clone();
            namespace.push("__crubit_internal".to_owned());
            out.set_namespace(&namespace);
            out.write_content(mem::take(&mut piece.internal));
        }
    }
    for piece in &mut pieces {
        if !piece.definitions.is_empty() {
            out.set_namespace(&piece.namespace);
            out.next_section();
            out.write_content(mem::take(&mut piece.definitions));
        }
    }
    for piece in &mut pieces {
        if !piece.assertions.is_empty() {
            out.set_namespace(&piece.namespace);
            out.write_content(mem::take(&mut piece.assertions));
        }
    }

    out.include.cstddef = true;
    out.include.cstdint = true;
    out.include.cstring = true;
    out.include.type_traits = true;
    out.include.utility = true;
    out.include.insert(cx.support_header());
    out.include.extend(cx.opt.include.iter().cloned());
    let mut header = out.content();
    let mut extra = String::new();
    for (needle, include) in [
        ("std::numeric_limits", "<limits>"),
        ("std::optional", "<optional>"),
        ("std::pair", "<utility>"),
        ("std::tuple", "<tuple>"),
    ] {
        let line = format!("#include {}\n", include);
        if header.contains(needle) && !header.contains(&line) && !extra.contains(&line) {
            extra.push_str(&line);
        }
    }
    if !extra.is_empty() {
        if let Some(at) = header.find("#include ") {
            header.insert_str(at, &extra);
        }
    }
    header
}

fn cc_api_impl(cx: &Context, thunks: TokenStream) -> String {
    let mut implementation = String::new();
    implementation.push_str("// Automatically @generated Rust thunks for the C++ bindings of the following Rust crate:\n");
    implementation.push_str("// ");
    implementation.push_str(cx.types.target);
    implementation.push_str("\n\n");
    implementation.push_str("#![allow(clippy::all, improper_ctypes_definitions, non_snake_case)]\n\n");
    if !thunks.is_empty() {
        implementation.push_str(&thunks.to_string());
        implementation.push('\n');
    }
    implementation
}

fn write_record(cx: &Context, record: &Record, methods: &[String]) -> PieceResult {
    let decl = &record.decl;
    let attrs = attrs::parse(decl)?;
    if attrs.bridge.is_some() {
        // Crosses by value through its codec, never by layout.
        return Ok(None);
    }
    let desc = cx.types.record(decl.id)?;
    let one = |message: String| vec![message];
    let name = names::cxx_ident(&decl.name).map_err(one)?;
    let cxx_path = names::cxx_path(cx, decl.id).map_err(one)?;
    let path = names::rust_path(cx, decl.id).map_err(one)?;

    let mut piece = Piece {
        namespace: names::cxx_namespace(cx, decl, &attrs),
        forward: Some(format!("struct {};", name)),
        ..Piece::default()
    };
    let mut thunks = TokenStream::new();

    let deprecated = cxx_deprecated_attr(attrs.deprecated.as_ref()).unwrap_or_default();
    let out = &mut piece.decl;
    write_doc(out, "", &doc_lines(cx, decl));
    writeln!(
        out,
        "struct {}alignas({}) {} final {{",
        deprecated, record.align, name,
    );
    writeln!(out, " public:");

    let plan = special::plan(Lang::Rust, record);
    let specials = [
        (SpecialThunk::Default, plan.default),
        (SpecialThunk::Drop, plan.drop),
        (SpecialThunk::Clone, plan.clone),
        (SpecialThunk::CloneFrom, plan.clone_from),
        (SpecialThunk::Move, plan.move_construct),
        (SpecialThunk::MoveAssign, plan.move_assign),
    ];
    for (member, state) in specials {
        let signature = special_signature(name, member);
        match state {
            SpecialState::Trivial => writeln!(out, "  {} = default;", signature),
            SpecialState::Deleted => writeln!(out, "  {} = delete;", signature),
            SpecialState::NotConsidered => {}
            SpecialState::Thunked | SpecialState::DefaultedButNonTrivial => {
                let symbol = mangle::special(decl, member);
                writeln!(out, "  {};", signature);
                write_special_definition(&mut piece.definitions, name, member, &symbol);
                let other = match member {
                    SpecialThunk::Clone | SpecialThunk::CloneFrom => {
                        format!(", {} const* other", cxx_path)
                    }
                    SpecialThunk::Move | SpecialThunk::MoveAssign => format!(", {}* other", cxx_path),
                    _ => String::new(),
                };
                writeln!(
                    piece.internal,
                    "extern \"C\" void {}({}* __this{});",
                    symbol, cxx_path, other,
                );
                thunks.extend(expand_special_thunk(cx, &symbol, &path, member));
            }
        }
    }

    if !methods.is_empty() {
        out.next_section();
        for method in methods {
            write!(out, "{}", method);
        }
    }

    let offsets = if let Some(variants) = &record.variants {
        let tag = cx.types.classify(&variants.tag).map_err(one)?;
        let TypeKind::Primitive(atom) = tag.kind else {
            return Err(vec![format!("enum tag must be an integer, not {}", tag.spelling)]);
        };
        out.next_section();
        writeln!(out, "  enum class Tag : {} {{", atom.to_cxx());
        for variant in &variants.variants {
            let lines: Vec<String> = match &variant.doc {
                Some(doc) if cx.opt.doc_comments => doc.lines().map(str::to_owned).collect(),
                _ => Vec::new(),
            };
            write_doc(out, "    ", &lines);
            let variant_name = names::cxx_ident(&variant.name).map_err(one)?;
            write!(out, "    {} = ", variant_name);
            write_discriminant(out, atom, variant.discriminant);
            writeln!(out, ",");
        }
        writeln!(out, "  }};");
        writeln!(out);
        writeln!(out, "  /// The active variant.");
        writeln!(out, "  Tag tag() const noexcept {{");
        writeln!(out, "    Tag tag;");
        writeln!(
            out,
            "    std::memcpy(&tag, __opaque + {}, sizeof(Tag));",
            variants.tag_offset,
        );
        writeln!(out, "    return tag;");
        writeln!(out, "  }}");
        write_opaque(out, record.size);
        Vec::new()
    } else if record.is_union {
        write_opaque(out, record.size);
        Vec::new()
    } else {
        write_fields(out, cx, record).map_err(one)?
    };
    writeln!(out, "}};");

    if cx.opt.emit_layout_assertions {
        write_size_assertions(&mut piece.assertions, &cxx_path, desc.size, desc.align);
        thunks.extend(expand_layout_assertions(&path, desc.size, desc.align, &offsets));
    }
    Ok(Some((piece, thunks)))
}

fn special_signature(name: &str, member: SpecialThunk) -> String {
    match member {
        SpecialThunk::Default => format!("{}() noexcept", name),
        SpecialThunk::Drop | SpecialThunk::Delete => format!("~{}() noexcept", name),
        SpecialThunk::Clone => format!("{}(const {}&)", name, name),
        SpecialThunk::CloneFrom => format!("{}& operator=(const {}&)", name, name),
        SpecialThunk::Move => format!("{}({}&&) noexcept", name, name),
        SpecialThunk::MoveAssign => format!("{}& operator=({}&&) noexcept", name, name),
    }
}

fn write_special_definition(out: &mut Content, name: &str, member: SpecialThunk, symbol: &Symbol) {
    out.next_section();
    let internal = format!("__crubit_internal::{}", symbol);
    match member {
        SpecialThunk::Default => {
            writeln!(out, "inline {}::{}() noexcept {{", name, name);
            writeln!(out, "  {}(this);", internal);
        }
        SpecialThunk::Drop | SpecialThunk::Delete => {
            writeln!(out, "inline {}::~{}() noexcept {{", name, name);
            writeln!(out, "  {}(this);", internal);
        }
        SpecialThunk::Clone => {
            writeln!(out, "inline {}::{}(const {}& other) {{", name, name, name);
            writeln!(out, "  {}(this, &other);", internal);
        }
        SpecialThunk::CloneFrom => {
            writeln!(out, "inline {}& {}::operator=(const {}& other) {{", name, name, name);
            writeln!(out, "  if (this != &other) {{");
            writeln!(out, "    {}(this, &other);", internal);
            writeln!(out, "  }}");
            writeln!(out, "  return *this;");
        }
        SpecialThunk::Move => {
            writeln!(out, "inline {}::{}({}&& other) noexcept {{", name, name, name);
            writeln!(out, "  {}(this, &other);", internal);
        }
        SpecialThunk::MoveAssign => {
            writeln!(out, "inline {}& {}::operator=({}&& other) noexcept {{", name, name, name);
            writeln!(out, "  if (this != &other) {{");
            writeln!(out, "    {}(this, &other);", internal);
            writeln!(out, "  }}");
            writeln!(out, "  return *this;");
        }
    }
    writeln!(out, "}}");
}

fn write_opaque(out: &mut Content, size: u64) {
    writeln!(out);
    writeln!(out, " private:");
    writeln!(out, "  unsigned char __opaque[{}];", size);
}

/// Fields in offset order. A field is spelled with its type when C++ code
/// may read and write it freely; everything else is opaque bytes.
fn write_fields(out: &mut Content, cx: &Context, record: &Record) -> Result<Vec<(TokenStream, u64)>, String> {
    let mut fields: Vec<(usize, u64)> = record
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| (index, field.offset))
        .collect();
    fields.sort_by_key(|&(_, offset)| offset);

    let mut offsets = Vec::new();
    let mut access = Access::Public;
    let mut set_access = |out: &mut Content, want: Access| {
        if access != want {
            access = want;
            match want {
                Access::Public => writeln!(out, " public:"),
                _ => writeln!(out, " private:"),
            }
        }
    };

    let mut end = 0;
    let mut padding = 0;
    let mut first = true;
    for (index, offset) in fields {
        let field = &record.fields[index];
        let ty = cx.types.classify(&field.ty);
        let size = match &ty {
            Ok(ty) => ty.size,
            Err(_) => 0,
        };
        if size == 0 || offset < end {
            continue;
        }
        if first {
            writeln!(out);
            first = false;
        }
        if offset > end {
            set_access(out, Access::Private);
            writeln!(out, "  unsigned char __padding{}[{}];", padding, offset - end);
            padding += 1;
        }
        match ty.ok().and_then(|ty| typed_field(cx, record, index, &ty)) {
            Some((name, ty)) => {
                set_access(out, Access::Public);
                let lines: Vec<String> = match &field.doc {
                    Some(doc) if cx.opt.doc_comments => doc.lines().map(str::to_owned).collect(),
                    _ => Vec::new(),
                };
                write_doc(out, "  ", &lines);
                writeln!(out, "  {} {};", ty, name);
                let ident = names::rust_ident(name)?;
                offsets.push((quote::quote!(#ident), offset));
            }
            None => {
                set_access(out, Access::Private);
                writeln!(out, "  unsigned char __field{}[{}];", index, size);
            }
        }
        end = offset + size;
    }
    if end < record.size {
        set_access(out, Access::Private);
        writeln!(out, "  unsigned char __tail_padding[{}];", record.size - end);
    }
    Ok(offsets)
}

/// Name and C++ type of a field that C++ may access directly.
fn typed_field<'r>(
    cx: &Context,
    record: &'r Record,
    index: usize,
    ty: &TypeDescriptor,
) -> Option<(&'r str, String)> {
    let field = &record.fields[index];
    if field.access != Access::Public || field.is_bitfield {
        return None;
    }
    let name = field.name.as_deref()?;
    if name.starts_with(|ch: char| ch.is_ascii_digit()) || names::cxx_ident(name).is_err() {
        return None;
    }
    let plain = match &ty.kind {
        TypeKind::Primitive(_) | TypeKind::Pointer { .. } | TypeKind::Enum(_) => true,
        TypeKind::Record(_) => ty.triviality.copyable,
        _ => false,
    };
    if !plain {
        return None;
    }
    cxx_type(cx, ty).ok().map(|ty| (name, ty))
}

fn write_enum(cx: &Context, enm: &Enum) -> PieceResult {
    let decl = &enm.decl;
    let attrs = attrs::parse(decl)?;
    let atom = cx.types.import_enum(enm)?;
    let one = |message: String| vec![message];
    let name = names::cxx_ident(&decl.name).map_err(one)?;

    let mut piece = Piece {
        namespace: names::cxx_namespace(cx, decl, &attrs),
        forward: Some(format!("enum class {} : {};", name, atom.to_cxx())),
        ..Piece::default()
    };
    let deprecated = cxx_deprecated_attr(attrs.deprecated.as_ref()).unwrap_or_default();
    let out = &mut piece.decl;
    write_doc(out, "", &doc_lines(cx, decl));
    writeln!(out, "enum class {}{} : {} {{", deprecated, name, atom.to_cxx());
    for enumerator in &enm.enumerators {
        let lines: Vec<String> = match &enumerator.doc {
            Some(doc) if cx.opt.doc_comments => doc.lines().map(str::to_owned).collect(),
            _ => Vec::new(),
        };
        write_doc(out, "  ", &lines);
        let enumerator_name = names::cxx_ident(&enumerator.name).map_err(one)?;
        write!(out, "  {} = ", enumerator_name);
        write_discriminant(out, atom, enumerator.value);
        writeln!(out, ",");
    }
    writeln!(out, "}};");

    let mut thunks = TokenStream::new();
    if cx.opt.emit_layout_assertions {
        let cxx_path = names::cxx_path(cx, decl.id).map_err(one)?;
        let path = names::rust_path(cx, decl.id).map_err(one)?;
        write_size_assertions(&mut piece.assertions, &cxx_path, atom.size(), atom.align());
        thunks.extend(expand_layout_assertions(&path, atom.size(), atom.align(), &[]));
    }
    Ok(Some((piece, thunks)))
}

fn write_discriminant(out: &mut Content, repr: Atom, discriminant: Discriminant) {
    if discriminant.is_min(repr) {
        write!(out, "::std::numeric_limits<{}>::min()", repr.to_cxx());
    } else {
        write!(out, "{}", discriminant);
    }
}

fn write_alias(cx: &Context, alias: &TypeAlias) -> PieceResult {
    let decl = &alias.decl;
    if let Some(attr) = &decl.unknown_attr {
        return Err(vec![error::UNKNOWN_ATTRIBUTE.with(attr)]);
    }
    let attrs: Attrs = attrs::parse(decl)?;
    let one = |message: String| vec![message];
    let name = names::cxx_ident(&decl.name).map_err(one)?;
    let desc = cx.types.classify(&alias.underlying).map_err(one)?;
    let ty = cxx_type(cx, &desc).map_err(one)?;

    let mut piece = Piece {
        namespace: names::cxx_namespace(cx, decl, &attrs),
        ..Piece::default()
    };
    let deprecated = cxx_deprecated_attr(attrs.deprecated.as_ref()).unwrap_or_default();
    write_doc(&mut piece.decl, "", &doc_lines(cx, decl));
    writeln!(piece.decl, "using {} {}= {};", name, deprecated, ty);
    Ok(Some((piece, TokenStream::new())))
}

#[cfg(test)]
mod tests {
    use super::gen;
    use crate::gen::{Context, Opt};
    use crate::syntax::report::Errors;
    use crate::syntax::{Ir, Types};
    use indoc::indoc;
    use serde_json::{json, Value};

    fn run(items: Value) -> (String, String, Errors) {
        let ir: Ir = serde_json::from_value(json!({"lang": "rust", "target": "geo", "items": items})).unwrap();
        let types = Types::collect(&ir).unwrap();
        let opt = Opt::default();
        let cx = Context::new(&types, &opt).unwrap();
        let mut errors = Errors::new();
        let (api, implementation) = gen(&cx, &mut errors);
        (api, implementation, errors)
    }

    fn f64() -> Value {
        json!({"kind": "primitive", "name": "f64"})
    }

    #[test]
    fn test_class_with_special_members() {
        let (api, implementation, errors) = run(json!([
            {"kind": "record", "id": 1, "name": "Point", "size": 16, "align": 8,
             "rust_traits": {"clone": true, "default": true, "drop": true},
             "fields": [
                {"name": "x", "type": f64(), "offset": 0},
                {"name": "y", "type": f64(), "offset": 8, "access": "private"},
             ]},
            {"kind": "func", "id": 2, "name": "norm", "fn_kind": "method", "record": 1,
             "receiver": {"is_const": true}, "ret": f64()},
        ]));
        assert!(errors.is_empty());
        let class = indoc! {"
            struct alignas(8) Point final {
             public:
              Point() noexcept;
              ~Point() noexcept;
              Point(const Point&);
              Point& operator=(const Point&);
              Point(Point&&) noexcept;
              Point& operator=(Point&&) noexcept;

              double norm() const;

              double x;
             private:
              unsigned char __field1[8];
            };
        "};
        assert!(api.contains(class));
        assert!(api.contains("namespace geo {\nstruct Point;\n"));
        assert!(api.contains("inline Point::~Point() noexcept {\n  __crubit_internal::__crubit_thunk_Point___7bhdrop_7dh(this);\n}\n"));
        assert!(api.contains("static_assert(sizeof(::geo::Point) == 16);\n"));
        assert!(implementation.contains(":: crubit :: private :: move_construct (__this , other)"));
        assert!(implementation.contains("offset_of ! (:: geo :: Point , x) == 0"));
        assert!(!implementation.contains("offset_of ! (:: geo :: Point , y)"));
    }

    #[test]
    fn test_non_clone_record_deletes_copy() {
        let (api, _, errors) = run(json!([
            {"kind": "record", "id": 1, "name": "Token", "size": 8, "align": 8},
        ]));
        assert!(errors.is_empty());
        assert!(api.contains("  Token() noexcept = delete;\n"));
        assert!(api.contains("  Token(const Token&) = delete;\n"));
        assert!(api.contains("  Token(Token&&) noexcept = delete;\n"));
    }

    #[test]
    fn test_enum_class() {
        let (api, _, errors) = run(json!([
            {"kind": "enum", "id": 1, "name": "Level", "namespace": ["log"],
             "underlying": {"kind": "primitive", "name": "i64"},
             "enumerators": [
                {"name": "Low", "value": i64::MIN},
                {"name": "High", "value": 7, "doc": "Loudest."},
             ]},
        ]));
        assert!(errors.is_empty());
        let expected = indoc! {"
            enum class Level : std::int64_t {
              Low = ::std::numeric_limits<std::int64_t>::min(),
              /// Loudest.
              High = 7,
            };
        "};
        assert!(api.contains(expected));
        assert!(api.contains("namespace geo {\nnamespace log {\n"));
        assert!(api.contains("#include <limits>\n"));
    }

    #[test]
    fn test_free_function() {
        let (api, implementation, errors) = run(json!([
            {"kind": "func", "id": 1, "name": "add", "doc": "Sum of both.",
             "params": [{"name": "a", "type": f64()}, {"name": "b", "type": f64()}],
             "ret": f64()},
        ]));
        assert!(errors.is_empty());
        assert!(api.contains("/// Sum of both.\ninline double add(double a, double b) {\n"));
        assert!(api.contains("namespace __crubit_internal {\nextern \"C\" double "));
        assert!(implementation.contains("# [no_mangle] unsafe extern \"C\" fn"));
        assert!(implementation.contains(":: geo :: add (__param_0 , __param_1)"));
    }

    #[test]
    fn test_variants_expose_tag() {
        let (api, _, errors) = run(json!([
            {"kind": "record", "id": 1, "name": "Shape", "size": 16, "align": 8,
             "rust_traits": {"copy": true, "clone": true},
             "variants": {"tag": {"kind": "primitive", "name": "u8"}, "tag_offset": 0, "variants": [
                {"name": "Circle", "discriminant": 0},
                {"name": "Square", "discriminant": 1},
             ]}},
        ]));
        assert!(errors.is_empty());
        assert!(api.contains("  enum class Tag : std::uint8_t {\n    Circle = 0,\n    Square = 1,\n  };\n"));
        assert!(api.contains("    std::memcpy(&tag, __opaque + 0, sizeof(Tag));\n"));
        assert!(api.contains(" private:\n  unsigned char __opaque[16];\n"));
    }

    #[test]
    fn test_method_of_failed_record() {
        let (api, _, errors) = run(json!([
            {"kind": "record", "id": 1, "name": "Empty", "size": 0, "align": 1},
            {"kind": "func", "id": 2, "name": "len", "fn_kind": "method", "record": 1,
             "receiver": {"is_const": true}, "ret": {"kind": "primitive", "name": "usize"}},
        ]));
        assert_eq!(2, errors.iter().count());
        assert!(api.contains("// Error while generating bindings for item 'Empty':\n"));
        assert!(!api.contains("Empty::len("));
    }
}
