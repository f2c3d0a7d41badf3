// Intermediate representation consumed by the generator, plus the analysis
// passes that are shared between the crubit-gen library and the crubit CLI.
//
// The IR is produced by a language frontend (a C++ header parser, or a Rust
// crate walker) and arrives as JSON. Everything in this module is
// language-neutral: the frontend has already resolved declarations to ids,
// computed layouts, and classified special members.

pub mod abi_class;
pub mod atom;
pub mod attrs;
pub mod bridge;
pub mod classify;
pub mod discriminant;
pub mod elision;
pub mod error;
pub mod lifetime;
pub mod map;
pub mod mangle;
pub mod namespace;
pub mod report;
pub mod set;
pub mod special;
pub mod symbol;
pub mod thunk;
pub mod types;

use self::discriminant::Discriminant;
use self::namespace::Namespace;
use serde::Deserialize;
use std::fmt::{self, Display};

pub use self::atom::Atom;
pub use self::types::Types;

#[derive(Deserialize, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Language the bindings are generated *from*.
#[derive(Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    Cxx,
    Rust,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Ir {
    pub lang: Lang,
    /// Build target (C++ library, or Rust crate name) the items belong to.
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub public_headers: Vec<String>,
    /// Source files compiled with lifetime elision enabled.
    #[serde(default)]
    pub lifetime_elision_files: Vec<String>,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Record(Record),
    Enum(Enum),
    Func(Func),
    TypeAlias(TypeAlias),
    Unsupported(UnsupportedItem),
}

/// Fields common to every declaration.
#[derive(Deserialize, Clone, Debug)]
pub struct Decl {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub namespace: Namespace,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub source_loc: Option<SourceLoc>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Attributes the frontend saw but could not interpret.
    #[serde(default)]
    pub unknown_attr: Option<String>,
}

/// Position of a declaration in its source file.
#[derive(Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct SourceLoc {
    /// Path as the frontend spelled it.
    pub file: String,
    /// 1-based.
    pub line: u32,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Annotation {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Record {
    #[serde(flatten)]
    pub decl: Decl,
    pub size: u64,
    pub align: u64,
    /// `#pragma pack(n)` / `__attribute__((packed))` alignment cap.
    #[serde(default)]
    pub packed: Option<u64>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub special_members: SpecialMembers,
    #[serde(default)]
    pub is_trivial_abi: bool,
    #[serde(default)]
    pub is_union: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Only meaningful for records coming from Rust.
    #[serde(default)]
    pub rust_traits: RustTraits,
    /// System V eightbyte classes as computed by the frontend's compiler.
    #[serde(default)]
    pub abi_class: Option<Vec<AbiClass>>,
    /// Layout of a Rust enum with fields.
    #[serde(default)]
    pub variants: Option<Variants>,
}

#[derive(Deserialize, Debug)]
pub struct Variants {
    /// Integer type of the discriminant.
    pub tag: Type,
    pub tag_offset: u64,
    pub variants: Vec<Variant>,
}

#[derive(Deserialize, Debug)]
pub struct Variant {
    pub name: String,
    pub discriminant: Discriminant,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Whether dropping this variant runs any destructor.
    #[serde(default)]
    pub needs_drop: bool,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Field {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: Type,
    /// Byte offset from the start of the record.
    pub offset: u64,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub is_bitfield: bool,
}

#[derive(Deserialize, Copy, Clone, PartialEq, Eq, Default, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// Frontend's view of one special member function of a C++ record.
#[derive(Deserialize, Copy, Clone, PartialEq, Eq, Default, Debug)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMember {
    #[default]
    Trivial,
    /// Implicit or defaulted, but some member or base makes it non-trivial.
    NontrivialMembers,
    NontrivialUserDefined,
    /// Deleted, inaccessible, or not declared and not implicitly available.
    Unavailable,
}

#[derive(Deserialize, Copy, Clone, Default, Debug)]
#[serde(default)]
pub struct SpecialMembers {
    pub default_ctor: SpecialMember,
    pub copy_ctor: SpecialMember,
    pub move_ctor: SpecialMember,
    pub copy_assign: SpecialMember,
    pub move_assign: SpecialMember,
    pub destructor: SpecialMember,
}

#[derive(Deserialize, Copy, Clone, Default, Debug)]
#[serde(default)]
pub struct RustTraits {
    pub default: bool,
    pub clone: bool,
    pub copy: bool,
    /// `core::mem::needs_drop::<T>()`.
    pub drop: bool,
}

#[derive(Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum AbiClass {
    Integer,
    Sse,
    Memory,
}

#[derive(Deserialize, Debug)]
pub struct Enum {
    #[serde(flatten)]
    pub decl: Decl,
    pub underlying: Type,
    #[serde(default)]
    pub enumerators: Vec<Enumerator>,
    #[serde(default)]
    pub is_scoped: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Enumerator {
    pub name: String,
    pub value: Discriminant,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Deserialize, Copy, Clone, PartialEq, Eq, Default, Debug)]
#[serde(rename_all = "snake_case")]
pub enum FnKind {
    #[default]
    Free,
    Method,
    Constructor,
    Destructor,
}

#[derive(Deserialize, Debug)]
pub struct Func {
    #[serde(flatten)]
    pub decl: Decl,
    /// Spelled `fn_kind` because `kind` tags the item.
    #[serde(default, rename = "fn_kind")]
    pub kind: FnKind,
    /// Enclosing record of a method, constructor or destructor.
    #[serde(default)]
    pub record: Option<ItemId>,
    /// `None` on a static member function.
    #[serde(default)]
    pub receiver: Option<Receiver>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default = "Type::void")]
    pub ret: Type,
    #[serde(default)]
    pub cc: CallingConvention,
    /// Lifetime annotation strings attached to this declaration.
    #[serde(default)]
    pub lifetime_annotations: Vec<String>,
    #[serde(default)]
    pub redecls: Vec<Redecl>,
    #[serde(default)]
    pub mangled_name: Option<String>,
    #[serde(default)]
    pub is_inline: bool,
}

#[derive(Deserialize, Clone, Default, Debug)]
#[serde(default)]
pub struct Receiver {
    pub is_const: bool,
    /// `&&`-qualified method, or `self` by value for Rust.
    pub rvalue: bool,
    /// Inline lifetime annotation on `this`.
    pub lifetime: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// Another declaration of the same function, possibly in a different file.
#[derive(Deserialize, Clone, Debug)]
pub struct Redecl {
    #[serde(default)]
    pub source_loc: Option<SourceLoc>,
    #[serde(default)]
    pub lifetime_annotations: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct TypeAlias {
    #[serde(flatten)]
    pub decl: Decl,
    pub underlying: Type,
}

/// An item the frontend already failed to import.
#[derive(Deserialize, Debug)]
pub struct UnsupportedItem {
    #[serde(flatten)]
    pub decl: Decl,
    pub message: String,
}

#[derive(Deserialize, Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
#[serde(rename_all = "snake_case")]
pub enum CallingConvention {
    #[default]
    C,
    Stdcall,
    Fastcall,
    Vectorcall,
    Thiscall,
    Swiftcall,
    PreserveMost,
    RegCall,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Primitive(Primitive),
    Pointer(Box<Ptr>),
    Reference(Box<Ref>),
    Named(Named),
    Instantiation(Box<Instantiation>),
    FunctionPointer(Box<Signature>),
    Tuple(Tuple),
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Primitive {
    pub name: String,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Ptr {
    pub pointee: Type,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default = "yes")]
    pub nullable: bool,
    /// Inline lifetime annotation, e.g. from `int* $a`.
    #[serde(default)]
    pub lifetime: Option<String>,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Ref {
    pub pointee: Type,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub rvalue: bool,
    #[serde(default)]
    pub lifetime: Option<String>,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Named {
    pub id: ItemId,
}

/// A class template specialization, such as `std::optional<int>`.
#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Instantiation {
    /// Fully qualified template name without arguments.
    pub template: String,
    #[serde(default)]
    pub args: Vec<Type>,
    /// Record item the specialization was instantiated into, if any.
    #[serde(default)]
    pub id: Option<ItemId>,
    /// Set when the frontend failed to instantiate the template.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Signature {
    #[serde(default)]
    pub cc: CallingConvention,
    #[serde(default)]
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tuple {
    #[serde(default)]
    pub elements: Vec<Type>,
}

fn yes() -> bool {
    true
}

impl Type {
    pub fn void() -> Self {
        Type::Primitive(Primitive {
            name: "void".to_owned(),
        })
    }

    pub fn is_void(&self) -> bool {
        match self {
            Type::Primitive(prim) => prim.name == "void" || prim.name == "()",
            _ => false,
        }
    }
}

impl Item {
    pub fn decl(&self) -> &Decl {
        match self {
            Item::Record(record) => &record.decl,
            Item::Enum(enm) => &enm.decl,
            Item::Func(func) => &func.decl,
            Item::TypeAlias(alias) => &alias.decl,
            Item::Unsupported(item) => &item.decl,
        }
    }

    pub fn id(&self) -> ItemId {
        self.decl().id
    }
}

impl Decl {
    /// Qualified name for messages, e.g. `ns::Outer`.
    pub fn qualified_name(&self) -> String {
        self.namespace.qualify(&self.name)
    }

    pub fn annotation(&self, key: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.key == key)
    }
}

impl Func {
    pub fn is_member(&self) -> bool {
        self.record.is_some()
    }

    /// Every lifetime annotation string across all declarations, paired
    /// with where it was written.
    pub fn all_lifetime_annotations(&self) -> impl Iterator<Item = (&Option<SourceLoc>, &[String])> {
        let first = (&self.decl.source_loc, self.lifetime_annotations.as_slice());
        let rest = self
            .redecls
            .iter()
            .map(|redecl| (&redecl.source_loc, redecl.lifetime_annotations.as_slice()));
        std::iter::once(first).chain(rest)
    }
}

impl CallingConvention {
    /// ABI string for an `extern "..."` block, for conventions Rust can
    /// express.
    pub fn rust_abi(self) -> Option<&'static str> {
        match self {
            CallingConvention::C => Some("C"),
            CallingConvention::Stdcall => Some("stdcall"),
            CallingConvention::Fastcall => Some("fastcall"),
            CallingConvention::Vectorcall => Some("vectorcall"),
            CallingConvention::Thiscall => Some("thiscall"),
            CallingConvention::Swiftcall
            | CallingConvention::PreserveMost
            | CallingConvention::RegCall => None,
        }
    }

    pub fn cxx_attribute(self) -> Option<&'static str> {
        match self {
            CallingConvention::C => None,
            CallingConvention::Stdcall => Some("__attribute__((stdcall))"),
            CallingConvention::Fastcall => Some("__attribute__((fastcall))"),
            CallingConvention::Vectorcall => Some("__attribute__((vectorcall))"),
            CallingConvention::Thiscall => Some("__attribute__((thiscall))"),
            CallingConvention::Swiftcall => Some("__attribute__((swiftcall))"),
            CallingConvention::PreserveMost => Some("__attribute__((preserve_most))"),
            CallingConvention::RegCall => Some("__attribute__((regcall))"),
        }
    }
}

impl Display for SourceLoc {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{};l={}", self.file, self.line)
    }
}

impl Display for Lang {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(match self {
            Lang::Cxx => "C++",
            Lang::Rust => "Rust",
        })
    }
}
