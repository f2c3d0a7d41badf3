//! Type classification.
//!
//! Every type reachable from a declaration is mapped to a [`TypeDescriptor`]
//! which records its semantic category and the layout facts both languages
//! must agree on, or rejected with the reason it cannot cross the boundary.
//!
//! Records come in two depths. A record reached through a pointer or
//! reference, or nested by value, is described by its id, size, alignment
//! and triviality. The fields of a record are only classified when the
//! record itself is imported via [`Types::record`]. This keeps
//! self-referential records finite: `struct Node { Node* next; }` classifies
//! `Node*` while `Node` is being imported, and sees a shallow `Node`.

use crate::syntax::abi_class;
use crate::syntax::attrs;
use crate::syntax::bridge::{Bridge, TupleTemplate};
use crate::syntax::error;
use crate::syntax::{
    Atom, CallingConvention, Enum, Field, Instantiation, Item, ItemId, Lang, Record, SpecialMember, Type,
    Types,
};
use std::rc::Rc;

#[derive(Debug)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    /// Canonical spelling, see [`Types::spelling`].
    pub spelling: String,
    /// Zero for types whose layout is not shared across the boundary, such
    /// as tuples and bridged types.
    pub size: u64,
    pub align: u64,
    pub nullable: bool,
    /// Only filled in for an imported record.
    pub fields: Vec<FieldDescriptor>,
    pub repr: Repr,
    pub triviality: Triviality,
}

#[derive(Debug)]
pub enum TypeKind {
    Primitive(Atom),
    Pointer {
        pointee: Rc<TypeDescriptor>,
        is_const: bool,
    },
    Reference {
        pointee: Rc<TypeDescriptor>,
        is_const: bool,
    },
    Enum(ItemId),
    Record(ItemId),
    TemplateInstantiation {
        id: ItemId,
        template: String,
        args: Vec<Rc<TypeDescriptor>>,
    },
    FunctionPointer {
        cc: CallingConvention,
        params: Vec<Rc<TypeDescriptor>>,
        ret: Rc<TypeDescriptor>,
    },
    Tuple(Vec<Rc<TypeDescriptor>>),
    Bridged(Bridge),
}

#[derive(Debug)]
pub struct FieldDescriptor {
    /// Position in the record's `fields`.
    pub index: usize,
    pub name: Option<String>,
    pub offset: u64,
    /// Bytes the field occupies. For a field that cannot be represented
    /// this runs up to the next field, and the bytes are kept as an opaque
    /// blob.
    pub size: u64,
    pub ty: Result<Rc<TypeDescriptor>, String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Repr {
    pub packed: Option<u64>,
    pub align: Option<u64>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Triviality {
    pub copyable: bool,
    /// Trivially relocatable: a bytewise move followed by forgetting the
    /// source is a valid move.
    pub movable: bool,
    pub destructible: bool,
}

impl Triviality {
    pub const ALL: Triviality = Triviality {
        copyable: true,
        movable: true,
        destructible: true,
    };

    pub const NONE: Triviality = Triviality {
        copyable: false,
        movable: false,
        destructible: false,
    };
}

impl TypeDescriptor {
    fn new(kind: TypeKind, spelling: String, size: u64, align: u64) -> Self {
        TypeDescriptor {
            kind,
            spelling,
            size,
            align,
            nullable: false,
            fields: Vec::new(),
            repr: Repr::default(),
            triviality: Triviality::ALL,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(Atom::Void))
    }

    /// Id of the record, for records and class template specializations.
    pub fn record_id(&self) -> Option<ItemId> {
        match self.kind {
            TypeKind::Record(id) | TypeKind::TemplateInstantiation { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl<'a> Types<'a> {
    pub fn classify(&self, ty: &Type) -> Result<Rc<TypeDescriptor>, String> {
        let spelling = self.spelling(ty);
        if let Some(cached) = self.cache.borrow().get(&spelling) {
            return cached.clone();
        }
        let result = self.classify_uncached(ty, spelling.clone());
        // A record under import is assumed valid when reached through a
        // pointer, so nothing computed meanwhile is final.
        if self.importing.borrow().is_empty() {
            self.cache.borrow_mut().insert(spelling, result.clone());
        }
        result
    }

    fn classify_uncached(&self, ty: &Type, spelling: String) -> Result<Rc<TypeDescriptor>, String> {
        let desc = match ty {
            Type::Primitive(prim) => {
                let atom = Atom::lookup(self.lang, &prim.name).ok_or_else(|| {
                    error::UNSUPPORTED_PRIMITIVE.with(format_args!("`{}`", prim.name))
                })?;
                TypeDescriptor::new(TypeKind::Primitive(atom), spelling, atom.size(), atom.align())
            }
            Type::Pointer(ptr) => {
                let pointee = self.classify(&ptr.pointee)?;
                let kind = TypeKind::Pointer {
                    pointee,
                    is_const: ptr.is_const,
                };
                let mut desc = TypeDescriptor::new(kind, spelling, 8, 8);
                desc.nullable = ptr.nullable;
                desc
            }
            Type::Reference(reference) => {
                if reference.rvalue {
                    return Err(error::RVALUE_REFERENCE.to_string());
                }
                let pointee = self.classify(&reference.pointee)?;
                if pointee.is_void() {
                    return Err("reference to void".to_owned());
                }
                let kind = TypeKind::Reference {
                    pointee,
                    is_const: reference.is_const,
                };
                TypeDescriptor::new(kind, spelling, 8, 8)
            }
            Type::Named(named) => return self.classify_named(named.id, spelling),
            Type::Instantiation(inst) => return self.classify_instantiation(inst, spelling),
            Type::FunctionPointer(sig) => {
                if sig.cc.rust_abi().is_none() {
                    return Err(error::CALLING_CONVENTION.with(format_args!("{:?}", sig.cc)));
                }
                let params = sig
                    .params
                    .iter()
                    .map(|param| self.classify(param))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.classify(&sig.ret)?;
                let mut desc =
                    TypeDescriptor::new(TypeKind::FunctionPointer { cc: sig.cc, params, ret }, spelling, 8, 8);
                // Rust `extern "C" fn` is never null; C++ function pointers may be.
                desc.nullable = self.lang == Lang::Cxx;
                desc
            }
            Type::Tuple(tuple) => {
                if tuple.elements.is_empty() {
                    TypeDescriptor::new(TypeKind::Primitive(Atom::Void), spelling, 0, 1)
                } else {
                    let elements = tuple
                        .elements
                        .iter()
                        .map(|element| self.classify(element))
                        .collect::<Result<Vec<_>, _>>()?;
                    let triviality = combine(elements.iter().map(|element| element.triviality));
                    let mut desc = TypeDescriptor::new(TypeKind::Tuple(elements), spelling, 0, 1);
                    desc.triviality = triviality;
                    desc
                }
            }
        };
        Ok(Rc::new(desc))
    }

    fn classify_named(&self, id: ItemId, spelling: String) -> Result<Rc<TypeDescriptor>, String> {
        let Some(item) = self.get(id) else {
            return Err(error::DEPENDS_ON_UNSUPPORTED.with(spelling));
        };
        let depends = |name: &str| error::DEPENDS_ON_UNSUPPORTED.with(format_args!("'{}'", name));
        match item {
            Item::Record(record) => {
                let attrs = attrs::parse(&record.decl).map_err(|_| depends(&spelling))?;
                if let Some(bridge) = attrs.bridge {
                    let kind = TypeKind::Bridged(Bridge::Custom {
                        id,
                        attrs: bridge,
                        source_name: spelling.clone(),
                    });
                    let mut desc = TypeDescriptor::new(kind, spelling, 0, 1);
                    desc.triviality = Triviality::NONE;
                    return Ok(Rc::new(desc));
                }
                if self.importing.borrow().contains(&id) {
                    return Ok(Rc::new(self.shallow_record(record, TypeKind::Record(id))));
                }
                self.record(id).map_err(|_| depends(&spelling))
            }
            Item::Enum(enm) => {
                let atom = self.import_enum(enm).map_err(|_| depends(&spelling))?;
                let kind = TypeKind::Enum(id);
                Ok(Rc::new(TypeDescriptor::new(kind, spelling, atom.size(), atom.align())))
            }
            Item::TypeAlias(alias) => {
                if alias.decl.unknown_attr.is_some() || attrs::parse(&alias.decl).is_err() {
                    return Err(depends(&spelling));
                }
                self.classify(&alias.underlying)
            }
            Item::Func(_) => Err(error::NOT_A_TYPE.with(format_args!("'{}'", spelling))),
            Item::Unsupported(unsupported) => Err(error::DEPENDS_ON_UNSUPPORTED.with(
                format_args!("'{}': {}", spelling, unsupported.message),
            )),
        }
    }

    fn classify_instantiation(
        &self,
        inst: &Instantiation,
        spelling: String,
    ) -> Result<Rc<TypeDescriptor>, String> {
        if let Some(message) = &inst.error {
            return Err(error::INSTANTIATION_FAILED.with(format_args!("{}: {}", spelling, message)));
        }

        let template = inst.template.strip_prefix("::").unwrap_or(&inst.template);
        let args = inst
            .args
            .iter()
            .map(|arg| self.classify(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let bridge = match (template, args.as_slice()) {
            ("std::optional" | "core::option::Option" | "std::option::Option" | "Option", [arg]) => {
                Bridge::Optional(arg.clone())
            }
            ("std::pair", [_, _]) => Bridge::Tuple {
                template: TupleTemplate::Pair,
                elements: args.clone(),
            },
            ("std::tuple", _) => Bridge::Tuple {
                template: TupleTemplate::Tuple,
                elements: args.clone(),
            },
            ("std::unique_ptr", [pointee]) | ("std::unique_ptr", [pointee, _])
                if self.lang == Lang::Cxx =>
            {
                if pointee.record_id().is_none() {
                    return Err(error::UNSUPPORTED_TEMPLATE.with(format_args!(
                        "{} (only records declared here may be owned by std::unique_ptr)",
                        spelling,
                    )));
                }
                Bridge::UniquePtr(pointee.clone())
            }
            ("alloc::boxed::Box" | "std::boxed::Box" | "Box", _) => {
                return Err(error::BOX_BY_VALUE.to_string());
            }
            _ => {
                let Some(id) = inst.id else {
                    return Err(error::UNSUPPORTED_TEMPLATE.with(spelling));
                };
                let record = self.record(id).map_err(|problems| {
                    error::INSTANTIATION_FAILED.with(format_args!("{}: {}", spelling, problems.join("; ")))
                })?;
                let kind = TypeKind::TemplateInstantiation {
                    id,
                    template: template.to_owned(),
                    args,
                };
                let mut desc = TypeDescriptor::new(kind, spelling, record.size, record.align);
                desc.triviality = record.triviality;
                desc.repr = record.repr;
                return Ok(Rc::new(desc));
            }
        };

        if let Some(problem) = bridge.problem() {
            return Err(problem);
        }
        let mut desc = TypeDescriptor::new(TypeKind::Bridged(bridge), spelling, 0, 1);
        desc.triviality = Triviality {
            copyable: false,
            movable: true,
            destructible: false,
        };
        Ok(Rc::new(desc))
    }

    /// Imports a record: checks it can be represented at all, classifies its
    /// fields, decides its `#[repr]`, and cross-checks register
    /// classification against the compiler. Cached per id.
    pub fn record(&self, id: ItemId) -> Result<Rc<TypeDescriptor>, Vec<String>> {
        if let Some(done) = self.records.borrow().get(&id) {
            return done.clone();
        }
        let Some(Item::Record(record)) = self.get(id) else {
            return Err(vec![error::NOT_A_TYPE.with(id.0)]);
        };

        self.importing.borrow_mut().push(id);
        let result = self.import_record(id, record);
        self.importing.borrow_mut().pop();

        if self.importing.borrow().is_empty() {
            self.records.borrow_mut().insert(id, result.clone());
        }
        result
    }

    fn import_record(&self, id: ItemId, record: &Record) -> Result<Rc<TypeDescriptor>, Vec<String>> {
        let mut problems = Vec::new();
        if let Some(attr) = &record.decl.unknown_attr {
            problems.push(error::UNKNOWN_ATTRIBUTE.with(attr));
        }
        if let Err(errors) = attrs::parse(&record.decl) {
            problems.extend(errors);
        }
        if record.size == 0 {
            problems.push(error::ZERO_SIZED.to_string());
        }
        if !problems.is_empty() {
            return Err(problems);
        }

        let mut desc = self.shallow_record(record, TypeKind::Record(id));
        if self.lang == Lang::Cxx && record.variants.is_none() {
            match self.fields(record) {
                Ok(fields) => desc.fields = fields,
                Err(problem) => return Err(vec![problem]),
            }
        }

        match repr(record, &desc.fields) {
            Ok(repr) => desc.repr = repr,
            Err(problem) => problems.push(problem),
        }

        if let Some(expected) = &record.abi_class {
            let computed = abi_class::classify(self, record, &desc);
            if computed != *expected {
                problems.push(error::ABI_CLASS_MISMATCH.with(format_args!(
                    "computed {:?}, compiler chose {:?}",
                    computed, expected,
                )));
            }
        }

        if problems.is_empty() {
            Ok(Rc::new(desc))
        } else {
            Err(problems)
        }
    }

    fn shallow_record(&self, record: &Record, kind: TypeKind) -> TypeDescriptor {
        let mut desc = TypeDescriptor::new(kind, record.decl.qualified_name(), record.size, record.align);
        desc.triviality = record_triviality(self.lang, record);
        desc
    }

    fn fields(&self, record: &Record) -> Result<Vec<FieldDescriptor>, String> {
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        for (index, field) in record.fields.iter().enumerate() {
            let ty = if field.is_bitfield {
                Err("bitfields are not supported".to_owned())
            } else {
                self.classify(&field.ty).and_then(|ty| {
                    field_problem(&ty, field.offset, record.packed).map_or(Ok(ty), Err)
                })
            };

            let size = match &ty {
                Ok(ty) => ty.size,
                Err(_) => {
                    // Consecutive opaque fields sharing storage (bitfields
                    // of one unit, union members) become a single blob.
                    if let Some(prev) = fields.last() {
                        if prev.ty.is_err() && prev.offset == field.offset {
                            continue;
                        }
                    }
                    let next = record.fields[index + 1..]
                        .iter()
                        .map(|next| next.offset)
                        .find(|&offset| offset > field.offset)
                        .unwrap_or(record.size);
                    next.checked_sub(field.offset)
                        .ok_or_else(|| outside(record, index, field))?
                }
            };
            if field.offset.checked_add(size).map_or(true, |end| end > record.size) {
                return Err(outside(record, index, field));
            }

            fields.push(FieldDescriptor {
                index,
                name: field.name.clone(),
                offset: field.offset,
                size,
                ty,
            });
        }
        Ok(fields)
    }

    /// Underlying integer type of an enum whose enumerators all fit it.
    pub fn import_enum(&self, enm: &Enum) -> Result<Atom, Vec<String>> {
        let mut problems = Vec::new();
        if let Some(attr) = &enm.decl.unknown_attr {
            problems.push(error::UNKNOWN_ATTRIBUTE.with(attr));
        }
        if let Err(errors) = attrs::parse(&enm.decl) {
            problems.extend(errors);
        }

        let atom = match &enm.underlying {
            Type::Primitive(prim) => Atom::lookup(self.lang, &prim.name)
                .filter(|atom| atom.integer_signedness().is_some()),
            _ => None,
        };
        let Some(atom) = atom else {
            problems.push(error::ENUM_UNDERLYING.with(self.spelling(&enm.underlying)));
            return Err(problems);
        };

        for enumerator in &enm.enumerators {
            if !enumerator.value.fits(atom) {
                problems.push(error::DISCRIMINANT_RANGE.with(format_args!(
                    "{} = {} in {}",
                    enumerator.name, enumerator.value, atom,
                )));
            }
        }

        if problems.is_empty() {
            Ok(atom)
        } else {
            Err(problems)
        }
    }
}

fn combine(trivialities: impl Iterator<Item = Triviality>) -> Triviality {
    trivialities.fold(Triviality::ALL, |acc, t| Triviality {
        copyable: acc.copyable && t.copyable,
        movable: acc.movable && t.movable,
        destructible: acc.destructible && t.destructible,
    })
}

pub(crate) fn record_triviality(lang: Lang, record: &Record) -> Triviality {
    match lang {
        Lang::Cxx => {
            let members = &record.special_members;
            let destructible = members.destructor == SpecialMember::Trivial;
            Triviality {
                copyable: members.copy_ctor == SpecialMember::Trivial
                    && members.copy_assign == SpecialMember::Trivial
                    && destructible,
                movable: record.is_trivial_abi
                    || (members.move_ctor == SpecialMember::Trivial && destructible),
                destructible,
            }
        }
        // Every Rust value may be moved by copying its bytes.
        Lang::Rust => Triviality {
            copyable: record.rust_traits.copy,
            movable: true,
            destructible: !record.rust_traits.drop,
        },
    }
}

fn outside(record: &Record, index: usize, field: &Field) -> String {
    let name = match &field.name {
        Some(name) => format!("'{}'", name),
        None => format!("#{}", index),
    };
    format!(
        "field {} at offset {} does not fit in '{}', which is {} bytes",
        name,
        field.offset,
        record.decl.qualified_name(),
        record.size,
    )
}

fn field_problem(ty: &TypeDescriptor, offset: u64, packed: Option<u64>) -> Option<String> {
    match &ty.kind {
        TypeKind::Primitive(Atom::Void) => return Some("field of type void".to_owned()),
        TypeKind::Reference { .. } => {
            return Some("reference fields are not supported".to_owned());
        }
        TypeKind::Bridged(_) | TypeKind::Tuple(_) => {
            return Some(format!(
                "field type {} has no common layout in both languages",
                ty.spelling,
            ));
        }
        _ => {}
    }
    let align = match packed {
        Some(packed) => ty.align.min(packed),
        None => ty.align,
    };
    if offset % align.max(1) != 0 {
        return Some(format!("field is misaligned at offset {}", offset));
    }
    None
}

/// `#[repr]` attributes reproducing the record's size and alignment.
fn repr(record: &Record, fields: &[FieldDescriptor]) -> Result<Repr, String> {
    let natural = fields
        .iter()
        .map(|field| match &field.ty {
            Ok(ty) => match record.packed {
                Some(packed) => ty.align.min(packed),
                None => ty.align,
            },
            Err(_) => 1,
        })
        .max()
        .unwrap_or(1);

    match record.packed {
        Some(packed) => {
            if record.align > natural.min(packed) {
                return Err(error::PACKED_AND_ALIGNED.to_string());
            }
            Ok(Repr {
                packed: Some(record.align),
                align: None,
            })
        }
        None if record.align > natural => Ok(Repr {
            packed: None,
            align: Some(record.align),
        }),
        None if record.align < natural => Ok(Repr {
            packed: Some(record.align),
            align: None,
        }),
        None => Ok(Repr::default()),
    }
}
