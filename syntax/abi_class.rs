//! System V x86-64 classification of records passed by value.
//!
//! The frontend reports what its compiler decided for each record. The
//! generator recomputes the classification from the imported layout and
//! refuses records where the two disagree, since the Rust side of a thunk
//! would then place the value in different registers than C++ expects.

use crate::syntax::classify::{FieldDescriptor, TypeDescriptor, TypeKind};
use crate::syntax::{AbiClass, Atom, Record, Types};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Class {
    NoClass,
    Sse,
    Integer,
    Memory,
}

pub fn classify(types: &Types, record: &Record, desc: &TypeDescriptor) -> Vec<AbiClass> {
    if record.size > 16 {
        return vec![AbiClass::Memory];
    }
    if !desc.triviality.copyable && !record.is_trivial_abi {
        return vec![AbiClass::Memory];
    }

    let mut eightbytes = vec![Class::NoClass; record.size.div_ceil(8) as usize];
    if desc.fields.is_empty() {
        fill(&mut eightbytes, 0, record.size, Class::Integer);
    } else {
        classify_fields(types, &desc.fields, 0, &mut eightbytes);
    }

    if eightbytes.contains(&Class::Memory) {
        return vec![AbiClass::Memory];
    }
    eightbytes
        .into_iter()
        .map(|class| match class {
            Class::Integer => AbiClass::Integer,
            Class::NoClass | Class::Sse => AbiClass::Sse,
            Class::Memory => unreachable!(),
        })
        .collect()
}

/// Whether a value of this record travels in memory rather than in
/// registers.
pub fn is_memory(classes: &[AbiClass]) -> bool {
    classes.contains(&AbiClass::Memory)
}

fn classify_fields(types: &Types, fields: &[FieldDescriptor], base: u64, eightbytes: &mut [Class]) {
    for field in fields {
        let offset = base + field.offset;
        match &field.ty {
            Ok(ty) => classify_type(types, ty, offset, eightbytes),
            Err(_) => fill(eightbytes, offset, field.size, Class::Integer),
        }
    }
}

fn classify_type(types: &Types, ty: &TypeDescriptor, offset: u64, eightbytes: &mut [Class]) {
    if ty.align > 1 && offset % ty.align != 0 {
        fill(eightbytes, offset, ty.size.max(1), Class::Memory);
        return;
    }
    match &ty.kind {
        TypeKind::Primitive(Atom::Void) => {}
        TypeKind::Primitive(atom) if atom.is_float() => fill(eightbytes, offset, ty.size, Class::Sse),
        TypeKind::Primitive(_)
        | TypeKind::Pointer { .. }
        | TypeKind::Reference { .. }
        | TypeKind::FunctionPointer { .. }
        | TypeKind::Enum(_) => fill(eightbytes, offset, ty.size, Class::Integer),
        TypeKind::Record(id) | TypeKind::TemplateInstantiation { id, .. } => {
            match types.record(*id) {
                Ok(nested) if !nested.fields.is_empty() => {
                    classify_fields(types, &nested.fields, offset, eightbytes);
                }
                _ => fill(eightbytes, offset, ty.size, Class::Integer),
            }
        }
        TypeKind::Tuple(_) | TypeKind::Bridged(_) => fill(eightbytes, offset, 1, Class::Memory),
    }
}

fn fill(eightbytes: &mut [Class], offset: u64, size: u64, class: Class) {
    if size == 0 {
        return;
    }
    let first = (offset / 8) as usize;
    let last = ((offset + size - 1) / 8) as usize;
    for slot in eightbytes.iter_mut().take(last + 1).skip(first) {
        *slot = (*slot).max(class);
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::{AbiClass, Ir, ItemId, Item, Types};
    use serde_json::json;

    fn classes(record: serde_json::Value) -> Vec<AbiClass> {
        let ir: Ir = serde_json::from_value(json!({"lang": "cxx", "items": [record]})).unwrap();
        let types = Types::collect(&ir).unwrap();
        let desc = types.record(ItemId(1)).unwrap();
        let Some(Item::Record(record)) = types.get(ItemId(1)) else {
            unreachable!();
        };
        super::classify(&types, record, &desc)
    }

    fn prim(name: &str) -> serde_json::Value {
        json!({"kind": "primitive", "name": name})
    }

    #[test]
    fn test_mixed_eightbytes() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "S", "size": 16, "align": 8,
            "fields": [
                {"name": "x", "type": prim("double"), "offset": 0},
                {"name": "n", "type": prim("int"), "offset": 8},
                {"name": "f", "type": prim("float"), "offset": 12},
            ],
        }));
        assert_eq!(vec![AbiClass::Sse, AbiClass::Integer], classes);
    }

    #[test]
    fn test_floats_are_sse() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "Vec3", "size": 12, "align": 4,
            "fields": [
                {"name": "x", "type": prim("float"), "offset": 0},
                {"name": "y", "type": prim("float"), "offset": 4},
                {"name": "z", "type": prim("float"), "offset": 8},
            ],
        }));
        assert_eq!(vec![AbiClass::Sse, AbiClass::Sse], classes);
    }

    #[test]
    fn test_aligned_int_is_integer() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "Count", "size": 4, "align": 4,
            "fields": [{"name": "value", "type": prim("int"), "offset": 0}],
        }));
        assert_eq!(vec![AbiClass::Integer], classes);
    }

    #[test]
    fn test_misaligned_int_is_memory() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "Packed", "size": 5, "align": 1, "packed": 1,
            "fields": [
                {"name": "pad", "type": prim("char"), "offset": 0},
                {"name": "value", "type": prim("int"), "offset": 1},
            ],
        }));
        assert_eq!(vec![AbiClass::Memory], classes);
    }

    #[test]
    fn test_large_is_memory() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "S", "size": 24, "align": 8,
            "fields": [
                {"name": "a", "type": prim("long"), "offset": 0},
                {"name": "b", "type": prim("long"), "offset": 8},
                {"name": "c", "type": prim("long"), "offset": 16},
            ],
        }));
        assert_eq!(vec![AbiClass::Memory], classes);
    }

    #[test]
    fn test_nontrivial_is_memory() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "S", "size": 4, "align": 4,
            "fields": [{"name": "a", "type": prim("int"), "offset": 0}],
            "special_members": {"copy_ctor": "nontrivial_user_defined"},
        }));
        assert_eq!(vec![AbiClass::Memory], classes);
    }

    #[test]
    fn test_union_merges() {
        let classes = classes(json!({
            "kind": "record", "id": 1, "name": "U", "size": 8, "align": 8, "is_union": true,
            "fields": [
                {"name": "d", "type": prim("double"), "offset": 0},
                {"name": "i", "type": prim("long"), "offset": 0},
            ],
        }));
        assert_eq!(vec![AbiClass::Integer], classes);
    }

    #[test]
    fn test_mismatch_rejects_record() {
        let ir: Ir = serde_json::from_value(json!({"lang": "cxx", "items": [{
            "kind": "record", "id": 1, "name": "S", "size": 8, "align": 8,
            "fields": [{"name": "d", "type": prim("double"), "offset": 0}],
            "abi_class": ["integer"],
        }]}))
        .unwrap();
        let types = Types::collect(&ir).unwrap();
        let errors = types.record(ItemId(1)).unwrap_err();
        assert_eq!(
            vec!["register classification disagrees with the compiler: computed [Sse], compiler chose [Integer]".to_owned()],
            errors,
        );
    }
}
