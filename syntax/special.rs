use crate::syntax::classify::record_triviality;
use crate::syntax::{Lang, Record, SpecialMember};

/// How one special member of a record is provided on the other side.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SpecialState {
    /// The operation has no counterpart to provide.
    NotConsidered,
    /// Bytewise: no code runs in the source language.
    Trivial,
    /// Calls into the source language through a thunk.
    Thunked,
    /// Compiler-provided in the source language but not trivial, so it still
    /// needs a thunk.
    DefaultedButNonTrivial,
    Deleted,
}

impl SpecialState {
    pub fn is_available(self) -> bool {
        !matches!(self, SpecialState::NotConsidered | SpecialState::Deleted)
    }

    /// Whether calling it requires a thunk.
    pub fn needs_thunk(self) -> bool {
        matches!(self, SpecialState::Thunked | SpecialState::DefaultedButNonTrivial)
    }
}

/// Special members of one record, as seen from the target language. For
/// C++ records the names are Rust's (`Default`, `Clone`, `Drop`); for Rust
/// records they name the C++ special member functions that get defined.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SpecialMemberPlan {
    pub default: SpecialState,
    pub clone: SpecialState,
    pub clone_from: SpecialState,
    pub move_construct: SpecialState,
    pub move_assign: SpecialState,
    pub drop: SpecialState,
    /// Emit `#[derive(Clone, Copy)]` instead of a `Clone` impl.
    pub derive_copy: bool,
}

pub fn plan(lang: Lang, record: &Record) -> SpecialMemberPlan {
    match lang {
        Lang::Cxx => plan_cxx(record),
        Lang::Rust => plan_rust(record),
    }
}

fn plan_cxx(record: &Record) -> SpecialMemberPlan {
    let members = &record.special_members;
    let triviality = record_triviality(Lang::Cxx, record);
    let from_cxx = |member: SpecialMember| match member {
        SpecialMember::Trivial => SpecialState::Trivial,
        SpecialMember::NontrivialMembers => SpecialState::DefaultedButNonTrivial,
        SpecialMember::NontrivialUserDefined => SpecialState::Thunked,
        SpecialMember::Unavailable => SpecialState::Deleted,
    };

    SpecialMemberPlan {
        default: from_cxx(members.default_ctor),
        clone: from_cxx(members.copy_ctor),
        clone_from: from_cxx(members.copy_assign),
        // A Rust move is a memcpy, so only trivially relocatable records can
        // be moved at all.
        move_construct: if triviality.movable {
            SpecialState::Trivial
        } else {
            SpecialState::Deleted
        },
        move_assign: SpecialState::NotConsidered,
        drop: match members.destructor {
            SpecialMember::Trivial => SpecialState::Trivial,
            SpecialMember::NontrivialMembers | SpecialMember::NontrivialUserDefined => {
                SpecialState::Thunked
            }
            SpecialMember::Unavailable => SpecialState::Deleted,
        },
        derive_copy: triviality.copyable,
    }
}

fn plan_rust(record: &Record) -> SpecialMemberPlan {
    let traits = &record.rust_traits;
    let clone = if traits.copy {
        SpecialState::Trivial
    } else if traits.clone {
        SpecialState::Thunked
    } else {
        SpecialState::Deleted
    };
    // C++ leaves a moved-from object behind and destroys it later. A Rust
    // value can only be moved out of if something valid can be put back.
    let moving = if traits.copy {
        SpecialState::Trivial
    } else if traits.default {
        SpecialState::Thunked
    } else {
        SpecialState::Deleted
    };

    SpecialMemberPlan {
        default: if traits.default {
            SpecialState::Thunked
        } else {
            SpecialState::Deleted
        },
        clone,
        clone_from: clone,
        move_construct: moving,
        move_assign: moving,
        drop: if traits.drop {
            SpecialState::Thunked
        } else {
            SpecialState::Trivial
        },
        derive_copy: traits.copy,
    }
}

#[cfg(test)]
mod tests {
    use super::{plan, SpecialState};
    use crate::syntax::{Ir, Item, Lang};
    use serde_json::json;

    fn record(lang: &str, extra: serde_json::Value) -> Ir {
        let mut record = json!({"kind": "record", "id": 1, "name": "S", "size": 8, "align": 8});
        for (key, value) in extra.as_object().unwrap() {
            record[key] = value.clone();
        }
        serde_json::from_value(json!({"lang": lang, "items": [record]})).unwrap()
    }

    fn only_record(ir: &Ir) -> &crate::syntax::Record {
        match &ir.items[0] {
            Item::Record(record) => record,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cxx_user_defined_copy() {
        let ir = record("cxx", json!({"special_members": {
            "copy_ctor": "nontrivial_user_defined",
            "copy_assign": "nontrivial_members",
            "move_ctor": "nontrivial_user_defined",
            "destructor": "nontrivial_user_defined",
        }}));
        let plan = plan(Lang::Cxx, only_record(&ir));
        assert_eq!(SpecialState::Trivial, plan.default);
        assert_eq!(SpecialState::Thunked, plan.clone);
        assert_eq!(SpecialState::DefaultedButNonTrivial, plan.clone_from);
        assert_eq!(SpecialState::Deleted, plan.move_construct);
        assert_eq!(SpecialState::Thunked, plan.drop);
        assert!(!plan.derive_copy);
    }

    #[test]
    fn test_cxx_trivial_abi_moves() {
        let ir = record("cxx", json!({
            "is_trivial_abi": true,
            "special_members": {"destructor": "nontrivial_user_defined"},
        }));
        let plan = plan(Lang::Cxx, only_record(&ir));
        assert_eq!(SpecialState::Trivial, plan.move_construct);
        assert_eq!(SpecialState::NotConsidered, plan.move_assign);
    }

    #[test]
    fn test_rust_move_requires_default() {
        let ir = record("rust", json!({"rust_traits": {"clone": true, "drop": true}}));
        let plan = plan(Lang::Rust, only_record(&ir));
        assert_eq!(SpecialState::Deleted, plan.default);
        assert_eq!(SpecialState::Thunked, plan.clone);
        assert_eq!(SpecialState::Deleted, plan.move_construct);
        assert_eq!(SpecialState::Thunked, plan.drop);

        let ir = record("rust", json!({"rust_traits": {"default": true}}));
        let plan = super::plan(Lang::Rust, only_record(&ir));
        assert_eq!(SpecialState::Thunked, plan.move_construct);
        assert_eq!(SpecialState::Thunked, plan.move_assign);
        assert_eq!(SpecialState::Deleted, plan.clone_from);

        let ir = record("rust", json!({"rust_traits": {"copy": true, "clone": true}}));
        let plan = super::plan(Lang::Rust, only_record(&ir));
        assert_eq!(SpecialState::Trivial, plan.move_construct);
        assert!(plan.derive_copy);
    }
}
