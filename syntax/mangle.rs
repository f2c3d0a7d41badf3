// Mangled symbol arrangements:
//
//   (a) one-off function, free or static member:
//       __crubit_thunk_ {namespace} __ {record?} __ {name} __ {param types...}
//
//   (b) method with a receiver:
//       __crubit_thunk_ {namespace} __ {record} __ {name} __ {receiver} __ {param types...}
//       where {receiver} is {this}, {const} or {rvalue}
//
//   (c) special member of a record, or its `delete` thunk:
//       __crubit_thunk_ {namespace} __ {record} __ {member}
//       where {member} is {default}, {clone}, {clone_from}, {move},
//       {move_assign}, {drop} or {delete}
//
// Braces cannot occur in a C++ or Rust identifier, and a type spelling never
// starts with one, so no arrangement can produce the same segment list as
// another. The segment escape and the `__` separator keep the final symbol
// injective, see symbol.rs.

use crate::syntax::symbol::{self, Segment, Symbol};
use crate::syntax::{Decl, Func, Receiver};

pub const THUNK_PREFIX: &str = "__crubit_thunk_";

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SpecialThunk {
    Default,
    Clone,
    CloneFrom,
    Move,
    MoveAssign,
    Drop,
    Delete,
}

impl SpecialThunk {
    fn segment(self) -> &'static str {
        match self {
            SpecialThunk::Default => "{default}",
            SpecialThunk::Clone => "{clone}",
            SpecialThunk::CloneFrom => "{clone_from}",
            SpecialThunk::Move => "{move}",
            SpecialThunk::MoveAssign => "{move_assign}",
            SpecialThunk::Drop => "{drop}",
            SpecialThunk::Delete => "{delete}",
        }
    }
}

/// `param_types` are canonical type spellings, which distinguish overloads.
pub fn thunk(func: &Func, record: Option<&Decl>, param_types: &[String]) -> Symbol {
    let receiver = func.receiver.as_ref().map(receiver_segment);
    let mut segments: Vec<&dyn Segment> = vec![&func.decl.namespace];
    if let Some(record) = record {
        segments.push(&record.name);
    }
    segments.push(&func.decl.name);
    if let Some(receiver) = &receiver {
        segments.push(receiver);
    }
    for ty in param_types {
        segments.push(ty);
    }
    symbol::join(THUNK_PREFIX, &segments)
}

pub fn special(record: &Decl, member: SpecialThunk) -> Symbol {
    symbol::join(
        THUNK_PREFIX,
        &[&record.namespace, &record.name, &member.segment()],
    )
}

fn receiver_segment(receiver: &Receiver) -> &'static str {
    if receiver.rvalue {
        "{rvalue}"
    } else if receiver.is_const {
        "{const}"
    } else {
        "{this}"
    }
}
