//! The Crubit binding generator, as a library.
//!
//! Takes the JSON IR that a compiler frontend dumps for one target (either a
//! C++ library or a Rust crate) and produces bindings for the other
//! language. Declarations that cannot be bound are reported in
//! [`GeneratedCode::errors`] and leave an explanatory comment behind, while
//! the rest of the target still gets bindings.
//!
//! ```
//! # use crubit_gen::Opt;
//! #
//! let ir = r#"{"lang": "cxx", "target": "//math", "items": [
//!     {"kind": "func", "id": 1, "name": "Abs", "mangled_name": "_Z3Absi",
//!      "params": [{"name": "x", "type": {"kind": "primitive", "name": "int"}}],
//!      "ret": {"kind": "primitive", "name": "int"}}
//! ]}"#;
//! let code = crubit_gen::generate_bindings(ir, &Opt::default()).unwrap();
//! assert!(code.rs_api.contains("pub fn Abs"));
//! assert!(code.errors.is_empty());
//! ```

#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::enum_glob_use,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::new_without_default,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

mod error;
#[path = "../../src/mod.rs"]
mod gen;
#[path = "../../../syntax/mod.rs"]
mod syntax;

pub use crate::error::{Error, ErrorKind};
pub use crate::gen::include::HEADER;
pub use crate::gen::{GeneratedCode, Opt};
pub use crate::syntax::report::ItemError;
pub use crate::syntax::SourceLoc;

/// Generates bindings from the JSON text of an IR.
pub fn generate_bindings(json: &str, opt: &Opt) -> Result<GeneratedCode, Error> {
    gen::generate_from_str(json, opt).map_err(Error::from)
}

/// Generates bindings from an IR that is already parsed as JSON.
pub fn generate_from_value(json: serde_json::Value, opt: &Opt) -> Result<GeneratedCode, Error> {
    let ir = serde_json::from_value(json).map_err(gen::Error::from)?;
    gen::generate(&ir, opt).map_err(Error::from)
}
