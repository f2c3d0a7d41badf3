// Functionality that is shared between the crubit-gen library entry point and
// the crubit CLI command.

#![allow(
    clippy::enum_glob_use,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
)]

pub mod error;
mod expand;
mod expand_fn;
mod expand_thunk;
mod expand_type;
pub mod include;
mod names;
mod namespace_organizer;
pub(super) mod out;
mod write;
mod write_fn;
mod write_thunk;
mod write_type;

use self::error::{format_err, report_item_errors, Result};
use crate::syntax::report::{Errors, ItemError};
use crate::syntax::{Decl, Ir, Lang, Types};
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

pub use self::error::Error;

/// Options for binding generation.
///
/// We expect options to be added over time, so this is a non-exhaustive
/// struct. To instantiate one you need to create a default value and mutate
/// those fields that you want to modify.
///
/// ```
/// # use crubit_gen::Opt;
/// #
/// let mut opt = Opt::default();
/// opt.runtime_crate = "::my_runtime".to_owned();
/// opt.emit_layout_assertions = false;
/// ```
pub struct Opt {
    /// Generate the artifact callers use: the Rust module `rs_api` for C++
    /// input, the C++ header `cc_api` for Rust input.
    pub gen_api: bool,
    /// Generate the artifact holding thunk definitions: `rs_api_impl` (C++)
    /// for C++ input, `cc_api_impl` (Rust) for Rust input.
    pub gen_impl: bool,
    /// Directory under which the runtime's `support.h` is included, as in
    /// `#include "crubit/support.h"`.
    pub crubit_support_path: String,
    /// Path of the runtime crate in generated Rust.
    pub runtime_crate: String,
    /// Additional headers to #include in generated C++. The generator does
    /// not parse or even require the given paths to exist.
    pub include: Vec<String>,
    /// Whether both sides check size, alignment and field offsets at
    /// compile time.
    pub emit_layout_assertions: bool,
    /// Carry documentation comments over to the generated bindings.
    pub doc_comments: bool,
}

impl Default for Opt {
    fn default() -> Self {
        Opt {
            gen_api: true,
            gen_impl: true,
            crubit_support_path: "crubit".to_owned(),
            runtime_crate: "::crubit".to_owned(),
            include: Vec::new(),
            emit_layout_assertions: true,
            doc_comments: true,
        }
    }
}

/// Results of code generation. Artifacts that don't apply to the source
/// language, or that were turned off in [`Opt`], are empty.
#[derive(Default, Debug)]
pub struct GeneratedCode {
    /// Rust bindings for C++ declarations.
    pub rs_api: String,
    /// C++ thunks backing `rs_api`.
    pub rs_api_impl: String,
    /// C++ header for Rust declarations.
    pub cc_api: String,
    /// Rust thunks backing `cc_api`.
    pub cc_api_impl: String,
    /// Declarations that got no bindings, each with its reasons. The same
    /// reasons appear as comments in the generated code.
    pub errors: Vec<ItemError>,
}

/// State shared by the emitters during one run.
pub(crate) struct Context<'a> {
    pub types: &'a Types<'a>,
    pub opt: &'a Opt,
    /// `opt.runtime_crate` as a path.
    pub runtime: TokenStream,
}

impl<'a> Context<'a> {
    pub fn new(types: &'a Types<'a>, opt: &'a Opt) -> Result<Self> {
        let runtime = match syn::parse_str::<syn::Path>(&opt.runtime_crate) {
            Ok(path) => path.into_token_stream(),
            Err(_) => return Err(Error::RuntimeCrate(opt.runtime_crate.clone())),
        };
        Ok(Context {
            types,
            opt,
            runtime,
        })
    }

    /// `#include` line spelling of the runtime header.
    pub fn support_header(&self) -> String {
        let dir = self.opt.crubit_support_path.trim_end_matches('/');
        if dir.is_empty() {
            "support.h".to_owned()
        } else {
            format!("{}/support.h", dir)
        }
    }
}

pub fn generate_from_path(path: &Path, opt: &Opt) -> GeneratedCode {
    let source = match read_to_string(path) {
        Ok(source) => source,
        Err(err) => format_err(path, "", err),
    };
    match generate_from_str(&source, opt) {
        Ok(out) => {
            report_item_errors(&out.errors);
            out
        }
        Err(err) => format_err(path, &source, err),
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    let bytes = if path == Path::new("-") {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        bytes
    } else {
        fs::read(path)?
    };
    match String::from_utf8(bytes) {
        Ok(string) => Ok(string),
        Err(err) => Err(Error::Utf8(path.to_owned(), err.utf8_error())),
    }
}

pub fn generate_from_str(json: &str, opt: &Opt) -> Result<GeneratedCode> {
    if json.trim().is_empty() {
        return Err(Error::Empty);
    }
    let ir: Ir = serde_json::from_str(json)?;
    generate(&ir, opt)
}

pub fn generate(ir: &Ir, opt: &Opt) -> Result<GeneratedCode> {
    let types = Types::collect(ir)?;
    let cx = Context::new(&types, opt)?;
    log::debug!(
        "generating bindings for {} {} items of '{}'",
        ir.items.len(),
        ir.lang,
        ir.target,
    );

    let mut errors = Errors::new();
    let mut out = GeneratedCode::default();
    match ir.lang {
        Lang::Cxx => {
            let (api, implementation) = expand::gen(&cx, &mut errors);
            if opt.gen_api {
                log::info!("rs_api: {} bytes", api.len());
                out.rs_api = api;
            }
            if opt.gen_impl {
                log::info!("rs_api_impl: {} bytes", implementation.len());
                out.rs_api_impl = implementation;
            }
        }
        Lang::Rust => {
            let (api, implementation) = write::gen(&cx, &mut errors);
            if opt.gen_api {
                log::info!("cc_api: {} bytes", api.len());
                out.cc_api = api;
            }
            if opt.gen_impl {
                log::info!("cc_api_impl: {} bytes", implementation.len());
                out.cc_api_impl = implementation;
            }
        }
    }
    out.errors = errors.into_vec();
    Ok(out)
}

/// Records that `decl` got no bindings, and returns the comment block that
/// takes its place in the generated code.
pub(crate) fn skip(errors: &mut Errors, decl: &Decl, messages: Vec<String>) -> String {
    let error = errors.error(decl, messages);
    log::warn!("no bindings for '{}': {}", error.item, error.messages.join("; "));
    error_comment(error)
}

pub(crate) fn error_comment(error: &ItemError) -> String {
    let mut comment = format!("// Error while generating bindings for item '{}':\n", error.item);
    for message in &error.messages {
        for line in message.lines() {
            comment.push_str("// ");
            comment.push_str(line);
            comment.push('\n');
        }
    }
    comment
}

/// Documentation lines for a generated item: the declaration's own doc
/// comment, then where it came from.
pub(crate) fn doc_lines(cx: &Context, decl: &Decl) -> Vec<String> {
    let mut lines = Vec::new();
    if !cx.opt.doc_comments {
        return lines;
    }
    if let Some(doc) = &decl.doc {
        lines.extend(doc.lines().map(str::to_owned));
    }
    if let Some(source_loc) = &decl.source_loc {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("Generated from: {}", source_loc));
    }
    lines
}

pub(crate) fn doc_attrs(cx: &Context, decl: &Decl) -> TokenStream {
    let lines = doc_lines(cx, decl).into_iter().map(|line| {
        if line.is_empty() {
            line
        } else {
            format!(" {}", line)
        }
    });
    quote!(#(#[doc = #lines])*)
}

/// `#[deprecated]`, with the note if there is one.
pub(crate) fn deprecated_attr(deprecated: Option<&String>) -> Option<TokenStream> {
    deprecated.map(|note| {
        if note.is_empty() {
            quote!(#[deprecated])
        } else {
            quote!(#[deprecated = #note])
        }
    })
}

/// `[[deprecated]]` with the note escaped as a C++ string literal.
pub(crate) fn cxx_deprecated_attr(deprecated: Option<&String>) -> Option<String> {
    deprecated.map(|note| {
        if note.is_empty() {
            "[[deprecated]] ".to_owned()
        } else {
            format!("[[deprecated(\"{}\")]] ", cxx_escape(note))
        }
    })
}

/// Contents of a C++ string literal spelling `text`. Control characters
/// use three-digit octal escapes, which unlike `\x` stop at a fixed length.
fn cxx_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            ch if ch.is_ascii_control() => escaped.push_str(&format!("\\{:03o}", ch as u32)),
            ch => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::cxx_deprecated_attr;

    #[test]
    fn test_cxx_deprecated_attr() {
        assert_eq!(None, cxx_deprecated_attr(None));
        assert_eq!(Some("[[deprecated]] ".to_owned()), cxx_deprecated_attr(Some(&String::new())));

        let note = "use \"Größe\"\tinstead\\\u{1}7".to_owned();
        assert_eq!(
            Some("[[deprecated(\"use \\\"Größe\\\"\\tinstead\\\\\\0017\")]] ".to_owned()),
            cxx_deprecated_attr(Some(&note)),
        );
    }
}
