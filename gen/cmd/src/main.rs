#![allow(
    clippy::cognitive_complexity,
    clippy::enum_glob_use,
    clippy::inherent_to_string,
    clippy::items_after_statements,
    clippy::large_enum_variant,
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
    clippy::toplevel_ref_arg,
    clippy::uninlined_format_args
)]
#![allow(dead_code)]

mod app;
#[path = "../../src/mod.rs"]
mod gen;
mod output;
#[path = "../../../syntax/mod.rs"]
mod syntax;

use crate::gen::include::HEADER;
use crate::output::Output;
use anyhow::{Context as _, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Debug)]
struct Opt {
    input: Option<PathBuf>,
    header: bool,
    include: Vec<String>,
    support_path: Option<String>,
    runtime_crate: Option<String>,
    layout_assertions: bool,
    doc_comments: bool,
    rs_out: Option<Output>,
    rs_impl_out: Option<Output>,
    cc_out: Option<Output>,
    cc_impl_out: Option<Output>,
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "crubit: {:?}", err);
        process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let opt = app::from_args();

    let Some(input) = &opt.input else {
        // Enforced by required_unless_present: only --header is left.
        return Output::Stdout.write(HEADER.as_bytes());
    };
    if opt.header {
        Output::Stdout.write(HEADER.as_bytes())?;
    }

    let mut gen = gen::Opt::default();
    gen.include = opt.include.clone();
    if let Some(support_path) = &opt.support_path {
        gen.crubit_support_path = support_path.clone();
    }
    if let Some(runtime_crate) = &opt.runtime_crate {
        gen.runtime_crate = runtime_crate.clone();
    }
    gen.emit_layout_assertions = opt.layout_assertions;
    gen.doc_comments = opt.doc_comments;

    let code = gen::generate_from_path(input, &gen);
    let artifacts = [
        (&opt.rs_out, &code.rs_api, "rs_api"),
        (&opt.rs_impl_out, &code.rs_api_impl, "rs_api_impl"),
        (&opt.cc_out, &code.cc_api, "cc_api"),
        (&opt.cc_impl_out, &code.cc_api_impl, "cc_api_impl"),
    ];

    let mut any_output = false;
    for (output, content, name) in artifacts {
        if let Some(output) = output {
            any_output = true;
            output
                .write(content.as_bytes())
                .with_context(|| format!("failed to write {} to {}", name, output))?;
        }
    }
    if !any_output {
        // Without any destination, the bindings callers use go to stdout.
        let api = if code.rs_api.is_empty() {
            &code.cc_api
        } else {
            &code.rs_api
        };
        Output::Stdout.write(api.as_bytes())?;
    }
    Ok(())
}
