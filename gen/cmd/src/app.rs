#[cfg(test)]
#[path = "test.rs"]
mod test;

use super::Opt;
use crate::output::Output;
use clap::builder::{ArgAction, ValueParser};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

const USAGE: &str = "\
crubit <ir>.json                     Emit the bindings callers use to stdout
    crubit <ir>.json --rs-out <file>     Choose where each artifact goes
    crubit --header                      Emit \"crubit/support.h\" to stdout\
";

const TEMPLATE: &str = "\
{bin} {version}
Crubit Authors

Usage:
    {usage}

Arguments:
{positionals}

Options:
{options}\
";

fn app() -> Command {
    let mut app = Command::new("crubit")
        .override_usage(USAGE)
        .help_template(TEMPLATE)
        .next_line_help(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(arg_input())
        .arg(arg_cc_impl_out())
        .arg(arg_cc_out())
        .arg(arg_header())
        .arg(arg_help())
        .arg(arg_include())
        .arg(arg_no_doc_comments())
        .arg(arg_no_layout_assertions())
        .arg(arg_rs_impl_out())
        .arg(arg_rs_out())
        .arg(arg_runtime_crate())
        .arg(arg_support_path());
    if let Some(version) = option_env!("CARGO_PKG_VERSION") {
        app = app.version(version).arg(arg_version());
    }
    app
}

const INPUT: &str = "input";
const CC_IMPL_OUT: &str = "cc-impl-out";
const CC_OUT: &str = "cc-out";
const HEADER: &str = "header";
const HELP: &str = "help";
const INCLUDE: &str = "include";
const NO_DOC_COMMENTS: &str = "no-doc-comments";
const NO_LAYOUT_ASSERTIONS: &str = "no-layout-assertions";
const RS_IMPL_OUT: &str = "rs-impl-out";
const RS_OUT: &str = "rs-out";
const RUNTIME_CRATE: &str = "runtime-crate";
const SUPPORT_PATH: &str = "support-path";
const VERSION: &str = "version";

pub(super) fn from_args() -> Opt {
    from_matches(&app().get_matches())
}

fn from_matches(matches: &ArgMatches) -> Opt {
    let output = |id: &str| matches.get_one::<PathBuf>(id).map(Output::new);

    Opt {
        input: matches.get_one::<PathBuf>(INPUT).cloned(),
        header: matches.get_flag(HEADER),
        include: matches
            .get_many::<String>(INCLUDE)
            .unwrap_or_default()
            .cloned()
            .collect(),
        support_path: matches.get_one::<String>(SUPPORT_PATH).cloned(),
        runtime_crate: matches.get_one::<String>(RUNTIME_CRATE).cloned(),
        layout_assertions: !matches.get_flag(NO_LAYOUT_ASSERTIONS),
        doc_comments: !matches.get_flag(NO_DOC_COMMENTS),
        rs_out: output(RS_OUT),
        rs_impl_out: output(RS_IMPL_OUT),
        cc_out: output(CC_OUT),
        cc_impl_out: output(CC_IMPL_OUT),
    }
}

fn arg_input() -> Arg {
    Arg::new(INPUT)
        .help("IR of one C++ library or Rust crate, as JSON. Use - for stdin.")
        .required_unless_present(HEADER)
        .value_parser(ValueParser::path_buf())
}

fn output_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .num_args(1)
        .value_name("file")
        .value_parser(ValueParser::path_buf())
        .help(help)
}

fn arg_rs_out() -> Arg {
    output_arg(RS_OUT, "Where to write Rust bindings for a C++ library.")
}

fn arg_rs_impl_out() -> Arg {
    output_arg(RS_IMPL_OUT, "Where to write the C++ thunks backing --rs-out.")
}

fn arg_cc_out() -> Arg {
    output_arg(CC_OUT, "Where to write the C++ header for a Rust crate.")
}

fn arg_cc_impl_out() -> Arg {
    output_arg(CC_IMPL_OUT, "Where to write the Rust thunks backing --cc-out.")
}

fn arg_header() -> Arg {
    const HELP: &str = "\
Emit the runtime header \"crubit/support.h\" to stdout, which every
generated C++ file includes.";
    Arg::new(HEADER)
        .long(HEADER)
        .action(ArgAction::SetTrue)
        .help(HELP)
}

fn arg_include() -> Arg {
    const HELP: &str = "\
Any additional headers to #include. The crubit tool does not
parse or even require the given paths to exist; they simply go
into the generated C++ code as #include lines.";
    Arg::new(INCLUDE)
        .long(INCLUDE)
        .short('i')
        .num_args(1)
        .action(ArgAction::Append)
        .value_parser(ValueParser::string())
        .help(HELP)
}

fn arg_support_path() -> Arg {
    Arg::new(SUPPORT_PATH)
        .long(SUPPORT_PATH)
        .num_args(1)
        .value_name("dir")
        .value_parser(ValueParser::string())
        .help("Directory support.h is included from. Default: crubit")
}

fn arg_runtime_crate() -> Arg {
    Arg::new(RUNTIME_CRATE)
        .long(RUNTIME_CRATE)
        .num_args(1)
        .value_name("path")
        .value_parser(ValueParser::string())
        .help("Path of the runtime crate in generated Rust. Default: ::crubit")
}

fn arg_no_layout_assertions() -> Arg {
    Arg::new(NO_LAYOUT_ASSERTIONS)
        .long(NO_LAYOUT_ASSERTIONS)
        .action(ArgAction::SetTrue)
        .help("Skip compile-time checks of size, alignment and field offsets.")
}

fn arg_no_doc_comments() -> Arg {
    Arg::new(NO_DOC_COMMENTS)
        .long(NO_DOC_COMMENTS)
        .action(ArgAction::SetTrue)
        .help("Leave documentation comments out of the generated code.")
}

fn arg_help() -> Arg {
    Arg::new(HELP)
        .long(HELP)
        .short('h')
        .action(ArgAction::Help)
        .help("Print help information.")
}

fn arg_version() -> Arg {
    Arg::new(VERSION)
        .long(VERSION)
        .short('V')
        .action(ArgAction::Version)
        .help("Print version information.")
}
