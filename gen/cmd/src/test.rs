use crate::output::Output;

#[test]
fn test_help() {
    let mut app = super::app();
    let mut out = Vec::new();
    app.write_long_help(&mut out).unwrap();
    let help = String::from_utf8(out).unwrap();
    assert!(help.starts_with("crubit "));
    assert!(help.contains("Emit \"crubit/support.h\" to stdout"));
    for flag in [
        "--cc-impl-out <file>",
        "--cc-out <file>",
        "--header",
        "-i, --include <include>",
        "--no-doc-comments",
        "--no-layout-assertions",
        "--rs-impl-out <file>",
        "--rs-out <file>",
        "--runtime-crate <path>",
        "--support-path <dir>",
    ] {
        assert!(help.contains(flag), "missing {} in:\n{}", flag, help);
    }
}

#[test]
fn test_cli() {
    let app = super::app();
    app.debug_assert();
}

#[test]
fn test_outputs() {
    let matches = super::app()
        .try_get_matches_from([
            "crubit",
            "ir.json",
            "--rs-out",
            "-",
            "--rs-impl-out",
            "out/lib_impl.cc",
            "-i",
            "base.h",
            "--no-layout-assertions",
        ])
        .unwrap();
    let opt = super::from_matches(&matches);
    assert_eq!(Some("ir.json"), opt.input.as_ref().and_then(|path| path.to_str()));
    assert!(matches!(opt.rs_out, Some(Output::Stdout)));
    assert!(matches!(&opt.rs_impl_out, Some(Output::File(path)) if path.ends_with("lib_impl.cc")));
    assert!(opt.cc_out.is_none());
    assert_eq!(vec!["base.h".to_owned()], opt.include);
    assert!(!opt.layout_assertions);
    assert!(opt.doc_comments);
    assert!(!opt.header);
}

#[test]
fn test_input_required_without_header() {
    assert!(super::app().try_get_matches_from(["crubit"]).is_err());
    assert!(super::app().try_get_matches_from(["crubit", "--header"]).is_ok());
}
