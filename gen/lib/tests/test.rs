use crubit_gen::{ErrorKind, GeneratedCode, Opt};
use serde_json::{json, Value};

fn generate(ir: Value) -> GeneratedCode {
    crubit_gen::generate_from_value(ir, &Opt::default()).unwrap()
}

fn int() -> Value {
    json!({"kind": "primitive", "name": "int"})
}

#[test]
fn test_partial_failure() {
    let code = generate(json!({"lang": "cxx", "target": "//lib", "items": [
        {"kind": "unsupported", "id": 1, "name": "Variadic", "message": "variadic functions are not supported"},
        {"kind": "func", "id": 2, "name": "Fine", "mangled_name": "_Z4Finev"},
    ]}));
    assert_eq!(1, code.errors.len());
    assert_eq!("Variadic", code.errors[0].item);
    assert!(code.rs_api.contains("// Error while generating bindings for item 'Variadic':\n"));
    assert!(code.rs_api.contains("pub fn Fine ()"));
}

#[test]
fn test_malformed_json() {
    let err = crubit_gen::generate_bindings("{\"lang\": \"cxx\",\n  \"items\": [}", &Opt::default()).unwrap_err();
    assert_eq!(ErrorKind::Json, err.kind());
    assert_eq!(Some(2), err.position().map(|(line, _)| line));
}

#[test]
fn test_empty_input() {
    let err = crubit_gen::generate_bindings("  \n", &Opt::default()).unwrap_err();
    assert_eq!(ErrorKind::Empty, err.kind());
    assert_eq!(None, err.position());
}

#[test]
fn test_fatal_errors() {
    let ir = json!({"lang": "cxx", "items": [
        {"kind": "func", "id": 1, "name": "f", "ret": {"kind": "named", "id": 7}},
    ]});
    let err = crubit_gen::generate_from_value(ir, &Opt::default()).unwrap_err();
    assert_eq!(ErrorKind::InvalidIr, err.kind());

    let mut opt = Opt::default();
    opt.runtime_crate = "not a path".to_owned();
    let err = crubit_gen::generate_from_value(json!({"lang": "cxx", "items": []}), &opt).unwrap_err();
    assert_eq!(ErrorKind::Options, err.kind());
}

#[test]
fn test_abi_mismatch_rejects_record() {
    let code = generate(json!({"lang": "cxx", "items": [
        {"kind": "record", "id": 1, "name": "S", "size": 8, "align": 8,
         "fields": [{"name": "d", "type": {"kind": "primitive", "name": "double"}, "offset": 0}],
         "abi_class": ["integer"]},
    ]}));
    assert_eq!(1, code.errors.len());
    assert!(code.errors[0].messages[0].starts_with("register classification disagrees with the compiler"));
    assert!(!code.rs_api.contains("pub struct S"));
}

#[test]
fn test_bridged_optional_return() {
    let code = generate(json!({"lang": "cxx", "items": [
        {"kind": "func", "id": 1, "name": "Find", "namespace": ["db"],
         "params": [{"name": "key", "type": int()}],
         "ret": {"kind": "instantiation", "template": "std::optional", "args": [int()]}},
    ]}));
    assert!(code.errors.is_empty());
    assert!(code.rs_api.contains("-> :: core :: option :: Option < :: core :: ffi :: c_int >"));
    assert!(code.rs_api_impl.contains("::crubit::OptionalAbi<::crubit::TransmuteAbi<int>>"));
}

#[test]
fn test_thunk_symbols_are_unique() {
    let code = generate(json!({"lang": "cxx", "items": [
        {"kind": "func", "id": 1, "name": "Reset", "namespace": ["a"], "is_inline": true},
        {"kind": "func", "id": 2, "name": "Reset", "namespace": ["b"], "is_inline": true},
    ]}));
    assert!(code.errors.is_empty());
    let symbols: Vec<&str> = code
        .rs_api_impl
        .lines()
        .filter_map(|line| line.strip_prefix("extern \"C\" void "))
        .filter_map(|rest| rest.split('(').next())
        .collect();
    assert_eq!(2, symbols.len());
    assert_ne!(symbols[0], symbols[1]);
}

#[test]
fn test_callbacks_with_different_calling_conventions() {
    let callback = |cc: &str| {
        json!({"kind": "function_pointer", "cc": cc, "params": [int()],
               "ret": {"kind": "primitive", "name": "void"}})
    };
    let code = generate(json!({"lang": "cxx", "items": [
        {"kind": "func", "id": 1, "name": "a", "is_inline": true,
         "params": [{"name": "f", "type": callback("c")}]},
        {"kind": "func", "id": 2, "name": "b", "is_inline": true,
         "params": [{"name": "f", "type": callback("swiftcall")}]},
    ]}));
    assert_eq!(1, code.errors.len());
    assert_eq!("b", code.errors[0].item);
    assert!(code.errors[0].messages[0].contains("calling convention has no equivalent in the other language: Swiftcall"));
    assert!(code.rs_api.contains("pub fn a"));
    assert!(!code.rs_api.contains("pub fn b"));
}

#[test]
fn test_annotations() {
    let code = generate(json!({"lang": "cxx", "items": [
        {"kind": "func", "id": 1, "name": "old_sum", "mangled_name": "_Z7old_sumv",
         "annotations": [{"key": "deprecated", "value": "use total"}, {"key": "rust_name", "value": "sum"}]},
        {"kind": "func", "id": 2, "name": "odd", "mangled_name": "_Z3oddv",
         "annotations": [{"key": "no_such_thing"}]},
    ]}));
    assert!(code.rs_api.contains("# [deprecated = \"use total\"]"));
    assert!(code.rs_api.contains("pub fn sum ()"));
    assert_eq!(1, code.errors.len());
    assert_eq!("odd", code.errors[0].item);
    assert!(code.errors[0].messages[0].starts_with("unknown annotation: "));
}

#[test]
fn test_only_impl() {
    let mut opt = Opt::default();
    opt.gen_api = false;
    let ir = json!({"lang": "cxx", "items": [
        {"kind": "func", "id": 1, "name": "Tick", "is_inline": true},
    ]});
    let code = crubit_gen::generate_from_value(ir, &opt).unwrap();
    assert!(code.rs_api.is_empty());
    assert!(code.rs_api_impl.contains("::Tick();"));
}

#[test]
fn test_rust_crate_to_header() {
    let code = generate(json!({"lang": "rust", "target": "geo", "items": [
        {"kind": "record", "id": 1, "name": "Point", "size": 8, "align": 4,
         "rust_traits": {"copy": true, "clone": true},
         "fields": [
            {"name": "x", "type": {"kind": "primitive", "name": "i32"}, "offset": 0},
            {"name": "y", "type": {"kind": "primitive", "name": "i32"}, "offset": 4},
         ]},
        {"kind": "func", "id": 2, "name": "origin", "ret": {"kind": "named", "id": 1}},
    ]}));
    assert!(code.errors.is_empty());
    assert!(code.rs_api.is_empty());
    assert!(code.cc_api.contains("#pragma once\n"));
    assert!(code.cc_api.contains("#include \"crubit/support.h\"\n"));
    assert!(code.cc_api.contains("  std::int32_t x;\n  std::int32_t y;\n"));
    assert!(code.cc_api.contains("  Point(const Point&) = default;\n"));
    assert!(code.cc_api.contains("inline ::geo::Point origin() {\n"));
    assert!(code.cc_api_impl.contains("# [no_mangle]"));
    assert!(code.cc_api_impl.contains(":: geo :: origin ()"));
}

#[test]
fn test_runtime_header() {
    assert!(crubit_gen::HEADER.contains("namespace crubit {"));
}
