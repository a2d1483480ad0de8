use minidyn::exception::ExcKind;
use minidyn::run_source;

#[test]
fn unterminated_string_is_a_lex_error() {
    let err = run_source("let x = \"unterminated", "test.mdl").unwrap_err();
    assert_eq!(err.kind, ExcKind::LexError);
}

#[test]
fn const_without_initializer_is_a_parse_error() {
    let err = run_source("const x;", "test.mdl").unwrap_err();
    assert_eq!(err.kind, ExcKind::ParseError);
}

#[test]
fn destructuring_declaration_without_initializer_is_a_parse_error() {
    let err = run_source("let [a, b];", "test.mdl").unwrap_err();
    assert_eq!(err.kind, ExcKind::ParseError);
}

#[test]
fn unknown_identifier_is_a_runtime_error() {
    let err = run_source("totally_undefined_name", "test.mdl").unwrap_err();
    assert_eq!(err.kind, ExcKind::RuntimeError);
}

#[test]
fn thrown_value_is_preserved_on_an_uncaught_throw() {
    let err = run_source("throw \"boom\";", "test.mdl").unwrap_err();
    assert_eq!(err.kind, ExcKind::UserThrow);
    assert_eq!(err.thrown.unwrap().stringify(), "boom");
}

#[test]
fn error_display_includes_location() {
    let err = run_source("1 +", "test.mdl").unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("test.mdl"), "expected file name in: {rendered}");
}
