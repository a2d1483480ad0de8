use minidyn::run_source;

fn run(src: &str) -> String {
    run_source(src, "test.mdl").unwrap_or_else(|e| panic!("{e}")).stringify()
}

#[test]
fn string_builtins() {
    assert_eq!(run(r#"upper("abc")"#), "ABC");
    assert_eq!(run(r#"split("a,b,c", ",")"#), r#"["a", "b", "c"]"#);
    assert_eq!(run(r#"join(["a", "b"], "-")"#), "a-b");
    assert_eq!(run(r#"slice("hello", 1, 3)"#), "el");
    assert_eq!(run(r#"trim("  hi  ")"#), "hi");
    assert_eq!(run(r#"starts_with("hello", "he")"#), "true");
}

#[test]
fn array_builtins() {
    assert_eq!(run("length([1, 2, 3])"), "3");
    assert_eq!(run("filter([1, 2, 3, 4], x => x % 2 == 0)"), "[2, 4]");
    assert_eq!(run("reduce([1, 2, 3], (acc, x) => acc + x, 0)"), "6");
    assert_eq!(run("sort([3, 1, 2])"), "[1, 2, 3]");
    assert_eq!(run("reverse([1, 2, 3])"), "[3, 2, 1]");
    assert_eq!(run(r#"includes([1, 2, 3], 2)"#), "true");
}

#[test]
fn object_builtins() {
    assert_eq!(run(r#"keys({ a: 1, b: 2 })"#), r#"["a", "b"]"#);
    assert_eq!(run(r#"has_key({ a: 1 }, "a")"#), "true");
    assert_eq!(run(r#"merge({ a: 1 }, { b: 2 }).b"#), "2");
    assert_eq!(run(r#"deep_equal({ a: [1, 2] }, { a: [1, 2] })"#), "true");
}

#[test]
fn math_builtins() {
    assert_eq!(run("abs(-5)"), "5");
    assert_eq!(run("max(3, 7)"), "7");
    assert_eq!(run("min(3, 7)"), "3");
    assert_eq!(run("floor(1.9)"), "1.0");
}

#[test]
fn json_round_trip() {
    assert_eq!(run(r#"json_decode(json_encode({ a: 1, b: [1, 2] })).a"#), "1");
}

#[test]
fn regex_builtins() {
    assert_eq!(run(r#"regex_test("^a.c$", "abc")"#), "true");
    assert_eq!(run(r#"regex_replace("a", "banana", "o")"#), "bonono");
}

#[test]
fn http_is_disabled() {
    let err = run_source(r#"http_get("http://example.com")"#, "test.mdl").unwrap_err();
    assert_eq!(err.kind, minidyn::exception::ExcKind::RuntimeError);
}
