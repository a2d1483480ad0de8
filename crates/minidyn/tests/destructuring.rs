use minidyn::run_source;

fn run(src: &str) -> String {
    run_source(src, "test.mdl").unwrap_or_else(|e| panic!("{e}")).stringify()
}

#[test]
fn array_destructuring_with_rest() {
    assert_eq!(run("let [a, b, ...rest] = [1, 2, 3, 4]; rest"), "[3, 4]");
}

#[test]
fn array_destructuring_default_fires_on_hole_only() {
    assert_eq!(run("let [a = 10] = [nil]; a"), "nil");
    assert_eq!(run("let [a = 10] = []; a"), "10");
}

#[test]
fn object_destructuring_with_alias_and_default() {
    assert_eq!(run("let { x: renamed = 5 } = { y: 1 }; renamed"), "5");
    assert_eq!(run("let { x } = { x: 7 }; x"), "7");
}

#[test]
fn object_destructuring_default_fires_on_missing_key_only() {
    assert_eq!(run("let { x = 10 } = { x: nil }; x"), "nil");
    assert_eq!(run("let { x = 10 } = {}; x"), "10");
}

#[test]
fn nested_destructuring_patterns() {
    assert_eq!(run("let { a: [first, second] } = { a: [1, 2] }; first + second"), "3");
}

#[test]
fn destructuring_assignment_to_existing_bindings() {
    assert_eq!(run("var a; var b; [a, b] = [1, 2]; a + b"), "3");
}

#[test]
fn function_parameter_destructuring() {
    assert_eq!(run("fn f({ x, y }) { return x + y; } f({ x: 2, y: 3 })"), "5");
}
