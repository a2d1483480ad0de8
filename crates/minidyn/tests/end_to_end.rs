use minidyn::run_source;
use minidyn::value::Value;

fn run(src: &str) -> Value {
    run_source(src, "test.mdl").unwrap_or_else(|e| panic!("{e}"))
}

#[test]
fn arithmetic_and_numeric_promotion() {
    let v = run("9223372036854775807 + 1");
    assert_eq!(v.stringify(), "9223372036854775808");
}

#[test]
fn exact_division_stays_int_inexact_promotes_to_float() {
    assert_eq!(run("6 / 3").stringify(), "2");
    assert_eq!(run("1 / 2").stringify(), "0.5");
}

#[test]
fn ternary_and_nullish_coalescing() {
    assert_eq!(run("1 < 2 ? \"yes\" : \"no\"").stringify(), "yes");
    assert_eq!(run("nil ?? \"fallback\"").stringify(), "fallback");
    assert_eq!(run("0 ?? \"fallback\"").stringify(), "0");
}

#[test]
fn closures_capture_by_reference() {
    let v = run(
        r#"
        fn make_counter() {
            var count = 0;
            return fn() { count = count + 1; return count; };
        }
        let counter = make_counter();
        counter();
        counter();
        counter()
        "#,
    );
    assert_eq!(v.stringify(), "3");
}

#[test]
fn arrow_functions_as_callback_arguments() {
    let v = run("map([1, 2, 3], x => x * 2)");
    assert_eq!(v.stringify(), "[2, 4, 6]");
}

#[test]
fn optional_chaining_short_circuits_on_nil() {
    let v = run("let o = nil; o?.x?.y");
    assert_eq!(v.stringify(), "nil");
}

#[test]
fn named_arguments_bind_by_name() {
    let v = run(
        r#"
        fn greet(greeting, name) { return greeting + ", " + name; }
        greet(name: "Ada", greeting: "Hi")
        "#,
    );
    assert_eq!(v.stringify(), "Hi, Ada");
}

#[test]
fn try_catch_binds_thrown_value() {
    let v = run(
        r#"
        try {
            throw { code: 42 };
        } catch (e) {
            e.code
        }
        "#,
    );
    assert_eq!(v.stringify(), "42");
}

#[test]
fn try_catch_binds_runtime_error_object() {
    let v = run(
        r#"
        try {
            1 / 0;
            "unreachable"
        } catch (e) {
            e.name
        }
        "#,
    );
    assert_eq!(v.stringify(), "RuntimeError");
}

#[test]
fn for_of_and_for_in_iterate_collections() {
    let v = run(
        r#"
        let total = 0;
        for (x of [1, 2, 3]) { total = total + x; }
        total
        "#,
    );
    assert_eq!(v.stringify(), "6");
}

#[test]
fn const_reassignment_is_a_runtime_error() {
    let err = minidyn::run_source("const x = 1; x = 2;", "test.mdl").unwrap_err();
    assert_eq!(err.kind, minidyn::exception::ExcKind::RuntimeError);
}
