//! Functions simple enough to compile run through the bytecode VM
//! transparently; these tests just confirm the two execution engines agree
//! on results for constructs squarely inside the compiler's supported
//! subset, and that the tree-walker fallback still produces correct
//! results for constructs outside it (`try`/`catch` in a function body).

use minidyn::run_source;

fn run(src: &str) -> String {
    run_source(src, "test.mdl").unwrap_or_else(|e| panic!("{e}")).stringify()
}

#[test]
fn simple_arithmetic_function_compiles_and_runs() {
    assert_eq!(run("fn add(a, b) { return a + b; } add(2, 3)"), "5");
}

#[test]
fn recursive_function_with_conditional_and_loop() {
    let v = run(
        r#"
        fn fib(n) {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        fib(10)
        "#,
    );
    assert_eq!(v, "55");
}

#[test]
fn self_tail_call_does_not_overflow_the_stack() {
    let v = run(
        r#"
        fn count_down(n, acc) {
            if (n == 0) { return acc; }
            return count_down(n - 1, acc + 1);
        }
        count_down(100000, 0)
        "#,
    );
    assert_eq!(v, "100000");
}

#[test]
fn while_loop_accumulation() {
    let v = run(
        r#"
        fn sum_to(n) {
            var total = 0;
            var i = 1;
            while (i <= n) {
                total = total + i;
                i = i + 1;
            }
            return total;
        }
        sum_to(100)
        "#,
    );
    assert_eq!(v, "5050");
}

#[test]
fn try_catch_inside_function_body_falls_back_to_interpreter() {
    let v = run(
        r#"
        fn safe_div(a, b) {
            try {
                return a / b;
            } catch (e) {
                return -1;
            }
        }
        safe_div(10, 0)
        "#,
    );
    assert_eq!(v, "-1");
}
