use std::fs;
use std::path::PathBuf;

use minidyn::{FsModuleLoader, Interpreter};

fn temp_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("minidyn-test-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn require_resolves_relative_to_requiring_file() {
    let dir = temp_dir("require-basic");
    fs::write(dir.join("lib.mdl"), "module.exports.value = 41 + 1;").unwrap();
    fs::write(dir.join("main.mdl"), "let lib = require(\"./lib\"); lib.value;").unwrap();

    let source = fs::read_to_string(dir.join("main.mdl")).unwrap();
    let program = minidyn::parser::parse(&source, dir.join("main.mdl").to_str().unwrap()).unwrap();
    let mut interp = Interpreter::new(Box::new(FsModuleLoader));
    let result = interp.run_program(&program, dir.join("main.mdl").to_str().unwrap()).unwrap();
    assert_eq!(result.stringify(), "42");
}

#[test]
fn cached_module_is_not_re_executed() {
    let dir = temp_dir("require-cache");
    fs::write(
        dir.join("counter.mdl"),
        "module.exports.calls = (module.exports.calls ?? 0) + 1;",
    )
    .unwrap();
    fs::write(
        dir.join("main.mdl"),
        "let a = require(\"./counter\"); let b = require(\"./counter\"); a.calls + b.calls;",
    )
    .unwrap();

    let source = fs::read_to_string(dir.join("main.mdl")).unwrap();
    let program = minidyn::parser::parse(&source, dir.join("main.mdl").to_str().unwrap()).unwrap();
    let mut interp = Interpreter::new(Box::new(FsModuleLoader));
    let result = interp.run_program(&program, dir.join("main.mdl").to_str().unwrap()).unwrap();
    assert_eq!(result.stringify(), "2");
}
