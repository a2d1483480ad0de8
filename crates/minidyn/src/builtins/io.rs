//! Console output and the `require` module entry point (spec §4.H, §4.G).

use std::io::Write as _;
use std::path::Path;

use super::def;
use crate::env::Environment;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "print", 0, None, |_interp, args| {
        let text: Vec<String> = args.iter().map(Value::stringify).collect();
        print!("{}", text.join(" "));
        let _ = std::io::stdout().flush();
        Ok(Value::Nil)
    });
    def(globals, "println", 0, None, |_interp, args| {
        let text: Vec<String> = args.iter().map(Value::stringify).collect();
        println!("{}", text.join(" "));
        Ok(Value::Nil)
    });
    // `require` resolves relative to the requiring file's directory, not the
    // process's current directory (spec §4.G).
    def(globals, "require", 1, Some(1), |interp, args| {
        let specifier = args[0].as_str()?.to_owned();
        let base_dir = Path::new(&interp.current_file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Path::new(".").to_path_buf());
        interp.require(&specifier, &base_dir)
    });
}
