//! Filesystem built-ins (spec §4.H). Paths are resolved relative to the
//! process's current directory, not the requiring script's directory
//! (unlike `require`, these are explicit user-facing calls, not module
//! resolution).

use super::def;
use crate::env::Environment;
use crate::exception::RunError;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "read_file", 1, Some(1), |_interp, args| {
        let path = args[0].as_str()?;
        std::fs::read_to_string(path).map(Value::from).map_err(|e| RunError::runtime(format!("read_file: {e}")))
    });
    def(globals, "write_file", 2, Some(2), |_interp, args| {
        let path = args[0].as_str()?;
        let contents = args[1].as_str()?;
        std::fs::write(path, contents).map(|_| Value::Nil).map_err(|e| RunError::runtime(format!("write_file: {e}")))
    });
    def(globals, "file_exists", 1, Some(1), |_interp, args| Ok(Value::from(std::path::Path::new(args[0].as_str()?).exists())));
}
