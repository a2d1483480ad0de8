//! Path-manipulation built-ins (spec §4.H), thin wrappers over `std::path`.

use std::path::Path;

use super::def;
use crate::env::Environment;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "path_join", 2, Some(2), |_interp, args| {
        let base = args[0].as_str()?;
        let rest = args[1].as_str()?;
        Ok(Value::from(Path::new(base).join(rest).to_string_lossy().into_owned()))
    });
    def(globals, "path_basename", 1, Some(1), |_interp, args| {
        let name = Path::new(args[0].as_str()?).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(Value::from(name))
    });
    def(globals, "path_dirname", 1, Some(1), |_interp, args| {
        let dir = Path::new(args[0].as_str()?).parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(Value::from(dir))
    });
    def(globals, "path_extname", 1, Some(1), |_interp, args| {
        let ext = Path::new(args[0].as_str()?).extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(Value::from(ext))
    });
}
