//! Environment-variable access (spec §4.H). Deliberately exposes only a
//! single-name lookup, not an enumeration of the whole environment.

use super::def;
use crate::env::Environment;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "env_get", 1, Some(1), |_interp, args| {
        Ok(std::env::var(args[0].as_str()?).map(Value::from).unwrap_or(Value::Nil))
    });
}
