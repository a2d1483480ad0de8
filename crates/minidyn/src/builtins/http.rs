//! HTTP is out of scope (spec §4.H Non-goals): both entry points are wired
//! up so scripts get a clear runtime error instead of an undefined-name
//! error, rather than being omitted outright.

use super::def;
use crate::env::Environment;
use crate::exception::RunError;

pub fn register(globals: &Environment) {
    def(globals, "http_get", 1, Some(1), |_interp, _args| Err(RunError::runtime("HTTP is disabled")));
    def(globals, "http_post", 2, Some(2), |_interp, _args| Err(RunError::runtime("HTTP is disabled")));
}
