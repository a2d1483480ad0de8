//! UUID generation (spec §4.H), via the `uuid` crate's v4 feature.

use uuid::Uuid;

use super::def;
use crate::env::Environment;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "uuid4", 0, Some(0), |_interp, _args| Ok(Value::from(Uuid::new_v4().to_string())));
}
