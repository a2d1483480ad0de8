//! Regular-expression built-ins (spec §4.H), via the `regex` crate.

use regex::Regex;

use super::def;
use crate::env::Environment;
use crate::exception::RunError;
use crate::value::Value;

fn compile(pattern: &str) -> Result<Regex, RunError> {
    Regex::new(pattern).map_err(|e| RunError::runtime(format!("invalid regex '{pattern}': {e}")))
}

pub fn register(globals: &Environment) {
    def(globals, "regex_test", 2, Some(2), |_interp, args| {
        let re = compile(args[0].as_str()?)?;
        Ok(Value::from(re.is_match(args[1].as_str()?)))
    });
    def(globals, "regex_match", 2, Some(2), |_interp, args| {
        let re = compile(args[0].as_str()?)?;
        match re.captures(args[1].as_str()?) {
            Some(caps) => {
                let groups: Vec<Value> =
                    caps.iter().map(|m| m.map_or(Value::Nil, |m| Value::from(m.as_str().to_owned()))).collect();
                Ok(Value::array(groups))
            }
            None => Ok(Value::Nil),
        }
    });
    def(globals, "regex_replace", 3, Some(3), |_interp, args| {
        let re = compile(args[0].as_str()?)?;
        let replacement = args[2].as_str()?;
        Ok(Value::from(re.replace_all(args[1].as_str()?, replacement).into_owned()))
    });
}
