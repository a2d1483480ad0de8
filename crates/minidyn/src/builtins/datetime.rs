//! Date/time built-ins (spec §4.H), via `chrono`.

use chrono::{DateTime, Utc};

use super::def;
use crate::env::Environment;
use crate::exception::RunError;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "now", 0, Some(0), |_interp, _args| {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(Value::from(ms))
    });
    def(globals, "date_format", 2, Some(2), |_interp, args| {
        let ms = args[0].as_number()?.as_f64() as i64;
        let fmt = args[1].as_str()?;
        let dt: DateTime<Utc> =
            DateTime::from_timestamp_millis(ms).ok_or_else(|| RunError::runtime("timestamp out of range"))?;
        Ok(Value::from(dt.format(fmt).to_string()))
    });
}
