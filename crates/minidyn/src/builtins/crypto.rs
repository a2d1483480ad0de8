//! Hashing built-ins (spec §4.H): hex digests via `md-5`/`sha1`/`sha2`.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::def;
use crate::env::Environment;
use crate::value::Value;

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn register(globals: &Environment) {
    def(globals, "md5_hex", 1, Some(1), |_interp, args| {
        let mut hasher = Md5::new();
        hasher.update(args[0].as_str()?.as_bytes());
        Ok(Value::from(hex_encode(&hasher.finalize())))
    });
    def(globals, "sha1_hex", 1, Some(1), |_interp, args| {
        let mut hasher = Sha1::new();
        hasher.update(args[0].as_str()?.as_bytes());
        Ok(Value::from(hex_encode(&hasher.finalize())))
    });
    def(globals, "sha256_hex", 1, Some(1), |_interp, args| {
        let mut hasher = Sha256::new();
        hasher.update(args[0].as_str()?.as_bytes());
        Ok(Value::from(hex_encode(&hasher.finalize())))
    });
}
