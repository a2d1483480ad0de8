//! Module loader: path resolution, caching, and cycle-safe `require` (spec
//! §4.G, resolution rules in §6). The core never touches the filesystem
//! directly — it only asks a [`ModuleLoader`] to resolve specifiers and load
//! source text, so embedders can substitute a virtual filesystem for tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::env::Environment;
use crate::exception::{RunError, RunResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

const CANDIDATE_EXTENSIONS: [&str; 3] = ["", ".mdl", ".minidyn"];

pub trait ModuleLoader {
    fn resolve(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf>;
    fn load(&self, absolute_path: &Path) -> RunResult<String>;
}

/// Cache entry for an in-flight or completed `require`. `exports` is seeded
/// before the module body runs; a cyclic `require` observes this value as-is
/// without waiting for the body to finish (spec §4.G "cyclic require").
pub struct ModuleEntry {
    pub exports: Value,
    pub done: bool,
}

/// Default loader: resolves specifiers against the real filesystem.
pub struct FsModuleLoader;

impl ModuleLoader for FsModuleLoader {
    fn resolve(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let given = Path::new(specifier);
        let root = if given.is_absolute() { given.to_path_buf() } else { base_dir.join(given) };
        for ext in CANDIDATE_EXTENSIONS {
            let candidate = append_ext(&root, ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if root.is_dir() {
            for ext in CANDIDATE_EXTENSIONS {
                let candidate = append_ext(&root.join("index"), ext);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn load(&self, absolute_path: &Path) -> RunResult<String> {
        fs::read_to_string(absolute_path)
            .map_err(|e| RunError::runtime(format!("cannot read module '{}': {e}", absolute_path.display())))
    }
}

fn append_ext(path: &Path, ext: &str) -> PathBuf {
    if ext.is_empty() {
        path.to_path_buf()
    } else {
        let mut s = path.as_os_str().to_owned();
        s.push(ext);
        PathBuf::from(s)
    }
}

/// Cache keys are absolute paths with case-insensitive comparison (spec §6).
fn cache_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

impl Interpreter {
    /// `require(specifier)` resolved relative to `base_dir` (the requiring
    /// file's directory). Implements the fresh-vs-cyclic-vs-cached cases from
    /// spec §4.G.
    pub fn require(&mut self, specifier: &str, base_dir: &Path) -> RunResult<Value> {
        let absolute = self
            .loader
            .resolve(specifier, base_dir)
            .ok_or_else(|| RunError::runtime(format!("cannot resolve module '{specifier}'")))?;
        let key = cache_key(&absolute);

        if let Some(entry) = self.modules.borrow().get(&key) {
            return Ok(entry.exports.clone());
        }

        let exports = Value::empty_object();
        self.modules.borrow_mut().insert(
            key.clone(),
            ModuleEntry {
                exports: exports.clone(),
                done: false,
            },
        );

        let source = self.loader.load(&absolute)?;
        let file_name = absolute.to_string_lossy().into_owned();
        let program = crate::parser::parse(&source, &file_name)?;

        let module_env = Environment::child(&self.globals, true);
        module_env.define_const("exports", exports.clone())?;
        let module_obj = Value::empty_object();
        if let Value::Object(m) = &module_obj {
            m.borrow_mut().insert("exports".to_owned(), exports.clone());
        }
        module_env.define_const("module", module_obj.clone())?;

        let previous_file = std::mem::replace(&mut self.current_file, file_name);
        let body_result = self.run_in_env(&program, &module_env);
        self.current_file = previous_file;
        body_result?;

        let final_exports = match &module_obj {
            Value::Object(m) => m.borrow().get("exports").cloned().unwrap_or_else(|| exports.clone()),
            _ => exports.clone(),
        };

        if let Some(entry) = self.modules.borrow_mut().get_mut(&key) {
            entry.exports = final_exports.clone();
            entry.done = true;
        }
        Ok(final_exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemoryLoader {
        files: HashMap<String, String>,
    }

    impl ModuleLoader for MemoryLoader {
        fn resolve(&self, specifier: &str, _base_dir: &Path) -> Option<PathBuf> {
            let direct = format!("/{specifier}");
            for candidate in [direct.clone(), format!("{direct}.mdl")] {
                if self.files.contains_key(&candidate) {
                    return Some(PathBuf::from(candidate));
                }
            }
            None
        }

        fn load(&self, absolute_path: &Path) -> RunResult<String> {
            self.files
                .get(&absolute_path.to_string_lossy().into_owned())
                .cloned()
                .ok_or_else(|| RunError::runtime("missing module"))
        }
    }

    #[test]
    fn cyclic_require_returns_seeded_exports() {
        let mut files = HashMap::new();
        files.insert(
            "/a.mdl".to_owned(),
            "const b = require(\"b\"); module.exports.fromA = true;".to_owned(),
        );
        files.insert(
            "/b.mdl".to_owned(),
            "const a = require(\"a\"); module.exports.fromB = true;".to_owned(),
        );
        let mut interp = Interpreter::new(Box::new(MemoryLoader { files }));
        let result = interp.require("a", Path::new("/")).unwrap();
        assert_eq!(result.as_object().unwrap().borrow().get("fromA").unwrap().truthy(), true);
    }
}
