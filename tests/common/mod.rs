//! # Shorthand Test Fixtures
//!
//! Registries and recorders shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use shorthand::{Call, CallbackResult, ParamShape, Registry};

/// Calls seen by recording callbacks, rendered with [`describe`].
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Renders a call as `name("a", None, k="v")`.
pub fn describe<C>(call: &Call<'_, C>) -> String {
    fn value(v: Option<&str>) -> String {
        v.map(|s| format!("{:?}", s)).unwrap_or_else(|| "None".to_string())
    }
    let mut parts: Vec<String> = call.args().positional().map(|(_, v)| value(v)).collect();
    parts.extend(call.args().named().map(|(k, v)| format!("{}={}", k, value(v))));
    format!("{}({})", call.name(), parts.join(", "))
}

/// A callback that logs its call and returns `output`.
pub fn recording(
    log: &CallLog,
    output: &'static str,
) -> impl Fn(&Call<'_, ()>) -> CallbackResult + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |call| {
        log.lock().unwrap().push(describe(call));
        Ok(output.to_string())
    }
}

/// `wood()` and `melee(to_hit, damage, defense='')`.
pub fn melee_registry() -> Registry {
    let mut registry: Registry = Registry::new();
    registry
        .register("wood", ParamShape::empty(), |_| Ok("The bark is gray.".to_string()))
        .unwrap();
    let shape = ParamShape::builder()
        .required("to_hit")
        .required("damage")
        .named("defense", "")
        .build()
        .unwrap();
    registry
        .register("melee", shape, |call| {
            let to_hit = call.get("to_hit").filter(|v| !v.is_empty()).unwrap_or("±0");
            let damage = call.get("damage").unwrap_or_default();
            let mut text = format!("{} to hit with {} damage.", to_hit, damage);
            if let Some(defense) = call.get("defense").filter(|v| !v.is_empty()) {
                text.push_str(&format!(" {} to be hit in melee.", defense));
            }
            Ok(text)
        })
        .unwrap();
    registry
}

/// `f(arg, kw0='1', kw1=None)`, rendering its values joined by spaces.
pub fn f_shape() -> ParamShape {
    ParamShape::builder()
        .required("arg")
        .named("kw0", "1")
        .named_unset("kw1")
        .build()
        .unwrap()
}

pub fn f_registry() -> Registry {
    let mut registry: Registry = Registry::new();
    registry
        .register("f", f_shape(), |call| {
            let values: Vec<&str> = ["arg", "kw0", "kw1"]
                .iter()
                .map(|name| call.get(name).unwrap_or("None"))
                .collect();
            Ok(values.join(" "))
        })
        .unwrap();
    registry
}

/// Four recording processors whose outputs nest:
/// `b(kw=None) -> ""`, `c(arg, kw=None) -> "y"`, `d() -> "{{c|2|kw=3}}"`,
/// `e() -> "{{b|kw=1}}"`.
pub fn nesting_registry(log: &CallLog) -> Registry {
    let kw = || ParamShape::builder().named_unset("kw");
    let mut registry: Registry = Registry::new();
    registry.register("b", kw().build().unwrap(), recording(log, "")).unwrap();
    registry
        .register("c", kw().required("arg").build().unwrap(), recording(log, "y"))
        .unwrap();
    registry
        .register("d", ParamShape::empty(), recording(log, "{{c|2|kw=3}}"))
        .unwrap();
    registry
        .register("e", ParamShape::empty(), recording(log, "{{b|kw=1}}"))
        .unwrap();
    registry
}

/// A file under `tests/`, removed when dropped.
pub struct TempFile {
    pub path: PathBuf,
}

impl TempFile {
    pub fn new(name: &str, contents: &str) -> Self {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// A directory under `tests/`, removed with its contents when dropped.
pub struct TempDir {
    pub path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join(name);
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path.join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
