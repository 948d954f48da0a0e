use std::{fs, path::Path};

use serde_yaml::{Mapping, Value};

use crate::warn;

/// Reads and parses a YAML document. Missing or malformed files yield `None`.
pub fn load_yaml(path: &Path) -> Option<Value> {
    let txt = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str::<Value>(&txt) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("[MASCOT][CONFIG] Failed to parse {}: {e}", path.display());
            None
        }
    }
}

pub fn bool_at(map: &Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string()))?.as_bool()
}

pub fn bool_any(map: &Mapping, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| bool_at(map, k))
}

pub fn str_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(Value::String(key.to_string()))?.as_str()
}

pub fn str_any<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| str_at(map, k))
}

pub fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(Value::String(key.to_string()))?.as_mapping()
}

pub fn i64_at(map: &Mapping, key: &str) -> Option<i64> {
    map.get(Value::String(key.to_string()))?.as_i64()
}

pub fn u64_at(map: &Mapping, key: &str) -> Option<u64> {
    i64_at(map, key).and_then(|v| u64::try_from(v).ok())
}

pub fn u64_any(map: &Mapping, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| u64_at(map, k))
}

/// Reads an `{ x, y }` mapping. Either coordinate may be omitted and falls back to `default`.
pub fn point_at(map: &Mapping, key: &str, default: (i32, i32)) -> Option<(i32, i32)> {
    let point = mapping_at(map, key)?;
    let coord = |k: &str, d: i32| {
        i64_at(point, k)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(d)
    };
    Some((coord("x", default.0), coord("y", default.1)))
}
