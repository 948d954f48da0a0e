//! The persisted session: registered images, the topmost flag and the mascots that
//! were on screen. One JSON document, rewritten in full after every change.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub is_gif: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPosition {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWidget {
    /// Index into `image_list`. Kept signed and optional so hand-edited files with
    /// bad entries still load; such entries are skipped on restore. Anything that
    /// is not an integer reads as `None`.
    #[serde(rename = "image_index", default, deserialize_with = "lenient_index")]
    pub asset_index: Option<i64>,
    /// `null`, non-objects and coordinates outside `i32` read as 0.
    #[serde(default, deserialize_with = "lenient_position")]
    pub position: StoredPosition,
}

impl ActiveWidget {
    pub fn new(asset_index: usize, position: (i32, i32)) -> Self {
        Self {
            asset_index: i64::try_from(asset_index).ok(),
            position: StoredPosition {
                x: position.0,
                y: position.1,
            },
        }
    }

    /// The asset index if it addresses one of `asset_count` entries.
    pub fn resolve_index(&self, asset_count: usize) -> Option<usize> {
        self.asset_index
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < asset_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(rename = "image_list", default)]
    pub assets: Vec<StoredAsset>,
    #[serde(rename = "is_topmost", default = "default_topmost")]
    pub topmost: bool,
    /// Entries that are not objects are dropped; the rest still load.
    #[serde(rename = "last_mascots", default, deserialize_with = "lenient_widgets")]
    pub active_widgets: Vec<ActiveWidget>,
}

fn default_topmost() -> bool {
    true
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Value::deserialize(d)?.as_i64())
}

fn lenient_position<'de, D: Deserializer<'de>>(d: D) -> Result<StoredPosition, D::Error> {
    let value = Value::deserialize(d)?;
    let coordinate = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0)
    };
    Ok(StoredPosition {
        x: coordinate("x"),
        y: coordinate("y"),
    })
}

fn lenient_widgets<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ActiveWidget>, D::Error> {
    let Value::Array(entries) = Value::deserialize(d)? else {
        warn!("[MASCOT][SESSION] last_mascots is not a list; ignoring it");
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<ActiveWidget>(entry) {
            Ok(widget) => Some(widget),
            Err(e) => {
                warn!("[MASCOT][SESSION] Skipping saved mascot #{i}: {e}");
                None
            }
        })
        .collect())
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            topmost: default_topmost(),
            active_widgets: Vec::new(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or malformed files are a first run, never an error.
    pub fn load(&self) -> SessionSnapshot {
        let txt = match fs::read_to_string(&self.path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return SessionSnapshot::default(),
            Err(e) => {
                warn!("[MASCOT][SESSION] Failed to read {}: {e}", self.path.display());
                return SessionSnapshot::default();
            }
        };

        match serde_json::from_str(&txt) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[MASCOT][SESSION] Ignoring malformed {}: {e}", self.path.display());
                SessionSnapshot::default()
            }
        }
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        let bytes = encode_pretty(snapshot)?;
        write_file_atomic(&self.path, &bytes)
    }
}

fn encode_pretty(snapshot: &SessionSnapshot) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    snapshot.serialize(&mut ser)?;
    Ok(out)
}

fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), SessionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SessionError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file_name = path.file_name().and_then(|v| v.to_str()).unwrap_or("session");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    let write_err = |source| SessionError::Write {
        path: path.to_path_buf(),
        source,
    };

    fs::write(&tmp_path, bytes).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TMP_DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    pub(crate) fn unique_tmp_dir(prefix: &str) -> PathBuf {
        let seq = TMP_DIR_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "mascot_{prefix}_{}_{}_{}",
            std::process::id(),
            seq,
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir_all(&dir).expect("create tmp dir");
        dir
    }

    fn sample() -> SessionSnapshot {
        SessionSnapshot {
            assets: vec![
                StoredAsset {
                    path: "/x/a.png".into(),
                    name: "A".into(),
                    is_gif: false,
                },
                StoredAsset {
                    path: "/x/猫.gif".into(),
                    name: "ねこ".into(),
                    is_gif: true,
                },
            ],
            topmost: false,
            active_widgets: vec![ActiveWidget::new(0, (0, 0)), ActiveWidget::new(1, (-40, 300))],
        }
    }

    #[test]
    fn missing_file_is_an_empty_first_run() {
        let dir = unique_tmp_dir("session_missing");
        let store = SessionStore::new(dir.join("nope.json"));
        let snapshot = store.load();
        assert!(snapshot.assets.is_empty());
        assert!(snapshot.active_widgets.is_empty());
        assert!(snapshot.topmost);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_file_is_an_empty_first_run() {
        let dir = unique_tmp_dir("session_malformed");
        let path = dir.join("mascot_config.json");
        fs::write(&path, "{ \"image_list\": [ { \"name\": 3 ").expect("write");
        assert_eq!(SessionStore::new(&path).load(), SessionSnapshot::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_reproduces_the_snapshot() {
        let dir = unique_tmp_dir("session_roundtrip");
        let store = SessionStore::new(dir.join("nested").join("mascot_config.json"));
        let snapshot = sample();
        store.save(&snapshot).expect("save");
        assert_eq!(store.load(), snapshot);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_overwrites_previous_content() {
        let dir = unique_tmp_dir("session_overwrite");
        let store = SessionStore::new(dir.join("mascot_config.json"));
        store.save(&sample()).expect("first save");
        store.save(&SessionSnapshot::default()).expect("second save");
        assert_eq!(store.load(), SessionSnapshot::default());
        assert!(!dir.join("mascot_config.json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_replaces_an_existing_file_in_place() {
        let dir = unique_tmp_dir("session_replace");
        let path = dir.join("mascot_config.json");
        fs::write(&path, "stale").expect("write stale");

        SessionStore::new(&path).save(&sample()).expect("save over existing file");
        assert_eq!(SessionStore::new(&path).load(), sample());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_uses_the_documented_field_names() {
        let dir = unique_tmp_dir("session_schema");
        let path = dir.join("mascot_config.json");
        SessionStore::new(&path).save(&sample()).expect("save");

        let txt = fs::read_to_string(&path).expect("read");
        assert!(txt.contains("ねこ"), "non-ascii text must not be escaped");
        assert!(txt.contains("\n    \"image_list\""));

        let value: serde_json::Value = serde_json::from_str(&txt).expect("json");
        assert_eq!(value["image_list"][1]["is_gif"], true);
        assert_eq!(value["is_topmost"], false);
        assert_eq!(value["last_mascots"][1]["image_index"], 1);
        assert_eq!(value["last_mascots"][1]["position"]["x"], -40);
        assert_eq!(value["last_mascots"][1]["position"]["y"], 300);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_entries_fall_back_to_defaults() {
        let snapshot: SessionSnapshot = serde_json::from_str(
            r#"{ "image_list": [ { "path": "/a.png", "name": "a" } ],
                 "last_mascots": [ { "image_index": 0 }, { "position": { "x": 4 } } ] }"#,
        )
        .expect("parse");

        assert!(snapshot.topmost);
        assert!(!snapshot.assets[0].is_gif);
        assert_eq!(snapshot.active_widgets[0].position, StoredPosition::default());
        assert_eq!(snapshot.active_widgets[1].asset_index, None);
        assert_eq!(snapshot.active_widgets[1].position.x, 4);
    }

    #[test]
    fn one_bad_saved_mascot_keeps_the_rest_of_the_session() {
        let dir = unique_tmp_dir("session_bad_entry");
        let path = dir.join("mascot_config.json");
        fs::write(
            &path,
            r#"{ "image_list": [ { "path": "/a.png", "name": "a", "is_gif": false } ],
                 "is_topmost": false,
                 "last_mascots": [ { "image_index": 0, "position": null },
                                   { "image_index": 0, "position": { "x": 5, "y": 5 } } ] }"#,
        )
        .expect("write");

        let snapshot = SessionStore::new(&path).load();
        assert_eq!(snapshot.assets.len(), 1);
        assert!(!snapshot.topmost);
        assert_eq!(snapshot.active_widgets.len(), 2);
        assert_eq!(snapshot.active_widgets[0].asset_index, Some(0));
        assert_eq!(snapshot.active_widgets[0].position, StoredPosition::default());
        assert_eq!(snapshot.active_widgets[1].position, StoredPosition { x: 5, y: 5 });
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_of_range_values_in_saved_mascots_are_tolerated() {
        let snapshot: SessionSnapshot = serde_json::from_str(
            r#"{ "image_list": [ { "path": "/a.png", "name": "a" } ],
                 "last_mascots": [ { "image_index": 0, "position": { "x": 1e12, "y": 9999999999 } },
                                   { "image_index": 1.5, "position": { "x": 1, "y": 2 } },
                                   { "image_index": "zero" },
                                   { "image_index": 0, "position": [3, 4] },
                                   null,
                                   7,
                                   { "image_index": 0, "position": { "x": -3, "y": 8 } } ] }"#,
        )
        .expect("parse");

        assert_eq!(snapshot.assets.len(), 1);
        let widgets = &snapshot.active_widgets;
        assert_eq!(widgets.len(), 5);
        assert_eq!(widgets[0].asset_index, Some(0));
        assert_eq!(widgets[0].position, StoredPosition::default());
        assert_eq!(widgets[1].asset_index, None);
        assert_eq!(widgets[1].position, StoredPosition { x: 1, y: 2 });
        assert_eq!(widgets[2].asset_index, None);
        assert_eq!(widgets[3].position, StoredPosition::default());
        assert_eq!(widgets[4].position, StoredPosition { x: -3, y: 8 });
    }

    #[test]
    fn non_list_saved_mascots_read_as_empty() {
        let snapshot: SessionSnapshot = serde_json::from_str(
            r#"{ "image_list": [ { "path": "/a.png", "name": "a" } ], "last_mascots": null }"#,
        )
        .expect("parse");
        assert_eq!(snapshot.assets.len(), 1);
        assert!(snapshot.active_widgets.is_empty());
    }

    #[test]
    fn resolve_index_rejects_out_of_range_entries() {
        let entry = |i| ActiveWidget {
            asset_index: i,
            position: StoredPosition::default(),
        };
        assert_eq!(entry(Some(1)).resolve_index(2), Some(1));
        assert_eq!(entry(Some(2)).resolve_index(2), None);
        assert_eq!(entry(Some(-1)).resolve_index(2), None);
        assert_eq!(entry(None).resolve_index(2), None);
    }
}
