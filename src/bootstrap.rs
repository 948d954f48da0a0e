use std::fs;
use std::path::Path;

use crate::paths::config_file_path;
use crate::DEBUG_NAME;
use crate::{info, warn};

const DEFAULT_CONFIG_YAML: &str = r#"settings:
  runtime:
    tick_sleep_ms: 8
  mascots:
    spawn_offset:
      x: 20
      y: 20
    default_position:
      x: 0
      y: 0
    ask_to_show_new: true
  animation:
    min_frame_delay_ms: 20
  development:
    debug: false
    log_level: warn
"#;

/// Creates the data directory and scaffolds default files that are missing.
/// Existing files are never touched.
pub fn bootstrap_app(data_dir: &Path) {
    info!("[{}] === Bootstrap starting ===", DEBUG_NAME);
    info!("[{}] Current exe: {:?}", DEBUG_NAME, std::env::current_exe());

    match fs::create_dir_all(data_dir) {
        Ok(()) => info!("[{}] Data directory: {}", DEBUG_NAME, data_dir.display()),
        Err(e) => {
            warn!(
                "[{}] Failed to create data directory {}: {e}",
                DEBUG_NAME,
                data_dir.display()
            );
            return;
        }
    }

    scaffold_config_yaml(data_dir);
    info!("[{}] Scaffolding complete", DEBUG_NAME);
}

fn scaffold_config_yaml(data_dir: &Path) {
    let path = config_file_path(data_dir);
    if path.exists() {
        return;
    }

    match fs::write(&path, DEFAULT_CONFIG_YAML) {
        Ok(_) => info!("[{}] Created {}", DEBUG_NAME, path.display()),
        Err(e) => warn!("[{}] Failed to create {}: {e}", DEBUG_NAME, path.display()),
    }
}
