use std::path::{Path, PathBuf};

use crate::{debug, warn};

pub const APP_DIR_NAME: &str = ".mascot_app";
pub const SESSION_FILE_NAME: &str = "mascot_config.json";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const LOG_FILE_NAME: &str = "mascot_app.log";

pub fn user_home_dir() -> Option<PathBuf> {
    home_from(|key| std::env::var(key).ok())
}

fn home_from(var: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    // Primary (most reliable on Windows)
    if let Some(profile) = var("USERPROFILE").filter(|p| !p.is_empty()) {
        debug!("USERPROFILE environment variable found: {}", profile);
        return Some(PathBuf::from(profile));
    }

    // Fallback (older / edge cases)
    if let (Some(d), Some(p)) = (var("HOMEDRIVE"), var("HOMEPATH")) {
        let full = PathBuf::from(format!("{}{}", d, p));
        debug!("Resolved home directory from HOMEDRIVE/HOMEPATH: {}", full.display());
        return Some(full);
    }

    if let Some(home) = var("HOME").filter(|h| !h.is_empty()) {
        return Some(PathBuf::from(home));
    }

    warn!("Could not resolve home directory using USERPROFILE, HOMEDRIVE/HOMEPATH or HOME");
    None
}

/// The per-user data directory, `~/.mascot_app/`.
/// Session, config and log files live here.
pub fn app_data_dir() -> PathBuf {
    if let Some(home) = user_home_dir() {
        return home.join(APP_DIR_NAME);
    }

    warn!("Could not resolve home directory, falling back to exe parent");
    match std::env::current_exe() {
        Ok(path) => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
        Err(e) => {
            warn!("Failed to get current executable path: {e}");
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

pub fn session_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SESSION_FILE_NAME)
}

pub fn config_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

pub fn log_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE_NAME)
}
