use std::path::PathBuf;

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use crate::APP_NAME;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Multi-select image picker. Empty when cancelled.
pub fn pick_images() -> Vec<PathBuf> {
    FileDialog::new()
        .set_title("Select images")
        .add_filter("Image files", IMAGE_EXTENSIONS)
        .pick_files()
        .unwrap_or_default()
}

pub fn confirm_show(name: &str) -> bool {
    let answer = MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title(APP_NAME)
        .set_description(format!("Show '{name}' now?"))
        .set_buttons(MessageButtons::YesNo)
        .show();
    matches!(answer, MessageDialogResult::Yes)
}
