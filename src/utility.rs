use std::{ffi::OsStr, os::windows::ffi::OsStrExt};

/// NUL-terminated UTF-16 for `PCWSTR` arguments.
pub fn to_wstring(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Reads a UTF-16 buffer up to the first NUL.
pub fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

/// Menu labels treat `&` as a mnemonic marker; double it to show it literally.
pub fn menu_label(label: &str) -> Vec<u16> {
    to_wstring(&label.replace('&', "&&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_strings_round_trip_through_the_terminator() {
        let wide = to_wstring("mascot.gif");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(from_wide(&wide), "mascot.gif");
        assert_eq!(from_wide(&[0x41, 0x42]), "AB");
    }

    #[test]
    fn ampersands_are_escaped_for_menus() {
        assert_eq!(from_wide(&menu_label("Tom & Jerry")), "Tom && Jerry");
    }
}
