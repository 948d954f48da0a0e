use std::{env, mem};

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::HWND,
        UI::{
            Shell::{
                Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE,
                NOTIFYICONDATAW,
            },
            WindowsAndMessaging::{
                LoadIconW, LoadImageW, HICON, IDI_APPLICATION, IMAGE_ICON, LR_DEFAULTSIZE,
                LR_LOADFROMFILE, WM_APP,
            },
        },
    },
};

use crate::{debug, utility::to_wstring, DEBUG_NAME};

pub const WM_TRAY_CALLBACK: u32 = WM_APP + 1;

const TRAY_ICON_ID: u32 = 1;
const ICON_FILE_NAME: &str = "icon.ico";

pub struct TrayIcon {
    data: NOTIFYICONDATAW,
    added: bool,
}

impl TrayIcon {
    pub fn new(owner: HWND, tooltip: &str) -> Self {
        let mut data = NOTIFYICONDATAW {
            cbSize: mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: owner,
            uID: TRAY_ICON_ID,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_TRAY_CALLBACK,
            hIcon: load_tray_icon(),
            ..Default::default()
        };

        let tip = to_wstring(tooltip);
        let len = tip.len().min(data.szTip.len() - 1);
        data.szTip[..len].copy_from_slice(&tip[..len]);

        Self { data, added: false }
    }

    /// Also used to re-add the icon after Explorer restarts.
    pub fn add(&mut self) -> Result<(), String> {
        let ok = unsafe { Shell_NotifyIconW(NIM_ADD, &self.data).as_bool() };
        if !ok {
            return Err("Shell_NotifyIconW(NIM_ADD) failed".to_string());
        }
        self.added = true;
        Ok(())
    }

    pub fn remove(&mut self) {
        if !self.added {
            return;
        }
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &self.data);
        }
        self.added = false;
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        self.remove();
    }
}

/// `icon.ico` next to the executable, else the stock application icon.
fn load_tray_icon() -> HICON {
    let from_file = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(ICON_FILE_NAME)))
        .filter(|path| path.exists())
        .and_then(|path| {
            let wide = to_wstring(&path.to_string_lossy());
            unsafe {
                LoadImageW(
                    None,
                    PCWSTR(wide.as_ptr()),
                    IMAGE_ICON,
                    0,
                    0,
                    LR_LOADFROMFILE | LR_DEFAULTSIZE,
                )
            }
            .ok()
        });

    if let Some(handle) = from_file {
        debug!("[{}][TRAY] Using {}", DEBUG_NAME, ICON_FILE_NAME);
        return HICON(handle.0);
    }

    unsafe { LoadIconW(None, IDI_APPLICATION) }.unwrap_or_default()
}
