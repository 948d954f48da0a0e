use std::sync::OnceLock;

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, DestroyWindow, RegisterClassW,
            RegisterWindowMessageW, WINDOW_EX_STYLE, WM_CLOSE, WM_ENDSESSION, WM_LBUTTONUP,
            WM_RBUTTONUP, WNDCLASSW, WS_OVERLAPPED,
        },
    },
};

use super::{push_event, tray::WM_TRAY_CALLBACK, ShellEvent};

const HOST_CLASS_NAME: PCWSTR = w!("DesktopMascotHostWindow");

static TASKBAR_CREATED: OnceLock<u32> = OnceLock::new();

/// Invisible top-level window that owns the tray icon and the popup menus.
pub struct HostWindow {
    hwnd: HWND,
}

impl HostWindow {
    pub fn create() -> Result<Self, String> {
        let hinstance = module_instance()?;
        ensure_host_class(hinstance);

        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                HOST_CLASS_NAME,
                w!("Desktop Mascot"),
                WS_OVERLAPPED,
                0,
                0,
                0,
                0,
                None,
                None,
                Some(hinstance),
                None,
            )
        }
        .map_err(|e| format!("CreateWindowExW (host) failed: {e:?}"))?;

        TASKBAR_CREATED.get_or_init(|| unsafe { RegisterWindowMessageW(w!("TaskbarCreated")) });
        Ok(Self { hwnd })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }
}

impl Drop for HostWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

pub(super) fn module_instance() -> Result<HINSTANCE, String> {
    unsafe {
        GetModuleHandleW(None)
            .map(|h| HINSTANCE(h.0))
            .map_err(|e| format!("GetModuleHandleW failed: {e:?}"))
    }
}

fn ensure_host_class(hinstance: HINSTANCE) {
    static CLASS_ONCE: OnceLock<()> = OnceLock::new();
    CLASS_ONCE.get_or_init(|| {
        let wc = WNDCLASSW {
            lpfnWndProc: Some(host_window_proc),
            hInstance: hinstance,
            lpszClassName: HOST_CLASS_NAME,
            ..Default::default()
        };
        unsafe {
            let _ = RegisterClassW(&wc);
        }
    });
}

unsafe extern "system" fn host_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_TRAY_CALLBACK => {
            let mouse = (lparam.0 as u32) & 0xFFFF;
            if mouse == WM_RBUTTONUP || mouse == WM_LBUTTONUP {
                push_event(ShellEvent::TrayMenu);
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            push_event(ShellEvent::Quit);
            LRESULT(0)
        }
        WM_ENDSESSION if wparam.0 != 0 => {
            push_event(ShellEvent::Quit);
            LRESULT(0)
        }
        _ if TASKBAR_CREATED.get() == Some(&msg) => {
            push_event(ShellEvent::TrayRecreated);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
