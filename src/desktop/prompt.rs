//! Small modal text prompt used to name a freshly picked image.

use std::{cell::RefCell, ffi::c_void, sync::OnceLock};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
        UI::{
            Input::KeyboardAndMouse::SetFocus,
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
                GetMessageW, GetSystemMetrics, GetWindowTextLengthW, GetWindowTextW,
                IsDialogMessageW, PostQuitMessage, RegisterClassW, SetForegroundWindow, ShowWindow,
                TranslateMessage, BS_DEFPUSHBUTTON, BS_PUSHBUTTON, ES_AUTOHSCROLL, HMENU, MSG,
                SM_CXSCREEN, SM_CYSCREEN, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE, WM_COMMAND,
                WNDCLASSW, WS_CAPTION, WS_CHILD, WS_EX_CLIENTEDGE, WS_EX_DLGMODALFRAME,
                WS_EX_TOPMOST, WS_POPUP, WS_SYSMENU, WS_TABSTOP, WS_VISIBLE,
            },
        },
    },
};

use crate::{
    error,
    utility::{from_wide, to_wstring},
    APP_NAME, DEBUG_NAME,
};

use super::host::module_instance;

const PROMPT_CLASS_NAME: PCWSTR = w!("DesktopMascotPrompt");
const ID_OK: usize = 1;
const ID_CANCEL: usize = 2;
const WIDTH: i32 = 360;
const HEIGHT: i32 = 150;

#[derive(Default)]
struct PromptState {
    edit: HWND,
    /// `Some` once the prompt closed; the inner `None` means cancelled.
    outcome: Option<Option<String>>,
}

thread_local! {
    static PROMPT: RefCell<PromptState> = RefCell::new(PromptState::default());
}

/// Asks for a display name, prefilled with `default`. `None` when cancelled.
/// The returned text may be empty.
pub fn ask_name(default: &str) -> Option<String> {
    match run_prompt(default) {
        Ok(answer) => answer,
        Err(e) => {
            error!("[{}][PROMPT] {}", DEBUG_NAME, e);
            None
        }
    }
}

fn run_prompt(default: &str) -> Result<Option<String>, String> {
    let hinstance = module_instance()?;
    ensure_prompt_class(hinstance);

    let (x, y) = unsafe {
        (
            (GetSystemMetrics(SM_CXSCREEN) - WIDTH) / 2,
            (GetSystemMetrics(SM_CYSCREEN) - HEIGHT) / 2,
        )
    };

    let title = to_wstring(APP_NAME);
    let dialog = unsafe {
        CreateWindowExW(
            WS_EX_TOPMOST | WS_EX_DLGMODALFRAME,
            PROMPT_CLASS_NAME,
            PCWSTR(title.as_ptr()),
            WS_POPUP | WS_CAPTION | WS_SYSMENU,
            x,
            y,
            WIDTH,
            HEIGHT,
            None,
            None,
            Some(hinstance),
            None,
        )
    }
    .map_err(|e| format!("CreateWindowExW (prompt) failed: {e:?}"))?;

    let built = build_controls(dialog, hinstance, default);
    let edit = match built {
        Ok(edit) => edit,
        Err(e) => {
            unsafe {
                let _ = DestroyWindow(dialog);
            }
            return Err(e);
        }
    };

    PROMPT.with(|p| {
        *p.borrow_mut() = PromptState {
            edit,
            outcome: None,
        }
    });

    unsafe {
        let _ = ShowWindow(dialog, SW_SHOW);
        let _ = SetForegroundWindow(dialog);
        let _ = SetFocus(Some(edit));
    }

    let answer = loop {
        if let Some(outcome) = PROMPT.with(|p| p.borrow_mut().outcome.take()) {
            break outcome;
        }

        let mut msg = MSG::default();
        let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        if status.0 == 0 {
            // Hand WM_QUIT back to the main loop.
            unsafe { PostQuitMessage(msg.wParam.0 as i32) };
            break None;
        }
        if status.0 < 0 {
            break None;
        }

        unsafe {
            if !IsDialogMessageW(dialog, &msg).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    };

    unsafe {
        let _ = DestroyWindow(dialog);
    }
    PROMPT.with(|p| *p.borrow_mut() = PromptState::default());
    Ok(answer)
}

/// Creates label, edit box and buttons; returns the edit box.
fn build_controls(dialog: HWND, hinstance: HINSTANCE, default: &str) -> Result<HWND, String> {
    let label = to_wstring(&format!("Display name for \"{default}\":"));
    let text = to_wstring(default);

    let child = |ex: WINDOW_EX_STYLE,
                 class: PCWSTR,
                 caption: PCWSTR,
                 style: u32,
                 rect: (i32, i32, i32, i32),
                 id: usize|
     -> Result<HWND, String> {
        unsafe {
            CreateWindowExW(
                ex,
                class,
                caption,
                WINDOW_STYLE(WS_CHILD.0 | WS_VISIBLE.0 | style),
                rect.0,
                rect.1,
                rect.2,
                rect.3,
                Some(dialog),
                Some(HMENU(id as *mut c_void)),
                Some(hinstance),
                None,
            )
        }
        .map_err(|e| format!("CreateWindowExW (prompt control {id}) failed: {e:?}"))
    };

    child(
        WINDOW_EX_STYLE(0),
        w!("STATIC"),
        PCWSTR(label.as_ptr()),
        0,
        (12, 12, 330, 20),
        0,
    )?;
    let edit = child(
        WS_EX_CLIENTEDGE,
        w!("EDIT"),
        PCWSTR(text.as_ptr()),
        WS_TABSTOP.0 | ES_AUTOHSCROLL as u32,
        (12, 36, 330, 24),
        0,
    )?;
    child(
        WINDOW_EX_STYLE(0),
        w!("BUTTON"),
        w!("OK"),
        WS_TABSTOP.0 | BS_DEFPUSHBUTTON as u32,
        (176, 74, 80, 26),
        ID_OK,
    )?;
    child(
        WINDOW_EX_STYLE(0),
        w!("BUTTON"),
        w!("Cancel"),
        WS_TABSTOP.0 | BS_PUSHBUTTON as u32,
        (262, 74, 80, 26),
        ID_CANCEL,
    )?;

    Ok(edit)
}

fn edit_text(edit: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(edit).max(0) as usize;
        let mut buf = vec![0u16; len + 1];
        let copied = GetWindowTextW(edit, &mut buf).max(0) as usize;
        from_wide(&buf[..copied.min(buf.len())])
    }
}

fn ensure_prompt_class(hinstance: HINSTANCE) {
    static CLASS_ONCE: OnceLock<()> = OnceLock::new();
    CLASS_ONCE.get_or_init(|| {
        let wc = WNDCLASSW {
            lpfnWndProc: Some(prompt_window_proc),
            hInstance: hinstance,
            lpszClassName: PROMPT_CLASS_NAME,
            ..Default::default()
        };
        unsafe {
            let _ = RegisterClassW(&wc);
        }
    });
}

fn finish(outcome: Option<String>) {
    PROMPT.with(|p| p.borrow_mut().outcome = Some(outcome));
}

unsafe extern "system" fn prompt_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_COMMAND => {
            match wparam.0 & 0xFFFF {
                ID_OK => {
                    let edit = PROMPT.with(|p| p.borrow().edit);
                    finish(Some(edit_text(edit)));
                }
                ID_CANCEL => finish(None),
                _ => {}
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            finish(None);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
