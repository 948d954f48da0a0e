use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{HWND, LPARAM, POINT, WPARAM},
        UI::WindowsAndMessaging::{
            AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, PostMessageW,
            SetForegroundWindow, TrackPopupMenuEx, HMENU, MENU_ITEM_FLAGS, MF_CHECKED,
            MF_GRAYED, MF_POPUP, MF_SEPARATOR, MF_STRING, TPM_NONOTIFY, TPM_RETURNCMD,
            TPM_RIGHTBUTTON, WM_NULL,
        },
    },
};

use crate::{error, menu::MenuAction, menu::MenuNode, utility::menu_label, DEBUG_NAME};

/// Shows `nodes` at the cursor and blocks until the user picks or dismisses.
pub fn track(owner: HWND, nodes: &[MenuNode]) -> Option<MenuAction> {
    let mut actions = Vec::new();
    let menu = match build(nodes, &mut actions) {
        Ok(menu) => menu,
        Err(e) => {
            error!("[{}][MENU] {}", DEBUG_NAME, e);
            return None;
        }
    };

    let mut cursor = POINT::default();
    let command = unsafe {
        let _ = GetCursorPos(&mut cursor);
        // Without this the menu does not close when the user clicks elsewhere.
        let _ = SetForegroundWindow(owner);
        let picked = TrackPopupMenuEx(
            menu,
            (TPM_RETURNCMD | TPM_RIGHTBUTTON | TPM_NONOTIFY).0,
            cursor.x,
            cursor.y,
            owner,
            None,
        );
        let _ = PostMessageW(Some(owner), WM_NULL, WPARAM(0), LPARAM(0));
        let _ = DestroyMenu(menu);
        picked.0
    };

    action_for(&actions, command)
}

/// Command ids are 1-based positions in `actions`; 0 means dismissed.
fn action_for(actions: &[MenuAction], command: i32) -> Option<MenuAction> {
    let index = usize::try_from(command).ok()?.checked_sub(1)?;
    actions.get(index).copied()
}

fn build(nodes: &[MenuNode], actions: &mut Vec<MenuAction>) -> Result<HMENU, String> {
    let menu = unsafe { CreatePopupMenu() }.map_err(|e| format!("CreatePopupMenu failed: {e:?}"))?;

    for node in nodes {
        let appended = match node {
            MenuNode::Item {
                label,
                action,
                enabled,
            } => {
                let mut flags = MF_STRING;
                if !enabled {
                    flags |= MF_GRAYED;
                }
                let id = match action {
                    Some(action) => register(actions, *action),
                    None => 0,
                };
                append(menu, flags, id, label)
            }
            MenuNode::Check {
                label,
                action,
                checked,
            } => {
                let mut flags = MF_STRING;
                if *checked {
                    flags |= MF_CHECKED;
                }
                append(menu, flags, register(actions, *action), label)
            }
            MenuNode::Submenu { label, children } => match build(children, actions) {
                Ok(child) => append(menu, MF_POPUP | MF_STRING, child.0 as usize, label),
                Err(e) => Err(e),
            },
            MenuNode::Separator => unsafe {
                AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null())
                    .map_err(|e| format!("AppendMenuW failed: {e:?}"))
            },
        };

        if let Err(e) = appended {
            unsafe {
                let _ = DestroyMenu(menu);
            }
            return Err(e);
        }
    }

    Ok(menu)
}

fn register(actions: &mut Vec<MenuAction>, action: MenuAction) -> usize {
    actions.push(action);
    actions.len()
}

fn append(menu: HMENU, flags: MENU_ITEM_FLAGS, id: usize, label: &str) -> Result<(), String> {
    let wide = menu_label(label);
    unsafe { AppendMenuW(menu, flags, id, PCWSTR(wide.as_ptr())) }
        .map_err(|e| format!("AppendMenuW '{label}' failed: {e:?}"))
}
