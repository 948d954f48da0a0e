//! Win32 shell around [`MascotApp`]: tray icon, one layered window per mascot,
//! native popup menus and the add-images dialogs.
//!
//! Window procedures never touch application state. They push [`ShellEvent`]s
//! onto a thread-local queue which the main loop drains after dispatching the
//! pending Win32 messages.

mod host;
mod mascot_window;
mod picker;
mod popup;
mod prompt;
mod tray;

use std::{
    cell::RefCell,
    mem,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use windows::Win32::{
    Foundation::HWND,
    UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE, WM_QUIT,
    },
};

use crate::{
    data_loaders::{config::AppConfig, session::SessionStore},
    info,
    mascot::{
        app::{MascotApp, ShellRequest},
        asset::file_name_of,
        widget::Position,
    },
    menu::MenuAction,
    paths::session_file_path,
    warn, APP_NAME, DEBUG_NAME,
};

use self::{host::HostWindow, mascot_window::MascotWindowFactory, tray::TrayIcon};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShellEvent {
    TrayMenu,
    TrayRecreated,
    MascotPress { hwnd: HWND, cursor: Position },
    MascotMotion { cursor: Position },
    MascotRelease,
    MascotContext { hwnd: HWND },
    Quit,
}

thread_local! {
    static EVENTS: RefCell<Vec<ShellEvent>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn push_event(event: ShellEvent) {
    EVENTS.with(|queue| queue.borrow_mut().push(event));
}

fn take_events() -> Vec<ShellEvent> {
    EVENTS.with(|queue| mem::take(&mut *queue.borrow_mut()))
}

struct Shell {
    host: HostWindow,
    tray: TrayIcon,
    app: MascotApp<MascotWindowFactory>,
    ask_to_show_new: bool,
}

impl Shell {
    /// Returns false once the shell should quit.
    fn handle_event(&mut self, event: ShellEvent) -> bool {
        match event {
            ShellEvent::TrayMenu => {
                let menu = self.app.tray_menu();
                if let Some(action) = popup::track(self.host.hwnd(), &menu) {
                    return self.dispatch(action);
                }
            }
            ShellEvent::TrayRecreated => {
                if let Err(e) = self.tray.add() {
                    warn!("[{}][TRAY] Failed to re-add tray icon: {}", DEBUG_NAME, e);
                }
            }
            ShellEvent::MascotPress { hwnd, cursor } => {
                if let Some(id) = self.app.widget_for_surface(|w| w.hwnd() == hwnd) {
                    self.app.begin_drag(id, cursor);
                }
            }
            ShellEvent::MascotMotion { cursor } => {
                self.app.drag_motion(cursor);
            }
            ShellEvent::MascotRelease => {
                self.app.end_drag();
            }
            ShellEvent::MascotContext { hwnd } => {
                let Some(id) = self.app.widget_for_surface(|w| w.hwnd() == hwnd) else {
                    return true;
                };
                let menu = self.app.context_menu(id);
                if let Some(action) = popup::track(self.host.hwnd(), &menu) {
                    return self.dispatch(action);
                }
            }
            ShellEvent::Quit => return false,
        }
        true
    }

    fn dispatch(&mut self, action: MenuAction) -> bool {
        match self.app.handle(action) {
            ShellRequest::None => true,
            ShellRequest::PickAssets => {
                self.add_images();
                true
            }
            ShellRequest::Quit => false,
        }
    }

    /// Picker, then a naming prompt per file, then the optional "show now?"
    /// question. Cancelling the prompt skips only that file.
    fn add_images(&mut self) {
        let paths = picker::pick_images();
        if paths.is_empty() {
            return;
        }

        for path in paths {
            let path = path.to_string_lossy().into_owned();
            let file_name = file_name_of(&path);
            let Some(name) = prompt::ask_name(&file_name) else {
                info!("[{}][ASSETS] Naming cancelled, skipping '{}'", DEBUG_NAME, path);
                continue;
            };

            let id = self.app.add_asset(&path, Some(&name));
            if !self.ask_to_show_new {
                continue;
            }
            let display = self
                .app
                .registry()
                .get(id)
                .map(|a| a.name.clone())
                .unwrap_or(file_name);
            if picker::confirm_show(&display) {
                self.app.spawn(id);
            }
        }
    }
}

pub fn run(config: &AppConfig, data_dir: &Path) -> Result<(), String> {
    let host = HostWindow::create()?;
    let mut tray = TrayIcon::new(host.hwnd(), APP_NAME);
    tray.add()?;

    let store = SessionStore::new(session_file_path(data_dir));
    let snapshot = store.load();
    let factory = MascotWindowFactory::new(Duration::from_millis(
        config.settings.animation.min_frame_delay_ms,
    ));

    let mut shell = Shell {
        host,
        tray,
        app: MascotApp::new(factory, store, &config.settings.mascots),
        ask_to_show_new: config.settings.mascots.ask_to_show_new,
    };
    shell.app.load_snapshot(&snapshot);
    shell.app.finalize_pending();

    let loop_sleep = Duration::from_millis(config.settings.runtime.tick_sleep_ms.max(1));
    info!("[{}] Event loop running, tick={}ms", DEBUG_NAME, loop_sleep.as_millis());

    'main: loop {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    warn!("[{}] WM_QUIT received, shutting down", DEBUG_NAME);
                    break 'main;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        for event in take_events() {
            if !shell.handle_event(event) {
                break 'main;
            }
        }

        shell.app.tick(Instant::now());
        shell.app.finalize_pending();
        thread::sleep(loop_sleep);
    }

    shell.app.shutdown();
    shell.tray.remove();
    take_events();
    Ok(())
}
