use std::{
    ffi::c_void,
    mem, ptr,
    sync::OnceLock,
    time::{Duration, Instant},
};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM},
        Graphics::Gdi::{
            CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC,
            SelectObject, AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
            BLENDFUNCTION, DIB_RGB_COLORS, HGDIOBJ,
        },
        UI::{
            Input::KeyboardAndMouse::{GetCapture, ReleaseCapture, SetCapture},
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, GetCursorPos, RegisterClassW,
                SetForegroundWindow, SetWindowPos, ShowWindow, UpdateLayeredWindow, HWND_TOP,
                HWND_NOTOPMOST, HWND_TOPMOST, MA_NOACTIVATE, SWP_NOACTIVATE, SWP_NOMOVE,
                SWP_NOSIZE, SWP_NOZORDER, SWP_SHOWWINDOW, SW_HIDE, ULW_ALPHA, WM_CAPTURECHANGED,
                WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEACTIVATE, WM_MOUSEMOVE, WM_RBUTTONUP,
                WNDCLASSW, WS_EX_LAYERED, WS_EX_TOOLWINDOW, WS_POPUP,
            },
        },
    },
};

use crate::{
    debug,
    mascot::{
        asset::AssetDescriptor,
        content::{Animation, Content, Frame},
        widget::{MascotSurface, Position, SurfaceFactory, WidgetId},
    },
    warn, DEBUG_NAME,
};

use super::{host::module_instance, push_event, ShellEvent};

const MASCOT_CLASS_NAME: PCWSTR = w!("DesktopMascotWindow");

pub struct MascotWindowFactory {
    min_frame_delay: Duration,
}

impl MascotWindowFactory {
    pub fn new(min_frame_delay: Duration) -> Self {
        Self { min_frame_delay }
    }
}

impl SurfaceFactory for MascotWindowFactory {
    type Surface = MascotWindow;

    fn create(&mut self, id: WidgetId) -> Result<MascotWindow, String> {
        MascotWindow::create(id, self.min_frame_delay)
    }
}

/// Borderless per-pixel-alpha popup showing one mascot.
pub struct MascotWindow {
    id: WidgetId,
    hwnd: HWND,
    animation: Option<Animation>,
    position: Position,
    min_frame_delay: Duration,
}

impl MascotWindow {
    fn create(id: WidgetId, min_frame_delay: Duration) -> Result<Self, String> {
        let hinstance = module_instance()?;
        ensure_mascot_class(hinstance);

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOOLWINDOW,
                MASCOT_CLASS_NAME,
                PCWSTR::null(),
                WS_POPUP,
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
        .map_err(|e| format!("CreateWindowExW ({id}) failed: {e:?}"))?;
        debug!("[{}][WINDOW] Created {} hwnd={:?}", DEBUG_NAME, id, hwnd);

        Ok(Self {
            id,
            hwnd,
            animation: None,
            position: (0, 0),
            min_frame_delay,
        })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    fn present(&self) {
        let Some(animation) = &self.animation else {
            return;
        };
        if let Err(e) = paint_frame(self.hwnd, self.position, animation.current()) {
            warn!("[{}][WINDOW] {} paint failed: {}", DEBUG_NAME, self.id, e);
        }
    }
}

impl MascotSurface for MascotWindow {
    fn load(&mut self, asset: Option<&AssetDescriptor>) {
        if let Some(mut old) = self.animation.take() {
            old.stop();
        }

        let content = match asset {
            Some(asset) => Content::load(asset, self.min_frame_delay),
            None => Content::blank(),
        };
        let mut animation = Animation::new(content);
        animation.start(Instant::now());
        self.animation = Some(animation);
        self.present();
    }

    fn move_to(&mut self, position: Position) {
        self.position = position;
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                None,
                position.0,
                position.1,
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            );
        }
    }

    fn apply_topmost(&mut self, topmost: bool) {
        let insert_after = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                Some(insert_after),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW,
            );
        }
        if let Some(animation) = self.animation.as_mut() {
            animation.start(Instant::now());
        }
        self.present();
    }

    fn focus(&mut self) {
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                Some(HWND_TOP),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_SHOWWINDOW,
            );
            let _ = SetForegroundWindow(self.hwnd);
        }
    }

    fn tick(&mut self, now: Instant) {
        let changed = self
            .animation
            .as_mut()
            .map(|a| a.tick(now))
            .unwrap_or(false);
        if changed {
            self.present();
        }
    }

    fn release(&mut self) {
        if let Some(mut animation) = self.animation.take() {
            animation.stop();
        }
        unsafe {
            if GetCapture() == self.hwnd {
                let _ = ReleaseCapture();
            }
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
    }
}

impl Drop for MascotWindow {
    fn drop(&mut self) {
        debug!("[{}][WINDOW] Destroying {}", DEBUG_NAME, self.id);
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

/// Pushes one premultiplied BGRA frame to the layered window, resizing it to
/// the frame.
fn paint_frame(hwnd: HWND, position: Position, frame: &Frame) -> Result<(), String> {
    let width = i32::try_from(frame.width).map_err(|_| "frame too wide".to_string())?;
    let height = i32::try_from(frame.height).map_err(|_| "frame too tall".to_string())?;

    let mut bmi = BITMAPINFO::default();
    bmi.bmiHeader = BITMAPINFOHEADER {
        biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
        biWidth: width,
        biHeight: -height,
        biPlanes: 1,
        biBitCount: 32,
        biCompression: BI_RGB.0,
        ..Default::default()
    };

    unsafe {
        let screen_dc = GetDC(None);
        let mem_dc = CreateCompatibleDC(Some(screen_dc));
        if mem_dc.is_invalid() {
            ReleaseDC(None, screen_dc);
            return Err("CreateCompatibleDC failed".to_string());
        }

        let mut bits: *mut c_void = ptr::null_mut();
        let dib = match CreateDIBSection(Some(mem_dc), &bmi, DIB_RGB_COLORS, &mut bits, None, 0) {
            Ok(dib) if !bits.is_null() => dib,
            Ok(dib) => {
                let _ = DeleteObject(HGDIOBJ(dib.0));
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);
                return Err("CreateDIBSection returned no pixel buffer".to_string());
            }
            Err(e) => {
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);
                return Err(format!("CreateDIBSection failed: {e:?}"));
            }
        };

        let len = frame.bgra.len().min(width as usize * height as usize * 4);
        ptr::copy_nonoverlapping(frame.bgra.as_ptr(), bits as *mut u8, len);

        let previous = SelectObject(mem_dc, HGDIOBJ(dib.0));
        let destination = POINT {
            x: position.0,
            y: position.1,
        };
        let size = SIZE {
            cx: width,
            cy: height,
        };
        let source = POINT::default();
        let blend = BLENDFUNCTION {
            BlendOp: AC_SRC_OVER as u8,
            BlendFlags: 0,
            SourceConstantAlpha: 255,
            AlphaFormat: AC_SRC_ALPHA as u8,
        };

        let result = UpdateLayeredWindow(
            hwnd,
            Some(screen_dc),
            Some(&destination as *const POINT),
            Some(&size as *const SIZE),
            Some(mem_dc),
            Some(&source as *const POINT),
            COLORREF(0),
            Some(&blend as *const BLENDFUNCTION),
            ULW_ALPHA,
        );

        let _ = SelectObject(mem_dc, previous);
        let _ = DeleteObject(HGDIOBJ(dib.0));
        let _ = DeleteDC(mem_dc);
        ReleaseDC(None, screen_dc);

        result.map_err(|e| format!("UpdateLayeredWindow failed: {e:?}"))
    }
}

fn ensure_mascot_class(hinstance: HINSTANCE) {
    static CLASS_ONCE: OnceLock<()> = OnceLock::new();
    CLASS_ONCE.get_or_init(|| {
        let wc = WNDCLASSW {
            lpfnWndProc: Some(mascot_window_proc),
            hInstance: hinstance,
            lpszClassName: MASCOT_CLASS_NAME,
            ..Default::default()
        };
        unsafe {
            let _ = RegisterClassW(&wc);
        }
    });
}

fn cursor_position() -> Position {
    let mut point = POINT::default();
    unsafe {
        let _ = GetCursorPos(&mut point);
    }
    (point.x, point.y)
}

unsafe extern "system" fn mascot_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_LBUTTONDOWN => {
            let _ = SetCapture(hwnd);
            push_event(ShellEvent::MascotPress {
                hwnd,
                cursor: cursor_position(),
            });
            LRESULT(0)
        }
        WM_MOUSEMOVE => {
            if GetCapture() == hwnd {
                push_event(ShellEvent::MascotMotion {
                    cursor: cursor_position(),
                });
            }
            LRESULT(0)
        }
        WM_LBUTTONUP => {
            // WM_CAPTURECHANGED follows and ends the drag.
            let _ = ReleaseCapture();
            LRESULT(0)
        }
        WM_CAPTURECHANGED => {
            push_event(ShellEvent::MascotRelease);
            LRESULT(0)
        }
        WM_RBUTTONUP => {
            push_event(ShellEvent::MascotContext { hwnd });
            LRESULT(0)
        }
        WM_MOUSEACTIVATE => LRESULT(MA_NOACTIVATE as isize),
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
