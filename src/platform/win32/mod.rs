//! Win32 + DXGI + Direct3D 11 平台实现
//!
//! 子窗口的消息经窗口类的窗口过程按句柄路由到观察者；主窗口通过替换
//! `GWLP_WNDPROC` 接管，观察后转发给原窗口过程。路由表是线程局部的，
//! 与窗口的 UI 线程一致。

mod d3d11;
mod window;

pub use d3d11::D3D11Surface;

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem::transmute;
use std::rc::Rc;

use tracing::{debug, warn};
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::errors::{SubWindowError, SubWindowResult};
use crate::events::RawMessage;
use crate::platform::{MessageObserver, Platform, WindowPlacement};
use crate::types::{Geometry, NativeHandle, Point, Size};

use window::{from_hwnd, to_hwnd};

struct Subclass {
    previous: isize,
    observer: Rc<dyn MessageObserver>,
}

thread_local! {
    static ROUTES: RefCell<HashMap<isize, Rc<dyn MessageObserver>>> = RefCell::new(HashMap::new());
    static SUBCLASSES: RefCell<HashMap<isize, Subclass>> = RefCell::new(HashMap::new());
}

/// Win32 平台
#[derive(Debug, Default)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

impl Platform for Win32Platform {
    type Surface = D3D11Surface;

    fn register_window_class(&self, class_name: &str) -> SubWindowResult<()> {
        window::register_class(class_name, Some(sub_window_proc))?;
        debug!("已注册窗口类 {}", class_name);
        Ok(())
    }

    fn create_window(
        &self,
        class_name: &str,
        owner: NativeHandle,
        placement: WindowPlacement,
        observer: Rc<dyn MessageObserver>,
    ) -> SubWindowResult<NativeHandle> {
        let hwnd = window::create_window(class_name, owner, placement)?;
        let Some(handle) = from_hwnd(hwnd) else {
            return Err(SubWindowError::WindowCreation("窗口句柄为空".into()));
        };

        ROUTES.with_borrow_mut(|routes| routes.insert(handle.as_raw(), observer));
        Ok(handle)
    }

    fn extend_frame_into_client_area(&self, window: NativeHandle) -> SubWindowResult<()> {
        window::extend_frame(to_hwnd(window))
    }

    fn create_surface(&self, window: NativeHandle, size: Size) -> SubWindowResult<D3D11Surface> {
        D3D11Surface::create(to_hwnd(window), size)
    }

    fn apply_overlay_style(&self, window: NativeHandle) -> SubWindowResult<()> {
        window::apply_overlay_style(to_hwnd(window))
    }

    fn show_window(&self, window: NativeHandle) {
        unsafe {
            let _ = ShowWindow(to_hwnd(window), SW_SHOW);
        }
    }

    fn move_window(&self, window: NativeHandle, geometry: Geometry) -> SubWindowResult<()> {
        window::move_window(to_hwnd(window), geometry)
    }

    fn destroy_window(&self, window: NativeHandle) {
        // 先移除路由，销毁过程中的消息直接交给默认窗口过程
        ROUTES.with_borrow_mut(|routes| routes.remove(&window.as_raw()));
        if let Err(e) = unsafe { DestroyWindow(to_hwnd(window)) } {
            warn!("销毁窗口 {:#x} 失败: {}", window.as_raw(), e);
        }
    }

    fn window_geometry(&self, window: NativeHandle) -> Option<Geometry> {
        window::window_rect(to_hwnd(window))
    }

    fn cursor_position(&self) -> Option<Point> {
        window::cursor_position()
    }

    fn subclass_window(
        &self,
        window: NativeHandle,
        observer: Rc<dyn MessageObserver>,
    ) -> SubWindowResult<()> {
        let hwnd = to_hwnd(window);

        // 先登记，替换生效后立即到达的消息也能找到原窗口过程
        let current = unsafe { GetWindowLongPtrW(hwnd, GWLP_WNDPROC) };
        if current == 0 {
            return Err(SubWindowError::Subclass(format!(
                "无法读取窗口 {:#x} 的窗口过程",
                window.as_raw()
            )));
        }
        SUBCLASSES.with_borrow_mut(|subclasses| {
            subclasses.insert(window.as_raw(), Subclass {
                previous: current,
                observer,
            })
        });

        let previous = unsafe { SetWindowLongPtrW(hwnd, GWLP_WNDPROC, main_window_proc as usize as isize) };
        if previous == 0 {
            SUBCLASSES.with_borrow_mut(|subclasses| subclasses.remove(&window.as_raw()));
            return Err(SubWindowError::Subclass(format!(
                "替换窗口 {:#x} 的窗口过程失败",
                window.as_raw()
            )));
        }
        Ok(())
    }

    fn restore_window_procedure(&self, window: NativeHandle) {
        let previous = SUBCLASSES.with_borrow(|subclasses| {
            subclasses.get(&window.as_raw()).map(|subclass| subclass.previous)
        });
        let Some(previous) = previous else {
            return;
        };

        unsafe {
            SetWindowLongPtrW(to_hwnd(window), GWLP_WNDPROC, previous);
        }
        SUBCLASSES.with_borrow_mut(|subclasses| subclasses.remove(&window.as_raw()));
    }
}

fn raw_message(msg: u32, wparam: WPARAM, lparam: LPARAM) -> RawMessage {
    RawMessage::new(msg, wparam.0, lparam.0)
}

/// 子窗口类的窗口过程：观察后交给默认窗口过程
unsafe extern "system" fn sub_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if let Some(handle) = from_hwnd(hwnd) {
        let observer = ROUTES.with_borrow(|routes| routes.get(&handle.as_raw()).cloned());
        if let Some(observer) = observer {
            observer.observe(handle, raw_message(msg, wparam, lparam));
        }
    }
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// 主窗口替换后的窗口过程：观察后转发给原窗口过程
unsafe extern "system" fn main_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let entry = from_hwnd(hwnd).and_then(|handle| {
        SUBCLASSES.with_borrow(|subclasses| {
            subclasses
                .get(&handle.as_raw())
                .map(|subclass| (handle, subclass.previous, subclass.observer.clone()))
        })
    });

    let Some((handle, previous, observer)) = entry else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    observer.observe(handle, raw_message(msg, wparam, lparam));

    // SAFETY: `previous` 是 GetWindowLongPtrW 返回的有效窗口过程地址
    let previous: WNDPROC = unsafe { transmute(previous) };
    unsafe { CallWindowProcW(previous, hwnd, msg, wparam, lparam) }
}
