use std::ffi::c_void;

use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Dwm::DwmExtendFrameIntoClientArea;
use windows::Win32::Graphics::Gdi::{COLOR_WINDOW, HBRUSH};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::PCWSTR;

use crate::errors::{SubWindowError, SubWindowResult};
use crate::platform::WindowPlacement;
use crate::types::{Geometry, NativeHandle, Point, Size};

/// 子窗口样式：无边框弹出窗口
pub const SUB_WINDOW_STYLE: WINDOW_STYLE = WINDOW_STYLE(WS_VISIBLE.0 | WS_POPUP.0);

/// 子窗口扩展样式：分层窗口
pub const SUB_WINDOW_EX_STYLE: WINDOW_EX_STYLE = WS_EX_LAYERED;

pub fn to_hwnd(handle: NativeHandle) -> HWND {
    HWND(handle.as_raw() as *mut c_void)
}

pub fn from_hwnd(hwnd: HWND) -> Option<NativeHandle> {
    NativeHandle::from_raw(hwnd.0 as isize)
}

pub fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// 注册子窗口类，已注册时视为成功
pub fn register_class(class_name: &str, window_proc: WNDPROC) -> SubWindowResult<()> {
    let class_name_w = wide(class_name);

    unsafe {
        let instance = GetModuleHandleW(None)
            .map_err(|e| SubWindowError::WindowClass(format!("{}: {}", class_name, e)))?;

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW | CS_NOCLOSE,
            lpfnWndProc: window_proc,
            hInstance: instance.into(),
            hbrBackground: HBRUSH((COLOR_WINDOW.0 + 1) as usize as *mut c_void),
            lpszClassName: PCWSTR(class_name_w.as_ptr()),
            ..Default::default()
        };

        if RegisterClassExW(&class) == 0 {
            let error = GetLastError();
            if error != ERROR_CLASS_ALREADY_EXISTS {
                return Err(SubWindowError::WindowClass(format!("{}: {:?}", class_name, error)));
            }
        }
    }
    Ok(())
}

/// 创建以 `owner` 为父窗口的子窗口
pub fn create_window(
    class_name: &str,
    owner: NativeHandle,
    placement: WindowPlacement,
) -> SubWindowResult<HWND> {
    let class_name_w = wide(class_name);
    let title = wide("");

    let (x, y, size) = match placement {
        WindowPlacement::At(geometry) => (geometry.origin.x, geometry.origin.y, geometry.size),
        WindowPlacement::SystemDefault(size) => (CW_USEDEFAULT, CW_USEDEFAULT, size),
    };

    unsafe {
        let instance = GetModuleHandleW(None)
            .map_err(|e| SubWindowError::WindowCreation(e.to_string()))?;

        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            PCWSTR(class_name_w.as_ptr()),
            PCWSTR(title.as_ptr()),
            SUB_WINDOW_STYLE,
            x,
            y,
            size.width,
            size.height,
            Some(to_hwnd(owner)),
            None,
            Some(instance.into()),
            None,
        )
    }
    .map_err(|e| SubWindowError::WindowCreation(e.to_string()))
}

/// 把窗口框架扩展到整个客户区
pub fn extend_frame(hwnd: HWND) -> SubWindowResult<()> {
    let margins = MARGINS {
        cxLeftWidth: -1,
        cxRightWidth: 0,
        cyTopHeight: 0,
        cyBottomHeight: 0,
    };
    unsafe { DwmExtendFrameIntoClientArea(hwnd, &margins) }
        .map_err(|e| SubWindowError::FrameExtension(e.to_string()))
}

/// 应用无边框、分层、置顶样式
pub fn apply_overlay_style(hwnd: HWND) -> SubWindowResult<()> {
    unsafe {
        SetWindowLongW(hwnd, GWL_STYLE, SUB_WINDOW_STYLE.0 as i32);

        // 保留已有的扩展样式，追加分层样式
        let mut ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
        ex_style |= SUB_WINDOW_EX_STYLE.0;
        SetWindowLongW(hwnd, GWL_EXSTYLE, ex_style as i32);

        SetWindowPos(
            hwnd,
            Some(HWND_TOPMOST),
            0, 0, 0, 0,
            SWP_NOSIZE | SWP_NOMOVE,
        )
        .map_err(|e| SubWindowError::WindowCreation(format!("设置置顶失败: {}", e)))
    }
}

pub fn move_window(hwnd: HWND, geometry: Geometry) -> SubWindowResult<()> {
    unsafe {
        MoveWindow(
            hwnd,
            geometry.origin.x,
            geometry.origin.y,
            geometry.size.width,
            geometry.size.height,
            true,
        )
    }
    .map_err(|e| SubWindowError::WindowCreation(format!("移动窗口失败: {}", e)))
}

pub fn window_rect(hwnd: HWND) -> Option<Geometry> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect) }.ok()?;
    Some(Geometry {
        origin: Point::new(rect.left, rect.top),
        size: Size::new(rect.right - rect.left, rect.bottom - rect.top),
    })
}

pub fn cursor_position() -> Option<Point> {
    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point) }.ok()?;
    Some(Point::new(point.x, point.y))
}
