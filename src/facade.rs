//! 进程级入口
//!
//! [`Facade`] 把宿主上下文包装成接受原始参数、返回哨兵值的接口：
//! 创建失败返回 -1，无效索引被忽略，查询无效索引返回原点。
//! Windows 上另外导出同名的 C 接口，宿主（例如游戏引擎插件）直接调用。

use std::ffi::c_void;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::events::{SubWindowEvent, SubWindowListener};
use crate::host::SubWindowHost;
use crate::platform::Platform;
use crate::types::{Geometry, NativeHandle, Point, TextureHandle};

/// 宿主的输入事件回调，事件按值传递
pub type EventCallback = unsafe extern "C" fn(SubWindowEvent);

/// 把 C 回调适配为监听者
struct CallbackListener(EventCallback);

impl SubWindowListener for CallbackListener {
    fn on_input(&self, event: SubWindowEvent) {
        // SAFETY: 宿主保证回调在子窗口存活期间有效
        unsafe { (self.0)(event) }
    }
}

/// 原始参数入口
pub struct Facade<P: Platform> {
    host: SubWindowHost<P>,
}

impl<P: Platform> Facade<P> {
    pub fn new(host: SubWindowHost<P>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &SubWindowHost<P> {
        &self.host
    }

    /// 空句柄只跳过主窗口接管，槽位表照常按数量处理；负数数量按 0 处理
    pub fn initialize(&self, main_window: isize, max_sub_windows: i32) {
        let main_window = NativeHandle::from_raw(main_window);
        if main_window.is_none() {
            debug!("初始化时主窗口句柄为空，只处理槽位表");
        }
        if let Err(e) = self.host.initialize(main_window, max_sub_windows.max(0) as usize) {
            error!("初始化失败: {}", e);
        }
    }

    pub fn terminate(&self) {
        self.host.terminate();
    }

    pub fn cursor_position(&self) -> Point {
        self.host.cursor_position().unwrap_or(Point::ZERO)
    }

    pub fn move_main_window(&self, x: i32, y: i32) {
        self.host.move_main_window(x, y);
    }

    pub fn main_window_point(&self) -> Point {
        self.host.main_window_point()
    }

    /// 创建子窗口，返回槽位索引，失败返回 -1
    ///
    /// # Safety
    /// `texture` 为空或指向有效纹理，且在该子窗口销毁前保持有效；
    /// `callback` 在子窗口存活期间可以调用。
    pub unsafe fn create_sub_window(
        &self,
        texture: *mut c_void,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        callback: Option<EventCallback>,
    ) -> i32 {
        let Some(texture) = (unsafe { TextureHandle::from_raw(texture) }) else {
            warn!("创建子窗口时纹理为空");
            return -1;
        };
        let listener = callback.map(|callback| -> Rc<dyn SubWindowListener> {
            Rc::new(CallbackListener(callback))
        });

        match self
            .host
            .create_sub_window(texture, Geometry::new(x, y, width, height), listener)
        {
            Ok(index) => index as i32,
            Err(e) => {
                warn!("创建子窗口失败: {}", e);
                -1
            }
        }
    }

    pub fn dispose_sub_window(&self, index: i32) {
        if let Ok(index) = usize::try_from(index) {
            self.host.dispose_sub_window(index);
        }
    }

    pub fn move_sub_window(&self, index: i32, x: i32, y: i32) {
        if let Ok(index) = usize::try_from(index) {
            self.host.move_sub_window(index, x, y);
        }
    }

    pub fn sub_window_point(&self, index: i32) -> Point {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.host.sub_window_point(index))
            .unwrap_or(Point::ZERO)
    }
}

#[cfg(windows)]
pub use exports::*;

/// C 接口导出（UI 线程调用）
#[cfg(windows)]
mod exports {
    use std::ffi::c_void;

    use super::{EventCallback, Facade};
    use crate::config::HostConfig;
    use crate::host::SubWindowHost;
    use crate::logging::{self, LogCallback};
    use crate::platform::win32::Win32Platform;
    use crate::types::Point;

    thread_local! {
        static FACADE: Facade<Win32Platform> = {
            logging::init();
            Facade::new(SubWindowHost::new(Win32Platform::new(), HostConfig::discover()))
        };
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn SetLogCallback(callback: Option<LogCallback>) {
        logging::init();
        logging::set_log_callback(callback);
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn InitializeNative(main_window: isize, max_sub_windows: i32) {
        FACADE.with(|facade| facade.initialize(main_window, max_sub_windows));
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn TerminateNative() {
        FACADE.with(|facade| facade.terminate());
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn GetCursorPosition() -> Point {
        FACADE.with(|facade| facade.cursor_position())
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn MoveMainWindow(x: i32, y: i32) {
        FACADE.with(|facade| facade.move_main_window(x, y));
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn GetMainWindowPoint() -> Point {
        FACADE.with(|facade| facade.main_window_point())
    }

    /// # Safety
    /// `texture` 必须是有效的 `ID3D11Texture2D*`（或空），并在子窗口销毁前保持有效。
    #[unsafe(no_mangle)]
    pub unsafe extern "system" fn CreateSubWindow(
        texture: *mut c_void,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        callback: Option<EventCallback>,
    ) -> i32 {
        FACADE.with(|facade| unsafe { facade.create_sub_window(texture, x, y, width, height, callback) })
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn DisposeSubWindow(index: i32) {
        FACADE.with(|facade| facade.dispose_sub_window(index));
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn MoveSubWindow(index: i32, x: i32, y: i32) {
        FACADE.with(|facade| facade.move_sub_window(index, x, y));
    }

    #[unsafe(no_mangle)]
    pub extern "system" fn GetSubWindowPoint(index: i32) -> Point {
        FACADE.with(|facade| facade.sub_window_point(index))
    }
}
