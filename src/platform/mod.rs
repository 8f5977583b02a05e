//! 窗口系统与图形设备的抽象边界
//!
//! 核心逻辑（槽位、生命周期、呈现循环、事件翻译）只通过这里的 trait 驱动平台，
//! Windows 上由 [`win32`] 实现，测试和非 Windows 构建使用 [`headless`]。

pub mod headless;
#[cfg(windows)]
pub mod win32;

use std::rc::Rc;

use crate::errors::SubWindowResult;
use crate::events::RawMessage;
use crate::types::{Geometry, NativeHandle, Point, Size, TextureHandle};

/// 窗口消息观察者
///
/// 平台在窗口过程中同步调用它（UI 线程），之后总是继续默认处理。
pub trait MessageObserver {
    fn observe(&self, window: NativeHandle, message: RawMessage);
}

/// 子窗口初始位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPlacement {
    /// 放在指定位置
    At(Geometry),
    /// 由系统决定位置，只指定尺寸
    SystemDefault(Size),
}

/// 绑定到一个窗口的图形表面（设备 + 设备上下文 + 交换链）
///
/// 创建后被移交给呈现线程独占使用，线程退出时再交还给 UI 线程释放。
pub trait PresentSurface: Send + 'static {
    /// 后台缓冲区引用，drop 时释放
    type BackBuffer;

    fn acquire_back_buffer(&mut self) -> SubWindowResult<Self::BackBuffer>;

    /// 把源纹理完整拷贝到后台缓冲区并以垂直同步间隔 1 呈现
    fn copy_and_present(
        &mut self,
        back_buffer: &Self::BackBuffer,
        source: TextureHandle,
    ) -> SubWindowResult<()>;

    /// 刷新未完成的 GPU 工作，然后依次释放设备上下文、交换链、设备
    fn release(self);
}

/// 平台接口
pub trait Platform: 'static {
    type Surface: PresentSurface;

    /// 注册子窗口类（可重复调用）
    fn register_window_class(&self, class_name: &str) -> SubWindowResult<()>;

    /// 创建以 `owner` 为父窗口的无边框分层置顶窗口，并把它的消息路由到 `observer`
    fn create_window(
        &self,
        class_name: &str,
        owner: NativeHandle,
        placement: WindowPlacement,
        observer: Rc<dyn MessageObserver>,
    ) -> SubWindowResult<NativeHandle>;

    /// 把窗口框架扩展到整个客户区
    fn extend_frame_into_client_area(&self, window: NativeHandle) -> SubWindowResult<()>;

    /// 创建硬件设备与交换链（单缓冲，32 位 RGBA，窗口模式）
    fn create_surface(&self, window: NativeHandle, size: Size) -> SubWindowResult<Self::Surface>;

    /// 应用无边框、分层、置顶样式（幂等）
    fn apply_overlay_style(&self, window: NativeHandle) -> SubWindowResult<()>;

    fn show_window(&self, window: NativeHandle);

    fn move_window(&self, window: NativeHandle, geometry: Geometry) -> SubWindowResult<()>;

    /// 销毁窗口并移除其消息路由
    fn destroy_window(&self, window: NativeHandle);

    fn window_geometry(&self, window: NativeHandle) -> Option<Geometry>;

    fn cursor_position(&self) -> Option<Point>;

    /// 替换窗口过程：先交给 `observer` 观察，再转发给原窗口过程
    fn subclass_window(
        &self,
        window: NativeHandle,
        observer: Rc<dyn MessageObserver>,
    ) -> SubWindowResult<()>;

    /// 恢复原窗口过程
    fn restore_window_procedure(&self, window: NativeHandle);
}
