//! 无界面平台实现
//!
//! 在进程内模拟窗口、消息分发和图形表面，用于测试以及非 Windows 构建。
//! 支持在每个创建步骤上注入失败，并记录拆除顺序。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::errors::{SubWindowError, SubWindowResult};
use crate::events::codes::{WM_MOVE, WM_SIZE};
use crate::events::{RawMessage, make_lparam};
use crate::platform::{MessageObserver, Platform, PresentSurface, WindowPlacement};
use crate::types::{Geometry, NativeHandle, Point, Size, TextureHandle};

/// 系统默认放置时使用的位置（相当于 `CW_USEDEFAULT` 的结果）
pub const DEFAULT_PLACEMENT_ORIGIN: Point = Point { x: 64, y: 64 };

/// 可注入失败的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    WindowClass,
    WindowCreation,
    FrameExtension,
    SurfaceCreation,
    OverlayStyle,
    Subclass,
}

/// 资源生命周期记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEntry {
    WindowCreated(NativeHandle),
    SurfaceCreated(NativeHandle),
    SurfaceReleased(NativeHandle),
    WindowDestroyed(NativeHandle),
    Subclassed(NativeHandle),
    Restored(NativeHandle),
}

/// 窗口状态快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub owner: Option<NativeHandle>,
    pub class_name: Option<String>,
    pub geometry: Geometry,
    pub visible: bool,
    pub overlay_styled: bool,
    pub style_applications: u32,
    pub frame_extended: bool,
    pub subclassed: bool,
}

struct HeadlessWindow {
    info: WindowInfo,
    observer: Option<Rc<dyn MessageObserver>>,
    subclass: Option<Rc<dyn MessageObserver>>,
    frames: Option<Arc<AtomicU64>>,
    source: Option<Arc<AtomicUsize>>,
}

struct HeadlessState {
    next_handle: isize,
    windows: HashMap<NativeHandle, HeadlessWindow>,
    classes: HashSet<String>,
    cursor: Option<Point>,
    failures: HashSet<FailurePoint>,
}

/// 无界面平台
pub struct HeadlessPlatform {
    state: RefCell<HeadlessState>,
    journal: Arc<Mutex<Vec<JournalEntry>>>,
    fail_back_buffer: Arc<AtomicBool>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                next_handle: 0x100,
                windows: HashMap::new(),
                classes: HashSet::new(),
                cursor: Some(Point::ZERO),
                failures: HashSet::new(),
            }),
            journal: Arc::new(Mutex::new(Vec::new())),
            fail_back_buffer: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 模拟宿主的主窗口
    pub fn create_host_window(&self, geometry: Geometry) -> NativeHandle {
        let mut state = self.state.borrow_mut();
        let handle = Self::next_handle(&mut state);
        state.windows.insert(handle, HeadlessWindow {
            info: WindowInfo {
                owner: None,
                class_name: None,
                geometry,
                visible: true,
                overlay_styled: false,
                style_applications: 0,
                frame_extended: false,
                subclassed: false,
            },
            observer: None,
            subclass: None,
            frames: None,
            source: None,
        });
        handle
    }

    /// 模拟窗口系统向窗口分发一条消息
    ///
    /// 替换后的窗口过程先观察，然后是窗口类的窗口过程。
    pub fn send_message(&self, window: NativeHandle, message: RawMessage) {
        let observers = {
            let state = self.state.borrow();
            match state.windows.get(&window) {
                Some(entry) => [entry.subclass.clone(), entry.observer.clone()],
                None => return,
            }
        };

        for observer in observers.into_iter().flatten() {
            observer.observe(window, message);
        }
    }

    /// 让下一次经过该步骤的调用失败
    pub fn fail_next(&self, point: FailurePoint) {
        self.state.borrow_mut().failures.insert(point);
    }

    /// 让所有图形表面获取后台缓冲区失败
    pub fn set_back_buffer_failure(&self, fail: bool) {
        self.fail_back_buffer.store(fail, Ordering::SeqCst);
    }

    pub fn set_cursor_position(&self, position: Option<Point>) {
        self.state.borrow_mut().cursor = position;
    }

    pub fn window(&self, window: NativeHandle) -> Option<WindowInfo> {
        self.state.borrow().windows.get(&window).map(|entry| entry.info.clone())
    }

    pub fn is_alive(&self, window: NativeHandle) -> bool {
        self.state.borrow().windows.contains_key(&window)
    }

    /// 当前存活的子窗口数量（不含宿主窗口）
    pub fn live_sub_window_count(&self) -> usize {
        self.state
            .borrow()
            .windows
            .values()
            .filter(|entry| entry.info.owner.is_some())
            .count()
    }

    pub fn is_class_registered(&self, class_name: &str) -> bool {
        self.state.borrow().classes.contains(class_name)
    }

    /// 绑定到窗口的图形表面已呈现的帧数
    pub fn frames_presented(&self, window: NativeHandle) -> u64 {
        self.state
            .borrow()
            .windows
            .get(&window)
            .and_then(|entry| entry.frames.as_ref())
            .map_or(0, |frames| frames.load(Ordering::SeqCst))
    }

    /// 绑定到窗口的图形表面最近一次拷贝使用的源纹理地址
    pub fn last_source(&self, window: NativeHandle) -> Option<usize> {
        let state = self.state.borrow();
        let source = state.windows.get(&window)?.source.as_ref()?;
        match source.load(Ordering::SeqCst) {
            0 => None,
            address => Some(address),
        }
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.journal.lock().clone()
    }

    fn next_handle(state: &mut HeadlessState) -> NativeHandle {
        loop {
            let raw = state.next_handle;
            state.next_handle = state.next_handle.wrapping_add(4);
            if let Some(handle) = NativeHandle::from_raw(raw) {
                return handle;
            }
        }
    }

    fn take_failure(&self, point: FailurePoint) -> bool {
        self.state.borrow_mut().failures.remove(&point)
    }

    fn record(&self, entry: JournalEntry) {
        trace!("headless: {:?}", entry);
        self.journal.lock().push(entry);
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HeadlessPlatform {
    type Surface = HeadlessSurface;

    fn register_window_class(&self, class_name: &str) -> SubWindowResult<()> {
        if self.take_failure(FailurePoint::WindowClass) {
            return Err(SubWindowError::WindowClass(class_name.to_string()));
        }
        self.state.borrow_mut().classes.insert(class_name.to_string());
        Ok(())
    }

    fn create_window(
        &self,
        class_name: &str,
        owner: NativeHandle,
        placement: WindowPlacement,
        observer: Rc<dyn MessageObserver>,
    ) -> SubWindowResult<NativeHandle> {
        if self.take_failure(FailurePoint::WindowCreation) {
            return Err(SubWindowError::WindowCreation("injected failure".into()));
        }

        let handle = {
            let mut state = self.state.borrow_mut();
            if !state.classes.contains(class_name) {
                return Err(SubWindowError::WindowCreation(format!("未注册的窗口类: {}", class_name)));
            }
            if !state.windows.contains_key(&owner) {
                return Err(SubWindowError::WindowCreation("父窗口不存在".into()));
            }

            let geometry = match placement {
                WindowPlacement::At(geometry) => geometry,
                WindowPlacement::SystemDefault(size) => Geometry {
                    origin: DEFAULT_PLACEMENT_ORIGIN,
                    size,
                },
            };

            let handle = Self::next_handle(&mut state);
            state.windows.insert(handle, HeadlessWindow {
                info: WindowInfo {
                    owner: Some(owner),
                    class_name: Some(class_name.to_string()),
                    geometry,
                    visible: false,
                    overlay_styled: false,
                    style_applications: 0,
                    frame_extended: false,
                    subclassed: false,
                },
                observer: Some(observer),
                subclass: None,
                frames: None,
                source: None,
            });
            handle
        };

        self.record(JournalEntry::WindowCreated(handle));
        Ok(handle)
    }

    fn extend_frame_into_client_area(&self, window: NativeHandle) -> SubWindowResult<()> {
        if self.take_failure(FailurePoint::FrameExtension) {
            return Err(SubWindowError::FrameExtension("injected failure".into()));
        }
        let mut state = self.state.borrow_mut();
        let entry = state
            .windows
            .get_mut(&window)
            .ok_or_else(|| SubWindowError::FrameExtension("窗口不存在".into()))?;
        entry.info.frame_extended = true;
        Ok(())
    }

    fn create_surface(&self, window: NativeHandle, size: Size) -> SubWindowResult<HeadlessSurface> {
        if self.take_failure(FailurePoint::SurfaceCreation) {
            return Err(SubWindowError::DeviceCreation("injected failure".into()));
        }
        if size.width <= 0 || size.height <= 0 {
            return Err(SubWindowError::DeviceCreation(format!(
                "无效的交换链尺寸: {}x{}",
                size.width, size.height
            )));
        }

        let frames = Arc::new(AtomicU64::new(0));
        let source = Arc::new(AtomicUsize::new(0));
        {
            let mut state = self.state.borrow_mut();
            let entry = state
                .windows
                .get_mut(&window)
                .ok_or_else(|| SubWindowError::DeviceCreation("窗口不存在".into()))?;
            entry.frames = Some(frames.clone());
            entry.source = Some(source.clone());
        }

        self.record(JournalEntry::SurfaceCreated(window));
        Ok(HeadlessSurface {
            window,
            frames,
            last_source: source,
            fail_back_buffer: self.fail_back_buffer.clone(),
            journal: self.journal.clone(),
        })
    }

    fn apply_overlay_style(&self, window: NativeHandle) -> SubWindowResult<()> {
        if self.take_failure(FailurePoint::OverlayStyle) {
            return Err(SubWindowError::WindowCreation("injected failure".into()));
        }
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.windows.get_mut(&window) {
            entry.info.overlay_styled = true;
            entry.info.style_applications += 1;
        }
        Ok(())
    }

    fn show_window(&self, window: NativeHandle) {
        if let Some(entry) = self.state.borrow_mut().windows.get_mut(&window) {
            entry.info.visible = true;
        }
    }

    fn move_window(&self, window: NativeHandle, geometry: Geometry) -> SubWindowResult<()> {
        let previous = {
            let mut state = self.state.borrow_mut();
            let entry = state
                .windows
                .get_mut(&window)
                .ok_or_else(|| SubWindowError::WindowCreation("窗口不存在".into()))?;
            std::mem::replace(&mut entry.info.geometry, geometry)
        };

        // 与真实窗口系统一样，在 MoveWindow 返回前同步发送 WM_MOVE / WM_SIZE
        if previous.origin != geometry.origin {
            let lparam = make_lparam(geometry.origin.x, geometry.origin.y);
            self.send_message(window, RawMessage::new(WM_MOVE, 0, lparam));
        }
        if previous.size != geometry.size {
            let lparam = make_lparam(geometry.size.width, geometry.size.height);
            self.send_message(window, RawMessage::new(WM_SIZE, 0, lparam));
        }
        Ok(())
    }

    fn destroy_window(&self, window: NativeHandle) {
        let removed = self.state.borrow_mut().windows.remove(&window);
        if removed.is_some() {
            self.record(JournalEntry::WindowDestroyed(window));
        }
    }

    fn window_geometry(&self, window: NativeHandle) -> Option<Geometry> {
        self.state.borrow().windows.get(&window).map(|entry| entry.info.geometry)
    }

    fn cursor_position(&self) -> Option<Point> {
        self.state.borrow().cursor
    }

    fn subclass_window(
        &self,
        window: NativeHandle,
        observer: Rc<dyn MessageObserver>,
    ) -> SubWindowResult<()> {
        if self.take_failure(FailurePoint::Subclass) {
            return Err(SubWindowError::Subclass("injected failure".into()));
        }
        {
            let mut state = self.state.borrow_mut();
            let entry = state
                .windows
                .get_mut(&window)
                .ok_or_else(|| SubWindowError::Subclass("窗口不存在".into()))?;
            entry.subclass = Some(observer);
            entry.info.subclassed = true;
        }
        self.record(JournalEntry::Subclassed(window));
        Ok(())
    }

    fn restore_window_procedure(&self, window: NativeHandle) {
        let restored = {
            let mut state = self.state.borrow_mut();
            match state.windows.get_mut(&window) {
                Some(entry) if entry.subclass.is_some() => {
                    entry.subclass = None;
                    entry.info.subclassed = false;
                    true
                }
                _ => false,
            }
        };
        if restored {
            self.record(JournalEntry::Restored(window));
        }
    }
}

/// 无界面图形表面
pub struct HeadlessSurface {
    window: NativeHandle,
    frames: Arc<AtomicU64>,
    last_source: Arc<AtomicUsize>,
    fail_back_buffer: Arc<AtomicBool>,
    journal: Arc<Mutex<Vec<JournalEntry>>>,
}

/// 无界面后台缓冲区
#[derive(Debug)]
pub struct HeadlessBackBuffer;

impl PresentSurface for HeadlessSurface {
    type BackBuffer = HeadlessBackBuffer;

    fn acquire_back_buffer(&mut self) -> SubWindowResult<HeadlessBackBuffer> {
        if self.fail_back_buffer.load(Ordering::SeqCst) {
            return Err(SubWindowError::BackBuffer("injected failure".into()));
        }
        Ok(HeadlessBackBuffer)
    }

    fn copy_and_present(
        &mut self,
        _back_buffer: &HeadlessBackBuffer,
        source: TextureHandle,
    ) -> SubWindowResult<()> {
        self.last_source.store(source.as_raw() as usize, Ordering::SeqCst);
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(self) {
        self.journal.lock().push(JournalEntry::SurfaceReleased(self.window));
    }
}
