//! 子窗口宿主上下文
//!
//! 持有槽位表、主窗口适配器和平台实现，负责子窗口的创建与销毁。
//! 只能在 UI 线程使用：所有操作和窗口过程都在同一线程上运行。
//!
//! 调用平台接口时从不持有 `RefCell` 借用，因为平台会在调用过程中同步回调窗口过程。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::config::{HostConfig, Placement};
use crate::errors::{SubWindowError, SubWindowResult};
use crate::events::{Observation, RawMessage, SubWindowListener, translate};
use crate::main_window::MainWindowAdapter;
use crate::platform::{MessageObserver, Platform, PresentSurface, WindowPlacement};
use crate::presentation::{PresentationStats, PresentationThread};
use crate::registry::{ActiveWindow, SlotPool};
use crate::types::{Geometry, NativeHandle, Point, Size, TextureHandle};

type SharedPool<S> = Rc<RefCell<Option<SlotPool<S>>>>;

/// 子窗口消息路由：按句柄找到槽位，更新缓存并转发输入事件
struct SubWindowRouter<S: PresentSurface> {
    pool: Weak<RefCell<Option<SlotPool<S>>>>,
}

impl<S: PresentSurface> MessageObserver for SubWindowRouter<S> {
    fn observe(&self, window: NativeHandle, message: RawMessage) {
        let Some(pool) = self.pool.upgrade() else {
            return;
        };

        let (index, observation, listener) = {
            // 槽位表正被同一线程修改（创建或销毁途中）时直接放行
            let Ok(mut guard) = pool.try_borrow_mut() else {
                trace!("槽位表忙，跳过消息 {:#x}", message.msg);
                return;
            };
            let Some(slots) = guard.as_mut() else {
                return;
            };
            let Some(index) = slots.find_slot(window) else {
                return;
            };
            let Some(slot) = slots.get_mut(index) else {
                return;
            };

            let observation = translate(index, message);
            match observation {
                Observation::Moved(position) => slot.position = position,
                Observation::Resized(size) => slot.size = size,
                _ => {}
            }
            (index, observation, slot.listener())
        };

        // 借用已释放，监听者可以重入宿主
        let Some(listener) = listener else {
            return;
        };
        match observation {
            Observation::Moved(position) => listener.on_move(index, position),
            Observation::Resized(size) => listener.on_resize(index, size),
            Observation::Input(event) => listener.on_input(event),
            Observation::Ignored => {}
        }
    }
}

/// 创建过程中的回滚守卫：未提交就被丢弃时销毁窗口并释放槽位
struct CreationGuard<'a, P: Platform> {
    host: &'a SubWindowHost<P>,
    index: usize,
    window: Option<NativeHandle>,
    committed: bool,
}

impl<P: Platform> CreationGuard<'_, P> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl<P: Platform> Drop for CreationGuard<'_, P> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Some(window) = self.window.take() {
            self.host.platform.destroy_window(window);
        }
        if let Some(slots) = self.host.pool.borrow_mut().as_mut() {
            slots.free(self.index);
        }
        debug!("子窗口 {} 创建失败，已回滚", self.index);
    }
}

/// 子窗口宿主
pub struct SubWindowHost<P: Platform> {
    platform: Rc<P>,
    config: HostConfig,
    pool: SharedPool<P::Surface>,
    router: Rc<SubWindowRouter<P::Surface>>,
    main_window: RefCell<Option<Rc<MainWindowAdapter>>>,
    class_registered: Cell<bool>,
}

impl<P: Platform> SubWindowHost<P> {
    pub fn new(platform: P, config: HostConfig) -> Self {
        let pool: SharedPool<P::Surface> = Rc::new(RefCell::new(None));
        let router = Rc::new(SubWindowRouter {
            pool: Rc::downgrade(&pool),
        });

        Self {
            platform: Rc::new(platform),
            config,
            pool,
            router,
            main_window: RefCell::new(None),
            class_registered: Cell::new(false),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.borrow().is_some()
    }

    /// 初始化：接管主窗口并分配 `max_sub_windows` 个槽位
    ///
    /// 两件事互不依赖：主窗口只在第一次提供句柄时接管；`max_sub_windows` 大于 0
    /// 或还没有槽位表时重新分配槽位表（已打开的子窗口先被销毁）。
    /// 注册窗口类或接管主窗口失败时槽位表照常分配，错误在最后返回。
    pub fn initialize(&self, main_window: Option<NativeHandle>, max_sub_windows: usize) -> SubWindowResult<()> {
        let registered = self.register_window_class();
        let adopted = match (main_window, self.main_window_handle()) {
            (Some(handle), None) => self.adopt_main_window(handle),
            (Some(handle), Some(current)) if current != handle => {
                debug!("主窗口已接管 ({:#x})，忽略 {:#x}", current.as_raw(), handle.as_raw());
                Ok(())
            }
            _ => Ok(()),
        };

        self.reallocate_pool(max_sub_windows);
        registered.and(adopted)
    }

    fn register_window_class(&self) -> SubWindowResult<()> {
        if !self.class_registered.get() {
            self.platform.register_window_class(&self.config.window_class_name)?;
            self.class_registered.set(true);
        }
        Ok(())
    }

    fn adopt_main_window(&self, handle: NativeHandle) -> SubWindowResult<()> {
        let adapter = MainWindowAdapter::install(&*self.platform, handle, &self.config)?;
        *self.main_window.borrow_mut() = Some(Rc::new(adapter));
        Ok(())
    }

    fn reallocate_pool(&self, max_sub_windows: usize) {
        if self.pool.borrow().is_some() && max_sub_windows == 0 {
            debug!("保留现有槽位表");
            return;
        }

        let open = self.occupied_indices();
        if !open.is_empty() {
            warn!("重新初始化时仍有 {} 个子窗口打开，将全部销毁", open.len());
            for index in open {
                self.dispose_sub_window(index);
            }
        }

        *self.pool.borrow_mut() = Some(SlotPool::new(max_sub_windows));
        info!("子窗口宿主已初始化, 容量 {}", max_sub_windows);
    }

    /// 销毁所有子窗口、释放槽位表并恢复主窗口的窗口过程
    ///
    /// 之后可以重新初始化。
    pub fn terminate(&self) {
        for index in self.occupied_indices() {
            self.dispose_sub_window(index);
        }
        let had_pool = self.pool.borrow_mut().take().is_some();

        let adapter = self.main_window.borrow_mut().take();
        if let Some(adapter) = adapter {
            adapter.restore(&*self.platform);
        }

        if had_pool {
            info!("子窗口宿主已终止");
        }
    }

    /// 当前光标位置（屏幕坐标）
    pub fn cursor_position(&self) -> Option<Point> {
        self.platform.cursor_position()
    }

    /// 移动主窗口，尺寸保持缓存值
    pub fn move_main_window(&self, x: i32, y: i32) {
        let Some(adapter) = self.main_window() else {
            return;
        };
        if let Err(e) = adapter.move_to(&*self.platform, x, y) {
            warn!("移动主窗口失败: {}", e);
        }
    }

    /// 主窗口缓存的位置，未接管时为原点
    pub fn main_window_point(&self) -> Point {
        self.main_window().map_or(Point::ZERO, |adapter| adapter.point())
    }

    pub fn main_window_handle(&self) -> Option<NativeHandle> {
        self.main_window().map(|adapter| adapter.handle())
    }

    fn main_window(&self) -> Option<Rc<MainWindowAdapter>> {
        self.main_window.borrow().clone()
    }

    /// 创建子窗口并开始呈现 `texture`，返回槽位索引
    ///
    /// 任一步骤失败时回滚此前的所有步骤，槽位保持空闲。
    pub fn create_sub_window(
        &self,
        texture: TextureHandle,
        geometry: Geometry,
        listener: Option<Rc<dyn SubWindowListener>>,
    ) -> SubWindowResult<usize> {
        let owner = self.main_window_handle().ok_or(SubWindowError::NotInitialized)?;

        let index = {
            let mut pool = self.pool.borrow_mut();
            let slots = pool.as_mut().ok_or(SubWindowError::NotInitialized)?;
            let index = slots.allocate_slot().ok_or(SubWindowError::PoolExhausted {
                capacity: slots.capacity(),
            })?;
            slots.reserve(index);
            index
        };

        let mut guard = CreationGuard {
            host: self,
            index,
            window: None,
            committed: false,
        };

        let placement = match self.config.placement {
            Placement::Explicit => WindowPlacement::At(geometry),
            Placement::SystemDefault => WindowPlacement::SystemDefault(geometry.size),
        };

        let window = self.platform.create_window(
            &self.config.window_class_name,
            owner,
            placement,
            self.router.clone(),
        )?;
        guard.window = Some(window);

        self.platform.extend_frame_into_client_area(window)?;

        let surface = self.platform.create_surface(window, geometry.size)?;
        if let Err(e) = self.platform.apply_overlay_style(window) {
            surface.release();
            return Err(e);
        }
        self.platform.show_window(window);

        let presenter = PresentationThread::spawn(
            index,
            surface,
            texture,
            self.config.frame_interval(),
            self.config.join_warn_threshold(),
        )?;

        let position = match placement {
            WindowPlacement::At(geometry) => geometry.origin,
            WindowPlacement::SystemDefault(_) => self
                .platform
                .window_geometry(window)
                .map(|geometry| geometry.origin)
                .unwrap_or(Point::ZERO),
        };

        let active = ActiveWindow {
            handle: window,
            texture,
            listener,
            presenter,
        };

        let unpublished = match self.pool.borrow_mut().as_mut() {
            Some(slots) => {
                slots.occupy(index, active, position, geometry.size);
                None
            }
            None => Some(active),
        };
        if let Some(active) = unpublished {
            // 创建途中宿主被终止
            if let Some(surface) = active.presenter.stop() {
                surface.release();
            }
            return Err(SubWindowError::NotInitialized);
        }
        guard.commit();

        info!(
            "子窗口 {} 已创建: 句柄 {:#x}, 位置 {:?}, 尺寸 {}x{}",
            index,
            window.as_raw(),
            position,
            geometry.size.width,
            geometry.size.height
        );
        Ok(index)
    }

    /// 销毁子窗口；索引无效或槽位空闲时什么也不做
    pub fn dispose_sub_window(&self, index: usize) {
        let active = self
            .pool
            .borrow_mut()
            .as_mut()
            .and_then(|slots| slots.take_active(index));
        let Some(active) = active else {
            return;
        };

        let ActiveWindow {
            handle,
            listener,
            presenter,
            ..
        } = active;
        drop(listener);

        match presenter.stop() {
            Some(surface) => surface.release(),
            None => error!("子窗口 {} 的图形表面随呈现线程异常丢失", index),
        }
        self.platform.destroy_window(handle);

        if let Some(slots) = self.pool.borrow_mut().as_mut() {
            slots.free(index);
        }
        info!("子窗口 {} 已销毁", index);
    }

    /// 移动子窗口，尺寸保持缓存值；索引无效时什么也不做
    pub fn move_sub_window(&self, index: usize, x: i32, y: i32) {
        let target = self.pool.borrow().as_ref().and_then(|slots| {
            let slot = slots.get(index)?;
            Some((slot.handle()?, slot.size))
        });
        let Some((handle, size)) = target else {
            return;
        };

        let origin = Point::new(x, y);
        if let Err(e) = self.platform.move_window(handle, Geometry { origin, size }) {
            warn!("移动子窗口 {} 失败: {}", index, e);
            return;
        }

        if let Some(slot) = self.pool.borrow_mut().as_mut().and_then(|slots| slots.get_mut(index)) {
            if slot.handle() == Some(handle) {
                slot.position = origin;
            }
        }
    }

    /// 子窗口缓存的位置，槽位未占用时为 `None`
    pub fn sub_window_point(&self, index: usize) -> Option<Point> {
        self.with_occupied(index, |slot_position, _| slot_position)
    }

    pub fn sub_window_size(&self, index: usize) -> Option<Size> {
        self.with_occupied(index, |_, size| size)
    }

    pub fn sub_window_handle(&self, index: usize) -> Option<NativeHandle> {
        self.pool.borrow().as_ref()?.get(index)?.handle()
    }

    pub fn presentation_stats(&self, index: usize) -> Option<Arc<PresentationStats>> {
        let pool = self.pool.borrow();
        let active = pool.as_ref()?.get(index)?.active()?;
        Some(active.presenter.stats().clone())
    }

    pub fn capacity(&self) -> usize {
        self.pool.borrow().as_ref().map_or(0, SlotPool::capacity)
    }

    pub fn occupied_count(&self) -> usize {
        self.pool.borrow().as_ref().map_or(0, SlotPool::occupied_count)
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.pool.borrow().as_ref().is_some_and(|slots| slots.is_occupied(index))
    }

    fn occupied_indices(&self) -> Vec<usize> {
        self.pool.borrow().as_ref().map(SlotPool::occupied_indices).unwrap_or_default()
    }

    fn with_occupied<T>(&self, index: usize, f: impl FnOnce(Point, Size) -> T) -> Option<T> {
        let pool = self.pool.borrow();
        let slot = pool.as_ref()?.get(index)?;
        slot.active()?;
        Some(f(slot.position, slot.size))
    }
}

impl<P: Platform> Drop for SubWindowHost<P> {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfigBuilder;
    use crate::events::codes::*;
    use crate::events::{SubWindowEvent, make_lparam};
    use crate::platform::headless::{DEFAULT_PLACEMENT_ORIGIN, FailurePoint, HeadlessPlatform, JournalEntry};
    use std::ffi::c_void;
    use std::time::Duration;

    fn texture() -> TextureHandle {
        unsafe { TextureHandle::from_raw(0x1000 as *mut c_void) }.unwrap()
    }

    fn test_config() -> HostConfig {
        HostConfigBuilder::new()
            .with_frame_interval(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    fn host_with_capacity(capacity: usize) -> (SubWindowHost<HeadlessPlatform>, NativeHandle) {
        let host = SubWindowHost::new(HeadlessPlatform::new(), test_config());
        let main = host.platform().create_host_window(Geometry::new(0, 0, 1280, 720));
        host.initialize(Some(main), capacity).unwrap();
        (host, main)
    }

    fn create(host: &SubWindowHost<HeadlessPlatform>, x: i32, y: i32) -> SubWindowResult<usize> {
        host.create_sub_window(texture(), Geometry::new(x, y, 320, 240), None)
    }

    #[derive(Default)]
    struct RecordingListener {
        inputs: RefCell<Vec<SubWindowEvent>>,
        moves: RefCell<Vec<(usize, Point)>>,
        resizes: RefCell<Vec<(usize, Size)>>,
    }

    impl SubWindowListener for RecordingListener {
        fn on_move(&self, index: usize, position: Point) {
            self.moves.borrow_mut().push((index, position));
        }

        fn on_resize(&self, index: usize, size: Size) {
            self.resizes.borrow_mut().push((index, size));
        }

        fn on_input(&self, event: SubWindowEvent) {
            self.inputs.borrow_mut().push(event);
        }
    }

    #[test]
    fn test_create_before_initialize_fails() {
        let host = SubWindowHost::new(HeadlessPlatform::new(), test_config());
        assert!(matches!(create(&host, 0, 0), Err(SubWindowError::NotInitialized)));
        assert_eq!(host.capacity(), 0);
        assert_eq!(host.main_window_point(), Point::ZERO);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let (host, _) = host_with_capacity(3);

        for expected in 0..3 {
            assert_eq!(create(&host, 10, 10).unwrap(), expected);
        }
        assert!(matches!(
            create(&host, 10, 10),
            Err(SubWindowError::PoolExhausted { capacity: 3 })
        ));
        assert_eq!(host.occupied_count(), 3);
    }

    #[test]
    fn test_zero_capacity_pool() {
        let (host, _) = host_with_capacity(0);
        assert!(host.is_initialized());
        assert!(matches!(create(&host, 0, 0), Err(SubWindowError::PoolExhausted { capacity: 0 })));
    }

    #[test]
    fn test_slot_reuse_scenario() {
        let (host, _) = host_with_capacity(2);

        assert_eq!(create(&host, 0, 0).unwrap(), 0);
        assert_eq!(create(&host, 100, 0).unwrap(), 1);
        assert!(create(&host, 200, 0).is_err());

        host.dispose_sub_window(0);
        assert!(!host.is_occupied(0));
        assert_eq!(host.sub_window_point(0), None);

        assert_eq!(create(&host, 300, 40).unwrap(), 0);
        assert_eq!(host.sub_window_point(0), Some(Point::new(300, 40)));
        assert_eq!(host.sub_window_point(1), Some(Point::new(100, 0)));
        assert_eq!(host.platform().live_sub_window_count(), 2);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (host, _) = host_with_capacity(2);
        let index = create(&host, 0, 0).unwrap();

        host.dispose_sub_window(index);
        host.dispose_sub_window(index);
        host.dispose_sub_window(99);

        assert_eq!(host.occupied_count(), 0);
        assert_eq!(host.platform().live_sub_window_count(), 0);
    }

    #[test]
    fn test_point_follows_moves_and_size_is_kept() {
        let (host, _) = host_with_capacity(1);
        let index = create(&host, 15, 25).unwrap();
        assert_eq!(host.sub_window_point(index), Some(Point::new(15, 25)));

        host.move_sub_window(index, -200, 50);
        assert_eq!(host.sub_window_point(index), Some(Point::new(-200, 50)));
        assert_eq!(host.sub_window_size(index), Some(Size::new(320, 240)));

        let handle = host.sub_window_handle(index).unwrap();
        assert_eq!(
            host.platform().window(handle).unwrap().geometry,
            Geometry::new(-200, 50, 320, 240)
        );

        // 无效索引
        host.move_sub_window(7, 1, 1);
        assert_eq!(host.sub_window_point(7), None);
    }

    #[test]
    fn test_click_reaches_listener_with_index() {
        let (host, _) = host_with_capacity(2);
        create(&host, 0, 0).unwrap();

        let listener = Rc::new(RecordingListener::default());
        let index = host
            .create_sub_window(texture(), Geometry::new(0, 0, 64, 64), Some(listener.clone()))
            .unwrap();
        assert_eq!(index, 1);

        let handle = host.sub_window_handle(index).unwrap();
        host.platform()
            .send_message(handle, RawMessage::new(WM_LBUTTONDOWN, 0x0001, make_lparam(12, 34)));

        let inputs = listener.inputs.borrow();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].index, 1);
        assert_eq!(inputs[0].msg, WM_LBUTTONDOWN);
        assert_eq!(inputs[0].point(), Point::new(12, 34));
    }

    #[test]
    fn test_closure_listener_receives_wheel() {
        let (host, _) = host_with_capacity(1);
        let received = Rc::new(RefCell::new(Vec::new()));

        let listener: Rc<dyn SubWindowListener> = {
            let received = received.clone();
            Rc::new(move |event: SubWindowEvent| received.borrow_mut().push(event))
        };
        let index = host
            .create_sub_window(texture(), Geometry::new(0, 0, 64, 64), Some(listener))
            .unwrap();

        let handle = host.sub_window_handle(index).unwrap();
        let wparam = ((120i16 as u16 as usize) << 16) | 0x0008;
        host.platform()
            .send_message(handle, RawMessage::new(WM_MOUSEWHEEL, wparam, make_lparam(5, 6)));
        host.platform().send_message(handle, RawMessage::new(0x000F, 0, 0));

        let received = received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!((received[0].z, received[0].w), (0x0008, 120));
    }

    #[test]
    fn test_move_and_size_notifications() {
        let (host, _) = host_with_capacity(1);
        let listener = Rc::new(RecordingListener::default());
        let index = host
            .create_sub_window(texture(), Geometry::new(0, 0, 64, 64), Some(listener.clone()))
            .unwrap();
        let handle = host.sub_window_handle(index).unwrap();

        // 系统改变窗口尺寸
        host.platform().move_window(handle, Geometry::new(0, 0, 128, 96)).unwrap();
        assert_eq!(host.sub_window_size(index), Some(Size::new(128, 96)));
        assert_eq!(listener.resizes.borrow().as_slice(), &[(0, Size::new(128, 96))]);

        host.move_sub_window(index, 40, 50);
        assert_eq!(listener.moves.borrow().as_slice(), &[(0, Point::new(40, 50))]);
    }

    #[test]
    fn test_cache_updates_without_listener() {
        let (host, _) = host_with_capacity(1);
        let index = create(&host, 0, 0).unwrap();
        let handle = host.sub_window_handle(index).unwrap();

        host.platform()
            .send_message(handle, RawMessage::new(WM_MOVE, 0, make_lparam(-8, 9)));
        host.platform()
            .send_message(handle, RawMessage::new(WM_LBUTTONDOWN, 0, make_lparam(1, 1)));

        assert_eq!(host.sub_window_point(index), Some(Point::new(-8, 9)));
    }

    #[test]
    fn test_listener_may_dispose_its_own_window() {
        let host = Rc::new(SubWindowHost::new(HeadlessPlatform::new(), test_config()));
        let main = host.platform().create_host_window(Geometry::new(0, 0, 800, 600));
        host.initialize(Some(main), 1).unwrap();

        let listener: Rc<dyn SubWindowListener> = {
            let host = Rc::downgrade(&host);
            Rc::new(move |event: SubWindowEvent| {
                if let Some(host) = host.upgrade() {
                    host.dispose_sub_window(event.index as usize);
                }
            })
        };
        let index = host
            .create_sub_window(texture(), Geometry::new(0, 0, 64, 64), Some(listener))
            .unwrap();
        let handle = host.sub_window_handle(index).unwrap();

        host.platform()
            .send_message(handle, RawMessage::new(WM_KEYDOWN, 0x1B, 0));

        assert_eq!(host.occupied_count(), 0);
        assert!(!host.platform().is_alive(handle));
    }

    #[test]
    fn test_presentation_runs_until_dispose() {
        let (host, _) = host_with_capacity(1);
        let index = create(&host, 0, 0).unwrap();
        let handle = host.sub_window_handle(index).unwrap();

        std::thread::sleep(Duration::from_millis(40));
        let stats = host.presentation_stats(index).unwrap();
        assert!(stats.frames_presented() > 0);

        assert!(host.platform().frames_presented(handle) > 0);
        assert_eq!(host.platform().last_source(handle), Some(texture().as_raw() as usize));

        host.dispose_sub_window(index);
        let presented = stats.frames_presented();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(stats.frames_presented(), presented);
        assert!(host.presentation_stats(index).is_none());
    }

    #[test]
    fn test_back_buffer_failure_does_not_stop_presentation() {
        let (host, _) = host_with_capacity(1);
        host.platform().set_back_buffer_failure(true);
        let index = create(&host, 0, 0).unwrap();

        std::thread::sleep(Duration::from_millis(30));
        let stats = host.presentation_stats(index).unwrap();
        assert!(stats.frames_skipped() > 0);
        assert_eq!(stats.frames_presented(), 0);

        host.platform().set_back_buffer_failure(false);
        std::thread::sleep(Duration::from_millis(30));
        assert!(stats.frames_presented() > 0);
    }

    #[test]
    fn test_creation_failures_roll_back() {
        for point in [
            FailurePoint::WindowCreation,
            FailurePoint::FrameExtension,
            FailurePoint::SurfaceCreation,
            FailurePoint::OverlayStyle,
        ] {
            let (host, _) = host_with_capacity(1);
            host.platform().fail_next(point);

            let result = create(&host, 0, 0);
            assert!(result.is_err(), "{:?} must fail", point);
            assert!(result.unwrap_err().is_creation_failure());

            assert_eq!(host.occupied_count(), 0);
            assert_eq!(host.platform().live_sub_window_count(), 0);

            // 回滚后槽位立即可用
            assert_eq!(create(&host, 0, 0).unwrap(), 0);
        }
    }

    #[test]
    fn test_styling_failure_releases_surface_before_window() {
        let (host, _) = host_with_capacity(1);
        host.platform().fail_next(FailurePoint::OverlayStyle);

        assert!(create(&host, 0, 0).is_err());
        assert_eq!(host.occupied_count(), 0);

        let journal = host.platform().journal();
        let handle = journal
            .iter()
            .find_map(|entry| match entry {
                JournalEntry::SurfaceCreated(handle) => Some(*handle),
                _ => None,
            })
            .unwrap();
        let position = |target: JournalEntry| journal.iter().position(|entry| *entry == target).unwrap();

        assert!(position(JournalEntry::SurfaceCreated(handle)) < position(JournalEntry::SurfaceReleased(handle)));
        assert!(position(JournalEntry::SurfaceReleased(handle)) < position(JournalEntry::WindowDestroyed(handle)));
        assert!(!host.platform().is_alive(handle));
    }

    #[test]
    fn test_teardown_order() {
        let (host, _) = host_with_capacity(1);
        let index = create(&host, 0, 0).unwrap();
        let handle = host.sub_window_handle(index).unwrap();
        host.dispose_sub_window(index);

        let journal: Vec<_> = host
            .platform()
            .journal()
            .into_iter()
            .filter(|entry| {
                matches!(entry,
                    JournalEntry::WindowCreated(h) |
                    JournalEntry::SurfaceCreated(h) |
                    JournalEntry::SurfaceReleased(h) |
                    JournalEntry::WindowDestroyed(h) if *h == handle
                )
            })
            .collect();

        assert_eq!(journal, vec![
            JournalEntry::WindowCreated(handle),
            JournalEntry::SurfaceCreated(handle),
            JournalEntry::SurfaceReleased(handle),
            JournalEntry::WindowDestroyed(handle),
        ]);
    }

    #[test]
    fn test_terminate_releases_everything() {
        let (host, main) = host_with_capacity(2);
        create(&host, 0, 0).unwrap();
        create(&host, 50, 50).unwrap();

        host.terminate();

        assert_eq!(host.occupied_count(), 0);
        assert!(!host.is_initialized());
        assert_eq!(host.platform().live_sub_window_count(), 0);
        assert!(!host.platform().window(main).unwrap().subclassed);

        // 主窗口不再被跟踪
        host.platform().move_window(main, Geometry::new(99, 99, 1280, 720)).unwrap();
        assert_eq!(host.main_window_point(), Point::ZERO);

        // 可以重新初始化
        host.initialize(Some(main), 1).unwrap();
        assert_eq!(host.main_window_point(), Point::new(99, 99));
        assert_eq!(create(&host, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_reinitialize_replaces_pool() {
        let (host, main) = host_with_capacity(1);
        create(&host, 0, 0).unwrap();

        // 数量为 0 时保留现有槽位表
        host.initialize(Some(main), 0).unwrap();
        assert_eq!(host.occupied_count(), 1);

        host.initialize(Some(main), 4).unwrap();
        assert_eq!(host.capacity(), 4);
        assert_eq!(host.occupied_count(), 0);
        assert_eq!(host.platform().live_sub_window_count(), 0);
    }

    #[test]
    fn test_main_window_tracking() {
        let (host, main) = host_with_capacity(1);
        assert_eq!(host.main_window_point(), Point::ZERO);

        host.move_main_window(300, 200);
        assert_eq!(host.main_window_point(), Point::new(300, 200));
        assert_eq!(
            host.platform().window(main).unwrap().geometry,
            Geometry::new(300, 200, 1280, 720)
        );

        // 用户拖动
        host.platform().move_window(main, Geometry::new(10, 10, 1280, 720)).unwrap();
        assert_eq!(host.main_window_point(), Point::new(10, 10));
    }

    #[test]
    fn test_untracked_main_window_move() {
        let config = HostConfigBuilder::new()
            .with_frame_interval(Duration::from_millis(1))
            .track_main_window(false)
            .build()
            .unwrap();
        let host = SubWindowHost::new(HeadlessPlatform::new(), config);
        let main = host.platform().create_host_window(Geometry::new(0, 0, 640, 480));
        host.initialize(Some(main), 1).unwrap();

        host.move_main_window(70, 80);
        assert_eq!(host.main_window_point(), Point::new(70, 80));
    }

    #[test]
    fn test_class_registration_failure_still_allocates_pool() {
        let host = SubWindowHost::new(HeadlessPlatform::new(), test_config());
        let main = host.platform().create_host_window(Geometry::new(0, 0, 640, 480));

        host.platform().fail_next(FailurePoint::WindowClass);
        assert!(matches!(host.initialize(Some(main), 1), Err(SubWindowError::WindowClass(_))));
        assert!(host.is_initialized());
        assert_eq!(host.main_window_handle(), Some(main));
        assert!(create(&host, 0, 0).is_err());
        assert_eq!(host.occupied_count(), 0);

        // 下一次初始化重新注册窗口类，数量为 0 时保留槽位表
        host.initialize(None, 0).unwrap();
        assert!(host.platform().is_class_registered("SubWindowHostWnd"));
        assert_eq!(create(&host, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_subclass_failure_still_allocates_pool() {
        let host = SubWindowHost::new(HeadlessPlatform::new(), test_config());
        let main = host.platform().create_host_window(Geometry::new(0, 0, 640, 480));

        host.platform().fail_next(FailurePoint::Subclass);
        assert!(matches!(host.initialize(Some(main), 2), Err(SubWindowError::Subclass(_))));
        assert_eq!(host.capacity(), 2);
        assert_eq!(host.main_window_handle(), None);
        assert!(matches!(create(&host, 0, 0), Err(SubWindowError::NotInitialized)));

        host.initialize(Some(main), 0).unwrap();
        assert_eq!(host.capacity(), 2);
        assert_eq!(host.main_window_handle(), Some(main));
        assert_eq!(create(&host, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_pool_resizes_without_main_window_handle() {
        let (host, main) = host_with_capacity(1);

        host.initialize(None, 4).unwrap();
        assert_eq!(host.capacity(), 4);
        assert_eq!(host.main_window_handle(), Some(main));
        assert!(host.platform().window(main).unwrap().subclassed);

        for expected in 0..4 {
            assert_eq!(create(&host, 0, 0).unwrap(), expected);
        }
    }

    #[test]
    fn test_pool_without_any_main_window() {
        let host = SubWindowHost::new(HeadlessPlatform::new(), test_config());
        host.initialize(None, 2).unwrap();

        assert_eq!(host.capacity(), 2);
        assert_eq!(host.main_window_point(), Point::ZERO);
        assert!(matches!(create(&host, 0, 0), Err(SubWindowError::NotInitialized)));
    }

    #[test]
    fn test_second_main_window_is_ignored() {
        let (host, main) = host_with_capacity(1);
        let other = host.platform().create_host_window(Geometry::new(0, 0, 10, 10));

        host.initialize(Some(other), 1).unwrap();
        assert_eq!(host.main_window_handle(), Some(main));
        assert!(!host.platform().window(other).unwrap().subclassed);
    }

    #[test]
    fn test_system_default_placement() {
        let config = HostConfigBuilder::new()
            .with_frame_interval(Duration::from_millis(1))
            .with_placement(Placement::SystemDefault)
            .build()
            .unwrap();
        let host = SubWindowHost::new(HeadlessPlatform::new(), config);
        let main = host.platform().create_host_window(Geometry::new(0, 0, 640, 480));
        host.initialize(Some(main), 1).unwrap();

        let index = create(&host, 500, 500).unwrap();
        assert_eq!(host.sub_window_point(index), Some(DEFAULT_PLACEMENT_ORIGIN));
        assert_eq!(host.sub_window_size(index), Some(Size::new(320, 240)));
    }

    #[test]
    fn test_sub_window_is_styled_and_owned() {
        let (host, main) = host_with_capacity(1);
        let index = create(&host, 0, 0).unwrap();
        let info = host.platform().window(host.sub_window_handle(index).unwrap()).unwrap();

        assert_eq!(info.owner, Some(main));
        assert_eq!(info.class_name.as_deref(), Some("SubWindowHostWnd"));
        assert!(info.visible);
        assert!(info.frame_extended);
        assert!(info.overlay_styled);
        assert_eq!(info.style_applications, 1);
    }

    #[test]
    fn test_main_window_is_styled_once() {
        let (host, main) = host_with_capacity(1);
        host.initialize(Some(main), 2).unwrap();
        host.initialize(None, 3).unwrap();

        let info = host.platform().window(main).unwrap();
        assert!(info.overlay_styled);
        assert_eq!(info.style_applications, 1);
    }
}
