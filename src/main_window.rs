use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::errors::SubWindowResult;
use crate::events::{Observation, RawMessage, translate};
use crate::platform::{MessageObserver, Platform};
use crate::types::{Geometry, NativeHandle, Point, Size};

/// 主窗口位置与尺寸缓存，由替换后的窗口过程更新
struct MainWindowTracker {
    origin: Cell<Point>,
    size: Cell<Size>,
}

impl MessageObserver for MainWindowTracker {
    fn observe(&self, _window: NativeHandle, message: RawMessage) {
        match translate(0, message) {
            Observation::Moved(origin) => self.origin.set(origin),
            Observation::Resized(size) => self.size.set(size),
            _ => {}
        }
    }
}

/// 宿主主窗口适配器
///
/// 接管主窗口的窗口过程以跟踪位置和尺寸，`restore` 时原样恢复。
pub struct MainWindowAdapter {
    handle: NativeHandle,
    tracker: Rc<MainWindowTracker>,
    subclassed: Cell<bool>,
}

impl MainWindowAdapter {
    /// 接管主窗口
    pub fn install<P: Platform>(
        platform: &P,
        handle: NativeHandle,
        config: &HostConfig,
    ) -> SubWindowResult<Self> {
        let tracker = Rc::new(MainWindowTracker {
            origin: Cell::new(Point::ZERO),
            size: Cell::new(Size::default()),
        });

        let adapter = Self {
            handle,
            tracker,
            subclassed: Cell::new(false),
        };

        if config.track_main_window {
            platform.subclass_window(handle, adapter.tracker.clone())?;
            adapter.subclassed.set(true);
        }

        if config.style_main_window {
            if let Err(e) = platform.apply_overlay_style(handle) {
                adapter.restore(platform);
                return Err(e);
            }
            if let Err(e) = platform.extend_frame_into_client_area(handle) {
                warn!("主窗口扩展框架失败: {}", e);
            }
        }

        // 以当前窗口矩形作为缓存初值
        if let Some(geometry) = platform.window_geometry(handle) {
            adapter.tracker.origin.set(geometry.origin);
            adapter.tracker.size.set(geometry.size);
        }

        info!(
            "已接管主窗口 {:#x}, 位置 {:?}, 尺寸 {:?}",
            handle.as_raw(),
            adapter.point(),
            adapter.size()
        );
        Ok(adapter)
    }

    /// 恢复原窗口过程（可重复调用）
    pub fn restore<P: Platform>(&self, platform: &P) {
        if self.subclassed.replace(false) {
            platform.restore_window_procedure(self.handle);
            debug!("已恢复主窗口 {:#x} 的窗口过程", self.handle.as_raw());
        }
    }

    /// 移动主窗口，保持缓存的尺寸
    pub fn move_to<P: Platform>(&self, platform: &P, x: i32, y: i32) -> SubWindowResult<()> {
        let geometry = Geometry {
            origin: Point::new(x, y),
            size: self.size(),
        };
        platform.move_window(self.handle, geometry)?;

        // 未跟踪时收不到移动通知，直接更新缓存
        if !self.subclassed.get() {
            self.tracker.origin.set(geometry.origin);
        }
        Ok(())
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn point(&self) -> Point {
        self.tracker.origin.get()
    }

    pub fn size(&self) -> Size {
        self.tracker.size.get()
    }

    pub fn is_tracking(&self) -> bool {
        self.subclassed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfigBuilder;
    use crate::platform::headless::{FailurePoint, HeadlessPlatform, JournalEntry};

    #[test]
    fn test_install_seeds_cache_and_styles_window() {
        let platform = HeadlessPlatform::new();
        let main = platform.create_host_window(Geometry::new(100, 200, 800, 600));

        let adapter = MainWindowAdapter::install(&platform, main, &HostConfig::default()).unwrap();
        assert_eq!(adapter.point(), Point::new(100, 200));
        assert_eq!(adapter.size(), Size::new(800, 600));

        let info = platform.window(main).unwrap();
        assert!(info.subclassed);
        assert!(info.overlay_styled);
        assert!(info.frame_extended);
    }

    #[test]
    fn test_tracks_moves_until_restored() {
        let platform = HeadlessPlatform::new();
        let main = platform.create_host_window(Geometry::new(0, 0, 640, 480));
        let adapter = MainWindowAdapter::install(&platform, main, &HostConfig::default()).unwrap();

        // 用户拖动主窗口
        platform.move_window(main, Geometry::new(-50, 30, 640, 480)).unwrap();
        assert_eq!(adapter.point(), Point::new(-50, 30));

        adapter.move_to(&platform, 10, 20).unwrap();
        assert_eq!(adapter.point(), Point::new(10, 20));
        assert_eq!(platform.window(main).unwrap().geometry, Geometry::new(10, 20, 640, 480));

        adapter.restore(&platform);
        adapter.restore(&platform);
        platform.move_window(main, Geometry::new(300, 300, 640, 480)).unwrap();
        assert_eq!(adapter.point(), Point::new(10, 20));

        let restores = platform
            .journal()
            .into_iter()
            .filter(|entry| *entry == JournalEntry::Restored(main))
            .count();
        assert_eq!(restores, 1);
    }

    #[test]
    fn test_untracked_move_updates_cache_directly() {
        let platform = HeadlessPlatform::new();
        let main = platform.create_host_window(Geometry::new(0, 0, 640, 480));
        let config = HostConfigBuilder::new()
            .track_main_window(false)
            .style_main_window(false)
            .build()
            .unwrap();

        let adapter = MainWindowAdapter::install(&platform, main, &config).unwrap();
        assert!(!adapter.is_tracking());
        assert!(!platform.window(main).unwrap().overlay_styled);

        adapter.move_to(&platform, 5, 6).unwrap();
        assert_eq!(adapter.point(), Point::new(5, 6));
    }

    #[test]
    fn test_subclass_failure_is_reported() {
        let platform = HeadlessPlatform::new();
        let main = platform.create_host_window(Geometry::new(0, 0, 640, 480));
        platform.fail_next(FailurePoint::Subclass);

        assert!(MainWindowAdapter::install(&platform, main, &HostConfig::default()).is_err());
        assert!(!platform.window(main).unwrap().subclassed);
    }

    #[test]
    fn test_styling_failure_restores_procedure() {
        let platform = HeadlessPlatform::new();
        let main = platform.create_host_window(Geometry::new(0, 0, 640, 480));
        platform.fail_next(FailurePoint::OverlayStyle);

        assert!(MainWindowAdapter::install(&platform, main, &HostConfig::default()).is_err());
        assert!(!platform.window(main).unwrap().subclassed);
        assert_eq!(
            platform.journal(),
            vec![JournalEntry::Subclassed(main), JournalEntry::Restored(main)]
        );
    }
}
