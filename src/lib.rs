pub mod config;
pub mod errors;
pub mod events;
pub mod facade;
pub mod host;
pub mod logging;
pub mod main_window;
pub mod platform;
pub mod presentation;
pub mod registry;
pub mod types;

// 导出主要的公共类型
pub use config::{HostConfig, HostConfigBuilder, Placement};
pub use errors::{SubWindowError, SubWindowResult};
pub use events::{MessageKind, SubWindowEvent, SubWindowListener};
pub use facade::{EventCallback, Facade};
pub use host::SubWindowHost;
pub use platform::headless::HeadlessPlatform;
pub use platform::{MessageObserver, Platform, PresentSurface};
pub use presentation::PresentationStats;
pub use types::{Geometry, NativeHandle, Point, Size, TextureHandle};

#[cfg(windows)]
pub use platform::win32::Win32Platform;
