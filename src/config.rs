use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{SubWindowError, SubWindowResult};

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV_VAR: &str = "SUB_WINDOWS_CONFIG";

/// 子窗口初始放置方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// 使用调用方给出的位置
    #[default]
    Explicit,
    /// 忽略调用方给出的位置，由系统决定
    SystemDefault,
}

/// 子窗口宿主配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// 呈现线程两帧之间的等待时间（毫秒）
    pub frame_interval_ms: u64,
    /// 子窗口初始放置方式
    pub placement: Placement,
    /// 是否跟踪主窗口的移动与尺寸变化
    pub track_main_window: bool,
    /// 初始化时是否给主窗口应用无边框置顶样式
    pub style_main_window: bool,
    /// 子窗口类名
    pub window_class_name: String,
    /// 等待呈现线程退出超过该时间时输出警告（毫秒）
    pub join_warn_threshold_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            placement: Placement::Explicit,
            track_main_window: true,
            style_main_window: true,
            window_class_name: "SubWindowHostWnd".to_string(),
            join_warn_threshold_ms: 250,
        }
    }
}

impl HostConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn join_warn_threshold(&self) -> Duration {
        Duration::from_millis(self.join_warn_threshold_ms)
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> SubWindowResult<()> {
        if self.frame_interval_ms == 0 {
            return Err(SubWindowError::Config("帧间隔不能为 0".into()));
        }
        if self.window_class_name.trim().is_empty() {
            return Err(SubWindowError::Config("窗口类名不能为空".into()));
        }
        if self.window_class_name.contains('\0') {
            return Err(SubWindowError::Config("窗口类名不能包含空字符".into()));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> SubWindowResult<Self> {
        let config: HostConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载，缺失的字段使用默认值
    pub fn load(path: impl AsRef<Path>) -> SubWindowResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        info!("已加载子窗口配置: {}", path.display());
        Ok(config)
    }

    /// 环境变量指定了配置文件时加载它，否则（或加载失败时）使用默认配置
    pub fn discover() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(&path).unwrap_or_else(|e| {
                warn!("加载配置 {:?} 失败，使用默认配置: {}", path, e);
                Self::default()
            }),
            _ => {
                debug!("未设置 {}，使用默认配置", CONFIG_ENV_VAR);
                Self::default()
            }
        }
    }
}

/// 配置构建器
pub struct HostConfigBuilder {
    config: HostConfig,
}

impl HostConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HostConfig::default(),
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.config.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.config.placement = placement;
        self
    }

    pub fn track_main_window(mut self, enable: bool) -> Self {
        self.config.track_main_window = enable;
        self
    }

    pub fn style_main_window(mut self, enable: bool) -> Self {
        self.config.style_main_window = enable;
        self
    }

    pub fn with_window_class_name(mut self, name: impl Into<String>) -> Self {
        self.config.window_class_name = name.into();
        self
    }

    pub fn with_join_warn_threshold(mut self, threshold: Duration) -> Self {
        self.config.join_warn_threshold_ms = threshold.as_millis() as u64;
        self
    }

    pub fn build(self) -> SubWindowResult<HostConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for HostConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
