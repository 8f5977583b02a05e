use thiserror::Error;

/// 子窗口子系统错误类型
#[derive(Error, Debug)]
pub enum SubWindowError {
    #[error("子窗口子系统尚未初始化")]
    NotInitialized,

    #[error("子窗口池已满 (容量: {capacity})")]
    PoolExhausted { capacity: usize },

    #[error("注册窗口类失败: {0}")]
    WindowClass(String),

    #[error("创建窗口失败: {0}")]
    WindowCreation(String),

    #[error("替换窗口过程失败: {0}")]
    Subclass(String),

    #[error("扩展窗口框架失败: {0}")]
    FrameExtension(String),

    #[error("创建图形设备或交换链失败: {0}")]
    DeviceCreation(String),

    #[error("获取后台缓冲区失败: {0}")]
    BackBuffer(String),

    #[error("呈现失败: {0}")]
    Present(String),

    #[error("启动呈现线程失败: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("配置无效: {0}")]
    Config(String),

    #[error("配置解析失败: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl SubWindowError {
    /// 检查错误是否是单帧内的瞬时错误（跳过该帧即可，不需要回滚）
    pub fn is_transient(&self) -> bool {
        matches!(self,
            SubWindowError::BackBuffer(_) |
            SubWindowError::Present(_)
        )
    }

    /// 检查错误是否发生在创建子窗口的过程中（需要回滚已获取的资源）
    pub fn is_creation_failure(&self) -> bool {
        matches!(self,
            SubWindowError::WindowCreation(_) |
            SubWindowError::FrameExtension(_) |
            SubWindowError::DeviceCreation(_) |
            SubWindowError::ThreadSpawn(_)
        )
    }
}

/// 子窗口操作结果类型
pub type SubWindowResult<T> = Result<T, SubWindowError>;
