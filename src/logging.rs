//! 日志初始化与宿主日志转发
//!
//! 所有诊断信息都通过 `tracing` 输出。`init` 安装全局订阅者：标准错误输出一份，
//! 另一份经 [`HostSinkLayer`] 交给宿主注册的回调（Windows 上同时写入调试器输出）。

use std::ffi::{CString, c_char};
use std::fmt::Write as _;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

/// 宿主日志接收函数
///
/// 呈现线程的诊断也会转发过来，因此可能在任意线程上被调用。
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// 宿主通过 C 接口注册的日志回调，参数为以空字符结尾的 UTF-8 字符串
///
/// 与 [`LogSink`] 一样可能在呈现线程上被调用，回调必须是线程安全的。
pub type LogCallback = unsafe extern "C" fn(*const c_char);

lazy_static! {
    static ref HOST_SINK: RwLock<Option<LogSink>> = RwLock::new(None);
}

/// 安装全局日志订阅者（重复调用无效果）
///
/// 过滤级别取自 `RUST_LOG`，未设置时为 `info`。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(HostSinkLayer)
        .try_init();
}

/// 设置或清除宿主日志接收函数
pub fn set_log_sink(sink: Option<LogSink>) {
    *HOST_SINK.write() = sink;
}

/// 注册 C 回调作为宿主日志接收函数，传入 `None` 清除
pub fn set_log_callback(callback: Option<LogCallback>) {
    let sink = callback.map(|callback| -> LogSink {
        Arc::new(move |line: &str| {
            let line = CString::new(line.replace('\0', " ")).unwrap_or_default();
            // SAFETY: 宿主保证回调在注册期间有效，字符串只在调用期间借出
            unsafe { callback(line.as_ptr()) };
        })
    });
    set_log_sink(sink);
}

fn host_sink() -> Option<LogSink> {
    HOST_SINK.read().clone()
}

/// 把事件格式化为一行文本转发给宿主
pub struct HostSinkLayer;

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let sink = host_sink();
        if sink.is_none() && !cfg!(windows) {
            return;
        }

        let meta = event.metadata();
        let mut visitor = MsgVisitor(String::new());
        event.record(&mut visitor);
        let line = format!("[{}] {}: {}", meta.level(), meta.target(), visitor.0.trim());

        #[cfg(windows)]
        debug_output(&line);

        if let Some(sink) = sink {
            sink(&line);
        }
    }
}

struct MsgVisitor(String);

impl tracing_subscriber::field::Visit for MsgVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        if field.name() == "message" {
            let _ = write!(self.0, "{:?}", value);
        } else {
            let _ = write!(self.0, "{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        if field.name() == "message" {
            self.0.push_str(value);
        } else {
            let _ = write!(self.0, "{}={}", field.name(), value);
        }
    }
}

#[cfg(windows)]
fn debug_output(line: &str) {
    use windows::Win32::System::Diagnostics::Debug::OutputDebugStringA;
    use windows::core::PCSTR;

    if let Ok(text) = CString::new(format!("{}\n", line.replace('\0', " "))) {
        unsafe { OutputDebugStringA(PCSTR(text.as_ptr() as *const u8)) };
    }
}
