use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::errors::{SubWindowError, SubWindowResult};
use crate::platform::PresentSurface;
use crate::types::TextureHandle;

/// 呈现线程的停止令牌
///
/// UI 线程取消，呈现线程每帧检查一次；帧间等待会被取消立即唤醒。
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<StopState>,
}

#[derive(Debug, Default)]
struct StopState {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut stopped = self.inner.stopped.lock();
        *stopped = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// 最多等待 `timeout`，被取消则提前返回；返回值表示是否已取消
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.inner.stopped.lock();
        while !*stopped {
            if self.inner.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// 呈现统计（原子变量，UI 线程随时可读）
#[derive(Debug, Default)]
pub struct PresentationStats {
    frames_presented: AtomicU64,
    frames_skipped: AtomicU64,
}

impl PresentationStats {
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Relaxed)
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped.load(Ordering::Relaxed)
    }
}

/// 单个子窗口的呈现线程
///
/// 图形表面在启动时移入线程，`stop` 时随 join 交还给调用方，
/// 因此 UI 线程和呈现线程不会同时接触 GPU 对象。
pub struct PresentationThread<S: PresentSurface> {
    index: usize,
    token: StopToken,
    stats: Arc<PresentationStats>,
    handle: JoinHandle<S>,
    join_warn_threshold: Duration,
}

impl<S: PresentSurface> PresentationThread<S> {
    /// 启动呈现线程
    pub fn spawn(
        index: usize,
        surface: S,
        source: TextureHandle,
        frame_interval: Duration,
        join_warn_threshold: Duration,
    ) -> SubWindowResult<Self> {
        let token = StopToken::new();
        let stats = Arc::new(PresentationStats::default());

        let handle = {
            let token = token.clone();
            let stats = stats.clone();
            thread::Builder::new()
                .name(format!("sub-window-present-{}", index))
                .spawn(move || run_loop(index, surface, source, frame_interval, token, stats))
                .map_err(SubWindowError::ThreadSpawn)?
        };

        debug!("子窗口 {} 呈现线程已启动, 帧间隔 {:?}", index, frame_interval);

        Ok(Self {
            index,
            token,
            stats,
            handle,
            join_warn_threshold,
        })
    }

    pub fn stats(&self) -> &Arc<PresentationStats> {
        &self.stats
    }

    /// 请求停止并阻塞等待线程退出，返回图形表面
    ///
    /// 正在进行的拷贝/呈现会先完成。线程 panic 时返回 `None`（表面已随线程栈释放）。
    pub fn stop(self) -> Option<S> {
        let started = Instant::now();
        self.token.cancel();

        let result = self.handle.join();
        let elapsed = started.elapsed();

        if elapsed > self.join_warn_threshold {
            warn!("子窗口 {} 呈现线程退出耗时过长: {:?}", self.index, elapsed);
        } else {
            debug!("子窗口 {} 呈现线程已退出, 等待 {:?}", self.index, elapsed);
        }

        match result {
            Ok(surface) => Some(surface),
            Err(_) => {
                error!("子窗口 {} 呈现线程异常退出", self.index);
                None
            }
        }
    }
}

fn run_loop<S: PresentSurface>(
    index: usize,
    mut surface: S,
    source: TextureHandle,
    frame_interval: Duration,
    token: StopToken,
    stats: Arc<PresentationStats>,
) -> S {
    while !token.is_cancelled() {
        match surface.acquire_back_buffer() {
            Ok(back_buffer) => {
                match surface.copy_and_present(&back_buffer, source) {
                    Ok(()) => {
                        stats.frames_presented.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) if e.is_transient() => {
                        stats.frames_skipped.fetch_add(1, Ordering::Relaxed);
                        trace!("子窗口 {} 呈现失败: {}", index, e);
                    }
                    Err(e) => {
                        stats.frames_skipped.fetch_add(1, Ordering::Relaxed);
                        warn!("子窗口 {} 呈现出错: {}", index, e);
                    }
                }
                // 成功与失败路径都在这里释放后台缓冲区
                drop(back_buffer);
            }
            Err(e) => {
                stats.frames_skipped.fetch_add(1, Ordering::Relaxed);
                trace!("子窗口 {} 跳过一帧: {}", index, e);
            }
        }

        if token.wait_timeout(frame_interval) {
            break;
        }
    }

    debug!(
        "子窗口 {} 呈现循环结束, 已呈现 {} 帧, 跳过 {} 帧",
        index,
        stats.frames_presented(),
        stats.frames_skipped()
    );
    surface
}
