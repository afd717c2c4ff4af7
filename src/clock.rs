//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 时钟抽象
//!
//! 熔断器通过 [`Clock`] 获取当前时刻，测试中可注入 [`ManualClock`] 以获得确定性。

use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 时钟
pub trait Clock: Debug + Send + Sync {
    /// 当前时刻
    fn now(&self) -> Instant;
}

/// 系统单调时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手动推进的时钟
///
/// 克隆共享同一时间线，可在测试中推进时间而无需真实等待。
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// 创建新的手动时钟，起点为当前时刻
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// 推进时间
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// 设置自起点以来经过的时间
    pub fn set_elapsed(&self, elapsed: Duration) {
        *self.elapsed.lock() = elapsed;
    }

    /// 自起点以来经过的时间
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

/// 默认时钟
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
