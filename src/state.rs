//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 熔断器状态
//!
//! 三种不可变状态及其纯转换操作。每个操作都返回新的状态值，不修改原值。
//!
//! | 状态 | 操作 | 结果 |
//! |---|---|---|
//! | Closed(n) | `reset()` | Closed(0) |
//! | Closed(n) | `increase_failure()` | Closed(n+1) |
//! | Closed(n) | `trip(now)` | Open(now) |
//! | Open(t) | `try_reset()` | HalfOpen |
//! | HalfOpen | `reset()` | Closed(0) |
//! | HalfOpen | `trip(now)` | Open(now) |
//!
//! 未在表中列出的组合保持状态不变。

use std::fmt;
use std::time::Instant;

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// 关闭状态（正常），记录自上次重置以来的连续失败次数
    Closed { failure_count: u32 },
    /// 打开状态（熔断），记录熔断时刻
    Open { opened_at: Instant },
    /// 半开状态（探测），下一次调用结果决定关闭或重新打开
    HalfOpen,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self::closed()
    }
}

impl CircuitState {
    /// 初始关闭状态
    pub fn closed() -> Self {
        CircuitState::Closed { failure_count: 0 }
    }

    /// 调用成功，回到 Closed(0)
    pub fn reset(self) -> Self {
        match self {
            CircuitState::Closed { .. } | CircuitState::HalfOpen => Self::closed(),
            open @ CircuitState::Open { .. } => open,
        }
    }

    /// 失败次数加一
    pub fn increase_failure(self) -> Self {
        match self {
            CircuitState::Closed { failure_count } => CircuitState::Closed {
                failure_count: failure_count.saturating_add(1),
            },
            other => other,
        }
    }

    /// 熔断，进入 Open(now)
    pub fn trip(self, now: Instant) -> Self {
        match self {
            CircuitState::Closed { .. } | CircuitState::HalfOpen => {
                CircuitState::Open { opened_at: now }
            }
            open @ CircuitState::Open { .. } => open,
        }
    }

    /// 冷却结束，进入半开探测
    pub fn try_reset(self) -> Self {
        match self {
            CircuitState::Open { .. } => CircuitState::HalfOpen,
            other => other,
        }
    }

    /// 是否允许调用
    pub fn is_call_permitted(&self) -> bool {
        !self.is_open()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, CircuitState::Closed { .. })
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CircuitState::Open { .. })
    }

    pub fn is_half_open(&self) -> bool {
        matches!(self, CircuitState::HalfOpen)
    }

    /// 连续失败次数，仅关闭状态有意义
    pub fn failure_count(&self) -> Option<u32> {
        match self {
            CircuitState::Closed { failure_count } => Some(*failure_count),
            _ => None,
        }
    }

    /// 熔断时刻，仅打开状态有意义
    pub fn opened_at(&self) -> Option<Instant> {
        match self {
            CircuitState::Open { opened_at } => Some(*opened_at),
            _ => None,
        }
    }

    /// 状态名称
    pub fn name(&self) -> &'static str {
        match self {
            CircuitState::Closed { .. } => "Closed",
            CircuitState::Open { .. } => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed { failure_count } => write!(f, "Closed({})", failure_count),
            CircuitState::Open { .. } => f.write_str("Open"),
            CircuitState::HalfOpen => f.write_str("HalfOpen"),
        }
    }
}
