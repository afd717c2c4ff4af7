//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 熔断器状态机
//!
//! 根据调用生命周期事件计算下一个状态。状态机本身不可变，每次转换都产生新的实例，
//! 阈值策略、超时策略与转换观察者在整个生命周期内保持不变。
//!
//! # 事件顺序
//!
//! 每次受保护调用依次产生 [`Event::BeforeCall`]，然后是 [`Event::CallSucceeded`] 或
//! [`Event::CallFailed`] 之一。
//!
//! # 两种编排方式
//!
//! - [`StateMachine::transition`]：调用方自行执行操作，并在前后分别提交事件
//! - [`StateMachine::invoke`] / [`StateMachine::invoke_async`]：由状态机执行操作，
//!   返回调用结果与新的状态机
//!
//! 两者基于同一张转换表，对相同的事件序列产生相同的状态轨迹。

use crate::clock::Clock;
use crate::config::CircuitBreakerConfig;
use crate::error::{CallError, CallResult};
use crate::state::CircuitState;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, trace, warn};

/// 阈值策略：给定失败次数，判断是否应熔断
pub type ThresholdPolicy = Arc<dyn Fn(u32) -> bool + Send + Sync>;

/// 超时策略：给定熔断时刻与当前时刻，判断是否可以开始探测
pub type TimeoutPolicy = Arc<dyn Fn(Instant, Instant) -> bool + Send + Sync>;

/// 状态转换观察者，参数为 (旧状态, 新状态)
pub type TransitionObserver = Arc<dyn Fn(&CircuitState, &CircuitState) + Send + Sync>;

/// 一次状态变化 (旧状态, 新状态)
pub type StateChange = (CircuitState, CircuitState);

/// 调用生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// 调用之前
    BeforeCall,
    /// 调用成功
    CallSucceeded,
    /// 调用失败
    CallFailed,
}

/// [`StateMachine::invoke`] 的结果
pub struct Invocation<T, E> {
    /// 调用结果，被抑制的调用为 [`CallError::CircuitOpen`]
    pub outcome: CallResult<T, E>,
    /// 转换后的状态机
    pub machine: StateMachine,
}

/// 熔断器状态机
#[derive(Clone)]
pub struct StateMachine {
    current_state: CircuitState,
    is_threshold_reached: ThresholdPolicy,
    is_timeout_reached: TimeoutPolicy,
    notify_transition: Option<TransitionObserver>,
    clock: Arc<dyn Clock>,
}

impl StateMachine {
    /// 创建新的状态机
    ///
    /// # 参数
    /// - `state`: 初始状态
    /// - `is_threshold_reached`: 阈值策略
    /// - `is_timeout_reached`: 超时策略
    /// - `clock`: 时钟
    pub fn new<T, O>(
        state: CircuitState,
        is_threshold_reached: T,
        is_timeout_reached: O,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        T: Fn(u32) -> bool + Send + Sync + 'static,
        O: Fn(Instant, Instant) -> bool + Send + Sync + 'static,
    {
        Self {
            current_state: state,
            is_threshold_reached: Arc::new(is_threshold_reached),
            is_timeout_reached: Arc::new(is_timeout_reached),
            notify_transition: None,
            clock,
        }
    }

    /// 根据配置创建处于 Closed(0) 的状态机
    ///
    /// - 阈值策略：`failure_count >= max_failures`
    /// - 超时策略：`opened_at + reset_timeout < now`
    pub fn from_config(config: &CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let max_failures = config.max_failures;
        let reset_timeout = config.reset_timeout();

        Self::new(
            CircuitState::closed(),
            move |failure_count| failure_count >= max_failures,
            move |opened_at: Instant, now| {
                opened_at
                    .checked_add(reset_timeout)
                    .map_or(false, |deadline| deadline < now)
            },
            clock,
        )
    }

    /// 设置状态转换观察者
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&CircuitState, &CircuitState) + Send + Sync + 'static,
    {
        self.notify_transition = Some(Arc::new(observer));
        self
    }

    /// 当前状态
    pub fn current_state(&self) -> CircuitState {
        self.current_state
    }

    /// 是否允许调用
    pub fn is_call_permitted(&self) -> bool {
        self.current_state.is_call_permitted()
    }

    /// 是否应快速失败
    pub fn should_fail_fast(&self) -> bool {
        !self.is_call_permitted()
    }

    /// 处理一个生命周期事件，返回新的状态机
    ///
    /// 每次状态变化都会按发生顺序通知观察者。
    pub fn transition(&self, event: Event) -> StateMachine {
        let (machine, changes) = self.transition_with_changes(event);
        if let Some(notify) = &self.notify_transition {
            for (previous, next) in &changes {
                notify(previous, next);
            }
        }
        machine
    }

    /// 处理一个生命周期事件，返回新的状态机与按顺序发生的状态变化
    ///
    /// 不调用观察者，由调用方决定何时通知。
    pub fn transition_with_changes(&self, event: Event) -> (StateMachine, Vec<StateChange>) {
        let mut changes = Vec::new();
        let machine = self.step(event, &mut changes);
        (machine, changes)
    }

    fn step(&self, event: Event, changes: &mut Vec<StateChange>) -> StateMachine {
        let state = self.current_state;

        match (state, event) {
            (CircuitState::Closed { .. }, Event::BeforeCall) => self.move_to(state, changes),
            (CircuitState::Closed { .. }, Event::CallSucceeded) => {
                self.move_to(state.reset(), changes)
            }
            (CircuitState::Closed { failure_count }, Event::CallFailed) => {
                if (self.is_threshold_reached)(failure_count.saturating_add(1)) {
                    self.move_to(state.trip(self.clock.now()), changes)
                } else {
                    self.move_to(state.increase_failure(), changes)
                }
            }

            (CircuitState::Open { opened_at }, Event::BeforeCall) => {
                if self.timeout_reached(opened_at) {
                    self.move_to(state.try_reset(), changes)
                } else {
                    self.move_to(state, changes)
                }
            }
            // 探测已在同一次调用内开始：转入半开后重新分发该事件
            (CircuitState::Open { opened_at }, Event::CallSucceeded | Event::CallFailed) => {
                if self.timeout_reached(opened_at) {
                    self.move_to(state.try_reset(), changes).step(event, changes)
                } else {
                    self.move_to(state, changes)
                }
            }

            (CircuitState::HalfOpen, Event::BeforeCall) => self.move_to(state, changes),
            (CircuitState::HalfOpen, Event::CallSucceeded) => {
                self.move_to(state.reset(), changes)
            }
            (CircuitState::HalfOpen, Event::CallFailed) => {
                self.move_to(state.trip(self.clock.now()), changes)
            }
        }
    }

    /// 执行同步调用并完成状态转换
    ///
    /// 打开状态且未超时时调用不会被执行，结果为 [`CallError::CircuitOpen`]。
    /// 调用 panic 时先按失败完成转换（观察者会收到通知），再继续传播 panic。
    pub fn invoke<T, E, F>(&self, call: F) -> Invocation<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let machine = self.transition(Event::BeforeCall);
        if machine.should_fail_fast() {
            return Invocation {
                outcome: Err(CallError::CircuitOpen),
                machine,
            };
        }

        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => machine.settle(result),
            Err(payload) => {
                machine.transition(Event::CallFailed);
                panic::resume_unwind(payload)
            }
        }
    }

    /// 执行异步调用，在结果就绪后完成状态转换
    pub async fn invoke_async<T, E, F, Fut>(&self, call: F) -> Invocation<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let machine = self.transition(Event::BeforeCall);
        if machine.should_fail_fast() {
            return Invocation {
                outcome: Err(CallError::CircuitOpen),
                machine,
            };
        }

        match AssertUnwindSafe(async move { call().await })
            .catch_unwind()
            .await
        {
            Ok(result) => machine.settle(result),
            Err(payload) => {
                machine.transition(Event::CallFailed);
                panic::resume_unwind(payload)
            }
        }
    }

    fn settle<T, E>(&self, result: Result<T, E>) -> Invocation<T, E> {
        match result {
            Ok(value) => Invocation {
                outcome: Ok(value),
                machine: self.transition(Event::CallSucceeded),
            },
            Err(e) => Invocation {
                outcome: Err(CallError::Failed(e)),
                machine: self.transition(Event::CallFailed),
            },
        }
    }

    fn timeout_reached(&self, opened_at: Instant) -> bool {
        (self.is_timeout_reached)(opened_at, self.clock.now())
    }

    fn move_to(&self, next: CircuitState, changes: &mut Vec<StateChange>) -> StateMachine {
        let previous = self.current_state;

        if next != previous {
            match next {
                CircuitState::Open { .. } => {
                    warn!("熔断器状态变更: {} -> {}", previous, next);
                }
                CircuitState::Closed { failure_count } if previous.is_closed() => {
                    if failure_count == 0 {
                        trace!("操作成功（关闭状态），重置失败计数");
                    } else {
                        trace!("操作失败（关闭状态）: failure_count={}", failure_count);
                    }
                }
                _ => {
                    info!("熔断器状态变更: {} -> {}", previous, next);
                }
            }

            changes.push((previous, next));
        }

        StateMachine {
            current_state: next,
            is_threshold_reached: Arc::clone(&self.is_threshold_reached),
            is_timeout_reached: Arc::clone(&self.is_timeout_reached),
            notify_transition: self.notify_transition.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current_state", &self.current_state)
            .field("has_observer", &self.notify_transition.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}
