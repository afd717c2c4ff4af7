//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 熔断器实现
//!
//! 提供熔断器功能，支持三状态转换和自动恢复。
//!
//! # 特性
//!
//! - **三状态**: Closed（关闭）、Open（打开）、HalfOpen（半开）
//! - **自动熔断**: 连续失败次数达到阈值自动熔断
//! - **自动恢复**: 超时后放行一次探测调用，成功则关闭，失败则重新打开
//! - **同步与异步**: 同一个包装器既可保护同步函数，也可保护返回 Future 的函数
//! - **线程安全**: 状态机保存在互斥锁中，每次事件的读-改-写在锁内完成
//! - **单一用途**: 一个熔断器实例在整个生命周期内只保护一个调用
//! - **观察者**: 可注册多个观察者，在状态锁释放后按转换顺序收到通知

use crate::clock::{system_clock, Clock};
use crate::config::CircuitBreakerConfig;
use crate::error::{BreakerError, CallError, CallResult};
use crate::state::CircuitState;
use crate::state_machine::{Event, StateChange, StateMachine, TransitionObserver};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

struct BreakerCore {
    /// 当前状态机
    machine: Mutex<StateMachine>,
    /// 状态转换观察者，按注册顺序调用
    observers: RwLock<Vec<TransitionObserver>>,
    /// 尚未通知的状态变化，入队时持有状态锁
    pending: Mutex<VecDeque<StateChange>>,
    /// 同一时刻只有一个线程派发通知
    notifying: Mutex<()>,
    /// 是否已经包装过调用
    in_use: AtomicBool,
    /// 配置
    config: CircuitBreakerConfig,
}

impl BreakerCore {
    fn apply(&self, event: Event) -> CircuitState {
        let state = {
            let mut machine = self.machine.lock();
            let (next, changes) = machine.transition_with_changes(event);
            let state = next.current_state();
            *machine = next;
            if !changes.is_empty() {
                self.pending.lock().extend(changes);
            }
            state
        };

        self.notify_pending();
        state
    }

    /// 在状态锁之外派发排队的状态变化
    ///
    /// 正在派发的线程会一直取到队列为空；观察者内部再次触发的转换由外层循环派发，
    /// 因此通知顺序与转换顺序一致。
    fn notify_pending(&self) {
        loop {
            let Some(guard) = self.notifying.try_lock() else {
                return;
            };

            loop {
                let change = self.pending.lock().pop_front();
                let Some((previous, next)) = change else {
                    break;
                };
                let observers = self.observers.read().clone();
                for observer in &observers {
                    observer(&previous, &next);
                }
            }

            drop(guard);
            // 释放派发权之后入队的变化没有人负责，需要重新检查
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    fn state(&self) -> CircuitState {
        self.machine.lock().current_state()
    }
}

/// 熔断器
///
/// # 示例
/// ```rust
/// use breakeron::{CallError, CircuitBreaker, CircuitBreakerConfig};
/// use std::time::Duration;
///
/// let breaker = CircuitBreaker::new(CircuitBreakerConfig::new(1, Duration::from_secs(10)));
/// let protected = breaker
///     .wrap(|_: ()| Err::<(), _>("Boom"))
///     .unwrap();
///
/// assert_eq!(protected.call(()), Err(CallError::Failed("Boom")));
/// assert_eq!(protected.call(()), Err(CallError::FailFast));
/// assert!(breaker.should_fail_fast());
/// ```
pub struct CircuitBreaker {
    core: Arc<BreakerCore>,
}

impl CircuitBreaker {
    /// 使用系统时钟创建熔断器
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// 使用指定时钟创建熔断器
    ///
    /// # 参数
    /// - `config`: 熔断器配置
    /// - `clock`: 时钟，测试中可注入 [`ManualClock`](crate::clock::ManualClock)
    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "创建熔断器: max_failures={}, reset_timeout={:?}",
            config.max_failures,
            config.reset_timeout()
        );

        Self {
            core: Arc::new(BreakerCore {
                machine: Mutex::new(StateMachine::from_config(&config, clock)),
                observers: RwLock::new(Vec::new()),
                pending: Mutex::new(VecDeque::new()),
                notifying: Mutex::new(()),
                in_use: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// 添加状态转换观察者
    ///
    /// 每次状态变化调用一次，参数为 (旧状态, 新状态)，按转换发生的顺序调用。
    /// 可多次调用，观察者按注册顺序依次收到同一个变化，后注册的不会替换先注册的。
    /// 通知在状态锁释放后派发，观察者中可以查询同一个熔断器。
    pub fn on_transition<F>(self, observer: F) -> Self
    where
        F: Fn(&CircuitState, &CircuitState) + Send + Sync + 'static,
    {
        self.core.observers.write().push(Arc::new(observer));
        self
    }

    /// 包装被保护的调用
    ///
    /// 每个熔断器实例只能包装一次，第二次调用返回 [`BreakerError::AlreadyInUse`]，
    /// 与传入的调用无关。
    pub fn wrap<F>(&self, call: F) -> Result<Protected<F>, BreakerError> {
        if self
            .core
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("熔断器已被占用，拒绝重复包装");
            return Err(BreakerError::AlreadyInUse);
        }

        Ok(Protected {
            core: Arc::clone(&self.core),
            call,
        })
    }

    /// 当前是否应快速失败
    pub fn should_fail_fast(&self) -> bool {
        !self.core.state().is_call_permitted()
    }

    /// 获取当前状态
    pub fn state(&self) -> CircuitState {
        self.core.state()
    }

    /// 是否已经包装过调用
    pub fn is_in_use(&self) -> bool {
        self.core.in_use.load(Ordering::Acquire)
    }

    /// 获取配置
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.core.config
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.core.state())
            .field("in_use", &self.is_in_use())
            .field("observers", &self.core.observers.read().len())
            .field("config", &self.core.config)
            .finish()
    }
}

/// 受熔断器保护的调用
///
/// 由 [`CircuitBreaker::wrap`] 创建，与创建它的熔断器共享状态。
pub struct Protected<F> {
    core: Arc<BreakerCore>,
    call: F,
}

impl<F> Protected<F> {
    /// 执行同步调用
    ///
    /// # 返回
    /// - `Ok(T)`: 调用成功
    /// - `Err(CallError::FailFast)`: 熔断器打开，调用未执行
    /// - `Err(CallError::Failed(e))`: 调用失败，状态已更新
    ///
    /// 调用 panic 时按失败记录，然后继续传播 panic。
    pub fn call<A, T, E>(&self, arg: A) -> CallResult<T, E>
    where
        F: Fn(A) -> Result<T, E>,
    {
        self.before_call::<E>()?;
        match panic::catch_unwind(AssertUnwindSafe(|| (self.call)(arg))) {
            Ok(result) => self.settle(result),
            Err(payload) => self.settle_panic(payload),
        }
    }

    /// 执行异步调用
    ///
    /// 状态锁不会跨越 `.await` 持有，结果就绪后才提交成功或失败事件。
    /// 创建或轮询 Future 时 panic 按失败记录，然后继续传播 panic。
    pub async fn call_async<A, T, E, Fut>(&self, arg: A) -> CallResult<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.before_call::<E>()?;
        match AssertUnwindSafe(async move { (self.call)(arg).await })
            .catch_unwind()
            .await
        {
            Ok(result) => self.settle(result),
            Err(payload) => self.settle_panic(payload),
        }
    }

    /// 当前是否应快速失败
    pub fn should_fail_fast(&self) -> bool {
        !self.core.state().is_call_permitted()
    }

    /// 获取当前状态
    pub fn state(&self) -> CircuitState {
        self.core.state()
    }

    fn before_call<E>(&self) -> Result<(), CallError<E>> {
        let state = self.core.apply(Event::BeforeCall);
        if state.is_call_permitted() {
            Ok(())
        } else {
            warn!("熔断器打开，拒绝请求");
            Err(CallError::FailFast)
        }
    }

    fn settle<T, E>(&self, result: Result<T, E>) -> CallResult<T, E> {
        match result {
            Ok(value) => {
                self.core.apply(Event::CallSucceeded);
                Ok(value)
            }
            Err(e) => {
                self.core.apply(Event::CallFailed);
                Err(CallError::Failed(e))
            }
        }
    }

    fn settle_panic(&self, payload: Box<dyn Any + Send>) -> ! {
        warn!("受保护调用发生 panic，按失败处理");
        self.core.apply(Event::CallFailed);
        panic::resume_unwind(payload)
    }
}

impl<F> fmt::Debug for Protected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protected")
            .field("state", &self.core.state())
            .finish()
    }
}
