//! 端到端测试：恢复中的异步依赖
//!
//! 测试场景：
//! 1. 异步依赖故障，连续失败3次后熔断
//! 2. 熔断期间请求被拒绝，依赖未被调用
//! 3. 依赖恢复，超时后的探测调用成功，熔断器关闭
//! 4. 后续请求正常通过

use crate::common::init_tracing;
use breakeron::{CallError, CircuitBreaker, CircuitBreakerConfig, CircuitState, ManualClock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Dependency {
    healthy: AtomicBool,
    calls: AtomicUsize,
}

impl Dependency {
    async fn fetch(&self, key: u64) -> Result<u64, std::io::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.healthy.load(Ordering::SeqCst) {
            Ok(key * 10)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "dependency down",
            ))
        }
    }
}

#[tokio::test]
async fn test_async_dependency_recovers() {
    init_tracing();
    let clock = ManualClock::new();
    let transitions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transitions);
    let breaker = CircuitBreaker::with_clock(
        CircuitBreakerConfig::new(3, Duration::from_secs(30)),
        Arc::new(clock.clone()),
    )
    .on_transition(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let dependency = Arc::new(Dependency::default());
    let dep = Arc::clone(&dependency);
    let protected = breaker
        .wrap(move |key: u64| {
            let dep = Arc::clone(&dep);
            async move { dep.fetch(key).await }
        })
        .unwrap();

    // 1. 故障期间连续失败
    for _ in 0..3 {
        let error = protected.call_async(1).await.unwrap_err();
        let io_error = error.into_failed().unwrap();
        assert_eq!(io_error.kind(), std::io::ErrorKind::ConnectionRefused);
    }
    assert!(breaker.state().is_open());

    // 2. 熔断期间拒绝
    clock.advance(Duration::from_secs(10));
    assert!(matches!(
        protected.call_async(2).await,
        Err(CallError::FailFast)
    ));
    assert_eq!(dependency.calls.load(Ordering::SeqCst), 3);

    // 3. 依赖恢复，探测成功
    dependency.healthy.store(true, Ordering::SeqCst);
    clock.advance(Duration::from_secs(21));
    assert_eq!(protected.call_async(3).await.unwrap(), 30);
    assert_eq!(breaker.state(), CircuitState::closed());

    // 4. 正常通过
    assert_eq!(protected.call_async(4).await.unwrap(), 40);
    assert_eq!(dependency.calls.load(Ordering::SeqCst), 5);

    // Closed(0)->Closed(1)->Closed(2)->Open->HalfOpen->Closed(0)
    assert_eq!(transitions.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_protected_call_runs_in_spawned_task() {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
    let protected = Arc::new(
        breaker
            .wrap(|value: u32| async move { Ok::<_, String>(value + 1) })
            .unwrap(),
    );

    let task = {
        let protected = Arc::clone(&protected);
        tokio::spawn(async move { protected.call_async(1).await })
    };

    assert_eq!(task.await.unwrap(), Ok(2));
    assert!(!protected.should_fail_fast());
}
