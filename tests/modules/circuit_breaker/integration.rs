//! 熔断器模块集成测试
//!
//! 测试熔断器外观与被保护服务的集成

use crate::common::{init_tracing, manual_breaker, FlakyService};
use breakeron::{
    BreakerError, CallError, CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock,
};
use std::sync::Arc;
use std::time::Duration;

/// 测试新建的熔断器处于关闭状态
#[test]
fn test_fresh_breaker_permits_calls() {
    init_tracing();
    for config in [
        CircuitBreakerConfig::default(),
        CircuitBreakerConfig::new(1, Duration::from_millis(1)),
        CircuitBreakerConfig::new(100, Duration::from_secs(3600)),
    ] {
        let breaker = CircuitBreaker::new(config);
        assert_eq!(breaker.state(), CircuitState::Closed { failure_count: 0 });
        assert!(!breaker.should_fail_fast());
    }
}

/// 测试重复包装被拒绝，与传入的函数无关
#[test]
fn test_breaker_protects_single_callable() {
    let (breaker, _) = manual_breaker(5, 1000);
    let service = FlakyService::new(&[true]);

    let svc = Arc::clone(&service);
    let first = breaker.wrap(move |request: &str| svc.handle(request));
    assert!(first.is_ok());

    let second = breaker.wrap(|request: &str| Ok::<_, String>(request.to_string()));
    let error = second.unwrap_err();
    assert!(matches!(error, BreakerError::AlreadyInUse));
    assert_eq!(error.to_string(), "CircuitBreaker: already-in-use");

    // 第一个包装器仍然可用
    assert_eq!(
        first.unwrap().call("a"),
        Ok("handled a".to_string())
    );
}

/// 测试阈值之前的失败只计数
#[test]
fn test_failures_tally_until_threshold() {
    let (breaker, clock) = manual_breaker(4, 1000);
    let service = FlakyService::failing();
    let svc = Arc::clone(&service);
    let protected = breaker.wrap(move |request: &str| svc.handle(request)).unwrap();

    for tally in 1..4 {
        let result = protected.call("req");
        assert_eq!(result, Err(CallError::Failed("Boom".to_string())));
        assert_eq!(breaker.state().failure_count(), Some(tally));
    }

    let _ = protected.call("req");
    assert_eq!(
        breaker.state(),
        CircuitState::Open {
            opened_at: clock.now()
        }
    );
    assert_eq!(service.calls(), 4);
}

/// 测试成功调用不会增加失败次数
#[test]
fn test_repeated_successes_keep_zero_failures() {
    let (breaker, _) = manual_breaker(2, 1000);
    let service = FlakyService::new(&[true; 10]);
    let svc = Arc::clone(&service);
    let protected = breaker.wrap(move |request: &str| svc.handle(request)).unwrap();

    for _ in 0..10 {
        assert!(protected.call("ok").is_ok());
        assert_eq!(breaker.state().failure_count(), Some(0));
    }
}

/// 测试打开状态下拒绝调用且不执行被保护函数
#[test]
fn test_open_circuit_rejects_without_invoking() {
    let (breaker, clock) = manual_breaker(1, 10_000);
    let service = FlakyService::failing();
    let svc = Arc::clone(&service);
    let protected = breaker.wrap(move |request: &str| svc.handle(request)).unwrap();

    assert!(protected.call("first").is_err());

    for _ in 0..5 {
        clock.advance(Duration::from_millis(1_000));
        let error = protected.call("rejected").unwrap_err();
        assert_eq!(error, CallError::FailFast);
        assert_eq!(error.kind(), "fail-fast");
        assert!(error.is_rejection());
    }

    assert_eq!(service.calls(), 1);
}

/// 测试超时后只执行一次探测调用
#[test]
fn test_probation_call_runs_exactly_once() {
    let (breaker, clock) = manual_breaker(1, 100);
    let service = FlakyService::new(&[false, true, true]);
    let svc = Arc::clone(&service);
    let protected = breaker.wrap(move |request: &str| svc.handle(request)).unwrap();

    assert!(protected.call("trip").is_err());
    assert_eq!(service.calls(), 1);

    clock.advance(Duration::from_millis(101));
    assert_eq!(protected.call("trial"), Ok("handled trial".to_string()));
    assert_eq!(service.calls(), 2);
    assert_eq!(breaker.state(), CircuitState::closed());

    assert!(protected.call("after").is_ok());
    assert_eq!(service.calls(), 3);
}

/// 测试观察者按顺序收到每次状态变化
#[test]
fn test_transition_observer_sequence() {
    let (breaker, clock) = manual_breaker(2, 50);
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let breaker = breaker.on_transition(move |previous, next| {
        sink.lock().push((previous.to_string(), next.to_string()));
    });

    let service = FlakyService::new(&[false, false, false]);
    let svc = Arc::clone(&service);
    let protected = breaker.wrap(move |request: &str| svc.handle(request)).unwrap();

    let _ = protected.call("a");
    let _ = protected.call("b");
    let _ = protected.call("rejected");
    clock.advance(Duration::from_millis(60));
    let _ = protected.call("trial");

    let seen = seen.lock();
    let pairs: Vec<(&str, &str)> = seen
        .iter()
        .map(|(previous, next)| (previous.as_str(), next.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Closed(0)", "Closed(1)"),
            ("Closed(1)", "Open"),
            ("Open", "HalfOpen"),
            ("HalfOpen", "Open"),
        ]
    );
}

/// 测试熔断器可以在线程间共享
#[test]
fn test_protected_shared_across_threads() {
    let (breaker, _) = manual_breaker(3, 10_000);
    let protected = Arc::new(
        breaker
            .wrap(|_: ()| Err::<(), _>("Boom"))
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let protected = Arc::clone(&protected);
            std::thread::spawn(move || protected.call(()))
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let failed = results
        .iter()
        .filter(|r| matches!(r, Err(CallError::Failed(_))))
        .count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(CallError::FailFast)))
        .count();

    assert!(failed >= 3);
    assert_eq!(failed + rejected, 4);
    assert!(breaker.should_fail_fast());
}

/// 测试被保护调用 panic 时熔断器按失败记录并继续传播 panic
#[test]
fn test_panicking_dependency_trips_circuit() {
    let (breaker, clock) = manual_breaker(2, 100);
    let opened = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&opened);
    let breaker = breaker.on_transition(move |_, next| {
        if next.is_open() {
            sink.lock().push(*next);
        }
    });
    let protected = breaker
        .wrap(|request: &str| -> Result<String, String> {
            if request == "crash" {
                panic!("dependency crashed");
            }
            Ok(format!("handled {request}"))
        })
        .unwrap();

    for _ in 0..2 {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            protected.call("crash")
        }));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"dependency crashed"));
    }

    assert!(breaker.should_fail_fast());
    assert_eq!(protected.call("next"), Err(CallError::FailFast));
    assert_eq!(
        *opened.lock(),
        vec![CircuitState::Open {
            opened_at: clock.now()
        }]
    );

    clock.advance(Duration::from_millis(101));
    assert_eq!(protected.call("trial"), Ok("handled trial".to_string()));
    assert_eq!(breaker.state(), CircuitState::closed());
}
