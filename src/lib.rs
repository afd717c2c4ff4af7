//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Breakeron - Circuit Breaker for Rust
//!
//! Protects a caller from repeatedly invoking an unreliable operation: failures are
//! counted, and once a threshold is crossed calls are refused until a cooldown has passed
//! and a probation call succeeds.
//!
//! # API Layers
//!
//! ## Prelude (Quick Start)
//!
//! Use `use breakeron::prelude::*;` to import all commonly used types.
//!
//! ## Core API
//!
//! - [`CircuitBreaker`] - Facade that wraps exactly one callable
//! - [`Protected`] - The wrapped callable (sync via `call`, async via `call_async`)
//! - [`CircuitBreakerConfig`] - `max_failures` and `reset_timeout_millis`
//! - [`CallError`] / [`BreakerError`] - Error types
//!
//! ## State Machine
//!
//! - [`CircuitState`] - Closed / Open / HalfOpen with pure transition operations
//! - [`StateMachine`] - Event-driven transitions plus call-wrapping `invoke`
//! - [`Clock`] - Injectable time source ([`SystemClock`], [`ManualClock`])
//!
//! # Examples
//!
//! ```rust
//! use breakeron::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // 创建熔断器：连续失败2次后熔断，500毫秒后允许探测
//!     let breaker = CircuitBreaker::new(CircuitBreakerConfig::new(2, Duration::from_millis(500)));
//!     let protected = breaker
//!         .wrap(|id: u32| async move { Ok::<_, std::io::Error>(id) })
//!         .unwrap();
//!
//!     let value = protected.call_async(7).await.unwrap();
//!     assert_eq!(value, 7);
//!     assert!(!breaker.should_fail_fast());
//! }
//! ```

pub mod prelude;

pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod state;
pub mod state_machine;

// 重新导出常用类型
pub use circuit_breaker::{CircuitBreaker, Protected};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CircuitBreakerConfig;
pub use error::{BreakerError, CallError, CallResult};
pub use state::CircuitState;
pub use state_machine::{Event, Invocation, StateChange, StateMachine};
