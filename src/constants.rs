//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Centralized configuration constants for Breakeron.
//!
//! All default values used by [`CircuitBreakerConfig`] and the error surface are defined
//! here with their purpose and usage context.
//!
//! [`CircuitBreakerConfig`]: crate::config::CircuitBreakerConfig

// ============================================================================
// Circuit Breaker Constants
// ============================================================================

/// Default failure threshold for circuit breaker.
///
/// The circuit breaker transitions to open state once this many consecutive failures
/// have been recorded since the last reset.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Default reset timeout for circuit breaker (1 second).
///
/// Minimum time, measured from the instant the circuit opened, before a probation
/// call is let through.
pub const DEFAULT_RESET_TIMEOUT_MILLIS: u64 = 1_000;

// ============================================================================
// Error Kind Identifiers
// ============================================================================

/// Raised by `wrap()` when the breaker already protects a callable.
pub const KIND_ALREADY_IN_USE: &str = "already-in-use";

/// Raised by a protected callable while the circuit forbids calls.
pub const KIND_FAIL_FAST: &str = "fail-fast";

/// Produced by [`StateMachine::invoke`] when the call was suppressed.
///
/// [`StateMachine::invoke`]: crate::state_machine::StateMachine::invoke
pub const KIND_CIRCUIT_OPEN: &str = "circuit-breaker-open";

/// Kind reported for the protected callable's own failure.
pub const KIND_CALL_FAILED: &str = "call-failed";

/// Kind reported for invalid configuration values or unsupported config files.
pub const KIND_CONFIG: &str = "config";

/// Kind reported when a config file cannot be read.
pub const KIND_IO: &str = "io";

/// Kind reported when a config document cannot be deserialized.
pub const KIND_PARSE: &str = "parse";
