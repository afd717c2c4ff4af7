//! Prelude module - Commonly used types for quick imports
//!
//! This module re-exports the most commonly used types from Breakeron,
//! allowing users to import them with a single `use breakeron::prelude::*;`
//! statement instead of importing each type individually.

// Core types
pub use crate::circuit_breaker::{CircuitBreaker, Protected};
pub use crate::config::CircuitBreakerConfig;
pub use crate::error::{BreakerError, CallError, CallResult};

// State machine
pub use crate::state::CircuitState;
pub use crate::state_machine::{Event, StateMachine};

// Clocks
pub use crate::clock::{Clock, ManualClock, SystemClock};
