//! circuit_breaker 模块测试

mod integration;
