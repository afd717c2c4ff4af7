//! state_machine 模块测试
