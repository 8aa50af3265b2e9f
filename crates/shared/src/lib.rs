//! 共享库
//!
//! 包含配送平台各服务共用的配置、错误处理、数据库连接、Redis 客户端与可观测性基础设施。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod pubsub;
