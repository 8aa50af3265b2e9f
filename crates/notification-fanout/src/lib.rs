//! 通知扇出引擎
//!
//! 管理员触发发送后，按地理围栏和目标类别解析收件人，逐个写入投递日志、
//! 调用推送服务并广播实时消息，最后写一条管理员汇总日志。
//! 触发请求在解析开始前即返回，扇出在后台任务中完成。

pub mod channels;
pub mod error;
pub mod fanout;
pub mod models;
pub mod repository;
pub mod test_utils;

pub use error::{FanoutError, Result};
pub use fanout::{
    AudienceDirectories, AudienceResolver, FanoutDispatcher, FanoutHandle, FanoutOrchestrator,
    FanoutState, TriggerOutcome,
};
