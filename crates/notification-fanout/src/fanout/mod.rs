//! 通知扇出
//!
//! 调用链：`FanoutOrchestrator`（同步受理）→ 后台任务 →
//! `AudienceResolver`（解析收件人）→ `FanoutDispatcher`（写日志 + 渠道投递）。

mod dispatcher;
mod orchestrator;
mod resolver;

pub use dispatcher::FanoutDispatcher;
pub use orchestrator::{FanoutHandle, FanoutOrchestrator, FanoutState, TriggerOutcome};
pub use resolver::{AudienceDirectories, AudienceResolver};
