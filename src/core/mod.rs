//! 核心控制层：错误类型、重试台账、状态投影与主控循环

pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod status;

pub use error::{ControlError, WorldError};
pub use orchestrator::Orchestrator;
pub use retry::{RetryLedger, RetryRecord};
pub use status::{NavReport, RunPhase, StatusSnapshot};
